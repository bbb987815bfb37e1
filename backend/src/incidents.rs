use std::{collections::VecDeque, sync::RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::NavError;
use crate::models::{Coordinate, Incident, IncidentSeverity, IncidentStatus, IncidentType, NewIncident};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentTypeInfo {
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub default_severity: IncidentSeverity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityInfo {
    pub severity: IncidentSeverity,
    pub name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentCatalog {
    pub types: Vec<IncidentTypeInfo>,
    pub severities: Vec<SeverityInfo>,
}

pub fn type_info(incident_type: IncidentType) -> IncidentTypeInfo {
    use IncidentSeverity::*;
    use IncidentType::*;

    let (name, description, color, default_severity) = match incident_type {
        PoorLighting => (
            "Poor Lighting",
            "Inadequate lighting in pathways or areas",
            "#f59e0b",
            Medium,
        ),
        UnsafeArea => (
            "Unsafe Area",
            "General safety concerns in specific locations",
            "#ef4444",
            High,
        ),
        BrokenInfrastructure => (
            "Broken Infrastructure",
            "Damaged roads, walkways, or facilities",
            "#f97316",
            Medium,
        ),
        WildlifeSighting => (
            "Wildlife Sighting",
            "Potentially dangerous wildlife encounters",
            "#84cc16",
            Low,
        ),
        Flooding => (
            "Flooding/Water logging",
            "Water accumulation blocking pathways",
            "#06b6d4",
            Medium,
        ),
        ConstructionHazard => (
            "Construction Hazard",
            "Unsafe construction sites or equipment",
            "#f59e0b",
            High,
        ),
        MedicalEmergency => (
            "Medical Emergency",
            "Someone requiring immediate medical attention",
            "#dc2626",
            Critical,
        ),
        SecurityConcern => (
            "Security Concern",
            "Suspicious activities or security issues",
            "#7c3aed",
            High,
        ),
        LostFound => ("Lost & Found", "Lost items or found belongings", "#10b981", Low),
        Harassment => (
            "Harassment",
            "Inappropriate behavior or harassment",
            "#dc2626",
            High,
        ),
        Theft => ("Theft", "Stolen items or theft incidents", "#991b1b", High),
        Other => (
            "Other",
            "Other safety or security concerns",
            "#6b7280",
            Medium,
        ),
    };

    IncidentTypeInfo {
        incident_type,
        name,
        description,
        color,
        default_severity,
    }
}

pub fn severity_info(severity: IncidentSeverity) -> SeverityInfo {
    let (name, color, description) = match severity {
        IncidentSeverity::Low => ("Low", "#10b981", "Minor issue, no immediate danger"),
        IncidentSeverity::Medium => ("Medium", "#f59e0b", "Moderate concern, should be addressed"),
        IncidentSeverity::High => ("High", "#ef4444", "Serious issue requiring prompt attention"),
        IncidentSeverity::Critical => (
            "Critical",
            "#dc2626",
            "Immediate danger, requires urgent response",
        ),
    };
    SeverityInfo {
        severity,
        name,
        color,
        description,
    }
}

pub fn catalog() -> IncidentCatalog {
    use IncidentType::*;
    let types = [
        PoorLighting,
        UnsafeArea,
        BrokenInfrastructure,
        WildlifeSighting,
        Flooding,
        ConstructionHazard,
        MedicalEmergency,
        SecurityConcern,
        LostFound,
        Harassment,
        Theft,
        Other,
    ];
    let severities = [
        IncidentSeverity::Low,
        IncidentSeverity::Medium,
        IncidentSeverity::High,
        IncidentSeverity::Critical,
    ];
    IncidentCatalog {
        types: types.into_iter().map(type_info).collect(),
        severities: severities.into_iter().map(severity_info).collect(),
    }
}

/// Demo incidents shown on the heatmap alongside real reports.
pub fn sample_incidents(now: DateTime<Utc>) -> Vec<Incident> {
    vec![
        Incident {
            id: "inc-001".into(),
            incident_type: IncidentType::PoorLighting,
            severity: IncidentSeverity::Medium,
            location: Coordinate::new(12.989, 80.232),
            description: "Street light near Alakananda Hostel is not working".into(),
            timestamp: now - Duration::hours(2),
            anonymous: false,
            photos: Vec::new(),
            reporter_contact: Some("student@iitm.ac.in".into()),
            status: IncidentStatus::Reported,
            admin_notes: None,
            resolved_at: None,
        },
        Incident {
            id: "inc-002".into(),
            incident_type: IncidentType::BrokenInfrastructure,
            severity: IncidentSeverity::High,
            location: Coordinate::new(12.991, 80.234),
            description: "Large pothole on main pathway causing safety hazard".into(),
            timestamp: now - Duration::hours(6),
            anonymous: true,
            photos: Vec::new(),
            reporter_contact: None,
            status: IncidentStatus::InProgress,
            admin_notes: Some("Maintenance team notified".into()),
            resolved_at: None,
        },
        Incident {
            id: "inc-003".into(),
            incident_type: IncidentType::WildlifeSighting,
            severity: IncidentSeverity::Low,
            location: Coordinate::new(12.985, 80.238),
            description: "Snake spotted near sports complex".into(),
            timestamp: now - Duration::hours(24),
            anonymous: false,
            photos: Vec::new(),
            reporter_contact: None,
            status: IncidentStatus::Resolved,
            admin_notes: None,
            resolved_at: Some(now - Duration::hours(12)),
        },
    ]
}

/// Reports kept in memory before the oldest are dropped.
pub const MAX_STORED_INCIDENTS: usize = 1000;

/// In-memory incident reports. Nothing is persisted across restarts, and
/// only the newest `limit` reports are retained.
#[derive(Debug)]
pub struct IncidentStore {
    incidents: RwLock<VecDeque<Incident>>,
    limit: usize,
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::with_limit(MAX_STORED_INCIDENTS)
    }
}

impl IncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            incidents: RwLock::new(VecDeque::new()),
            limit: limit.max(1),
        }
    }

    pub fn report(&self, report: NewIncident) -> Result<Incident, NavError> {
        let location = report.location.validate()?;
        let description = report.description.trim();
        if description.is_empty() {
            return Err(NavError::EmptyDescription);
        }

        let severity = report
            .severity
            .unwrap_or_else(|| type_info(report.incident_type).default_severity);
        let reporter_contact = if report.anonymous {
            None
        } else {
            report.reporter_contact.filter(|contact| !contact.trim().is_empty())
        };

        let incident = Incident {
            id: format!("inc-{}", Uuid::new_v4()),
            incident_type: report.incident_type,
            severity,
            location,
            description: description.to_string(),
            timestamp: Utc::now(),
            anonymous: report.anonymous,
            photos: report.photos,
            reporter_contact,
            status: IncidentStatus::Reported,
            admin_notes: None,
            resolved_at: None,
        };

        tracing::info!(
            "incident {} reported: {:?} ({:?}) at ({}, {})",
            incident.id,
            incident.incident_type,
            incident.severity,
            location.lat,
            location.lng
        );

        let mut incidents = self.incidents.write().map_err(|_| NavError::StatePoisoned)?;
        if incidents.len() >= self.limit {
            if let Some(dropped) = incidents.pop_front() {
                tracing::debug!("incident store full, dropping {}", dropped.id);
            }
        }
        incidents.push_back(incident.clone());
        Ok(incident)
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<Incident>, NavError> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .read()
            .map_err(|_| NavError::StatePoisoned)?
            .iter()
            .cloned()
            .collect();
        incidents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(incidents)
    }

    /// Stored reports followed by the demo incidents when requested.
    pub fn heatmap_input(&self, include_samples: bool) -> Result<Vec<Incident>, NavError> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .read()
            .map_err(|_| NavError::StatePoisoned)?
            .iter()
            .cloned()
            .collect();
        if include_samples {
            incidents.extend(sample_incidents(Utc::now()));
        }
        Ok(incidents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CAMPUS_CENTER;

    fn report(incident_type: IncidentType) -> NewIncident {
        NewIncident {
            incident_type,
            severity: None,
            location: CAMPUS_CENTER,
            description: "  Light out near the library  ".into(),
            anonymous: false,
            photos: Vec::new(),
            reporter_contact: Some("someone@example.com".into()),
        }
    }

    #[test]
    fn report_applies_default_severity_and_status() {
        let store = IncidentStore::new();
        let incident = store.report(report(IncidentType::MedicalEmergency)).unwrap();
        assert_eq!(incident.severity, IncidentSeverity::Critical);
        assert_eq!(incident.status, IncidentStatus::Reported);
        assert_eq!(incident.description, "Light out near the library");
        assert!(incident.id.starts_with("inc-"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn explicit_severity_wins() {
        let store = IncidentStore::new();
        let mut new = report(IncidentType::Theft);
        new.severity = Some(IncidentSeverity::Low);
        assert_eq!(store.report(new).unwrap().severity, IncidentSeverity::Low);
    }

    #[test]
    fn anonymous_reports_drop_contact() {
        let store = IncidentStore::new();
        let mut new = report(IncidentType::Harassment);
        new.anonymous = true;
        let incident = store.report(new).unwrap();
        assert!(incident.reporter_contact.is_none());
    }

    #[test]
    fn rejects_blank_description_and_bad_location() {
        let store = IncidentStore::new();
        let mut blank = report(IncidentType::Other);
        blank.description = "   ".into();
        assert!(matches!(store.report(blank), Err(NavError::EmptyDescription)));

        let mut nowhere = report(IncidentType::Other);
        nowhere.location = Coordinate::new(f64::NAN, 80.0);
        assert!(matches!(
            store.report(nowhere),
            Err(NavError::InvalidCoordinate(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn oldest_reports_are_dropped_past_the_limit() {
        let store = IncidentStore::with_limit(2);
        let first = store.report(report(IncidentType::Theft)).unwrap();
        let second = store.report(report(IncidentType::Flooding)).unwrap();
        let third = store.report(report(IncidentType::Harassment)).unwrap();

        let kept: Vec<String> = store
            .heatmap_input(false)
            .unwrap()
            .into_iter()
            .map(|incident| incident.id)
            .collect();
        assert_eq!(kept, vec![second.id, third.id]);
        assert!(!kept.contains(&first.id));
    }

    #[test]
    fn heatmap_input_appends_samples() {
        let store = IncidentStore::new();
        store.report(report(IncidentType::Flooding)).unwrap();
        assert_eq!(store.heatmap_input(false).unwrap().len(), 1);
        let all = store.heatmap_input(true).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[1].id, "inc-001");
    }

    #[test]
    fn catalog_covers_every_type_and_severity() {
        let catalog = catalog();
        assert_eq!(catalog.types.len(), 12);
        assert_eq!(catalog.severities.len(), 4);
        let lighting = &catalog.types[0];
        assert_eq!(lighting.name, "Poor Lighting");
        assert_eq!(lighting.default_severity, IncidentSeverity::Medium);
    }

    #[test]
    fn samples_are_dated_relative_to_now() {
        let now = Utc::now();
        let samples = sample_incidents(now);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].timestamp, now - Duration::hours(2));
        assert_eq!(samples[2].resolved_at, Some(now - Duration::hours(12)));
    }
}
