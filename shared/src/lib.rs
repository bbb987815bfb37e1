use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }

    /// Checks that the coordinate is finite and inside WGS84 ranges.
    pub fn validate(self) -> Result<Self, InvalidCoordinate> {
        let ok = self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng);
        if ok {
            Ok(self)
        } else {
            Err(InvalidCoordinate(self))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinate(pub Coordinate);

impl fmt::Display for InvalidCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid coordinate ({}, {})", self.0.lat, self.0.lng)
    }
}

impl std::error::Error for InvalidCoordinate {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    #[default]
    Shortest,
    Safest,
    Covered,
    Scenic,
}

impl RouteType {
    pub const ALL: [RouteType; 4] = [
        RouteType::Shortest,
        RouteType::Safest,
        RouteType::Covered,
        RouteType::Scenic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RouteType::Shortest => "shortest",
            RouteType::Safest => "safest",
            RouteType::Covered => "covered",
            RouteType::Scenic => "scenic",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Unknown names resolve to `Shortest`, so route calculation stays total.
    pub fn parse_lenient(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Rain,
    Night,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
    #[serde(default)]
    pub avoid_stairs: bool,
    #[serde(default)]
    pub prefer_lighting: bool,
    #[serde(default)]
    pub prefer_covered: bool,
    /// Hour of day, 0-23. `None` means the current local hour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_condition: Option<WeatherCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    /// Meters from the previous point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    /// Seconds from the previous point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl RoutePoint {
    pub fn new(coord: Coordinate, instruction: impl Into<String>) -> Self {
        Self {
            lat: coord.lat,
            lng: coord.lng,
            instruction: Some(instruction.into()),
            distance: None,
            duration: None,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    pub points: Vec<RoutePoint>,
    pub total_distance: u32,
    pub total_duration: u32,
    pub safety_score: u8,
    pub description: String,
    pub warnings: Vec<String>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentType {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentStatus {
    #[default]
    Reported,
    Investigating,
    InProgress,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub location: Coordinate,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_contact: Option<String>,
    pub status: IncidentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Incident report as submitted by the intake form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Falls back to the incident type's default severity.
    #[serde(default)]
    pub severity: Option<IncidentSeverity>,
    pub location: Coordinate,
    pub description: String,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub reporter_contact: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyLevel {
    High,
    Medium,
    Low,
}

impl SafetyLevel {
    pub fn color(self) -> &'static str {
        match self {
            SafetyLevel::High => "#10b981",
            SafetyLevel::Medium => "#f59e0b",
            SafetyLevel::Low => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyZone {
    pub lat: f64,
    pub lng: f64,
    /// Meters.
    pub radius: f64,
    pub color: String,
    pub level: SafetyLevel,
    pub incidents: usize,
    pub safety_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingCategory {
    Academic,
    Hostel,
    Dining,
    Facility,
    Medical,
    Sports,
    Gate,
    Research,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: String,
    pub name: String,
    pub category: BuildingCategory,
    pub coordinates: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_score: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Sos,
    Medical,
    Security,
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Responded,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub location: Coordinate,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Security,
    Medical,
    Fire,
    Police,
    Personal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(rename = "type")]
    pub kind: ContactKind,
    pub description: String,
    pub available24h: bool,
}

// HTTP request/response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub from: Coordinate,
    pub to: Coordinate,
    /// Free-form so unknown names can fall back to `shortest`.
    #[serde(default, rename = "type")]
    pub route_type: Option<String>,
    #[serde(default)]
    pub options: RouteOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub route: Route,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRouteRequest {
    pub from: Coordinate,
    pub to: Coordinate,
    #[serde(default)]
    pub options: RouteOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiRouteResponse {
    pub routes: Vec<Route>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapResponse {
    pub zones: Vec<SafetyZone>,
    pub incident_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSafety {
    pub location: Coordinate,
    pub hour: u8,
    pub within_campus: bool,
    pub safety_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayRequest {
    pub from: Coordinate,
    pub to: Coordinate,
    #[serde(default = "default_weight")]
    pub w_lighting: f64,
    #[serde(default = "default_weight")]
    pub w_covered: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayRoute {
    pub points: Vec<Coordinate>,
    pub distance_m: f64,
    pub mean_lighting: f64,
    pub mean_covered: f64,
    pub mean_safety: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    pub location: Coordinate,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosResponse {
    pub alert_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStatusUpdate {
    pub status: AlertStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLocationRequest {
    pub location: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLocationResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

pub fn default_weight() -> f64 {
    1.0
}
