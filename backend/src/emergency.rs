use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::NavError;
use crate::models::{AlertKind, AlertStatus, ContactKind, Coordinate, EmergencyAlert, EmergencyContact};

const SUBSCRIBER_BUFFER: usize = 32;
const REPORTING_USER: &str = "current-user";
/// Alerts kept before the oldest closed ones are dropped. Active alerts are
/// never dropped.
pub const MAX_RETAINED_ALERTS: usize = 500;

pub fn emergency_contacts() -> Vec<EmergencyContact> {
    let contact = |id: &str, name: &str, phone: &str, kind, description: &str| EmergencyContact {
        id: id.to_string(),
        name: name.to_string(),
        phone: phone.to_string(),
        kind,
        description: description.to_string(),
        available24h: true,
    };
    vec![
        contact(
            "iit-security",
            "IIT Madras Security",
            "+91-44-2257-4001",
            ContactKind::Security,
            "Campus security control room",
        ),
        contact(
            "iit-medical",
            "IIT Health Centre",
            "+91-44-2257-4002",
            ContactKind::Medical,
            "Campus medical emergency",
        ),
        contact(
            "chennai-police",
            "Chennai Police",
            "100",
            ContactKind::Police,
            "Emergency police services",
        ),
        contact(
            "fire-service",
            "Fire Service",
            "101",
            ContactKind::Fire,
            "Fire and rescue services",
        ),
        contact(
            "ambulance",
            "Ambulance",
            "108",
            ContactKind::Medical,
            "Emergency medical services",
        ),
    ]
}

pub fn location_share_message(location: Coordinate) -> String {
    format!(
        "Emergency! I need help. My location: https://maps.google.com/?q={},{}",
        location.lat, location.lng
    )
}

/// SOS alert registry with publish/subscribe notifications.
///
/// Every mutation publishes a snapshot of all alerts to subscribers.
/// Subscribers that fall behind miss intermediate snapshots, never the
/// latest one.
pub struct EmergencyService {
    alerts: RwLock<Vec<EmergencyAlert>>,
    updates: broadcast::Sender<Vec<EmergencyAlert>>,
    response_delay: Option<Duration>,
    alert_limit: usize,
}

impl EmergencyService {
    /// `response_delay` marks new SOS alerts as responded after the delay;
    /// `None` leaves them active until updated explicitly.
    pub fn new(response_delay: Option<Duration>) -> Self {
        let (updates, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            alerts: RwLock::new(Vec::new()),
            updates,
            response_delay,
            alert_limit: MAX_RETAINED_ALERTS,
        }
    }

    pub fn with_alert_limit(mut self, limit: usize) -> Self {
        self.alert_limit = limit;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<EmergencyAlert>> {
        self.updates.subscribe()
    }

    /// Must be called from within a tokio runtime when a response delay is set.
    pub fn trigger_sos(
        self: &Arc<Self>,
        location: Coordinate,
        description: Option<String>,
    ) -> Result<String, NavError> {
        let location = location.validate()?;
        let alert = EmergencyAlert {
            id: format!("sos-{}", Uuid::new_v4()),
            kind: AlertKind::Sos,
            location,
            timestamp: Utc::now(),
            user_id: REPORTING_USER.to_string(),
            status: AlertStatus::Active,
            description,
        };
        let id = alert.id.clone();
        tracing::warn!(
            "SOS {} triggered at ({}, {})",
            id,
            location.lat,
            location.lng
        );

        {
            let mut alerts = self.alerts.write().map_err(|_| NavError::StatePoisoned)?;
            alerts.push(alert);
            prune_closed(&mut alerts, self.alert_limit);
        }
        self.publish()?;

        if let Some(delay) = self.response_delay {
            let service = Arc::clone(self);
            let alert_id = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(err) = service.update_alert_status(&alert_id, AlertStatus::Responded) {
                    tracing::warn!("could not mark {alert_id} as responded: {err}");
                }
            });
        }

        Ok(id)
    }

    pub fn update_alert_status(
        &self,
        id: &str,
        status: AlertStatus,
    ) -> Result<EmergencyAlert, NavError> {
        let updated = {
            let mut alerts = self.alerts.write().map_err(|_| NavError::StatePoisoned)?;
            let alert = alerts
                .iter_mut()
                .find(|alert| alert.id == id)
                .ok_or_else(|| NavError::UnknownAlert(id.to_string()))?;
            alert.status = status;
            alert.clone()
        };
        tracing::info!("alert {} is now {:?}", id, status);
        self.publish()?;
        Ok(updated)
    }

    pub fn alerts(&self) -> Result<Vec<EmergencyAlert>, NavError> {
        Ok(self
            .alerts
            .read()
            .map_err(|_| NavError::StatePoisoned)?
            .clone())
    }

    pub fn active_alerts(&self) -> Result<Vec<EmergencyAlert>, NavError> {
        Ok(self
            .alerts()?
            .into_iter()
            .filter(|alert| alert.status == AlertStatus::Active)
            .collect())
    }

    fn publish(&self) -> Result<(), NavError> {
        let snapshot = self.alerts()?;
        // no subscribers is not an error
        let _ = self.updates.send(snapshot);
        Ok(())
    }
}

/// Drops the oldest non-active alerts until at most `limit` remain.
fn prune_closed(alerts: &mut Vec<EmergencyAlert>, limit: usize) {
    while alerts.len() > limit {
        let Some(oldest) = alerts
            .iter()
            .position(|alert| alert.status != AlertStatus::Active)
        else {
            return;
        };
        let dropped = alerts.remove(oldest);
        tracing::debug!("dropping closed alert {}", dropped.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CAMPUS_CENTER;

    #[test]
    fn contacts_are_all_around_the_clock() {
        let contacts = emergency_contacts();
        assert_eq!(contacts.len(), 5);
        assert!(contacts.iter().all(|c| c.available24h));
        assert_eq!(contacts[0].phone, "+91-44-2257-4001");
    }

    #[test]
    fn share_message_contains_maps_link() {
        let message = location_share_message(CAMPUS_CENTER);
        assert!(message.ends_with("https://maps.google.com/?q=12.9915936,80.2336832"));
    }

    #[tokio::test]
    async fn sos_is_published_to_subscribers() {
        let service = Arc::new(EmergencyService::new(None));
        let mut updates = service.subscribe();

        let id = service
            .trigger_sos(CAMPUS_CENTER, Some("twisted ankle".into()))
            .unwrap();
        let snapshot = updates.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].status, AlertStatus::Active);
        assert_eq!(service.active_alerts().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_updates_remove_alert_from_active_list() {
        let service = Arc::new(EmergencyService::new(None));
        let id = service.trigger_sos(CAMPUS_CENTER, None).unwrap();
        let mut updates = service.subscribe();

        let updated = service
            .update_alert_status(&id, AlertStatus::Resolved)
            .unwrap();
        assert_eq!(updated.status, AlertStatus::Resolved);
        assert!(service.active_alerts().unwrap().is_empty());
        assert_eq!(service.alerts().unwrap().len(), 1);
        assert_eq!(
            updates.recv().await.unwrap()[0].status,
            AlertStatus::Resolved
        );
    }

    #[tokio::test]
    async fn unknown_alert_is_an_error() {
        let service = EmergencyService::new(None);
        assert!(matches!(
            service.update_alert_status("sos-missing", AlertStatus::Resolved),
            Err(NavError::UnknownAlert(_))
        ));
    }

    #[tokio::test]
    async fn invalid_location_is_rejected() {
        let service = Arc::new(EmergencyService::new(None));
        let result = service.trigger_sos(Coordinate::new(123.0, 80.0), None);
        assert!(matches!(result, Err(NavError::InvalidCoordinate(_))));
        assert!(service.alerts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_alerts_are_dropped_past_the_limit() {
        let service = Arc::new(EmergencyService::new(None).with_alert_limit(1));
        let first = service.trigger_sos(CAMPUS_CENTER, None).unwrap();
        service
            .update_alert_status(&first, AlertStatus::Resolved)
            .unwrap();

        let second = service.trigger_sos(CAMPUS_CENTER, None).unwrap();
        let ids: Vec<String> = service.alerts().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![second.clone()]);

        // active alerts stay even over the limit
        let third = service.trigger_sos(CAMPUS_CENTER, None).unwrap();
        let ids: Vec<String> = service.alerts().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![second, third]);
    }

    #[tokio::test(start_paused = true)]
    async fn alerts_are_auto_responded_after_delay() {
        let service = Arc::new(EmergencyService::new(Some(Duration::from_secs(30))));
        let mut updates = service.subscribe();
        let id = service.trigger_sos(CAMPUS_CENTER, None).unwrap();

        assert_eq!(updates.recv().await.unwrap()[0].status, AlertStatus::Active);
        // paused clock auto-advances to the pending sleep
        let snapshot = updates.recv().await.unwrap();
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].status, AlertStatus::Responded);
        assert!(service.active_alerts().unwrap().is_empty());
    }
}
