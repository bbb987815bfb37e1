use std::{
    num::NonZeroUsize,
    sync::Mutex,
    time::{Duration, Instant},
};

use lru::LruCache;

use crate::models::{Coordinate, Route};

pub const DEFAULT_ROUTE_TTL: Duration = Duration::from_secs(10 * 60);

struct CachedRoutes {
    routes: Vec<Route>,
    stored_at: Instant,
}

/// Memoizes route bundles per (origin, destination) for a limited time.
///
/// Routing options are not part of the key, so a hit may return routes
/// scored for a different hour or weather within the TTL window.
pub struct RouteCache {
    entries: Mutex<LruCache<String, CachedRoutes>>,
    ttl: Duration,
}

impl RouteCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn key(from: Coordinate, to: Coordinate) -> String {
        format!("{},{}->{},{}", from.lat, from.lng, to.lat, to.lng)
    }

    pub fn get(&self, from: Coordinate, to: Coordinate) -> Option<Vec<Route>> {
        self.get_at(from, to, Instant::now())
    }

    pub fn insert(&self, from: Coordinate, to: Coordinate, routes: Vec<Route>) {
        self.insert_at(from, to, routes, Instant::now());
    }

    fn get_at(&self, from: Coordinate, to: Coordinate, now: Instant) -> Option<Vec<Route>> {
        let key = Self::key(from, to);
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!("route cache lock poisoned, skipping lookup");
            return None;
        };

        match entries.get(&key) {
            None => None,
            Some(entry) if now.saturating_duration_since(entry.stored_at) < self.ttl => {
                tracing::debug!("route cache hit for {key}");
                Some(entry.routes.clone())
            }
            Some(_) => {
                tracing::debug!("route cache entry for {key} expired");
                entries.pop(&key);
                None
            }
        }
    }

    fn insert_at(&self, from: Coordinate, to: Coordinate, routes: Vec<Route>, now: Instant) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                Self::key(from, to),
                CachedRoutes {
                    routes,
                    stored_at: now,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
