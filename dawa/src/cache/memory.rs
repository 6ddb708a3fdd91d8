//! In-process response cache.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use super::traits::CacheStorage;

/// Response bodies held in memory, each with an optional deadline.
///
/// Expired bodies are dropped when they are next looked up.
#[derive(Debug, Default)]
pub struct MemoryCache {
    bodies: Mutex<HashMap<String, Body>>,
}

#[derive(Debug)]
struct Body {
    bytes: Vec<u8>,
    fresh_until: Option<Instant>,
}

impl Body {
    fn is_fresh(&self, now: Instant) -> bool {
        self.fresh_until.map_or(true, |deadline| now < deadline)
    }
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut bodies = self.bodies.lock().unwrap_or_else(PoisonError::into_inner);
        match bodies.get(key) {
            Some(body) if body.is_fresh(Instant::now()) => Some(body.bytes.clone()),
            Some(_) => {
                bodies.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        let body = Body {
            bytes: value.to_vec(),
            fresh_until: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), body);
    }

    async fn remove(&self, key: &str) {
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
