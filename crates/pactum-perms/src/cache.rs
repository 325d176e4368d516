//! Role cache.
//!
//! Maps `(user, firm)` to the role resolved for that membership, including a
//! cached "no role" answer. Entries expire after a TTL; administrative
//! mutations invalidate them eagerly.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use pactum_core::{FirmId, UserId};

use crate::capability::LawFirmRole;

struct CacheEntry {
    role: Option<LawFirmRole>,
    inserted_at: Instant,
}

/// TTL cache of resolved roles keyed by `(user, firm)`.
pub struct RoleCache {
    ttl: Duration,
    entries: Mutex<HashMap<(UserId, FirmId), CacheEntry>>,
}

impl RoleCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A poisoned cache holds no invariant worth aborting for.
    fn lock(&self) -> MutexGuard<'_, HashMap<(UserId, FirmId), CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a cached resolution.
    ///
    /// Returns `None` on miss or expiry, `Some(None)` for a cached "no role".
    pub fn get(&self, user_id: &UserId, firm_id: &FirmId) -> Option<Option<LawFirmRole>> {
        let mut entries = self.lock();
        let key = (*user_id, *firm_id);
        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.role.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Cache a resolution (a role, or `None` for no membership).
    pub fn insert(&self, user_id: UserId, firm_id: FirmId, role: Option<LawFirmRole>) {
        self.lock().insert(
            (user_id, firm_id),
            CacheEntry {
                role,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for one member of a firm.
    pub fn invalidate_member(&self, user_id: &UserId, firm_id: &FirmId) {
        self.lock().remove(&(*user_id, *firm_id));
    }

    /// Drop every entry for a firm.
    pub fn invalidate_firm(&self, firm_id: &FirmId) {
        self.lock().retain(|(_, f), _| f != firm_id);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
