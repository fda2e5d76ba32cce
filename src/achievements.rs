//! achievements.rs — Visit counters and threshold unlocks.
//!
//! Consulted only as a side effect of a confirmed identification: one
//! atomic increment per `success`, and a one-shot achievement signal when
//! the counter crosses its threshold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Visits needed for the first explorer achievement.
pub const EXPLORER_NOVICE_THRESHOLD: u32 = 5;
pub const ACHIEVEMENT_EXPLORER_NOVICE: &str = "EXPLORADOR_NOVATO";

/// Profile collaborator consumed by the identification flow.
pub trait VisitTracker: Send + Sync {
    /// Atomically increment the user's visited-places counter; returns the
    /// achievement code unlocked by exactly this visit, if any.
    fn record_visit(&self, user: &str) -> Option<&'static str>;

    /// Current counter value, for diagnostics.
    fn visits(&self, user: &str) -> u32;
}

pub type DynVisitTracker = Arc<dyn VisitTracker>;

/// In-memory tracker; increments are serialized so concurrent confirmations
/// from the same user never lose an update.
#[derive(Debug, Default)]
pub struct InMemoryVisits {
    counts: Mutex<HashMap<String, u32>>,
}

impl InMemoryVisits {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisitTracker for InMemoryVisits {
    fn record_visit(&self, user: &str) -> Option<&'static str> {
        let mut counts = self.counts.lock().expect("visit counter mutex poisoned");
        let count = counts.entry(user.to_string()).or_insert(0);
        *count += 1;

        if *count == EXPLORER_NOVICE_THRESHOLD {
            info!(
                user,
                achievement = ACHIEVEMENT_EXPLORER_NOVICE,
                "achievement unlocked"
            );
            Some(ACHIEVEMENT_EXPLORER_NOVICE)
        } else {
            None
        }
    }

    fn visits(&self, user: &str) -> u32 {
        self.counts
            .lock()
            .expect("visit counter mutex poisoned")
            .get(user)
            .copied()
            .unwrap_or(0)
    }
}
