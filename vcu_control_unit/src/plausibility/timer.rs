//! Time-gated fault condition.

/// Raises once a condition has held continuously for `timeout_ms`; clears
/// the instant the condition goes away.
#[derive(Debug, Clone)]
pub struct PersistenceTimer {
    timeout_ms: u64,
    started_at: Option<u64>,
    tripped: bool,
}

impl PersistenceTimer {
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            started_at: None,
            tripped: false,
        }
    }

    /// Feed this tick's condition. Returns whether the fault is raised.
    pub fn update(&mut self, condition: bool, now_ms: u64) -> bool {
        if !condition {
            self.started_at = None;
            self.tripped = false;
            return false;
        }
        let start = *self.started_at.get_or_insert(now_ms);
        if now_ms.saturating_sub(start) >= self.timeout_ms {
            self.tripped = true;
        }
        self.tripped
    }

    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}
