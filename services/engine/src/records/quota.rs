//! Plan-based record quota

use crate::auth::{Plan, User};

/// Ceiling applied to free accounts unless configured otherwise
pub const DEFAULT_FREE_RECORD_LIMIT: usize = 2;

/// Derives a user's record ceiling from their plan
#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    free_limit: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_RECORD_LIMIT)
    }
}

impl QuotaPolicy {
    pub fn new(free_limit: usize) -> Self {
        Self { free_limit }
    }

    /// Ceiling for a plan; `None` means unlimited
    pub fn limit_for(&self, plan: Plan) -> Option<usize> {
        match plan {
            Plan::Free => Some(self.free_limit),
            Plan::Premium => None,
        }
    }

    /// Whether `user` may add one more record given how many they hold now
    pub fn allowed_to_create(&self, user: &User, current_record_count: usize) -> bool {
        match self.limit_for(user.plan) {
            Some(limit) => current_record_count < limit,
            None => true,
        }
    }
}
