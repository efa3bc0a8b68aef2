//! Per-member serialization of point-mutating operations.
//!
//! The cap check and the point write must not interleave for the same
//! member, so every operation that reads then updates a member's weekly
//! points takes that member's lock first. Different members proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemberLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl MemberLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `member_id`'s weekly points. Lock entries are
    /// created on first use and live for the process lifetime; a household
    /// has few members.
    pub fn lock_for(&self, member_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(member_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
