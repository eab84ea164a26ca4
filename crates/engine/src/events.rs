//! Change events and fan-out reporting.
//!
//! Cross-record synchronization is not transactional: each derived copy is
//! written independently, and a failure on one target never rolls back the
//! others. The [`Propagation`] report tells the caller exactly which
//! targets were refreshed and which were left stale, so a retry can be
//! scheduled for the failed ones alone.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A source-of-truth change that has derived copies to refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// The user's personal budget changed; shared snapshots of it are stale.
    BudgetChanged { user_id: String },
    /// The user's profile changed; member rows and snapshot display names
    /// are stale.
    ProfileChanged {
        user_id: String,
        name: String,
        phone: String,
    },
}

/// One derived record touched by a fan-out write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationTarget {
    /// The `group_ids` back-reference list on a user row.
    UserGroupIds { user_id: String },
    /// A member row inside a group roster.
    GroupMember { group_id: String, uid: String },
    /// A shared budget snapshot row.
    SharedBudget { snapshot_id: String },
}

/// Outcome of a fan-out write, target by target.
#[derive(Debug, Default)]
pub struct Propagation {
    pub succeeded: Vec<PropagationTarget>,
    pub failed: Vec<(PropagationTarget, EngineError)>,
}

impl Propagation {
    /// Folds one target's write result into the report.
    pub(crate) fn record(
        &mut self,
        target: PropagationTarget,
        result: Result<(), EngineError>,
    ) {
        match result {
            Ok(()) => self.succeeded.push(target),
            Err(error) => {
                tracing::warn!(?target, %error, "propagation target failed");
                self.failed.push((target, error));
            }
        }
    }

    /// `true` when every target was refreshed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
