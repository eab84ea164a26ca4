//! Budget ledger and cross-record synchronization engine.
//!
//! The engine stores per-user ledgers (income, one-time entries, recurring
//! entry definitions), pooled group budgets with a persisted remaining
//! balance, and the denormalized copies derived from them (group member
//! rows, shared-budget snapshots). Mutations go through [`Engine`], which is
//! stateless over a [`sea_orm::DatabaseConnection`]; balance checks are
//! re-validated inside database transactions so two concurrent writers
//! cannot both spend the same remaining budget.
//!
//! Fan-out writes to derived copies are deliberately *not* transactional
//! across records: each target is updated independently with an idempotent
//! overwrite, and partial failures are reported per target via
//! [`Propagation`].

pub use budget::{BudgetEntry, BudgetMap, BudgetSlot, MonthlySavings};
pub use error::EngineError;
pub use events::{LedgerEvent, Propagation, PropagationTarget};
pub use group_budgets::GroupBudget;
pub use groups::{Group, GroupMember};
pub use ops::{Engine, EngineBuilder};
pub use recurring_entries::{EntryKind, Interval, Occurrence, RecurringEntry, expand, project};
pub use shared_budgets::SharedBudgetSnapshot;
pub use users::UserLedger;

pub mod budget;
mod budget_entries;
mod error;
mod events;
mod group_budget_entries;
mod group_budgets;
mod group_members;
mod groups;
mod ops;
mod recurring_entries;
mod shared_budgets;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
