//! Users table: one row per ledger owner.
//!
//! The row carries the ledger's scalar fields (income, monthly allowance)
//! plus the profile fields (`name`, `phone`, `email`) that get copied into
//! group member rows and shared snapshots, and the denormalized `group_ids`
//! back-reference list. Authentication itself lives in the external
//! identity provider; the engine only receives opaque user ids.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{budget::BudgetMap, recurring_entries::RecurringEntry};

/// A user's full ledger, joined into a single read view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserLedger {
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub income_minor: i64,
    pub budget_total_minor: i64,
    pub budget: BudgetMap,
    pub recurring_entries: Vec<RecurringEntry>,
    /// Groups the user belongs to. Dangling ids left behind by group
    /// deletion are filtered out at read time.
    pub group_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub income_minor: i64,
    pub budget_total_minor: i64,
    pub group_ids: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_entries::Entity")]
    BudgetEntries,
    #[sea_orm(has_many = "super::recurring_entries::Entity")]
    RecurringEntries,
}

impl Related<super::budget_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetEntries.def()
    }
}

impl Related<super::recurring_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Decodes the stored `group_ids` JSON array; a malformed value reads as
/// empty rather than poisoning every ledger read.
pub(crate) fn group_ids_from_json(value: &Json) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
