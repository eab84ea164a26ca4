//! Group budgets: a shared pot with an optional ceiling.
//!
//! The invariant for a configured pot is `remaining = ceiling - spent`,
//! where spent is the sum of the pot's entries. `remaining_minor` is a
//! stored value, but every mutation re-derives it from the entries so
//! overwrites and deletions cannot leave it stale.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::budget::BudgetMap;

/// A group budget read view, entries folded into the category/name map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupBudget {
    pub id: String,
    pub group_id: String,
    pub name: String,
    /// `None` until the owner runs the initial setup.
    pub ceiling_minor: Option<i64>,
    pub remaining_minor: Option<i64>,
    pub budget: BudgetMap,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub ceiling_minor: Option<i64>,
    pub remaining_minor: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Group,
    #[sea_orm(has_many = "super::group_budget_entries::Entity")]
    Entries,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::group_budget_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
