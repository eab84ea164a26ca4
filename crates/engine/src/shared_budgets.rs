//! Shared budget snapshots: a user's personal budget map copied into a
//! group so other members can read it.
//!
//! The copy is deliberate. A snapshot is a point-in-time publication that
//! gets refreshed by budget propagation, not a live join against the
//! sharer's ledger, so the budget map is stored as a JSON document.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{budget::BudgetMap, error::EngineError};

/// One user's published budget inside one group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedBudgetSnapshot {
    pub id: String,
    pub user_id: String,
    /// The sharer's display name at snapshot time, refreshed by profile
    /// propagation.
    pub user_name: String,
    pub group_id: String,
    pub budget: BudgetMap,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shared_budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub group_id: String,
    pub budget: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Group,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for SharedBudgetSnapshot {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let budget: BudgetMap = serde_json::from_value(model.budget)
            .map_err(|e| EngineError::InvalidInput(format!("corrupt budget snapshot: {e}")))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            user_name: model.user_name,
            group_id: model.group_id,
            budget,
        })
    }
}
