//! Groups: a named roster of members with a single owner.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A group read view, roster included.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub members: Vec<GroupMember>,
}

/// A member row inside a group: the membership plus the profile fields
/// copied from the user at join time and kept fresh by profile propagation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub uid: String,
    pub name: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_members::Entity")]
    Members,
    #[sea_orm(has_many = "super::group_budgets::Entity")]
    Budgets,
    #[sea_orm(has_many = "super::shared_budgets::Entity")]
    SharedBudgets,
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::group_budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl Related<super::shared_budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SharedBudgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
