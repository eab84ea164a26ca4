//! Manual budget entry rows, keyed by `(user_id, category, name)`.
//!
//! Writing the same key twice overwrites the slot; that matches the
//! category/name addressed map the read views expose.

use sea_orm::entity::prelude::*;

use crate::budget::BudgetEntry;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub amount_minor: i64,
    pub date: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for BudgetEntry {
    fn from(model: Model) -> Self {
        Self {
            category: model.category,
            name: model.name,
            amount_minor: model.amount_minor,
            date: model.date,
        }
    }
}
