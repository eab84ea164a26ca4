//! Group budget entry rows, keyed by `(group_budget_id, category, name)`.

use sea_orm::entity::prelude::*;

use crate::budget::BudgetEntry;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_budget_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_budget_id: String,
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
        belongs_to = "super::group_budgets::Entity",
        from = "Column::GroupBudgetId",
        to = "super::group_budgets::Column::Id"
    )]
    GroupBudget,
}

impl Related<super::group_budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupBudget.def()
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
