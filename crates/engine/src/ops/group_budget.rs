use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, Statement, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    budget::{self, BudgetEntry},
    group_budget_entries,
    group_budgets::{self, GroupBudget},
};

use super::{Engine, normalize_required_name, require_positive_amount, with_tx};

impl Engine {
    /// Creates a group pot with no ceiling. Any member may create one; the
    /// ceiling itself is set later by the owner.
    pub async fn create_group_budget(
        &self,
        group_id: &str,
        name: &str,
        caller: &str,
    ) -> ResultEngine<String> {
        let name = normalize_required_name(name, "group budget")?;
        let budget_id = Uuid::new_v4().to_string();
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, caller).await?;
            let row = group_budgets::ActiveModel {
                id: ActiveValue::Set(budget_id.clone()),
                group_id: ActiveValue::Set(group_id.to_string()),
                name: ActiveValue::Set(name),
                ceiling_minor: ActiveValue::Set(None),
                remaining_minor: ActiveValue::Set(None),
            };
            row.insert(&db_tx).await?;
            tracing::debug!(group_id, budget_id = %budget_id, "group budget created");
            Ok(())
        })?;
        Ok(budget_id)
    }

    /// One-shot initial setup: sets the ceiling, resets remaining to it and
    /// clears any entries. Owner-only, and only while no ceiling is set.
    pub async fn set_initial_budget(
        &self,
        group_id: &str,
        budget_id: &str,
        ceiling_minor: i64,
        caller: &str,
    ) -> ResultEngine<()> {
        require_positive_amount(ceiling_minor, "ceiling")?;
        with_tx!(self, |db_tx| {
            self.require_group_owner(&db_tx, group_id, caller).await?;
            let model = self.require_group_budget(&db_tx, group_id, budget_id).await?;
            if model.ceiling_minor.is_some() {
                return Err(EngineError::InvalidInput(
                    "initial budget is already set".to_string(),
                ));
            }
            group_budget_entries::Entity::delete_many()
                .filter(group_budget_entries::Column::GroupBudgetId.eq(budget_id.to_string()))
                .exec(&db_tx)
                .await?;
            let mut row: group_budgets::ActiveModel = model.into();
            row.ceiling_minor = ActiveValue::Set(Some(ceiling_minor));
            row.remaining_minor = ActiveValue::Set(Some(ceiling_minor));
            row.update(&db_tx).await?;
            tracing::debug!(group_id, budget_id, ceiling_minor, "initial budget set");
            Ok(())
        })
    }

    /// Records (or replaces) an entry in a group pot and decrements its
    /// remaining balance, all in one transaction so concurrent spends
    /// re-check against the committed remaining, not a stale read.
    pub async fn add_group_field(
        &self,
        group_id: &str,
        budget_id: &str,
        category: &str,
        name: &str,
        amount_minor: i64,
        date: NaiveDate,
        caller: &str,
    ) -> ResultEngine<()> {
        let category = normalize_required_name(category, "category")?;
        let name = normalize_required_name(name, "entry")?;
        require_positive_amount(amount_minor, "entry")?;
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, caller).await?;
            let model = self.require_group_budget(&db_tx, group_id, budget_id).await?;
            let Some(ceiling_minor) = model.ceiling_minor else {
                return Err(EngineError::InvalidInput(
                    "initial budget is not set".to_string(),
                ));
            };

            let key = (budget_id.to_string(), category.clone(), name.clone());
            let existing = group_budget_entries::Entity::find_by_id(key)
                .one(&db_tx)
                .await?;
            // Replacing a slot frees its old amount before the check.
            let spent = self.group_budget_spent(&db_tx, budget_id).await?
                - existing.as_ref().map_or(0, |e| e.amount_minor);
            let remaining = ceiling_minor - spent;
            if amount_minor > remaining {
                return Err(EngineError::InsufficientBudget(format!(
                    "entry of {amount_minor} exceeds remaining budget {remaining}"
                )));
            }

            match existing {
                Some(existing) => {
                    let mut row: group_budget_entries::ActiveModel = existing.into();
                    row.amount_minor = ActiveValue::Set(amount_minor);
                    row.date = ActiveValue::Set(date);
                    row.update(&db_tx).await?;
                }
                None => {
                    let row = group_budget_entries::ActiveModel {
                        group_budget_id: ActiveValue::Set(budget_id.to_string()),
                        category: ActiveValue::Set(category.clone()),
                        name: ActiveValue::Set(name.clone()),
                        amount_minor: ActiveValue::Set(amount_minor),
                        date: ActiveValue::Set(date),
                    };
                    row.insert(&db_tx).await?;
                }
            }
            self.refresh_group_remaining(&db_tx, budget_id, ceiling_minor)
                .await?;
            tracing::debug!(budget_id, %category, %name, amount_minor, "group entry recorded");
            Ok(())
        })
    }

    /// Removes a pot entry and gives its amount back to remaining.
    pub async fn delete_group_field(
        &self,
        group_id: &str,
        budget_id: &str,
        category: &str,
        name: &str,
        caller: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, caller).await?;
            let model = self.require_group_budget(&db_tx, group_id, budget_id).await?;
            let key = (
                budget_id.to_string(),
                category.to_string(),
                name.to_string(),
            );
            let row = group_budget_entries::Entity::find_by_id(key)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("group entry not exists".to_string()))?;
            row.delete(&db_tx).await?;
            if let Some(ceiling_minor) = model.ceiling_minor {
                self.refresh_group_remaining(&db_tx, budget_id, ceiling_minor)
                    .await?;
            }
            Ok(())
        })
    }

    /// Manual correction of the remaining balance. The ceiling is rewritten
    /// to `value + spent` so `remaining == ceiling − Σ entries` keeps
    /// holding afterwards.
    pub async fn set_remaining_budget(
        &self,
        group_id: &str,
        budget_id: &str,
        value_minor: i64,
        caller: &str,
    ) -> ResultEngine<()> {
        if value_minor < 0 {
            return Err(EngineError::InvalidInput(
                "remaining budget must not be negative".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, caller).await?;
            let model = self.require_group_budget(&db_tx, group_id, budget_id).await?;
            if model.ceiling_minor.is_none() {
                return Err(EngineError::InvalidInput(
                    "initial budget is not set".to_string(),
                ));
            }
            let spent = self.group_budget_spent(&db_tx, budget_id).await?;
            let mut row: group_budgets::ActiveModel = model.into();
            row.ceiling_minor = ActiveValue::Set(Some(value_minor + spent));
            row.remaining_minor = ActiveValue::Set(Some(value_minor));
            row.update(&db_tx).await?;
            tracing::debug!(budget_id, value_minor, "remaining budget corrected");
            Ok(())
        })
    }

    /// Deletes a pot and its entries. Group-owner-only.
    pub async fn delete_group_budget(
        &self,
        group_id: &str,
        budget_id: &str,
        caller: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group_owner(&db_tx, group_id, caller).await?;
            let model = self.require_group_budget(&db_tx, group_id, budget_id).await?;
            model.delete(&db_tx).await?;
            tracing::debug!(group_id, budget_id, "group budget deleted");
            Ok(())
        })
    }

    pub async fn group_budget(&self, group_id: &str, budget_id: &str) -> ResultEngine<GroupBudget> {
        with_tx!(self, |db_tx| {
            let model = self.require_group_budget(&db_tx, group_id, budget_id).await?;
            let entries: Vec<BudgetEntry> = group_budget_entries::Entity::find()
                .filter(group_budget_entries::Column::GroupBudgetId.eq(budget_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(BudgetEntry::from)
                .collect();
            Ok(GroupBudget {
                id: model.id,
                group_id: model.group_id,
                name: model.name,
                ceiling_minor: model.ceiling_minor,
                remaining_minor: model.remaining_minor,
                budget: budget::budget_map(&entries),
            })
        })
    }

    /// All pots of a group.
    pub async fn group_budgets_for_group(&self, group_id: &str) -> ResultEngine<Vec<GroupBudget>> {
        let ids: Vec<String> = {
            let db_tx = self.database.begin().await?;
            self.require_group(&db_tx, group_id).await?;
            let rows = group_budgets::Entity::find()
                .filter(group_budgets::Column::GroupId.eq(group_id.to_string()))
                .all(&db_tx)
                .await?;
            db_tx.commit().await?;
            rows.into_iter().map(|m| m.id).collect()
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.group_budget(group_id, &id).await?);
        }
        Ok(out)
    }

    /// Total spend of a pot, summed over its entries.
    async fn group_budget_spent(
        &self,
        db_tx: &DatabaseTransaction,
        budget_id: &str,
    ) -> ResultEngine<i64> {
        let stmt = Statement::from_sql_and_values(
            db_tx.get_database_backend(),
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM group_budget_entries \
             WHERE group_budget_id = ?",
            vec![budget_id.to_string().into()],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    /// Rewrites `remaining_minor` from the entries so overwrites and
    /// deletions can never leave it stale.
    async fn refresh_group_remaining(
        &self,
        db_tx: &DatabaseTransaction,
        budget_id: &str,
        ceiling_minor: i64,
    ) -> ResultEngine<()> {
        let spent = self.group_budget_spent(db_tx, budget_id).await?;
        let row = group_budgets::ActiveModel {
            id: ActiveValue::Set(budget_id.to_string()),
            remaining_minor: ActiveValue::Set(Some(ceiling_minor - spent)),
            ..Default::default()
        };
        row.update(db_tx).await?;
        Ok(())
    }
}
