use chrono::NaiveDate;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    budget::{self, BudgetEntry, MonthlySavings},
    budget_entries,
    events::{Propagation, PropagationTarget},
    group_members, groups,
    recurring_entries::{self, EntryKind, Interval, RecurringEntry},
    shared_budgets,
    users::{self, UserLedger, group_ids_from_json},
};

use super::{Engine, normalize_required_name, require_positive_amount, with_tx};

impl Engine {
    /// Creates the ledger row for a freshly signed-up user. Income and the
    /// monthly allowance start at zero.
    pub async fn create_user(
        &self,
        user_id: &str,
        name: &str,
        phone: &str,
        email: &str,
    ) -> ResultEngine<()> {
        let name = normalize_required_name(name, "user")?;
        with_tx!(self, |db_tx| {
            let row = users::ActiveModel {
                id: ActiveValue::Set(user_id.to_string()),
                name: ActiveValue::Set(name),
                phone: ActiveValue::Set(phone.to_string()),
                email: ActiveValue::Set(email.to_string()),
                income_minor: ActiveValue::Set(0),
                budget_total_minor: ActiveValue::Set(0),
                group_ids: ActiveValue::Set(serde_json::json!([])),
            };
            row.insert(&db_tx).await?;
            tracing::debug!(user_id, "user created");
            Ok(())
        })
    }

    /// Full read view of a user's ledger.
    pub async fn ledger(&self, user_id: &str) -> ResultEngine<UserLedger> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let manual = self.load_budget_entries(&db_tx, user_id).await?;
            let recurring = self.load_recurring_entries(&db_tx, user_id).await?;
            let group_ids = self
                .live_group_ids(&db_tx, &group_ids_from_json(&user.group_ids))
                .await?;
            Ok(UserLedger {
                user_id: user.id,
                name: user.name,
                phone: user.phone,
                email: user.email,
                income_minor: user.income_minor,
                budget_total_minor: user.budget_total_minor,
                budget: budget::budget_map(&manual),
                recurring_entries: recurring,
                group_ids,
            })
        })
    }

    /// Records a manual expense at `budget[category][name]`, replacing any
    /// previous slot with the same key.
    ///
    /// The balance check and the write share one transaction, so two
    /// concurrent calls cannot both pass the check against the same stale
    /// remaining value.
    pub async fn add_manual_entry(
        &self,
        user_id: &str,
        category: &str,
        name: &str,
        amount_minor: i64,
        date: NaiveDate,
    ) -> ResultEngine<()> {
        let category = normalize_required_name(category, "category")?;
        let name = normalize_required_name(name, "entry")?;
        require_positive_amount(amount_minor, "entry")?;
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;

            // Overwriting a slot frees its old amount first.
            let mut manual = self.load_budget_entries(&db_tx, user_id).await?;
            manual.retain(|e| !(e.category == category && e.name == name));
            let recurring = self.load_recurring_entries(&db_tx, user_id).await?;
            let remaining =
                budget::remaining(user.budget_total_minor, &manual, &recurring, date);
            if amount_minor > remaining {
                return Err(EngineError::InsufficientBudget(format!(
                    "entry of {amount_minor} exceeds remaining budget {remaining}"
                )));
            }

            let key = (user_id.to_string(), category.clone(), name.clone());
            match budget_entries::Entity::find_by_id(key).one(&db_tx).await? {
                Some(existing) => {
                    let mut row: budget_entries::ActiveModel = existing.into();
                    row.amount_minor = ActiveValue::Set(amount_minor);
                    row.date = ActiveValue::Set(date);
                    row.update(&db_tx).await?;
                }
                None => {
                    let row = budget_entries::ActiveModel {
                        user_id: ActiveValue::Set(user_id.to_string()),
                        category: ActiveValue::Set(category.clone()),
                        name: ActiveValue::Set(name.clone()),
                        amount_minor: ActiveValue::Set(amount_minor),
                        date: ActiveValue::Set(date),
                    };
                    row.insert(&db_tx).await?;
                }
            }
            tracing::debug!(user_id, %category, %name, amount_minor, "manual entry recorded");
            Ok(())
        })
    }

    /// Removes a manual entry. Absent keys are a no-op signalled by
    /// `Ok(false)`, never an error.
    pub async fn delete_manual_entry(
        &self,
        user_id: &str,
        category: &str,
        name: &str,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let key = (
                user_id.to_string(),
                category.to_string(),
                name.to_string(),
            );
            let Some(existing) = budget_entries::Entity::find_by_id(key).one(&db_tx).await?
            else {
                return Ok(false);
            };
            existing.delete(&db_tx).await?;
            tracing::debug!(user_id, category, name, "manual entry deleted");
            Ok(true)
        })
    }

    /// Direct overwrite, no validation: a negative figure is the user's
    /// business.
    pub async fn set_income(&self, user_id: &str, income_minor: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut row: users::ActiveModel = user.into();
            row.income_minor = ActiveValue::Set(income_minor);
            row.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Direct overwrite, like [`Engine::set_income`].
    pub async fn set_budget_total(
        &self,
        user_id: &str,
        budget_total_minor: i64,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut row: users::ActiveModel = user.into();
            row.budget_total_minor = ActiveValue::Set(budget_total_minor);
            row.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Appends a recurring entry at the end of the user's list.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_recurring_entry(
        &self,
        user_id: &str,
        category: &str,
        name: &str,
        amount_minor: i64,
        interval: Interval,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        kind: EntryKind,
    ) -> ResultEngine<RecurringEntry> {
        let category = normalize_required_name(category, "category")?;
        let name = normalize_required_name(name, "recurring entry")?;
        require_positive_amount(amount_minor, "recurring entry")?;
        if let Some(end) = end_date
            && end < start_date
        {
            return Err(EngineError::InvalidInput(
                "end date must not precede start date".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            // max + 1, not row count: removals leave gaps.
            let position = recurring_entries::Entity::find()
                .filter(recurring_entries::Column::UserId.eq(user_id.to_string()))
                .order_by_desc(recurring_entries::Column::Position)
                .one(&db_tx)
                .await?
                .map_or(0, |row| row.position + 1);

            let entry = RecurringEntry {
                id: Uuid::new_v4(),
                category,
                name,
                amount_minor,
                interval,
                start_date,
                end_date,
                kind,
            };
            let mut row = recurring_entries::ActiveModel::from(&entry);
            row.user_id = ActiveValue::Set(user_id.to_string());
            row.position = ActiveValue::Set(position);
            row.insert(&db_tx).await?;
            tracing::debug!(user_id, id = %entry.id, "recurring entry added");
            Ok(entry)
        })
    }

    /// Removes the `index`-th recurring entry in insertion order.
    /// Out-of-range indexes are a no-op signalled by `Ok(false)`.
    pub async fn remove_recurring_entry(
        &self,
        user_id: &str,
        index: usize,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let rows = recurring_entries::Entity::find()
                .filter(recurring_entries::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(recurring_entries::Column::Position)
                .all(&db_tx)
                .await?;
            let Some(row) = rows.into_iter().nth(index) else {
                return Ok(false);
            };
            row.delete(&db_tx).await?;
            Ok(true)
        })
    }

    pub async fn remove_recurring_entry_by_id(
        &self,
        user_id: &str,
        entry_id: Uuid,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let Some(row) = recurring_entries::Entity::find_by_id(entry_id.to_string())
                .filter(recurring_entries::Column::UserId.eq(user_id.to_string()))
                .one(&db_tx)
                .await?
            else {
                return Ok(false);
            };
            row.delete(&db_tx).await?;
            Ok(true)
        })
    }

    /// Remaining personal budget for the calendar month containing
    /// `reference_date`. Always derived, never stored.
    pub async fn remaining_budget(
        &self,
        user_id: &str,
        reference_date: NaiveDate,
    ) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let manual = self.load_budget_entries(&db_tx, user_id).await?;
            let recurring = self.load_recurring_entries(&db_tx, user_id).await?;
            Ok(budget::remaining(
                user.budget_total_minor,
                &manual,
                &recurring,
                reference_date,
            ))
        })
    }

    /// Per-month savings history up to `reference_date`.
    pub async fn monthly_savings(
        &self,
        user_id: &str,
        reference_date: NaiveDate,
    ) -> ResultEngine<Vec<MonthlySavings>> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let manual = self.load_budget_entries(&db_tx, user_id).await?;
            let recurring = self.load_recurring_entries(&db_tx, user_id).await?;
            Ok(budget::monthly_savings(
                user.budget_total_minor,
                &manual,
                &recurring,
                reference_date,
            ))
        })
    }

    /// Deletes the user's ledger, then best-effort cascades to the derived
    /// copies: group member rows and shared snapshots. Each copy is removed
    /// independently; the report names any that were left behind.
    pub async fn delete_account(&self, user_id: &str) -> ResultEngine<Propagation> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            user.delete(&db_tx).await?;
            Ok(())
        })?;
        tracing::debug!(user_id, "account deleted, cascading to derived copies");

        let mut report = Propagation::default();

        let member_rows = group_members::Entity::find()
            .filter(group_members::Column::Uid.eq(user_id.to_string()))
            .all(&self.database)
            .await?;
        for row in member_rows {
            let target = PropagationTarget::GroupMember {
                group_id: row.group_id.clone(),
                uid: row.uid.clone(),
            };
            let result = row.delete(&self.database).await.map(|_| ()).map_err(Into::into);
            report.record(target, result);
        }

        let snapshots = shared_budgets::Entity::find()
            .filter(shared_budgets::Column::UserId.eq(user_id.to_string()))
            .all(&self.database)
            .await?;
        for row in snapshots {
            let target = PropagationTarget::SharedBudget {
                snapshot_id: row.id.clone(),
            };
            let result = row.delete(&self.database).await.map(|_| ()).map_err(Into::into);
            report.record(target, result);
        }

        Ok(report)
    }

    pub(super) async fn load_budget_entries(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<BudgetEntry>> {
        let rows = budget_entries::Entity::find()
            .filter(budget_entries::Column::UserId.eq(user_id.to_string()))
            .all(db)
            .await?;
        Ok(rows.into_iter().map(BudgetEntry::from).collect())
    }

    pub(super) async fn load_recurring_entries(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<RecurringEntry>> {
        let rows = recurring_entries::Entity::find()
            .filter(recurring_entries::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(recurring_entries::Column::Position)
            .all(db)
            .await?;
        rows.into_iter().map(RecurringEntry::try_from).collect()
    }

    /// Filters a stored `group_ids` list down to groups that still exist.
    pub(super) async fn live_group_ids(
        &self,
        db: &DatabaseTransaction,
        stored: &[String],
    ) -> ResultEngine<Vec<String>> {
        let mut out = Vec::with_capacity(stored.len());
        for group_id in stored {
            if groups::Entity::find_by_id(group_id.clone())
                .one(db)
                .await?
                .is_some()
            {
                out.push(group_id.clone());
            }
        }
        Ok(out)
    }
}
