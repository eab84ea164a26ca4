use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, budget,
    events::{LedgerEvent, Propagation, PropagationTarget},
    group_members, shared_budgets,
    shared_budgets::SharedBudgetSnapshot,
    users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Publishes the caller's current budget map into a group. One snapshot
    /// per (user, group).
    pub async fn share_budget(&self, user_id: &str, group_id: &str) -> ResultEngine<String> {
        let snapshot_id = Uuid::new_v4().to_string();
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            self.require_group_member(&db_tx, group_id, user_id).await?;
            let duplicate = shared_budgets::Entity::find()
                .filter(shared_budgets::Column::UserId.eq(user_id.to_string()))
                .filter(shared_budgets::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(EngineError::AlreadyShared(format!(
                    "budget already shared with group {group_id}"
                )));
            }
            let manual = self.load_budget_entries(&db_tx, user_id).await?;
            let row = shared_budgets::ActiveModel {
                id: ActiveValue::Set(snapshot_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
                user_name: ActiveValue::Set(user.name.clone()),
                group_id: ActiveValue::Set(group_id.to_string()),
                budget: ActiveValue::Set(serde_json::json!(budget::budget_map(&manual))),
            };
            row.insert(&db_tx).await?;
            tracing::debug!(user_id, group_id, "budget shared");
            Ok(())
        })?;
        Ok(snapshot_id)
    }

    /// Retracts a snapshot. Only the user who shared it may do so.
    pub async fn unshare_budget(
        &self,
        group_id: &str,
        user_id: &str,
        caller: &str,
    ) -> ResultEngine<()> {
        if caller != user_id {
            return Err(EngineError::Unauthorized(
                "only the sharing user can unshare their budget".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let row = shared_budgets::Entity::find()
                .filter(shared_budgets::Column::UserId.eq(user_id.to_string()))
                .filter(shared_budgets::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("shared budget not exists".to_string())
                })?;
            row.delete(&db_tx).await?;
            tracing::debug!(user_id, group_id, "budget unshared");
            Ok(())
        })
    }

    /// Applies a source-of-truth change to every derived copy.
    ///
    /// Each copy is an idempotent overwrite written independently; a failed
    /// target leaves the others committed and shows up in the report, so the
    /// caller can retry the stale ones (or the whole event) safely.
    pub async fn handle_event(&self, event: LedgerEvent) -> ResultEngine<Propagation> {
        match event {
            LedgerEvent::BudgetChanged { user_id } => self.propagate_budget_change(&user_id).await,
            LedgerEvent::ProfileChanged {
                user_id,
                name,
                phone,
            } => self.propagate_profile_change(&user_id, &name, &phone).await,
        }
    }

    async fn propagate_budget_change(&self, user_id: &str) -> ResultEngine<Propagation> {
        let budget_json = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let manual = self.load_budget_entries(&db_tx, user_id).await?;
            Ok(serde_json::json!(budget::budget_map(&manual)))
        })?;

        let mut report = Propagation::default();
        let snapshots = shared_budgets::Entity::find()
            .filter(shared_budgets::Column::UserId.eq(user_id.to_string()))
            .all(&self.database)
            .await?;
        for snapshot in snapshots {
            let target = PropagationTarget::SharedBudget {
                snapshot_id: snapshot.id.clone(),
            };
            let mut row: shared_budgets::ActiveModel = snapshot.into();
            row.budget = ActiveValue::Set(budget_json.clone());
            let result = row.update(&self.database).await.map(|_| ()).map_err(Into::into);
            report.record(target, result);
        }
        Ok(report)
    }

    async fn propagate_profile_change(
        &self,
        user_id: &str,
        name: &str,
        phone: &str,
    ) -> ResultEngine<Propagation> {
        // The source of truth first; the copies only after it committed.
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut row: users::ActiveModel = user.into();
            row.name = ActiveValue::Set(name.to_string());
            row.phone = ActiveValue::Set(phone.to_string());
            row.update(&db_tx).await?;
            Ok(())
        })?;

        let mut report = Propagation::default();

        let member_rows = group_members::Entity::find()
            .filter(group_members::Column::Uid.eq(user_id.to_string()))
            .all(&self.database)
            .await?;
        for member in member_rows {
            let target = PropagationTarget::GroupMember {
                group_id: member.group_id.clone(),
                uid: member.uid.clone(),
            };
            let mut row: group_members::ActiveModel = member.into();
            row.name = ActiveValue::Set(name.to_string());
            row.phone = ActiveValue::Set(phone.to_string());
            let result = row.update(&self.database).await.map(|_| ()).map_err(Into::into);
            report.record(target, result);
        }

        let snapshots = shared_budgets::Entity::find()
            .filter(shared_budgets::Column::UserId.eq(user_id.to_string()))
            .all(&self.database)
            .await?;
        for snapshot in snapshots {
            let target = PropagationTarget::SharedBudget {
                snapshot_id: snapshot.id.clone(),
            };
            let mut row: shared_budgets::ActiveModel = snapshot.into();
            row.user_name = ActiveValue::Set(name.to_string());
            let result = row.update(&self.database).await.map(|_| ()).map_err(Into::into);
            report.record(target, result);
        }

        Ok(report)
    }

    /// Every budget shared into a group.
    pub async fn shared_budgets_for_group(
        &self,
        group_id: &str,
    ) -> ResultEngine<Vec<SharedBudgetSnapshot>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let rows = shared_budgets::Entity::find()
                .filter(shared_budgets::Column::GroupId.eq(group_id.to_string()))
                .all(&db_tx)
                .await?;
            rows.into_iter().map(SharedBudgetSnapshot::try_from).collect()
        })
    }

    pub async fn shared_budget(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> ResultEngine<SharedBudgetSnapshot> {
        with_tx!(self, |db_tx| {
            let row = shared_budgets::Entity::find()
                .filter(shared_budgets::Column::UserId.eq(user_id.to_string()))
                .filter(shared_budgets::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("shared budget not exists".to_string())
                })?;
            SharedBudgetSnapshot::try_from(row)
        })
    }
}
