use sea_orm::{DatabaseTransaction, prelude::*};

use crate::{EngineError, ResultEngine, group_budgets, group_members, groups, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    pub(super) async fn require_group_owner(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self.require_group(db, group_id).await?;
        if model.owner_id != user_id {
            return Err(EngineError::Unauthorized(
                "only the group owner can do this".to_string(),
            ));
        }
        Ok(model)
    }

    pub(super) async fn is_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<bool> {
        group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map(|row| row.is_some())
            .map_err(Into::into)
    }

    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self.require_group(db, group_id).await?;
        if !self.is_group_member(db, group_id, user_id).await? {
            return Err(EngineError::Unauthorized(
                "not a member of this group".to_string(),
            ));
        }
        Ok(model)
    }

    /// Fetch a group budget, checking it belongs to the given group.
    pub(super) async fn require_group_budget(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        budget_id: &str,
    ) -> ResultEngine<group_budgets::Model> {
        let model = group_budgets::Entity::find_by_id(budget_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group budget not exists".to_string()))?;
        if model.group_id != group_id {
            return Err(EngineError::KeyNotFound(
                "group budget not exists".to_string(),
            ));
        }
        Ok(model)
    }
}
