use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    events::{Propagation, PropagationTarget},
    group_members,
    groups::{self, Group, GroupMember},
    shared_budgets,
    users::{self, group_ids_from_json},
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Creates a group with the owner and the given roster, then fans the
    /// group id out to every member's `group_ids` list.
    ///
    /// The group and its member rows commit atomically; the back-reference
    /// writes are independent per-member overwrites reported target by
    /// target.
    pub async fn create_group(
        &self,
        name: &str,
        owner_id: &str,
        initial_members: &[GroupMember],
    ) -> ResultEngine<(String, Propagation)> {
        let name = normalize_required_name(name, "group")?;
        let group_id = Uuid::new_v4().to_string();

        with_tx!(self, |db_tx| {
            let owner = self.require_user(&db_tx, owner_id).await?;
            let row = groups::ActiveModel {
                id: ActiveValue::Set(group_id.clone()),
                name: ActiveValue::Set(name),
                owner_id: ActiveValue::Set(owner_id.to_string()),
            };
            row.insert(&db_tx).await?;

            // The owner is always on the roster; a duplicate in the input
            // must not shadow their profile row.
            let owner_member = GroupMember {
                uid: owner.id.clone(),
                name: owner.name.clone(),
                phone: owner.phone.clone(),
            };
            let roster = std::iter::once(&owner_member)
                .chain(initial_members.iter().filter(|m| m.uid != owner.id));
            for member in roster {
                let row = group_members::ActiveModel {
                    group_id: ActiveValue::Set(group_id.clone()),
                    uid: ActiveValue::Set(member.uid.clone()),
                    name: ActiveValue::Set(member.name.clone()),
                    phone: ActiveValue::Set(member.phone.clone()),
                };
                row.insert(&db_tx).await?;
            }
            Ok(())
        })?;
        tracing::debug!(%group_id, owner_id, "group created");

        let mut report = Propagation::default();
        let member_rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.clone()))
            .all(&self.database)
            .await?;
        for member in member_rows {
            let target = PropagationTarget::UserGroupIds {
                user_id: member.uid.clone(),
            };
            let result = self.add_group_back_reference(&member.uid, &group_id).await;
            report.record(target, result);
        }
        Ok((group_id, report))
    }

    /// Adds (or refreshes) a member row. Owner-gated.
    pub async fn add_member(
        &self,
        group_id: &str,
        member: &GroupMember,
        caller: &str,
    ) -> ResultEngine<Propagation> {
        with_tx!(self, |db_tx| {
            self.require_group_owner(&db_tx, group_id, caller).await?;
            let key = (group_id.to_string(), member.uid.clone());
            match group_members::Entity::find_by_id(key).one(&db_tx).await? {
                Some(existing) => {
                    let mut row: group_members::ActiveModel = existing.into();
                    row.name = ActiveValue::Set(member.name.clone());
                    row.phone = ActiveValue::Set(member.phone.clone());
                    row.update(&db_tx).await?;
                }
                None => {
                    let row = group_members::ActiveModel {
                        group_id: ActiveValue::Set(group_id.to_string()),
                        uid: ActiveValue::Set(member.uid.clone()),
                        name: ActiveValue::Set(member.name.clone()),
                        phone: ActiveValue::Set(member.phone.clone()),
                    };
                    row.insert(&db_tx).await?;
                }
            }
            Ok(())
        })?;

        let mut report = Propagation::default();
        let target = PropagationTarget::UserGroupIds {
            user_id: member.uid.clone(),
        };
        let result = self.add_group_back_reference(&member.uid, group_id).await;
        report.record(target, result);
        Ok(report)
    }

    /// Removes a member. The owner may remove anyone but themself; a member
    /// may leave on their own. The member's shared snapshot in this group
    /// goes with them.
    pub async fn remove_member(
        &self,
        group_id: &str,
        uid: &str,
        caller: &str,
    ) -> ResultEngine<Propagation> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            if uid == group.owner_id {
                return Err(EngineError::InvalidInput(
                    "the group owner cannot be removed".to_string(),
                ));
            }
            if caller != group.owner_id && caller != uid {
                return Err(EngineError::Unauthorized(
                    "only the owner or the member themself can remove a member".to_string(),
                ));
            }
            let key = (group_id.to_string(), uid.to_string());
            let row = group_members::Entity::find_by_id(key)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
            row.delete(&db_tx).await?;

            let snapshot = shared_budgets::Entity::find()
                .filter(shared_budgets::Column::GroupId.eq(group_id.to_string()))
                .filter(shared_budgets::Column::UserId.eq(uid.to_string()))
                .one(&db_tx)
                .await?;
            if let Some(snapshot) = snapshot {
                snapshot.delete(&db_tx).await?;
            }
            Ok(())
        })?;
        tracing::debug!(group_id, uid, "member removed");

        let mut report = Propagation::default();
        let target = PropagationTarget::UserGroupIds {
            user_id: uid.to_string(),
        };
        let result = self.remove_group_back_reference(uid, group_id).await;
        report.record(target, result);
        Ok(report)
    }

    /// Deletes a group and everything under it. Member `group_ids`
    /// back-references are left behind and filtered out at read time.
    pub async fn delete_group(&self, group_id: &str, caller: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_owner(&db_tx, group_id, caller).await?;
            // Member rows, budgets, entries and snapshots follow by cascade.
            group.delete(&db_tx).await?;
            tracing::debug!(group_id, "group deleted");
            Ok(())
        })
    }

    pub async fn group(&self, group_id: &str) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            self.group_view(&db_tx, group).await
        })
    }

    /// All groups the user belongs to, dangling ids dropped.
    pub async fn user_groups(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let stored = group_ids_from_json(&user.group_ids);
            let mut out = Vec::new();
            for group_id in self.live_group_ids(&db_tx, &stored).await? {
                let group = self.require_group(&db_tx, &group_id).await?;
                out.push(self.group_view(&db_tx, group).await?);
            }
            Ok(out)
        })
    }

    async fn group_view(
        &self,
        db: &sea_orm::DatabaseTransaction,
        group: groups::Model,
    ) -> ResultEngine<Group> {
        let members = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group.id.clone()))
            .order_by_asc(group_members::Column::Uid)
            .all(db)
            .await?;
        Ok(Group {
            id: group.id,
            name: group.name,
            owner_id: group.owner_id,
            members: members.into_iter().map(GroupMember::from).collect(),
        })
    }

    /// Appends `group_id` to a user's `group_ids` list. Members without a
    /// ledger row (invited by contact, never signed up) have nothing to
    /// update and succeed vacuously.
    async fn add_group_back_reference(&self, user_id: &str, group_id: &str) -> ResultEngine<()> {
        let Some(user) = users::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(());
        };
        let mut ids = group_ids_from_json(&user.group_ids);
        if ids.iter().any(|id| id == group_id) {
            return Ok(());
        }
        ids.push(group_id.to_string());
        let mut row: users::ActiveModel = user.into();
        row.group_ids = ActiveValue::Set(serde_json::json!(ids));
        row.update(&self.database).await?;
        Ok(())
    }

    async fn remove_group_back_reference(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> ResultEngine<()> {
        let Some(user) = users::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(());
        };
        let mut ids = group_ids_from_json(&user.group_ids);
        let before = ids.len();
        ids.retain(|id| id != group_id);
        if ids.len() == before {
            return Ok(());
        }
        let mut row: users::ActiveModel = user.into();
        row.group_ids = ActiveValue::Set(serde_json::json!(ids));
        row.update(&self.database).await?;
        Ok(())
    }
}
