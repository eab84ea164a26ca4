//! Initial schema migration - creates all tables from scratch.
//!
//! The schema backs the budget ledger and its derived records:
//!
//! - `users`: per-user ledger (income, monthly allowance, group back-refs)
//! - `budget_entries`: one-time categorized entries of a user's budget
//! - `recurring_entries`: recurring entry definitions, projected at read time
//! - `groups`: shared groups owned by a single user
//! - `group_members`: member rows with denormalized name/phone copies
//! - `group_budgets`: pooled budgets with a persisted remaining balance
//! - `group_budget_entries`: categorized entries of a pooled budget
//! - `shared_budgets`: denormalized snapshots of a user's budget in a group

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Name,
    Phone,
    Email,
    IncomeMinor,
    BudgetTotalMinor,
    GroupIds,
}

#[derive(Iden)]
enum BudgetEntries {
    Table,
    UserId,
    Category,
    Name,
    AmountMinor,
    Date,
}

#[derive(Iden)]
enum RecurringEntries {
    Table,
    Id,
    UserId,
    Category,
    Name,
    AmountMinor,
    Interval,
    StartDate,
    EndDate,
    Kind,
    Position,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    OwnerId,
}

#[derive(Iden)]
enum GroupMembers {
    Table,
    GroupId,
    Uid,
    Name,
    Phone,
}

#[derive(Iden)]
enum GroupBudgets {
    Table,
    Id,
    GroupId,
    Name,
    CeilingMinor,
    RemainingMinor,
}

#[derive(Iden)]
enum GroupBudgetEntries {
    Table,
    GroupBudgetId,
    Category,
    Name,
    AmountMinor,
    Date,
}

#[derive(Iden)]
enum SharedBudgets {
    Table,
    Id,
    UserId,
    UserName,
    GroupId,
    Budget,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Phone).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(
                        ColumnDef::new(Users::IncomeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::BudgetTotalMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Users::GroupIds).json().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Budget entries (one-time, keyed by user/category/name)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BudgetEntries::UserId).string().not_null())
                    .col(ColumnDef::new(BudgetEntries::Category).string().not_null())
                    .col(ColumnDef::new(BudgetEntries::Name).string().not_null())
                    .col(
                        ColumnDef::new(BudgetEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetEntries::Date).date().not_null())
                    .primary_key(
                        Index::create()
                            .col(BudgetEntries::UserId)
                            .col(BudgetEntries::Category)
                            .col(BudgetEntries::Name),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_entries-user_id")
                            .from(BudgetEntries::Table, BudgetEntries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Recurring entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RecurringEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringEntries::UserId).string().not_null())
                    .col(
                        ColumnDef::new(RecurringEntries::Category)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringEntries::Name).string().not_null())
                    .col(
                        ColumnDef::new(RecurringEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringEntries::Interval)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringEntries::StartDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringEntries::EndDate).date())
                    .col(ColumnDef::new(RecurringEntries::Kind).string().not_null())
                    .col(
                        ColumnDef::new(RecurringEntries::Position)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_entries-user_id")
                            .from(RecurringEntries::Table, RecurringEntries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_entries-user_id-position")
                    .table(RecurringEntries::Table)
                    .col(RecurringEntries::UserId)
                    .col(RecurringEntries::Position)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::OwnerId).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Group members (denormalized member name/phone)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupMembers::GroupId).string().not_null())
                    .col(ColumnDef::new(GroupMembers::Uid).string().not_null())
                    .col(ColumnDef::new(GroupMembers::Name).string().not_null())
                    .col(ColumnDef::new(GroupMembers::Phone).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupMembers::GroupId)
                            .col(GroupMembers::Uid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_members-group_id")
                            .from(GroupMembers::Table, GroupMembers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Group budgets (persisted remaining balance)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GroupBudgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupBudgets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupBudgets::GroupId).string().not_null())
                    .col(ColumnDef::new(GroupBudgets::Name).string().not_null())
                    .col(ColumnDef::new(GroupBudgets::CeilingMinor).big_integer())
                    .col(ColumnDef::new(GroupBudgets::RemainingMinor).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_budgets-group_id")
                            .from(GroupBudgets::Table, GroupBudgets::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Group budget entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GroupBudgetEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupBudgetEntries::GroupBudgetId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupBudgetEntries::Category)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupBudgetEntries::Name).string().not_null())
                    .col(
                        ColumnDef::new(GroupBudgetEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupBudgetEntries::Date).date().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupBudgetEntries::GroupBudgetId)
                            .col(GroupBudgetEntries::Category)
                            .col(GroupBudgetEntries::Name),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_budget_entries-group_budget_id")
                            .from(
                                GroupBudgetEntries::Table,
                                GroupBudgetEntries::GroupBudgetId,
                            )
                            .to(GroupBudgets::Table, GroupBudgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Shared budget snapshots
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SharedBudgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SharedBudgets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SharedBudgets::UserId).string().not_null())
                    .col(ColumnDef::new(SharedBudgets::UserName).string().not_null())
                    .col(ColumnDef::new(SharedBudgets::GroupId).string().not_null())
                    .col(ColumnDef::new(SharedBudgets::Budget).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shared_budgets-group_id")
                            .from(SharedBudgets::Table, SharedBudgets::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-shared_budgets-user_id-group_id-unique")
                    .table(SharedBudgets::Table)
                    .col(SharedBudgets::UserId)
                    .col(SharedBudgets::GroupId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SharedBudgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupBudgetEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupBudgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
