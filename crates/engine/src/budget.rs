//! Remaining-budget arithmetic over manual and projected recurring entries.
//!
//! Everything here is a pure function: the engine loads the rows and
//! delegates, so the same arithmetic is reusable from tests without a
//! store. The personal remaining budget is never persisted; it is
//! recomputed from the ledger on every read (the pooled group budget is the
//! deliberate exception and persists its remaining balance).

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::recurring_entries::{EntryKind, RecurringEntry, expand};

/// One slot of the nested budget map: `budget[category][name]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSlot {
    pub amount_minor: i64,
    pub date: NaiveDate,
}

/// Nested map `category -> entry name -> slot`, the document shape shared
/// by the personal ledger, pooled group budgets and shared snapshots.
pub type BudgetMap = BTreeMap<String, BTreeMap<String, BudgetSlot>>;

/// A flattened manual budget entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub category: String,
    pub name: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
}

/// Folds flattened entries back into the nested map shape.
pub fn budget_map(entries: &[BudgetEntry]) -> BudgetMap {
    let mut map = BudgetMap::new();
    for entry in entries {
        map.entry(entry.category.clone()).or_default().insert(
            entry.name.clone(),
            BudgetSlot {
                amount_minor: entry.amount_minor,
                date: entry.date,
            },
        );
    }
    map
}

/// First and last day of the calendar month containing `date`.
pub fn month_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day0(0).unwrap_or(date);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (start, end)
}

/// Remaining spendable budget at `reference_date`:
/// `budget_total - manual expenses in the month - projected recurring
/// expenses in the month`.
///
/// Recurring *income* entries are recorded but do not increase the
/// remaining figure; only the expense side is subtracted.
pub fn remaining(
    budget_total_minor: i64,
    manual: &[BudgetEntry],
    recurring: &[RecurringEntry],
    reference_date: NaiveDate,
) -> i64 {
    let (start, end) = month_window(reference_date);

    let manual_spent: i64 = manual
        .iter()
        .filter(|entry| entry.date >= start && entry.date <= end)
        .map(|entry| entry.amount_minor)
        .sum();

    let recurring_spent: i64 = expand(recurring, reference_date, None)
        .iter()
        .filter(|occurrence| occurrence.kind == EntryKind::Expense)
        .map(|occurrence| occurrence.amount_minor)
        .sum();

    budget_total_minor - manual_spent - recurring_spent
}

/// Savings of one calendar month: the monthly allowance minus everything
/// spent in that month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySavings {
    /// Month key in `YYYY-MM` form.
    pub month: String,
    pub savings_minor: i64,
}

/// Per-month savings report. Manual entries are bucketed by their own
/// date's month; recurring expenses are charged once to the month of
/// `reference_date`.
pub fn monthly_savings(
    budget_total_minor: i64,
    manual: &[BudgetEntry],
    recurring: &[RecurringEntry],
    reference_date: NaiveDate,
) -> Vec<MonthlySavings> {
    let mut spent_by_month: BTreeMap<String, i64> = BTreeMap::new();

    for entry in manual {
        let month = entry.date.format("%Y-%m").to_string();
        *spent_by_month.entry(month).or_insert(0) += entry.amount_minor;
    }

    let current_month = reference_date.format("%Y-%m").to_string();
    for entry in recurring {
        if entry.kind == EntryKind::Expense {
            *spent_by_month.entry(current_month.clone()).or_insert(0) += entry.amount_minor;
        }
    }

    spent_by_month
        .into_iter()
        .map(|(month, total_spent)| MonthlySavings {
            month,
            savings_minor: budget_total_minor - total_spent,
        })
        .collect()
}
