//! Recurring entry definitions and their projection into dated occurrences.
//!
//! A [`RecurringEntry`] is a template: category, name, amount, an interval
//! and a date range. [`project`] expands it into concrete dates up to a
//! reference date, and [`expand`] flattens a whole list of entries into the
//! occurrences falling inside a billing window. Both are pure functions of
//! their inputs, so reports can be recomputed on demand and tested without a
//! store.

use chrono::{Days, Months, NaiveDate};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, budget::month_window};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for Interval {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidInput(format!(
                "invalid interval: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidInput(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

/// A recurring entry definition. Immutable once created; edits go through
/// full replacement or removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringEntry {
    pub id: Uuid,
    pub category: String,
    pub name: String,
    pub amount_minor: i64,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub kind: EntryKind,
}

/// One concrete occurrence of a recurring entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub category: String,
    pub name: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub kind: EntryKind,
}

/// Enumerates every scheduled occurrence of `entry` between its start date
/// and `min(reference_date, end_date)`, inclusive.
///
/// Monthly and yearly steps are computed from the start date as anchor
/// (occurrence *n* = start + *n* months), so an entry starting Jan 31 lands
/// on Feb 28 (Feb 29 in leap years) and back on Mar 31, never skipping a
/// short month and never drifting the anchor day.
///
/// Deterministic and stateless: the same `(entry, reference_date)` always
/// yields the same list, and an entry starting after the reference date
/// yields none.
pub fn project(entry: &RecurringEntry, reference_date: NaiveDate) -> Vec<NaiveDate> {
    let until = match entry.end_date {
        Some(end) if end < reference_date => end,
        _ => reference_date,
    };

    let mut occurrences = Vec::new();
    if entry.start_date > until {
        return occurrences;
    }

    match entry.interval {
        Interval::Daily | Interval::Weekly | Interval::Biweekly => {
            let step = match entry.interval {
                Interval::Daily => 1,
                Interval::Weekly => 7,
                _ => 14,
            };
            let mut current = entry.start_date;
            while current <= until {
                occurrences.push(current);
                match current.checked_add_days(Days::new(step)) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
        Interval::Monthly | Interval::Yearly => {
            let months_per_step = match entry.interval {
                Interval::Monthly => 1,
                _ => 12,
            };
            let mut n: u32 = 0;
            while let Some(date) = entry
                .start_date
                .checked_add_months(Months::new(n * months_per_step))
            {
                if date > until {
                    break;
                }
                occurrences.push(date);
                n += 1;
            }
        }
    }

    occurrences
}

/// Flattens all occurrences of `entries` falling inside `window`, defaulting
/// to the calendar month containing `reference_date`.
pub fn expand(
    entries: &[RecurringEntry],
    reference_date: NaiveDate,
    window: Option<(NaiveDate, NaiveDate)>,
) -> Vec<Occurrence> {
    let (start, end) = window.unwrap_or_else(|| month_window(reference_date));

    entries
        .iter()
        .flat_map(|entry| {
            project(entry, reference_date)
                .into_iter()
                .filter(move |date| *date >= start && *date <= end)
                .map(|date| Occurrence {
                    category: entry.category.clone(),
                    name: entry.name.clone(),
                    amount_minor: entry.amount_minor,
                    date,
                    kind: entry.kind,
                })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub name: String,
    pub amount_minor: i64,
    pub interval: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub kind: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RecurringEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&model.id)
            .map_err(|_| EngineError::InvalidInput("invalid recurring entry id".to_string()))?;
        Ok(Self {
            id,
            category: model.category,
            name: model.name,
            amount_minor: model.amount_minor,
            interval: Interval::try_from(model.interval.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            kind: EntryKind::try_from(model.kind.as_str())?,
        })
    }
}

impl From<&RecurringEntry> for ActiveModel {
    fn from(entry: &RecurringEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            user_id: ActiveValue::NotSet,
            category: ActiveValue::Set(entry.category.clone()),
            name: ActiveValue::Set(entry.name.clone()),
            amount_minor: ActiveValue::Set(entry.amount_minor),
            interval: ActiveValue::Set(entry.interval.as_str().to_string()),
            start_date: ActiveValue::Set(entry.start_date),
            end_date: ActiveValue::Set(entry.end_date),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            position: ActiveValue::NotSet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(start: NaiveDate) -> RecurringEntry {
        RecurringEntry {
            id: Uuid::new_v4(),
            category: String::from("home"),
            name: String::from("rent"),
            amount_minor: 80_000,
            interval: Interval::Monthly,
            start_date: start,
            end_date: None,
            kind: EntryKind::Expense,
        }
    }

    #[test]
    fn daily_projection_counts_every_day() {
        let mut entry = monthly(date(2025, 3, 1));
        entry.interval = Interval::Daily;
        let occurrences = project(&entry, date(2025, 3, 10));
        assert_eq!(occurrences.len(), 10);
        assert_eq!(occurrences[0], date(2025, 3, 1));
        assert_eq!(occurrences[9], date(2025, 3, 10));
    }

    #[test]
    fn weekly_and_biweekly_step() {
        let mut entry = monthly(date(2025, 1, 6));
        entry.interval = Interval::Weekly;
        assert_eq!(
            project(&entry, date(2025, 1, 27)),
            vec![
                date(2025, 1, 6),
                date(2025, 1, 13),
                date(2025, 1, 20),
                date(2025, 1, 27)
            ]
        );

        entry.interval = Interval::Biweekly;
        assert_eq!(
            project(&entry, date(2025, 1, 27)),
            vec![date(2025, 1, 6), date(2025, 1, 20)]
        );
    }

    #[test]
    fn monthly_clamps_to_short_months_without_drifting() {
        let entry = monthly(date(2025, 1, 31));
        let occurrences = project(&entry, date(2025, 4, 15));
        assert_eq!(
            occurrences,
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
        );
    }

    #[test]
    fn monthly_clamps_to_feb_29_in_leap_years() {
        let entry = monthly(date(2024, 1, 31));
        let occurrences = project(&entry, date(2024, 2, 29));
        assert_eq!(occurrences, vec![date(2024, 1, 31), date(2024, 2, 29)]);
    }

    #[test]
    fn yearly_steps_calendar_years() {
        let mut entry = monthly(date(2024, 2, 29));
        entry.interval = Interval::Yearly;
        let occurrences = project(&entry, date(2026, 3, 1));
        assert_eq!(
            occurrences,
            vec![date(2024, 2, 29), date(2025, 2, 28), date(2026, 2, 28)]
        );
    }

    #[test]
    fn projection_is_restartable() {
        let entry = monthly(date(2025, 1, 31));
        let first = project(&entry, date(2025, 6, 15));
        let second = project(&entry, date(2025, 6, 15));
        assert_eq!(first, second);
    }

    #[test]
    fn start_after_reference_yields_nothing() {
        let entry = monthly(date(2025, 7, 1));
        assert!(project(&entry, date(2025, 6, 30)).is_empty());
    }

    #[test]
    fn end_date_caps_the_projection() {
        let mut entry = monthly(date(2025, 1, 15));
        entry.end_date = Some(date(2025, 3, 15));
        let occurrences = project(&entry, date(2025, 6, 1));
        assert_eq!(
            occurrences,
            vec![date(2025, 1, 15), date(2025, 2, 15), date(2025, 3, 15)]
        );
    }

    #[test]
    fn expand_defaults_to_the_reference_month() {
        let mut daily = monthly(date(2025, 2, 25));
        daily.interval = Interval::Daily;
        let occurrences = expand(&[daily], date(2025, 3, 3), None);
        // Only the March portion of the daily run.
        assert_eq!(occurrences.len(), 3);
        assert!(occurrences.iter().all(|o| o.date >= date(2025, 3, 1)));
    }

    #[test]
    fn expand_honors_an_explicit_window() {
        let entry = monthly(date(2025, 1, 10));
        let occurrences = expand(
            &[entry],
            date(2025, 6, 30),
            Some((date(2025, 2, 1), date(2025, 3, 31))),
        );
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].date, date(2025, 2, 10));
        assert_eq!(occurrences[1].date, date(2025, 3, 10));
    }
}
