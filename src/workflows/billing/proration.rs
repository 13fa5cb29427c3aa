use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Which reference date the partial-month charge was measured from, in
/// priority order: the last recorded payment, the tenant's move-in date, or
/// the start of the current calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRule {
    LastPaidDate,
    MoveInDate,
    MonthStart,
}

impl AnchorRule {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::LastPaidDate => "last payment date",
            Self::MoveInDate => "move-in date",
            Self::MonthStart => "start of current month",
        }
    }
}

/// A computed partial-month rent charge.
#[derive(Debug, Clone, Serialize)]
pub struct Proration {
    pub anchor: NaiveDate,
    pub rule: AnchorRule,
    pub elapsed_days: i64,
    pub amount: i64,
}

impl Proration {
    /// Human-readable note recorded on generated drafts so an operator can
    /// see how the amount came about.
    pub fn note(&self) -> String {
        format!(
            "Room rent prorated over {} day(s) since {} ({})",
            self.elapsed_days,
            self.anchor,
            self.rule.describe()
        )
    }
}

/// Pick the anchor date for a tenant: the most recent paid date when one is
/// recorded, the move-in date otherwise, and the first day of the current
/// month as the final fallback.
pub fn resolve_anchor(
    last_paid: Option<NaiveDate>,
    move_in: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, AnchorRule) {
    if let Some(paid) = last_paid {
        return (paid, AnchorRule::LastPaidDate);
    }
    if let Some(moved) = move_in {
        return (moved, AnchorRule::MoveInDate);
    }
    (month_start(today), AnchorRule::MonthStart)
}

/// Compute the prorated room rent. The daily rate divides the monthly price
/// by a fixed 30 days regardless of the actual month length, and the day
/// count is the absolute calendar-day distance, so an anchor accidentally in
/// the future never yields a negative charge.
pub fn prorate(
    monthly_price: i64,
    anchor: NaiveDate,
    rule: AnchorRule,
    today: NaiveDate,
) -> Proration {
    let elapsed_days = (today - anchor).num_days().abs();
    let daily_rate = monthly_price as f64 / 30.0;
    let amount = (daily_rate * elapsed_days as f64).round() as i64;
    Proration {
        anchor,
        rule,
        elapsed_days,
        amount,
    }
}

pub fn month_start(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
}

/// First permissible due date after the billing period: the given day of the
/// following month.
pub fn due_date_after(month: u32, year: i32, day: u8) -> NaiveDate {
    let (next_month, next_year) = if month == 12 {
        (1, year + 1)
    } else {
        (month + 1, year)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, u32::from(day))
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap_or_default())
}
