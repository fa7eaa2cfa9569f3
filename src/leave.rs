use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::center::CenterId;
use crate::coach::{Coach, CoachId};
use crate::period::{Period, CALENDAR_MONTHS};
use crate::time::iso_date;
use crate::validate;

pub type LeaveId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LeaveKind {
    Casual,
    Sick,
    Paid,
    Unpaid,
    WeekOff,
    Ot,
    Emergency,
    Other,
}

impl Default for LeaveKind {
    fn default() -> Self {
        LeaveKind::Casual
    }
}

impl LeaveKind {
    /// Week offs and overtime are tracked, but aren't absences.
    fn is_absence(self) -> bool {
        !matches!(self, LeaveKind::WeekOff | LeaveKind::Ot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Leave {
    pub id: LeaveId,
    pub coach_id: CoachId,
    #[serde(with = "iso_date")]
    pub from_date: Date,
    #[serde(with = "iso_date")]
    pub to_date: Date,
    pub kind: LeaveKind,
    pub remarks: String,
}

impl Leave {
    /// Inclusive day count.
    pub fn days(&self) -> i64 {
        (self.to_date - self.from_date).whole_days() + 1
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaveInput {
    /// Only honoured on update.
    pub coach_id: Option<CoachId>,
    pub from_date: String,
    pub to_date: Option<String>,
    #[serde(default)]
    pub kind: LeaveKind,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone)]
pub struct LeaveFields {
    pub coach_id: Option<CoachId>,
    pub from_date: Date,
    pub to_date: Date,
    pub kind: LeaveKind,
    pub remarks: String,
}

impl TryFrom<LeaveInput> for LeaveFields {
    type Error = &'static str;

    fn try_from(input: LeaveInput) -> Result<Self, Self::Error> {
        let from_date = validate::date(&input.from_date)?;
        let to_date = match input.to_date.as_deref().map(str::trim) {
            None | Some("") => from_date,
            Some(s) => validate::date(s)?,
        };

        if to_date < from_date {
            return Err("leave ends before it starts");
        }

        Ok(Self {
            coach_id: input.coach_id,
            from_date,
            to_date,
            kind: input.kind,
            remarks: validate::sanitize(&input.remarks, 1000),
        })
    }
}

/// `GET /api/leaves` filters. Leaves belong to the year and month they start in.
#[derive(Debug, Default, Deserialize)]
pub struct LeaveQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub center: Option<CenterId>,
    pub coach: Option<CoachId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaveFilter {
    pub year: i32,
    pub month: Option<u8>,
    pub center: Option<CenterId>,
    pub coach: Option<CoachId>,
}

impl LeaveFilter {
    pub fn new(q: &LeaveQuery, default_year: i32) -> Result<Self, &'static str> {
        let year = q.year.unwrap_or(default_year);
        // validates both year and month
        Period::new(year, q.month.unwrap_or(1))?;

        Ok(Self {
            year,
            month: q.month,
            center: q.center,
            coach: q.coach,
        })
    }
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct LeaveStats {
    pub coach_id: CoachId,
    pub coach_name: String,
    pub leaves: usize,
    /// Absence days, i.e. excluding week offs and overtime.
    pub total_days: i64,
    pub approved_days: i64,
    pub lop_days: i64,
    pub week_off_days: i64,
    pub ot_days: i64,
}

/// Per-coach leave tallies for `year`, busiest coach first.
///
/// A leave counts towards the year its first day falls in.
pub fn tally(coaches: &[Coach], leaves: &[Leave], year: i32) -> Vec<LeaveStats> {
    let mut stats: HashMap<CoachId, LeaveStats> = coaches
        .iter()
        .map(|c| {
            (
                c.id,
                LeaveStats {
                    coach_id: c.id,
                    coach_name: c.name.clone(),
                    ..Default::default()
                },
            )
        })
        .collect();

    for leave in leaves.iter().filter(|l| l.from_date.year() == year) {
        let Some(s) = stats.get_mut(&leave.coach_id) else {
            continue;
        };
        let days = leave.days();

        s.leaves += 1;
        if leave.kind.is_absence() {
            s.total_days += days;
        }
        match leave.kind {
            LeaveKind::Unpaid => s.lop_days += days,
            LeaveKind::WeekOff => s.week_off_days += days,
            LeaveKind::Ot => s.ot_days += days,
            _ => s.approved_days += days,
        }
    }

    let mut stats: Vec<_> = stats.into_values().collect();
    stats.sort_by(|a, b| {
        b.total_days
            .cmp(&a.total_days)
            .then_with(|| a.coach_name.cmp(&b.coach_name))
    });
    stats
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthDays {
    pub month: u8,
    pub name: &'static str,
    /// Every kind, week offs and overtime included.
    pub days: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct KindDays {
    pub kind: LeaveKind,
    pub days: i64,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct LeaveTotals {
    pub total_days: i64,
    pub lop_days: i64,
    pub week_off_days: i64,
    pub ot_days: i64,
}

/// Everything the leave dashboard shows for one year.
#[derive(Debug, Serialize, PartialEq)]
pub struct LeaveReport {
    pub year: i32,
    pub coaches: Vec<LeaveStats>,
    pub monthly_days: Vec<MonthDays>,
    pub by_kind: Vec<KindDays>,
    pub totals: LeaveTotals,
}

pub fn report(coaches: &[Coach], leaves: &[Leave], year: i32) -> LeaveReport {
    let in_year: Vec<&Leave> = leaves.iter().filter(|l| l.from_date.year() == year).collect();

    let mut monthly = [0i64; CALENDAR_MONTHS.len()];
    let mut by_kind: Vec<KindDays> = vec![];
    let mut totals = LeaveTotals::default();

    for leave in &in_year {
        let days = leave.days();

        monthly[usize::from(u8::from(leave.from_date.month())) - 1] += days;

        match by_kind.iter_mut().find(|k| k.kind == leave.kind) {
            Some(k) => k.days += days,
            None => by_kind.push(KindDays { kind: leave.kind, days }),
        }

        if leave.kind.is_absence() {
            totals.total_days += days;
        }
        match leave.kind {
            LeaveKind::Unpaid => totals.lop_days += days,
            LeaveKind::WeekOff => totals.week_off_days += days,
            LeaveKind::Ot => totals.ot_days += days,
            _ => {}
        }
    }

    // stable, so ties keep first-seen order
    by_kind.sort_by(|a, b| b.days.cmp(&a.days));

    let monthly_days = CALENDAR_MONTHS
        .iter()
        .zip(1u8..)
        .zip(monthly)
        .map(|((&name, month), days)| MonthDays { month, name, days })
        .collect();

    LeaveReport {
        year,
        coaches: tally(coaches, leaves, year),
        monthly_days,
        by_kind,
        totals,
    }
}
