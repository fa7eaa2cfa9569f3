use serde::{Deserialize, Serialize};
use time::Date;

use crate::center::CenterId;
use crate::time::iso_date;
use crate::validate;

pub type CoachId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Coach {
    pub id: CoachId,
    pub center_id: CenterId,
    pub name: String,
    pub monthly_salary: f64,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CoachInput {
    pub name: String,
    /// Only honoured on update, to move a coach between centers.
    pub center_id: Option<CenterId>,
    pub monthly_salary: f64,
    pub start_date: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct CoachFields {
    pub center_id: Option<CenterId>,
    pub name: String,
    pub monthly_salary: f64,
    pub start_date: Date,
    pub active: bool,
}

impl TryFrom<CoachInput> for CoachFields {
    type Error = &'static str;

    fn try_from(input: CoachInput) -> Result<Self, Self::Error> {
        Ok(Self {
            center_id: input.center_id,
            name: validate::name(&input.name)?,
            monthly_salary: validate::amount(
                input.monthly_salary,
                "monthly salary must be a non-negative amount",
            )?,
            start_date: validate::date(&input.start_date)?,
            active: input.active,
        })
    }
}

/// Committed monthly roster cost of a center.
#[derive(Debug, Serialize, PartialEq)]
pub struct Payroll {
    pub center_id: CenterId,
    pub active_coaches: usize,
    pub monthly_salary_total: f64,
    /// Revenue a month must bring in for the roster to stay under the cap.
    pub revenue_target: f64,
}

impl Payroll {
    pub fn of(center_id: CenterId, coaches: &[Coach]) -> Self {
        let active = coaches.iter().filter(|c| c.active);

        let (active_coaches, monthly_salary_total) =
            active.fold((0, 0.0), |(n, total), c| (n + 1, total + c.monthly_salary));

        Self {
            center_id,
            active_coaches,
            monthly_salary_total,
            revenue_target: crate::analytics::revenue_target(monthly_salary_total),
        }
    }
}
