use serde::{Deserialize, Serialize};

use crate::center::CenterId;
use crate::period::Period;
use crate::validate;

pub type RecordId = i64;

/// One month's revenue and salary totals for a center.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MonthlyRecord {
    pub id: RecordId,
    pub center_id: CenterId,
    pub year: i32,
    pub month: i32,
    pub revenue: f64,
    pub total_salary: f64,
}

impl MonthlyRecord {
    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month as u8,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordInput {
    pub year: i32,
    pub month: u8,
    pub revenue: f64,
    pub total_salary: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordFields {
    pub period: Period,
    pub revenue: f64,
    pub total_salary: f64,
}

impl TryFrom<RecordInput> for RecordFields {
    type Error = &'static str;

    fn try_from(input: RecordInput) -> Result<Self, Self::Error> {
        Ok(Self {
            period: Period::new(input.year, input.month)?,
            revenue: validate::amount(input.revenue, "revenue must be a non-negative amount")?,
            total_salary: validate::amount(
                input.total_salary,
                "total salary must be a non-negative amount",
            )?,
        })
    }
}
