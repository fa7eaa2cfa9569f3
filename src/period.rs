use std::{fmt, str::FromStr};

use serde::Deserialize;

pub const CALENDAR_MONTHS: [&str; 12] = [
    "January", "February", "March", "April",
    "May", "June", "July", "August",
    "September", "October", "November", "December",
];

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

/// A calendar month of a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    // field order gives chronological `Ord`
    pub year: i32,
    pub month: u8,
}

impl Period {
    pub fn new(year: i32, month: u8) -> Result<Self, &'static str> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err("year out of range");
        }
        if !(1..=12).contains(&month) {
            return Err("month must be between 1 and 12");
        }
        Ok(Self { year, month })
    }

    /// Months since year zero, used for range comparisons in SQL.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub fn month_name(&self) -> &'static str {
        CALENDAR_MONTHS[(self.month - 1) as usize]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.trim().split_once('-').ok_or("period must be yyyy-MM")?;

        let year = year.parse().map_err(|_| "invalid year")?;
        let month = month.parse().map_err(|_| "invalid month")?;

        Self::new(year, month)
    }
}

/// Inclusive range of periods; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodRange {
    pub from: Option<Period>,
    pub to: Option<Period>,
}

impl PeriodRange {
    pub fn between(from: Period, to: Period) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn year(year: i32) -> Result<Self, &'static str> {
        Ok(Self::between(Period::new(year, 1)?, Period::new(year, 12)?))
    }

    pub fn contains(&self, p: Period) -> bool {
        self.from.map_or(true, |from| from <= p) && self.to.map_or(true, |to| p <= to)
    }

    /// Ordinal bounds, with open ends widened to cover every valid period.
    pub fn ordinals(&self) -> (i64, i64) {
        let lo = self
            .from
            .map(|p| p.ordinal())
            .unwrap_or(MIN_YEAR as i64 * 12);
        let hi = self
            .to
            .map(|p| p.ordinal())
            .unwrap_or(MAX_YEAR as i64 * 12 + 11);
        (lo, hi)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct QueryRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TryFrom<&QueryRange> for PeriodRange {
    type Error = &'static str;

    fn try_from(q: &QueryRange) -> Result<Self, Self::Error> {
        let parse = |s: &Option<String>| match s.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        };

        let range = Self {
            from: parse(&q.from)?,
            to: parse(&q.to)?,
        };

        match range {
            Self {
                from: Some(from),
                to: Some(to),
            } if from > to => Err("range starts after it ends"),
            _ => Ok(range),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn p(s: &str) -> Period {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_order() {
        assert_eq!(p("2026-01"), Period { year: 2026, month: 1 });
        assert!(p("2025-12") < p("2026-01"));
        assert_eq!(p("2026-3").to_string(), "2026-03");
        assert_eq!(p("2026-09").month_name(), "September");

        assert!("2026-13".parse::<Period>().is_err());
        assert!("2026-00".parse::<Period>().is_err());
        assert!("202601".parse::<Period>().is_err());
        assert!("abcd-01".parse::<Period>().is_err());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let r = PeriodRange::between(p("2026-01"), p("2026-02"));
        assert!(r.contains(p("2026-01")));
        assert!(r.contains(p("2026-02")));
        assert!(!r.contains(p("2025-12")));
        assert!(!r.contains(p("2026-03")));

        let open = PeriodRange {
            from: Some(p("2026-06")),
            to: None,
        };
        assert!(open.contains(p("9999-12")));
        assert!(!open.contains(p("2026-05")));
        assert!(PeriodRange::default().contains(p("1900-01")));
    }

    #[test]
    fn query_range() {
        let q = QueryRange {
            from: Some("2026-01".into()),
            to: Some("".into()),
        };
        let r = PeriodRange::try_from(&q).unwrap();
        assert_eq!(r.from, Some(p("2026-01")));
        assert_eq!(r.to, None);

        let backwards = QueryRange {
            from: Some("2026-05".into()),
            to: Some("2026-01".into()),
        };
        assert!(PeriodRange::try_from(&backwards).is_err());

        let (lo, hi) = PeriodRange::year(2026).unwrap().ordinals();
        assert_eq!(hi - lo, 11);
    }
}
