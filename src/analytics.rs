//! Revenue and salary aggregates over monthly records.
//!
//! Nothing here rounds; presentation decides how many digits to show.

use serde::{Deserialize, Serialize};

use crate::center::CenterId;
use crate::period::{Period, PeriodRange, CALENDAR_MONTHS};
use crate::record::MonthlyRecord;

/// Salary should stay at or below this share of revenue.
pub const SALARY_CAP_RATIO: f64 = 0.299;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_revenue: f64,
    pub total_salary: f64,
    /// `total_salary / total_revenue`, or 0 without revenue.
    pub salary_ratio: f64,
    /// Highest salary spend the revenue supports.
    pub recommended_salary_cap: f64,
    /// Revenue needed for the salary actually paid to sit at the cap.
    pub revenue_target: f64,
    /// Number of monthly records aggregated.
    pub months: usize,
}

impl Summary {
    pub fn of<'a>(records: impl IntoIterator<Item = &'a MonthlyRecord>) -> Self {
        let (total_revenue, total_salary, months) = records
            .into_iter()
            .fold((0.0, 0.0, 0), |(rev, sal, n), r| {
                (rev + r.revenue, sal + r.total_salary, n + 1)
            });

        Self::from_totals(total_revenue, total_salary, months)
    }

    pub fn from_totals(total_revenue: f64, total_salary: f64, months: usize) -> Self {
        Self {
            total_revenue,
            total_salary,
            salary_ratio: ratio(total_salary, total_revenue),
            recommended_salary_cap: salary_cap(total_revenue),
            revenue_target: revenue_target(total_salary),
            months,
        }
    }
}

pub fn salary_cap(revenue: f64) -> f64 {
    SALARY_CAP_RATIO * revenue
}

pub fn revenue_target(salary: f64) -> f64 {
    if salary > 0.0 {
        salary / SALARY_CAP_RATIO
    } else {
        0.0
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

/// Sums the records of `center` (or every center) that fall in `range`.
///
/// Months without a record are absent from the sums and the month count.
pub fn compute_summary(
    records: &[MonthlyRecord],
    center: Option<CenterId>,
    range: PeriodRange,
) -> Summary {
    Summary::of(
        records
            .iter()
            .filter(|r| center.map_or(true, |c| r.center_id == c))
            .filter(|r| range.contains(r.period())),
    )
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthReport {
    pub month: u8,
    pub name: &'static str,
    /// Records found for the month; 0 means the figures are placeholders.
    pub records: usize,
    pub revenue: f64,
    pub salary: f64,
    pub salary_ratio: f64,
    pub revenue_target: f64,
    pub profit: f64,
    /// `revenue / revenue_target`
    pub achievement: f64,
    /// Change in revenue relative to the previous month.
    pub growth: f64,
    pub is_selected: bool,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, PartialEq)]
pub struct YearReport {
    pub year: i32,
    pub center_id: Option<CenterId>,
    pub months: Vec<MonthReport>,
    pub summary: Summary,
    pub selected: SelectedMonths,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SelectedMonths {
    pub count: usize,
    pub revenue: f64,
    pub salary: f64,
    pub average_revenue: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct QueryReport {
    pub year: Option<i32>,
    pub center: Option<CenterId>,
    /// Comma separated month names or numbers; empty selects all.
    pub months: Option<String>,
}

/// Parses "January,Mar,7" style month lists into month numbers.
pub fn parse_months(s: &str) -> Result<Vec<u8>, &'static str> {
    let mut months = vec![];

    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let month = match part.parse::<u8>() {
            Ok(n) if (1..=12).contains(&n) => n,
            Ok(_) => return Err("month must be between 1 and 12"),
            Err(_) => CALENDAR_MONTHS
                .iter()
                .position(|name| {
                    name.eq_ignore_ascii_case(part)
                        || (part.len() >= 3 && name[..3].eq_ignore_ascii_case(part))
                })
                .map(|i| i as u8 + 1)
                .ok_or("unknown month name")?,
        };

        if !months.contains(&month) {
            months.push(month);
        }
    }

    Ok(months)
}

/// Month by month figures for `year`, summed over all centers unless one is given.
///
/// `selected` restricts the averages; an empty selection means every month.
pub fn year_report(
    records: &[MonthlyRecord],
    year: i32,
    center: Option<CenterId>,
    selected: &[u8],
) -> YearReport {
    let in_scope: Vec<&MonthlyRecord> = records
        .iter()
        .filter(|r| r.year == year)
        .filter(|r| center.map_or(true, |c| r.center_id == c))
        .collect();

    let mut months = Vec::with_capacity(12);
    let mut prev_revenue = None;

    for month in 1..=12u8 {
        let month_summary = Summary::of(
            in_scope
                .iter()
                .copied()
                .filter(|r| r.month == month as i32),
        );

        let revenue = month_summary.total_revenue;
        let salary = month_summary.total_salary;
        let growth = match prev_revenue {
            Some(prev) if prev > 0.0 => (revenue - prev) / prev,
            _ => 0.0,
        };
        prev_revenue = Some(revenue);

        months.push(MonthReport {
            month,
            name: Period { year, month }.month_name(),
            records: month_summary.months,
            revenue,
            salary,
            salary_ratio: month_summary.salary_ratio,
            revenue_target: month_summary.revenue_target,
            profit: revenue - salary,
            achievement: ratio(revenue, month_summary.revenue_target),
            growth,
            is_selected: selected.is_empty() || selected.contains(&month),
        });
    }

    let (count, sel_revenue, sel_salary) = months
        .iter()
        .filter(|m| m.is_selected)
        .fold((0, 0.0, 0.0), |(n, rev, sal), m| {
            (n + 1, rev + m.revenue, sal + m.salary)
        });

    YearReport {
        year,
        center_id: center,
        summary: Summary::of(in_scope.iter().copied()),
        selected: SelectedMonths {
            count,
            revenue: sel_revenue,
            salary: sel_salary,
            average_revenue: if count > 0 {
                sel_revenue / count as f64
            } else {
                0.0
            },
        },
        months,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(center_id: CenterId, year: i32, month: i32, revenue: f64, salary: f64) -> MonthlyRecord {
        MonthlyRecord {
            id: 0,
            center_id,
            year,
            month,
            revenue,
            total_salary: salary,
        }
    }

    fn range(from: &str, to: &str) -> PeriodRange {
        PeriodRange::between(from.parse::<Period>().unwrap(), to.parse().unwrap())
    }

    #[test]
    fn north_center_example() {
        let records = [
            record(1, 2026, 1, 10000.0, 2500.0),
            record(1, 2026, 2, 12000.0, 3200.0),
        ];

        let s = compute_summary(&records, Some(1), range("2026-01", "2026-02"));

        assert_eq!(s.total_revenue, 22000.0);
        assert_eq!(s.total_salary, 5700.0);
        assert!((s.salary_ratio - 0.2591).abs() < 1e-4);
        assert!((s.recommended_salary_cap - 6578.0).abs() < 1e-9);
        assert_eq!(s.months, 2);
    }

    #[test]
    fn ratio_and_cap_properties() {
        let revenues = [0.0, 0.01, 1.0, 999.99, 22000.0, 1e9];
        let salaries = [0.0, 0.5, 2500.0, 1e7];

        for &r in &revenues {
            for &s in &salaries {
                let summary = Summary::from_totals(r, s, 1);

                if r > 0.0 {
                    assert_eq!(summary.salary_ratio, s / r);
                } else {
                    assert_eq!(summary.salary_ratio, 0.0);
                }
                assert_eq!(summary.recommended_salary_cap, 0.299 * r);
                assert!(!summary.salary_ratio.is_nan());
            }
        }
    }

    #[test]
    fn zero_revenue() {
        let s = compute_summary(&[record(1, 2026, 1, 0.0, 1500.0)], None, PeriodRange::default());

        assert_eq!(s.salary_ratio, 0.0);
        assert_eq!(s.recommended_salary_cap, 0.0);
        assert_eq!(s.revenue_target, 1500.0 / 0.299);

        let empty = compute_summary(&[], None, PeriodRange::default());
        assert_eq!(empty, Summary::default());
    }

    #[test]
    fn range_and_center_selection() {
        let records = [
            record(1, 2025, 12, 100.0, 10.0),
            record(1, 2026, 1, 200.0, 20.0),
            // March missing
            record(1, 2026, 4, 400.0, 40.0),
            record(1, 2026, 5, 500.0, 50.0),
            record(2, 2026, 1, 1000.0, 100.0),
        ];

        let s = compute_summary(&records, Some(1), range("2026-01", "2026-04"));
        assert_eq!(s.total_revenue, 600.0);
        assert_eq!(s.months, 2);

        let all_centers = compute_summary(&records, None, range("2026-01", "2026-01"));
        assert_eq!(all_centers.total_revenue, 1200.0);
        assert_eq!(all_centers.total_salary, 120.0);

        let open_start = PeriodRange {
            from: None,
            to: Some("2026-01".parse().unwrap()),
        };
        assert_eq!(compute_summary(&records, Some(1), open_start).total_revenue, 300.0);
    }

    #[test]
    fn month_lists() {
        assert_eq!(parse_months("January, mar,7").unwrap(), vec![1, 3, 7]);
        assert_eq!(parse_months("").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_months("2,2,February").unwrap(), vec![2]);
        assert!(parse_months("13").is_err());
        assert!(parse_months("Smarch").is_err());
    }

    #[test]
    fn year_report_by_month() {
        let records = [
            record(1, 2026, 1, 1000.0, 299.0),
            record(2, 2026, 1, 1000.0, 0.0),
            record(1, 2026, 2, 3000.0, 598.0),
            record(1, 2026, 4, 1500.0, 0.0),
            record(1, 2025, 1, 99999.0, 0.0),
        ];

        let report = year_report(&records, 2026, None, &[1, 2]);
        assert_eq!(report.months.len(), 12);

        let jan = &report.months[0];
        assert_eq!(jan.name, "January");
        assert_eq!(jan.records, 2);
        assert_eq!(jan.revenue, 2000.0);
        assert_eq!(jan.profit, 1701.0);
        assert_eq!(jan.growth, 0.0);
        assert_eq!(jan.revenue_target, 299.0 / 0.299);

        let feb = &report.months[1];
        assert_eq!(feb.growth, 0.5);
        assert!(feb.is_selected);

        let mar = &report.months[2];
        assert_eq!(mar.records, 0);
        assert_eq!(mar.growth, -1.0);
        assert!(!mar.is_selected);

        // March had no revenue to grow from
        assert_eq!(report.months[3].growth, 0.0);
        assert_eq!(report.months[3].achievement, 0.0);

        assert_eq!(report.summary.total_revenue, 6500.0);
        assert_eq!(report.summary.months, 4);
        assert_eq!(report.selected.count, 2);
        assert_eq!(report.selected.revenue, 5000.0);
        assert_eq!(report.selected.average_revenue, 2500.0);

        let center_two = year_report(&records, 2026, Some(2), &[]);
        assert_eq!(center_two.summary.total_revenue, 1000.0);
        assert_eq!(center_two.selected.count, 12);
    }
}
