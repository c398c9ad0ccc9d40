use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{aggregate, Aggregation, DailyTally, StudentTally};
use crate::models::AttendanceRecord;

/// Percentage below which a student is at risk.
pub const AT_RISK_BELOW: f64 = 60.0;

/// Marks awarded per attendance percentage, highest threshold first.
const MARK_BANDS: [(f64, u32); 7] = [
    (90.0, 100),
    (85.0, 90),
    (80.0, 80),
    (75.0, 70),
    (70.0, 60),
    (65.0, 50),
    (60.0, 40),
];

/// Rounds on the exact decimal value of `value`; exact halves round up.
pub fn round_to_tenth(value: f64) -> f64 {
    // Only odd multiples of 0.25 sit exactly on a .x5 boundary.
    let quarters = value * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        return (value * 10.0).round() / 10.0;
    }
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Late counts as half present. Zero sessions yields 0.0.
pub fn percentage(tally: &StudentTally) -> f64 {
    if tally.total == 0 {
        return 0.0;
    }
    round_to_tenth(tally.effective_present() / f64::from(tally.total) * 100.0)
}

pub fn marks_for(percentage: f64) -> u32 {
    MARK_BANDS
        .iter()
        .find(|(threshold, _)| percentage >= *threshold)
        .map(|(_, marks)| *marks)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub student_id: String,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub total: u32,
    pub percentage: f64,
    pub marks: u32,
}

impl From<&StudentTally> for StudentStats {
    fn from(tally: &StudentTally) -> Self {
        let percentage = percentage(tally);
        Self {
            student_id: tally.student_id.clone(),
            present: tally.present,
            absent: tally.absent,
            late: tally.late,
            total: tally.total,
            percentage,
            marks: marks_for(percentage),
        }
    }
}

pub fn student_stats(aggregation: &Aggregation) -> Vec<StudentStats> {
    aggregation.students.iter().map(StudentStats::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Excellent,
    Good,
    Average,
    Poor,
    Critical,
}

impl Band {
    pub const ALL: [Band; 5] = [
        Band::Excellent,
        Band::Good,
        Band::Average,
        Band::Poor,
        Band::Critical,
    ];

    pub fn classify(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Band::Excellent
        } else if percentage >= 80.0 {
            Band::Good
        } else if percentage >= 70.0 {
            Band::Average
        } else if percentage >= AT_RISK_BELOW {
            Band::Poor
        } else {
            Band::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Excellent => "90-100%",
            Band::Good => "80-89%",
            Band::Average => "70-79%",
            Band::Poor => "60-69%",
            Band::Critical => "Below 60%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandCount {
    pub band: Band,
    pub label: &'static str,
    pub count: usize,
}

/// Students per band, best band first, empty bands omitted.
pub fn distribution(stats: &[StudentStats]) -> Vec<BandCount> {
    let mut counts = [0usize; 5];
    for student in stats {
        let band = Band::classify(student.percentage);
        if let Some(slot) = Band::ALL.iter().position(|b| *b == band) {
            counts[slot] += 1;
        }
    }
    Band::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(band, count)| BandCount {
            band: *band,
            label: band.label(),
            count,
        })
        .collect()
}

/// Students at exactly 100%, ordered by id as strings.
pub fn perfect_attendance(stats: &[StudentStats]) -> Vec<StudentStats> {
    let mut perfect: Vec<StudentStats> = stats
        .iter()
        .filter(|s| s.percentage == 100.0)
        .cloned()
        .collect();
    perfect.sort_by(|a, b| a.student_id.cmp(&b.student_id));
    perfect
}

/// Students below 60%, lowest first. Ties keep roster order.
pub fn at_risk(stats: &[StudentStats]) -> Vec<StudentStats> {
    let mut risky: Vec<StudentStats> = stats
        .iter()
        .filter(|s| s.percentage < AT_RISK_BELOW)
        .cloned()
        .collect();
    risky.sort_by(|a, b| a.percentage.total_cmp(&b.percentage));
    risky
}

/// Weighted presence over every record, on or off the roster.
fn effective_present_total(aggregation: &Aggregation) -> f64 {
    aggregation
        .daily
        .iter()
        .map(DailyTally::effective_present)
        .sum()
}

/// Weighted presence over every roster seat of every session.
pub fn overall_rate(aggregation: &Aggregation) -> f64 {
    let seats = aggregation.session_count() * aggregation.roster_size();
    if seats == 0 {
        return 0.0;
    }
    round_to_tenth(effective_present_total(aggregation) / seats as f64 * 100.0)
}

pub fn average_daily_attendance(aggregation: &Aggregation) -> f64 {
    let sessions = aggregation.session_count();
    if sessions == 0 {
        return 0.0;
    }
    round_to_tenth(effective_present_total(aggregation) / sessions as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPresence {
    pub date: NaiveDate,
    /// Present plus half of late, unrounded.
    pub present: f64,
    pub total_students: usize,
}

impl DailyPresence {
    pub fn present_rounded(&self) -> i64 {
        self.present.round() as i64
    }
}

pub fn date_wise_series(aggregation: &Aggregation) -> Vec<DailyPresence> {
    aggregation
        .daily
        .iter()
        .map(|day| DailyPresence {
            date: day.date,
            present: day.effective_present(),
            total_students: aggregation.roster_size(),
        })
        .collect()
}

/// The last `window` entries of an ascending series.
pub fn recent(series: &[DailyPresence], window: usize) -> &[DailyPresence] {
    &series[series.len().saturating_sub(window)..]
}

/// Everything the analytics views and exporters read for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAnalytics {
    pub total_sessions: usize,
    pub total_students: usize,
    pub overall_rate: f64,
    pub average_daily_attendance: f64,
    pub students: Vec<StudentStats>,
    pub date_wise: Vec<DailyPresence>,
    pub distribution: Vec<BandCount>,
    pub perfect_attendance: Vec<StudentStats>,
    pub at_risk: Vec<StudentStats>,
}

impl ClassAnalytics {
    pub fn compute(records: &[AttendanceRecord], roster: &[String]) -> Self {
        Self::from_aggregation(&aggregate(records, roster))
    }

    pub fn from_aggregation(aggregation: &Aggregation) -> Self {
        let students = student_stats(aggregation);
        Self {
            total_sessions: aggregation.session_count(),
            total_students: aggregation.roster_size(),
            overall_rate: overall_rate(aggregation),
            average_daily_attendance: average_daily_attendance(aggregation),
            date_wise: date_wise_series(aggregation),
            distribution: distribution(&students),
            perfect_attendance: perfect_attendance(&students),
            at_risk: at_risk(&students),
            students,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;

    fn tally(id: &str, present: u32, absent: u32, late: u32, total: u32) -> StudentTally {
        StudentTally {
            student_id: id.to_string(),
            present,
            absent,
            late,
            total,
        }
    }

    fn stats(id: &str, pct: f64) -> StudentStats {
        StudentStats {
            student_id: id.to_string(),
            present: 0,
            absent: 0,
            late: 0,
            total: 0,
            percentage: pct,
            marks: marks_for(pct),
        }
    }

    #[test]
    fn late_counts_half() {
        assert_eq!(percentage(&tally("1", 1, 0, 1, 2)), 75.0);
        assert_eq!(percentage(&tally("1", 0, 2, 1, 3)), 16.7);
    }

    #[test]
    fn zero_sessions_is_zero_percent_and_no_marks() {
        let t = tally("1", 0, 0, 0, 0);
        let s = StudentStats::from(&t);
        assert_eq!(s.percentage, 0.0);
        assert_eq!(s.marks, 0);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(&tally("1", 2, 1, 0, 3)), 66.7);
        assert_eq!(percentage(&tally("1", 1, 2, 0, 3)), 33.3);
    }

    #[test]
    fn marks_follow_threshold_table() {
        assert_eq!(marks_for(100.0), 100);
        assert_eq!(marks_for(90.0), 100);
        assert_eq!(marks_for(89.9), 90);
        assert_eq!(marks_for(85.0), 90);
        assert_eq!(marks_for(80.0), 80);
        assert_eq!(marks_for(75.0), 70);
        assert_eq!(marks_for(70.0), 60);
        assert_eq!(marks_for(65.0), 50);
        assert_eq!(marks_for(60.0), 40);
        assert_eq!(marks_for(59.9), 0);
        assert_eq!(marks_for(0.0), 0);
    }

    #[test]
    fn distribution_omits_empty_bands() {
        let students = vec![stats("1", 95.0), stats("2", 90.0), stats("3", 42.0)];
        let bands = distribution(&students);
        assert_eq!(
            bands,
            vec![
                BandCount { band: Band::Excellent, label: "90-100%", count: 2 },
                BandCount { band: Band::Critical, label: "Below 60%", count: 1 },
            ]
        );
    }

    #[test]
    fn band_edges_fall_into_upper_band() {
        assert_eq!(Band::classify(80.0), Band::Good);
        assert_eq!(Band::classify(79.9), Band::Average);
        assert_eq!(Band::classify(60.0), Band::Poor);
        assert_eq!(Band::classify(59.9), Band::Critical);
    }

    #[test]
    fn perfect_attendance_sorts_as_strings() {
        let students = vec![stats("9", 100.0), stats("100", 100.0), stats("10", 99.9)];
        let ids: Vec<String> = perfect_attendance(&students)
            .into_iter()
            .map(|s| s.student_id)
            .collect();
        assert_eq!(ids, vec!["100", "9"]);
    }

    #[test]
    fn at_risk_sorts_by_percentage_keeping_roster_order_on_ties() {
        let students = vec![
            stats("1", 50.0),
            stats("2", 10.0),
            stats("3", 60.0),
            stats("4", 50.0),
        ];
        let ids: Vec<String> = at_risk(&students).into_iter().map(|s| s.student_id).collect();
        assert_eq!(ids, vec!["2", "1", "4"]);
    }

    #[test]
    fn rounding_follows_exact_decimal_value() {
        // 0.15 and 0.35 are stored just below the halfway point.
        assert_eq!(round_to_tenth(0.15), 0.1);
        assert_eq!(round_to_tenth(0.35), 0.3);
        assert_eq!(round_to_tenth(0.25), 0.3);
        assert_eq!(round_to_tenth(68.75), 68.8);
        assert_eq!(round_to_tenth(2.75), 2.8);
        assert_eq!(round_to_tenth(16.666_666_666_666_668), 16.7);
        assert_eq!(round_to_tenth(100.0), 100.0);
        assert_eq!(round_to_tenth(0.0), 0.0);
    }

    #[test]
    fn class_rates_count_records_outside_the_roster() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 7).unwrap();
        let records = vec![
            AttendanceRecord::on_date("1", date, AttendanceStatus::Present),
            AttendanceRecord::on_date("99", date, AttendanceStatus::Present),
        ];
        let roster = vec!["1".to_string(), "2".to_string()];
        let aggregation = aggregate(&records, &roster);

        let series_total: f64 = date_wise_series(&aggregation).iter().map(|d| d.present).sum();
        assert_eq!(series_total, 2.0);
        assert_eq!(average_daily_attendance(&aggregation), 2.0);
        assert_eq!(overall_rate(&aggregation), 100.0);
    }

    #[test]
    fn rates_guard_empty_denominators() {
        let empty = Aggregation::default();
        assert_eq!(overall_rate(&empty), 0.0);
        assert_eq!(average_daily_attendance(&empty), 0.0);
    }

    #[test]
    fn recent_keeps_tail_of_series() {
        let series: Vec<DailyPresence> = (1..=5)
            .map(|d| DailyPresence {
                date: NaiveDate::from_ymd_opt(2025, 4, d).unwrap(),
                present: f64::from(d),
                total_students: 5,
            })
            .collect();
        let tail = recent(&series, 2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].date, NaiveDate::from_ymd_opt(2025, 4, 4).unwrap());
        assert_eq!(recent(&series, 30).len(), 5);
    }

    #[test]
    fn daily_presence_rounds_half_up() {
        let day = DailyPresence {
            date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            present: 2.5,
            total_students: 4,
        };
        assert_eq!(day.present_rounded(), 3);
    }
}
