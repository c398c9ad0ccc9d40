//! Property tests for roster expansion, aggregation and metrics.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use roll_call::aggregate::{aggregate, StudentTally};
use roll_call::metrics::{percentage, ClassAnalytics};
use roll_call::models::{AttendanceRecord, AttendanceStatus};
use roll_call::roster::generate_roster;

fn status() -> impl Strategy<Value = AttendanceStatus> {
    prop_oneof![
        Just(AttendanceStatus::Present),
        Just(AttendanceStatus::Absent),
        Just(AttendanceStatus::Late),
    ]
}

fn records(max_roll: u32) -> impl Strategy<Value = Vec<AttendanceRecord>> {
    prop::collection::vec((1..=max_roll, 0u32..40, status()), 0..120).prop_map(|raw| {
        raw.into_iter()
            .map(|(roll, offset, status)| {
                let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                    + chrono::Duration::days(i64::from(offset));
                AttendanceRecord::on_date(roll.to_string(), date, status)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_roster_size_matches_range_minus_exclusions(
        start in 0i64..500,
        len in 0i64..60,
        excluded in prop::collection::btree_set(0i64..600, 0..10),
    ) {
        let end = start + len;
        let excluded_raw = excluded
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let roster = generate_roster(&start.to_string(), &end.to_string(), Some(&excluded_raw));

        let excluded_in_range = excluded.iter().filter(|n| (start..=end).contains(*n)).count();
        prop_assert_eq!(roster.len() as i64, end - start + 1 - excluded_in_range as i64);

        let unique: BTreeSet<&String> = roster.iter().collect();
        prop_assert_eq!(unique.len(), roster.len());
        for id in &roster {
            let n: i64 = id.parse().unwrap();
            prop_assert!((start..=end).contains(&n));
            prop_assert!(!excluded.contains(&n));
        }
    }

    #[test]
    fn prop_session_dates_are_distinct_record_dates(records in records(12)) {
        let roster = generate_roster("1", "8", None);
        let aggregation = aggregate(&records, &roster);

        let expected: Vec<NaiveDate> = records
            .iter()
            .map(AttendanceRecord::session_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(&aggregation.session_dates, &expected);

        for student in &aggregation.students {
            prop_assert_eq!(student.total as usize, expected.len());
            prop_assert!(student.recorded() <= student.total);
        }
    }

    #[test]
    fn prop_percentage_monotonic_in_effective_presence(
        total in 1u32..50,
        a in (0u32..50, 0u32..50),
        b in (0u32..50, 0u32..50),
    ) {
        let make = |(present, late): (u32, u32)| {
            let present = present.min(total);
            let late = late.min(total - present);
            StudentTally {
                student_id: "1".to_string(),
                present,
                absent: total - present - late,
                late,
                total,
            }
        };
        let (x, y) = (make(a), make(b));
        if x.effective_present() <= y.effective_present() {
            prop_assert!(percentage(&x) <= percentage(&y));
        } else {
            prop_assert!(percentage(&x) >= percentage(&y));
        }
        prop_assert!((0.0..=100.0).contains(&percentage(&x)));
    }

    #[test]
    fn prop_analytics_is_idempotent(records in records(10)) {
        let roster = generate_roster("1", "10", Some("4, 7"));
        let first = ClassAnalytics::compute(&records, &roster);
        let second = ClassAnalytics::compute(&records, &roster);
        prop_assert_eq!(first, second);
    }
}
