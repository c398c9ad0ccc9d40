use std::fmt::Write;

use crate::metrics::{recent, ClassAnalytics, StudentStats};
use crate::models::ClassRecord;

fn write_cohort(output: &mut String, students: &[StudentStats], empty: &str) {
    if students.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for student in students {
        let _ = writeln!(
            output,
            "- Roll {}: {:.1}% (P {}, L {}, A {} of {} sessions)",
            student.student_id,
            student.percentage,
            student.present,
            student.late,
            student.absent,
            student.total
        );
    }
}

pub fn build_report(class: &ClassRecord, analytics: &ClassAnalytics, window: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "{} {} (batch {}, class code {})",
        class.course_code, class.course_name, class.batch, class.class_code
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Sessions held: {}", analytics.total_sessions);
    let _ = writeln!(output, "- Students enrolled: {}", analytics.total_students);
    let _ = writeln!(output, "- Overall attendance rate: {:.1}%", analytics.overall_rate);
    let _ = writeln!(
        output,
        "- Average daily attendance: {:.1}",
        analytics.average_daily_attendance
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Distribution");
    if analytics.distribution.is_empty() {
        let _ = writeln!(output, "No students enrolled.");
    } else {
        for band in &analytics.distribution {
            let _ = writeln!(output, "- {}: {} students", band.label, band.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Perfect Attendance");
    write_cohort(&mut output, &analytics.perfect_attendance, "No students at 100%.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## At Risk (below 60%)");
    write_cohort(&mut output, &analytics.at_risk, "No students below 60%.");

    let trend = recent(&analytics.date_wise, window);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Sessions");
    if trend.is_empty() {
        let _ = writeln!(output, "No sessions recorded.");
    } else {
        for day in trend {
            let _ = writeln!(
                output,
                "- {}: {} of {} present",
                day.date.format("%b %-d"),
                day.present_rounded(),
                day.total_students
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceRecord, AttendanceStatus, ClassConfig};
    use crate::roster::generate_roster;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn class() -> ClassRecord {
        ClassRecord {
            id: Uuid::new_v4(),
            class_code: "K7Q2ZP".to_string(),
            owner: "teacher@example.edu".to_string(),
            course_code: "CSE 3201".to_string(),
            course_name: "Operating Systems".to_string(),
            batch: "2k21".to_string(),
            config: ClassConfig {
                starting_roll: "1".to_string(),
                ending_roll: "3".to_string(),
                excluded_rolls: None,
            },
        }
    }

    #[test]
    fn report_lists_cohorts_and_trend() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let records = vec![
            AttendanceRecord::on_date("1", date, AttendanceStatus::Present),
            AttendanceRecord::on_date("2", date, AttendanceStatus::Late),
            AttendanceRecord::on_date("3", date, AttendanceStatus::Absent),
        ];
        let analytics = ClassAnalytics::compute(&records, &generate_roster("1", "3", None));
        let report = build_report(&class(), &analytics, 30);

        assert!(report.contains("CSE 3201 Operating Systems (batch 2k21, class code K7Q2ZP)"));
        assert!(report.contains("- Overall attendance rate: 50.0%"));
        assert!(report.contains("- Roll 1: 100.0%"));
        assert!(report.contains("- Roll 3: 0.0%"));
        assert!(report.contains("- Mar 9: 2 of 3 present"));
    }

    #[test]
    fn empty_class_report_has_placeholders() {
        let analytics = ClassAnalytics::compute(&[], &[]);
        let report = build_report(&class(), &analytics, 30);
        assert!(report.contains("No students enrolled."));
        assert!(report.contains("No sessions recorded."));
    }
}
