//! Combined attendance across two sections of one course.
//!
//! Only absences are read from the records. The number of classes held is
//! supplied by the caller.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::class_code::is_valid_class_code;
use crate::error::ClassError;
use crate::metrics::{round_to_tenth, AT_RISK_BELOW};
use crate::models::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub roll: String,
    pub absences: u32,
    pub attended: u32,
    pub percentage: f64,
    pub shortfall: bool,
}

pub fn validate_request(
    current_code: &str,
    partner_code: &str,
    total_classes: i64,
) -> Result<u32, ClassError> {
    if !is_valid_class_code(partner_code) {
        return Err(ClassError::InvalidCode(partner_code.to_string()));
    }
    if partner_code == current_code {
        return Err(ClassError::SelfCombination(partner_code.to_string()));
    }
    u32::try_from(total_classes)
        .ok()
        .filter(|total| *total >= 1)
        .ok_or(ClassError::InvalidTotal(total_classes))
}

pub fn combine_absences(
    current: &[AttendanceRecord],
    partner: &[AttendanceRecord],
    roster: &[String],
    total_classes: u32,
) -> Vec<CombinedRow> {
    let mut absences: HashMap<&str, u32> = roster.iter().map(|r| (r.as_str(), 0)).collect();
    for record in current.iter().chain(partner) {
        if record.status != AttendanceStatus::Absent {
            continue;
        }
        if let Some(count) = absences.get_mut(record.student_id.as_str()) {
            *count += 1;
        }
    }

    let mut rows: Vec<CombinedRow> = absences
        .into_iter()
        .map(|(roll, absent)| {
            let attended = total_classes.saturating_sub(absent);
            let percentage = if total_classes == 0 {
                0.0
            } else {
                round_to_tenth(f64::from(attended) / f64::from(total_classes) * 100.0)
            };
            CombinedRow {
                roll: roll.to_string(),
                absences: absent,
                attended,
                percentage,
                shortfall: percentage < AT_RISK_BELOW,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.roll.cmp(&b.roll));
    rows
}

pub fn paginate(rows: &[CombinedRow], per_page: usize) -> Vec<&[CombinedRow]> {
    rows.chunks(per_page.max(1)).collect()
}

pub fn write_csv<W: Write>(rows: &[CombinedRow], out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "SL. No.",
        "Roll No.",
        "Total Number of Attendance",
        "Percentage of Attendance",
    ])?;
    for (i, row) in rows.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            row.roll.clone(),
            row.attended.to_string(),
            format!("{:.1}%", row.percentage),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
