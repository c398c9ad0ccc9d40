use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::StudentTally;
use crate::metrics::{marks_for, percentage};
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::SHEET_MAX_SESSIONS;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRow {
    pub serial: usize,
    pub roll: String,
    pub cells: Vec<AttendanceStatus>,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub percentage: f64,
    pub marks: u32,
}

/// Printable roll sheet: one column per session, one row per roster id.
///
/// Unlike the analytics view, an unmarked cell reads as present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSheet {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<SheetRow>,
}

impl AttendanceSheet {
    pub fn build(records: &[AttendanceRecord], roster: &[String]) -> Self {
        let dates: Vec<NaiveDate> = records
            .iter()
            .map(AttendanceRecord::session_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(SHEET_MAX_SESSIONS)
            .collect();

        let mut marked: HashMap<(&str, NaiveDate), AttendanceStatus> = HashMap::new();
        for record in records {
            marked.insert((record.student_id.as_str(), record.session_date()), record.status);
        }

        let rows = roster
            .iter()
            .enumerate()
            .map(|(i, roll)| {
                let cells: Vec<AttendanceStatus> = dates
                    .iter()
                    .map(|date| {
                        marked
                            .get(&(roll.as_str(), *date))
                            .copied()
                            .unwrap_or(AttendanceStatus::Present)
                    })
                    .collect();
                let mut tally = StudentTally {
                    student_id: roll.clone(),
                    total: dates.len() as u32,
                    ..StudentTally::default()
                };
                for status in &cells {
                    match status {
                        AttendanceStatus::Present => tally.present += 1,
                        AttendanceStatus::Absent => tally.absent += 1,
                        AttendanceStatus::Late => tally.late += 1,
                    }
                }
                let percentage = percentage(&tally);
                SheetRow {
                    serial: i + 1,
                    roll: roll.clone(),
                    cells,
                    present: tally.present,
                    absent: tally.absent,
                    late: tally.late,
                    percentage,
                    marks: marks_for(percentage),
                }
            })
            .collect();

        Self { dates, rows }
    }

    pub fn write_csv<W: Write>(&self, out: W) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_writer(out);

        let mut header = vec!["SL".to_string(), "Roll No.".to_string()];
        header.extend(self.dates.iter().map(|d| d.format("%d/%m").to_string()));
        header.extend(
            ["Present", "Absent", "Late", "Percentage", "Marks"]
                .iter()
                .map(|s| s.to_string()),
        );
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut fields = vec![row.serial.to_string(), row.roll.clone()];
            fields.extend(row.cells.iter().map(|c| c.to_string()));
            fields.push(row.present.to_string());
            fields.push(row.absent.to_string());
            fields.push(row.late.to_string());
            fields.push(format!("{:.1}%", row.percentage));
            fields.push(row.marks.to_string());
            writer.write_record(&fields)?;
        }

        writer.flush()?;
        Ok(())
    }
}
