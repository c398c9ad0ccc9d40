use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentTally {
    pub student_id: String,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    /// Sessions held by the class, not records held by the student.
    pub total: u32,
}

impl StudentTally {
    fn empty(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            ..Self::default()
        }
    }

    fn count(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
        }
    }

    pub fn recorded(&self) -> u32 {
        self.present + self.absent + self.late
    }

    /// Present plus half of late.
    pub fn effective_present(&self) -> f64 {
        weighted_presence(self.present, self.late)
    }
}

/// Status counts for one session across every record on that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTally {
    pub date: NaiveDate,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
}

impl DailyTally {
    pub fn effective_present(&self) -> f64 {
        weighted_presence(self.present, self.late)
    }
}

fn weighted_presence(present: u32, late: u32) -> f64 {
    f64::from(present) * AttendanceStatus::Present.presence_weight()
        + f64::from(late) * AttendanceStatus::Late.presence_weight()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    /// One entry per roster id, in roster order.
    pub students: Vec<StudentTally>,
    /// Distinct session dates, ascending.
    pub session_dates: Vec<NaiveDate>,
    /// One entry per session date, ascending.
    pub daily: Vec<DailyTally>,
}

impl Aggregation {
    pub fn session_count(&self) -> usize {
        self.session_dates.len()
    }

    pub fn roster_size(&self) -> usize {
        self.students.len()
    }

    pub fn get(&self, student_id: &str) -> Option<&StudentTally> {
        self.students.iter().find(|s| s.student_id == student_id)
    }
}

/// Folds raw records into per-student and per-date counts.
///
/// Records are keyed by calendar day. When a student has several records on
/// the same day the last one in input order wins. Records for ids outside
/// the roster still mark their date as a session.
pub fn aggregate(records: &[AttendanceRecord], roster: &[String]) -> Aggregation {
    let mut by_session: BTreeMap<(NaiveDate, &str), AttendanceStatus> = BTreeMap::new();
    let mut duplicates = 0usize;
    for record in records {
        let key = (record.session_date(), record.student_id.as_str());
        if by_session.insert(key, record.status).is_some() {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        warn!(duplicates, "duplicate student/date records, keeping the last of each");
    }

    let index: HashMap<&str, usize> = roster
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut students: Vec<StudentTally> =
        roster.iter().map(|id| StudentTally::empty(id)).collect();
    let mut daily: Vec<DailyTally> = Vec::new();
    let mut outside_roster = 0usize;

    for (&(date, student_id), &status) in &by_session {
        if daily.last().map(|d| d.date) != Some(date) {
            daily.push(DailyTally {
                date,
                present: 0,
                absent: 0,
                late: 0,
            });
        }
        if let Some(day) = daily.last_mut() {
            match status {
                AttendanceStatus::Present => day.present += 1,
                AttendanceStatus::Absent => day.absent += 1,
                AttendanceStatus::Late => day.late += 1,
            }
        }

        match index.get(student_id) {
            Some(&i) => students[i].count(status),
            None => outside_roster += 1,
        }
    }
    if outside_roster > 0 {
        debug!(outside_roster, "ignored records for ids outside the roster");
    }

    let session_dates: Vec<NaiveDate> = daily.iter().map(|d| d.date).collect();
    let total = u32::try_from(session_dates.len()).unwrap_or(u32::MAX);
    for student in &mut students {
        student.total = total;
    }

    Aggregation {
        students,
        session_dates,
        daily,
    }
}
