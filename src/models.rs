use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{ClassError, DateError, StatusError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn from_code(code: &str) -> Result<Self, StatusError> {
        match code.trim() {
            "P" | "p" => Ok(Self::Present),
            "A" | "a" => Ok(Self::Absent),
            "L" | "l" => Ok(Self::Late),
            other => Err(StatusError::Unknown(other.to_string())),
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Present => 'P',
            Self::Absent => 'A',
            Self::Late => 'L',
        }
    }

    /// Contribution to presence: late counts as half.
    pub fn presence_weight(self) -> f64 {
        match self {
            Self::Present => 1.0,
            Self::Late => 0.5,
            Self::Absent => 0.0,
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub taken_at: DateTime<FixedOffset>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn new(
        student_id: impl Into<String>,
        taken_at: DateTime<FixedOffset>,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            taken_at,
            status,
        }
    }

    /// Record stamped at midnight UTC of a stored calendar day.
    pub fn on_date(
        student_id: impl Into<String>,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        Self::new(student_id, midnight(date), status)
    }

    /// Calendar-day key of the record, in the offset it was written with.
    pub fn session_date(&self) -> NaiveDate {
        self.taken_at.date_naive()
    }
}

pub fn midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::MIN).and_utc().fixed_offset()
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_taken_at(raw: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let trimmed = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(stamp);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(midnight)
        .map_err(|_| DateError::Unparseable(raw.to_string()))
}

/// Roll range configuration stored with each class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassConfig {
    pub starting_roll: String,
    pub ending_roll: String,
    pub excluded_rolls: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassRecord {
    pub id: Uuid,
    pub class_code: String,
    pub owner: String,
    pub course_code: String,
    pub course_name: String,
    pub batch: String,
    pub config: ClassConfig,
}

#[derive(Debug, Clone)]
pub struct NewClass {
    pub course_code: String,
    pub course_name: String,
    pub batch: String,
    pub config: ClassConfig,
}

impl NewClass {
    pub fn validate(&self) -> Result<(), ClassError> {
        let required = [
            ("course code", &self.course_code),
            ("course name", &self.course_name),
            ("batch", &self.batch),
            ("starting roll", &self.config.starting_roll),
            ("ending roll", &self.config.ending_roll),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ClassError::MissingField(field));
            }
        }
        Ok(())
    }
}
