use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;

/// Session value produced by a successful student login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub roll_no: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub roll_no: String,
    pub name: String,
    pub class: String,
    pub department: String,
    pub year: String,
}

impl Student {
    pub fn user(&self) -> User {
        User {
            roll_no: self.roll_no.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub roll_no: String,
    pub name: String,
    pub class: String,
    pub department: String,
    pub year: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Report,
    Emergency,
}

impl ReportKind {
    pub fn id_prefix(self) -> &'static str {
        match self {
            ReportKind::Report => "report",
            ReportKind::Emergency => "emergency",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id_prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl ReportStatus {
    fn rank(self) -> u8 {
        match self {
            ReportStatus::Pending => 0,
            ReportStatus::InProgress => 1,
            ReportStatus::Resolved => 2,
        }
    }

    /// Report statuses only ever move forward.
    pub fn can_advance_to(self, next: ReportStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Resolved => "Resolved",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub roll_no: String,
    pub student_name: String,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetStatus {
    Pending,
    Offered,
    Booked,
    Resolved,
}

impl fmt::Display for MeetStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetSlot {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetRequest {
    pub id: String,
    pub roll_no: String,
    pub student_name: String,
    pub department: String,
    pub faculty: String,
    pub preferred_dates: Vec<String>,
    pub time_range: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: MeetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_slots: Option<Vec<MeetSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_slot: Option<MeetSlot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeetRequest {
    pub department: String,
    pub faculty: String,
    pub preferred_dates: Vec<String>,
    pub time_range: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Report,
    Emergency,
    Meeting,
    Admin,
}

impl From<ReportKind> for NotificationKind {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Report => NotificationKind::Report,
            ReportKind::Emergency => NotificationKind::Emergency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub roll_no: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyMember {
    pub id: String,
    pub name: String,
    pub title: String,
    pub department: String,
    pub subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

/// Faculty form input; `subjects` is the raw comma-separated list.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFaculty {
    pub name: String,
    pub title: String,
    pub department: String,
    pub subjects: String,
}
