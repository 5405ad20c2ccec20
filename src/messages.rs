use serde::{Deserialize, Serialize};

use crate::models::{MeetSlot, Notification, ReportKind, ReportStatus, User};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLogin {
    pub roll_no: String,
}

#[derive(Deserialize)]
pub struct AdminLogin {
    pub id: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionReply {
    pub token: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Deserialize)]
pub struct SubmitReport {
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateReportStatus {
    pub status: ReportStatus,
}

#[derive(Deserialize)]
pub struct ReportFilter {
    #[serde(rename = "type")]
    pub kind: Option<ReportKind>,
}

#[derive(Deserialize)]
pub struct OfferSlots {
    pub slots: Vec<MeetSlot>,
}

#[derive(Deserialize)]
pub struct BookSlot {
    pub slot: MeetSlot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    pub roll_no: Option<String>,
}

#[derive(Deserialize)]
pub struct MarkRead {
    pub read: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NotificationFeed {
    pub unread: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MarkedRead {
    pub updated: usize,
}

#[derive(Deserialize)]
pub struct FeedAuth {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorReply {
    pub message: String,
}

/// Frames pushed over the live notification socket.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum FeedMessage {
    #[serde(rename = "notification")]
    Notification { notification: Notification },
    #[serde(rename = "error")]
    Error { message: String },
}
