use std::cmp::Reverse;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::error::CampusError;
use crate::models::{
    FacultyMember, MeetRequest, MeetSlot, MeetStatus, NewFaculty, NewMeetRequest, NewStudent,
    Notification, NotificationKind, Report, ReportKind, ReportStatus, Student, User,
};
use crate::schedule::{self, Schedule};
use crate::validation;

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// All collections of one campus. Every mutation goes through a transition
/// method, and every transition that touches a student appends exactly one
/// notification for them.
#[derive(Debug, Clone, Default)]
pub struct CampusState {
    students: Vec<Student>,
    faculty: Vec<FacultyMember>,
    reports: Vec<Report>,
    meetings: Vec<MeetRequest>,
    notifications: Vec<Notification>,
}

impl CampusState {
    pub fn with_roster(students: Vec<Student>, faculty: Vec<FacultyMember>) -> Self {
        CampusState {
            students,
            faculty,
            ..CampusState::default()
        }
    }

    fn notify(&mut self, roll_no: &str, kind: NotificationKind, message: String) {
        self.notifications.push(Notification {
            id: new_id("notif"),
            roll_no: roll_no.to_string(),
            message,
            timestamp: Utc::now(),
            kind,
            read: false,
        });
    }

    fn report_mut(&mut self, report_id: &str) -> Result<&mut Report, CampusError> {
        self.reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| CampusError::not_found("report", report_id))
    }

    fn meeting_mut(&mut self, request_id: &str) -> Result<&mut MeetRequest, CampusError> {
        self.meetings
            .iter_mut()
            .find(|m| m.id == request_id)
            .ok_or_else(|| CampusError::not_found("meeting request", request_id))
    }

    pub fn login_student(&self, roll_no: &str) -> Result<User, CampusError> {
        self.students
            .iter()
            .find(|s| s.roll_no == roll_no)
            .map(Student::user)
            .ok_or_else(|| CampusError::not_found("student", roll_no))
    }

    pub fn submit_report(
        &mut self,
        user: &User,
        kind: ReportKind,
        description: &str,
        location: Option<String>,
    ) -> Result<Report, CampusError> {
        validation::require("description", description)?;

        let report = Report {
            id: new_id(kind.id_prefix()),
            roll_no: user.roll_no.clone(),
            student_name: user.name.clone(),
            kind,
            description: description.to_string(),
            location: location.filter(|l| !l.trim().is_empty()),
            timestamp: Utc::now(),
            status: ReportStatus::Pending,
        };
        self.reports.push(report.clone());

        let what = match kind {
            ReportKind::Report => "issue report",
            ReportKind::Emergency => "emergency request",
        };
        self.notify(
            &user.roll_no,
            kind.into(),
            format!("Your {what} has been submitted and is pending review."),
        );
        info!("{kind} {} submitted by {}", report.id, user.roll_no);
        Ok(report)
    }

    /// Resolves a report from any prior status.
    pub fn resolve_report(&mut self, report_id: &str) -> Result<Report, CampusError> {
        let report = self.report_mut(report_id)?;
        report.status = ReportStatus::Resolved;
        let report = report.clone();

        let what = match report.kind {
            ReportKind::Report => "issue",
            ReportKind::Emergency => "emergency request",
        };
        self.notify(
            &report.roll_no,
            NotificationKind::Admin,
            format!("Your {what} has been resolved."),
        );
        info!("report {report_id} resolved");
        Ok(report)
    }

    pub fn set_report_status(
        &mut self,
        report_id: &str,
        status: ReportStatus,
    ) -> Result<Report, CampusError> {
        let report = self.report_mut(report_id)?;
        if !report.status.can_advance_to(status) {
            return Err(CampusError::transition(report.status, status));
        }
        report.status = status;
        let report = report.clone();

        self.notify(
            &report.roll_no,
            NotificationKind::Admin,
            format!("Your {} status has been updated to: {status}", report.kind),
        );
        info!("report {report_id} moved to {status}");
        Ok(report)
    }

    pub fn submit_meeting(
        &mut self,
        user: &User,
        request: NewMeetRequest,
    ) -> Result<MeetRequest, CampusError> {
        validation::require("department", &request.department)?;
        validation::require("faculty", &request.faculty)?;
        validation::require("time range", &request.time_range)?;
        validation::require("message", &request.message)?;

        let preferred_dates: Vec<String> = request
            .preferred_dates
            .into_iter()
            .filter(|d| !d.trim().is_empty())
            .collect();
        if preferred_dates.is_empty() {
            return Err(CampusError::validation(
                "at least one preferred date is required",
            ));
        }
        for date in &preferred_dates {
            validation::date(date)?;
        }

        let meeting = MeetRequest {
            id: new_id("meet"),
            roll_no: user.roll_no.clone(),
            student_name: user.name.clone(),
            department: request.department,
            faculty: request.faculty,
            preferred_dates,
            time_range: request.time_range,
            message: request.message,
            timestamp: Utc::now(),
            status: MeetStatus::Pending,
            offered_slots: None,
            booked_slot: None,
        };
        self.meetings.push(meeting.clone());

        self.notify(
            &user.roll_no,
            NotificationKind::Meeting,
            format!("Your meeting request with {} has been submitted.", meeting.faculty),
        );
        info!("meeting request {} submitted by {}", meeting.id, user.roll_no);
        Ok(meeting)
    }

    /// Offers slots for a pending request. Re-offering an already offered
    /// request replaces the previous offer.
    pub fn offer_meeting_slots(
        &mut self,
        request_id: &str,
        slots: Vec<MeetSlot>,
    ) -> Result<MeetRequest, CampusError> {
        let slots: Vec<MeetSlot> = slots
            .into_iter()
            .filter(|s| !s.date.trim().is_empty() && !s.time.trim().is_empty())
            .collect();
        if slots.is_empty() {
            return Err(CampusError::validation(
                "at least one slot with a date and a time is required",
            ));
        }
        for slot in &slots {
            validation::date(&slot.date)?;
        }

        let meeting = self.meeting_mut(request_id)?;
        if !matches!(meeting.status, MeetStatus::Pending | MeetStatus::Offered) {
            return Err(CampusError::transition(meeting.status, MeetStatus::Offered));
        }
        meeting.status = MeetStatus::Offered;
        meeting.offered_slots = Some(slots);
        let meeting = meeting.clone();

        self.notify(
            &meeting.roll_no,
            NotificationKind::Meeting,
            format!("{} has offered meeting slots for your request.", meeting.faculty),
        );
        info!("slots offered for meeting request {request_id}");
        Ok(meeting)
    }

    /// Books one of the offered slots on behalf of the requesting student.
    pub fn book_meeting_slot(
        &mut self,
        roll_no: &str,
        request_id: &str,
        slot: MeetSlot,
    ) -> Result<MeetRequest, CampusError> {
        let meeting = self.meeting_mut(request_id)?;
        if meeting.roll_no != roll_no {
            return Err(CampusError::Forbidden);
        }
        if meeting.status != MeetStatus::Offered {
            return Err(CampusError::transition(meeting.status, MeetStatus::Booked));
        }
        let offered = meeting
            .offered_slots
            .as_ref()
            .is_some_and(|offered| offered.contains(&slot));
        if !offered {
            return Err(CampusError::SlotNotOffered);
        }
        meeting.status = MeetStatus::Booked;
        meeting.booked_slot = Some(slot.clone());
        let meeting = meeting.clone();

        self.notify(
            &meeting.roll_no,
            NotificationKind::Meeting,
            format!(
                "Your meeting with {} has been confirmed for {} at {}.",
                meeting.faculty, slot.date, slot.time
            ),
        );
        info!("meeting request {request_id} booked by {roll_no}");
        Ok(meeting)
    }

    pub fn complete_meeting(&mut self, request_id: &str) -> Result<MeetRequest, CampusError> {
        let meeting = self.meeting_mut(request_id)?;
        if meeting.status != MeetStatus::Booked {
            return Err(CampusError::transition(meeting.status, MeetStatus::Resolved));
        }
        meeting.status = MeetStatus::Resolved;
        let meeting = meeting.clone();

        self.notify(
            &meeting.roll_no,
            NotificationKind::Meeting,
            format!("Your meeting with {} has been marked as completed.", meeting.faculty),
        );
        info!("meeting request {request_id} completed");
        Ok(meeting)
    }

    /// Idempotent; the flag never goes back to unread.
    pub fn mark_read(&mut self, notification_id: &str) -> Result<Notification, CampusError> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| CampusError::not_found("notification", notification_id))?;
        notification.read = true;
        Ok(notification.clone())
    }

    pub fn mark_all_read(&mut self, roll_no: &str) -> usize {
        let unread: Vec<String> = self
            .notifications
            .iter()
            .filter(|n| n.roll_no == roll_no && !n.read)
            .map(|n| n.id.clone())
            .collect();

        unread
            .iter()
            .filter(|id| self.mark_read(id).is_ok())
            .count()
    }

    pub fn add_student(&mut self, student: NewStudent) -> Result<Student, CampusError> {
        validation::require("roll number", &student.roll_no)?;
        validation::require("name", &student.name)?;
        validation::require("class", &student.class)?;
        validation::require("department", &student.department)?;
        validation::require("year", &student.year)?;
        validation::roll_no(&student.roll_no)?;

        if self.students.iter().any(|s| s.roll_no == student.roll_no) {
            return Err(CampusError::DuplicateRollNo(student.roll_no));
        }

        let student = Student {
            roll_no: student.roll_no,
            name: student.name,
            class: student.class,
            department: student.department,
            year: student.year,
        };
        self.students.push(student.clone());
        info!("student {} added to roster", student.roll_no);
        Ok(student)
    }

    pub fn add_faculty(&mut self, faculty: NewFaculty) -> Result<FacultyMember, CampusError> {
        validation::require("name", &faculty.name)?;
        validation::require("title", &faculty.title)?;
        validation::require("department", &faculty.department)?;
        let subjects = validation::subjects(&faculty.subjects)?;

        let member = FacultyMember {
            id: new_id("faculty"),
            name: faculty.name,
            title: faculty.title,
            department: faculty.department,
            subjects,
            schedule: None,
        };
        self.faculty.push(member.clone());
        info!("faculty {} ({}) added", member.name, member.id);
        Ok(member)
    }

    /// Replaces the whole schedule; there is no per-day merge.
    pub fn update_schedule(
        &mut self,
        faculty_id: &str,
        schedule: Schedule,
    ) -> Result<FacultyMember, CampusError> {
        schedule.validate()?;
        let member = self
            .faculty
            .iter_mut()
            .find(|f| f.id == faculty_id)
            .ok_or_else(|| CampusError::not_found("faculty", faculty_id))?;
        member.schedule = Some(schedule);
        info!("schedule of {faculty_id} replaced");
        Ok(member.clone())
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn faculty(&self) -> &[FacultyMember] {
        &self.faculty
    }

    pub fn faculty_member(&self, faculty_id: &str) -> Result<&FacultyMember, CampusError> {
        self.faculty
            .iter()
            .find(|f| f.id == faculty_id)
            .ok_or_else(|| CampusError::not_found("faculty", faculty_id))
    }

    pub fn timetable(&self, faculty_id: &str) -> Result<Schedule, CampusError> {
        let member = self.faculty_member(faculty_id)?;
        Ok(member
            .schedule
            .clone()
            .unwrap_or_else(|| schedule::generate_timetable(&member.name)))
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn report(&self, report_id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == report_id)
    }

    pub fn reports_of_kind(&self, kind: ReportKind) -> Vec<&Report> {
        self.reports.iter().filter(|r| r.kind == kind).collect()
    }

    pub fn reports_for(&self, roll_no: &str) -> Vec<&Report> {
        self.reports.iter().filter(|r| r.roll_no == roll_no).collect()
    }

    pub fn meetings(&self) -> &[MeetRequest] {
        &self.meetings
    }

    pub fn meeting(&self, request_id: &str) -> Option<&MeetRequest> {
        self.meetings.iter().find(|m| m.id == request_id)
    }

    pub fn meetings_for(&self, roll_no: &str) -> Vec<&MeetRequest> {
        self.meetings.iter().filter(|m| m.roll_no == roll_no).collect()
    }

    pub fn notification(&self, notification_id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == notification_id)
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }

    pub fn notifications_since(&self, mark: usize) -> &[Notification] {
        self.notifications.get(mark..).unwrap_or(&[])
    }

    /// Insertion order.
    pub fn notifications_for(&self, roll_no: &str) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| n.roll_no == roll_no)
            .collect()
    }

    /// Display order: newest timestamp first, later insertions first on ties.
    pub fn notifications_newest_first(&self, roll_no: &str) -> Vec<&Notification> {
        let mut notifications = self.notifications_for(roll_no);
        notifications.reverse();
        notifications.sort_by_key(|n| Reverse(n.timestamp));
        notifications
    }

    pub fn unread_count(&self, roll_no: &str) -> usize {
        self.notifications_for(roll_no)
            .into_iter()
            .filter(|n| !n.read)
            .count()
    }
}
