use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::campus::CampusState;
use crate::config::AdminCredentials;
use crate::error::CampusError;
use crate::messages::{FeedMessage, NotificationFeed, SessionReply, SubmitReport};
use crate::models::{
    FacultyMember, MeetRequest, MeetSlot, NewFaculty, NewMeetRequest, NewStudent, Notification,
    Report, ReportKind, ReportStatus, Student, User,
};
use crate::schedule::Schedule;
use crate::session::{Session, SessionStore};

struct Subscriber {
    roll_no: String,
    token: String,
    sender: mpsc::UnboundedSender<Message>,
}

type Subscribers = Arc<RwLock<HashMap<String, Subscriber>>>; // subscriber_id -> feed socket

#[derive(Clone)]
pub struct Server {
    state: Arc<RwLock<CampusState>>,
    sessions: Arc<SessionStore>,
    subscribers: Subscribers,
    admin: Arc<AdminCredentials>,
}

impl Server {
    pub fn new(state: CampusState, admin: AdminCredentials) -> Self {
        Server {
            state: Arc::new(RwLock::new(state)),
            sessions: Arc::new(SessionStore::default()),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            admin: Arc::new(admin),
        }
    }

    /// Runs one transition under the write lock, then pushes whatever
    /// notifications it produced to open feeds.
    async fn apply<T, F>(&self, transition: F) -> Result<T, CampusError>
    where
        F: FnOnce(&mut CampusState) -> Result<T, CampusError>,
    {
        let (value, fresh) = {
            let mut state = self.state.write().await;
            let mark = state.notification_count();
            let value = transition(&mut state)?;
            (value, state.notifications_since(mark).to_vec())
        };
        self.publish(&fresh).await;
        Ok(value)
    }

    async fn publish(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            return;
        }
        let subscribers = self.subscribers.read().await;
        for notification in notifications {
            let message = FeedMessage::Notification {
                notification: notification.clone(),
            };
            if let Ok(text) = serde_json::to_string(&message) {
                for subscriber in subscribers
                    .values()
                    .filter(|s| s.roll_no == notification.roll_no)
                {
                    let _ = subscriber.sender.send(Message::text(text.clone()));
                }
            }
        }
    }

    pub async fn authenticate(&self, token: &str) -> Result<Session, CampusError> {
        self.sessions.get(token).await
    }

    pub async fn login_student(&self, roll_no: &str) -> Result<SessionReply, CampusError> {
        let user = self
            .state
            .read()
            .await
            .login_student(roll_no)
            .inspect_err(|_| warn!("rejected student login for {roll_no}"))?;
        let session = Session::Student(user.clone());
        let role = session.role().to_string();
        let token = self.sessions.open(session).await;
        info!("student {} logged in", user.roll_no);
        Ok(SessionReply {
            token,
            role,
            user: Some(user),
        })
    }

    pub async fn login_admin(&self, id: &str, password: &str) -> Result<SessionReply, CampusError> {
        if !self.admin.verify(id, password) {
            warn!("rejected admin login for {id}");
            return Err(CampusError::Unauthorized);
        }
        let token = self.sessions.open(Session::Admin).await;
        info!("admin {id} logged in");
        Ok(SessionReply {
            token,
            role: Session::Admin.role().to_string(),
            user: None,
        })
    }

    /// Revokes the token and hangs up every feed opened with it.
    pub async fn logout(&self, token: &str) -> Result<(), CampusError> {
        if !self.sessions.close(token).await {
            return Err(CampusError::Unauthorized);
        }
        let mut subscribers = self.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|_, subscriber| subscriber.token != token);
        let dropped = before - subscribers.len();
        if dropped > 0 {
            info!("closed {dropped} notification feed(s) on logout");
        }
        Ok(())
    }

    pub async fn students(&self, session: &Session) -> Result<Vec<Student>, CampusError> {
        session.admin()?;
        Ok(self.state.read().await.students().to_vec())
    }

    pub async fn add_student(
        &self,
        session: &Session,
        student: NewStudent,
    ) -> Result<Student, CampusError> {
        session.admin()?;
        self.apply(|state| state.add_student(student)).await
    }

    pub async fn faculty(&self) -> Vec<FacultyMember> {
        self.state.read().await.faculty().to_vec()
    }

    pub async fn add_faculty(
        &self,
        session: &Session,
        faculty: NewFaculty,
    ) -> Result<FacultyMember, CampusError> {
        session.admin()?;
        self.apply(|state| state.add_faculty(faculty)).await
    }

    pub async fn update_schedule(
        &self,
        session: &Session,
        faculty_id: &str,
        schedule: Schedule,
    ) -> Result<FacultyMember, CampusError> {
        session.admin()?;
        self.apply(|state| state.update_schedule(faculty_id, schedule))
            .await
    }

    pub async fn timetable(&self, faculty_id: &str) -> Result<Schedule, CampusError> {
        self.state.read().await.timetable(faculty_id)
    }

    pub async fn reports(&self, session: &Session, kind: Option<ReportKind>) -> Vec<Report> {
        let state = self.state.read().await;
        let visible: Vec<&Report> = match (session, kind) {
            (Session::Admin, Some(kind)) => state.reports_of_kind(kind),
            (Session::Admin, None) => state.reports().iter().collect(),
            (Session::Student(user), _) => state.reports_for(&user.roll_no),
        };
        visible
            .into_iter()
            .filter(|r| kind.is_none_or(|kind| r.kind == kind))
            .cloned()
            .collect()
    }

    /// Admin sees any report, a student only their own.
    pub async fn report(&self, session: &Session, report_id: &str) -> Result<Report, CampusError> {
        let state = self.state.read().await;
        let report = state
            .report(report_id)
            .ok_or_else(|| CampusError::not_found("report", report_id))?;
        if let Session::Student(user) = session {
            if report.roll_no != user.roll_no {
                return Err(CampusError::Forbidden);
            }
        }
        Ok(report.clone())
    }

    pub async fn submit_report(
        &self,
        session: &Session,
        report: SubmitReport,
    ) -> Result<Report, CampusError> {
        let user = session.student()?;
        self.apply(|state| {
            state.submit_report(user, report.kind, &report.description, report.location)
        })
        .await
    }

    pub async fn set_report_status(
        &self,
        session: &Session,
        report_id: &str,
        status: ReportStatus,
    ) -> Result<Report, CampusError> {
        session.admin()?;
        self.apply(|state| state.set_report_status(report_id, status))
            .await
    }

    pub async fn resolve_report(
        &self,
        session: &Session,
        report_id: &str,
    ) -> Result<Report, CampusError> {
        session.admin()?;
        self.apply(|state| state.resolve_report(report_id)).await
    }

    pub async fn meetings(&self, session: &Session) -> Vec<MeetRequest> {
        let state = self.state.read().await;
        match session {
            Session::Admin => state.meetings().to_vec(),
            Session::Student(user) => state
                .meetings_for(&user.roll_no)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    pub async fn meeting(
        &self,
        session: &Session,
        request_id: &str,
    ) -> Result<MeetRequest, CampusError> {
        let state = self.state.read().await;
        let meeting = state
            .meeting(request_id)
            .ok_or_else(|| CampusError::not_found("meeting request", request_id))?;
        if let Session::Student(user) = session {
            if meeting.roll_no != user.roll_no {
                return Err(CampusError::Forbidden);
            }
        }
        Ok(meeting.clone())
    }

    pub async fn submit_meeting(
        &self,
        session: &Session,
        request: NewMeetRequest,
    ) -> Result<MeetRequest, CampusError> {
        let user = session.student()?;
        self.apply(|state| state.submit_meeting(user, request)).await
    }

    pub async fn offer_meeting_slots(
        &self,
        session: &Session,
        request_id: &str,
        slots: Vec<MeetSlot>,
    ) -> Result<MeetRequest, CampusError> {
        session.admin()?;
        self.apply(|state| state.offer_meeting_slots(request_id, slots))
            .await
    }

    pub async fn book_meeting_slot(
        &self,
        session: &Session,
        request_id: &str,
        slot: MeetSlot,
    ) -> Result<MeetRequest, CampusError> {
        let user = session.student()?;
        self.apply(|state| state.book_meeting_slot(&user.roll_no, request_id, slot))
            .await
    }

    pub async fn complete_meeting(
        &self,
        session: &Session,
        request_id: &str,
    ) -> Result<MeetRequest, CampusError> {
        session.admin()?;
        self.apply(|state| state.complete_meeting(request_id)).await
    }

    /// Students read their own feed; the admin must name a roll number.
    pub async fn notifications(
        &self,
        session: &Session,
        roll_no: Option<String>,
    ) -> Result<NotificationFeed, CampusError> {
        let roll_no = match (session, roll_no) {
            (Session::Student(user), None) => user.roll_no.clone(),
            (Session::Student(user), Some(roll_no)) if roll_no == user.roll_no => roll_no,
            (Session::Student(_), Some(_)) => return Err(CampusError::Forbidden),
            (Session::Admin, Some(roll_no)) => roll_no,
            (Session::Admin, None) => {
                return Err(CampusError::validation("rollNo is required"));
            }
        };

        let state = self.state.read().await;
        Ok(NotificationFeed {
            unread: state.unread_count(&roll_no),
            notifications: state
                .notifications_newest_first(&roll_no)
                .into_iter()
                .cloned()
                .collect(),
        })
    }

    pub async fn mark_read(
        &self,
        session: &Session,
        notification_id: &str,
        read: bool,
    ) -> Result<Notification, CampusError> {
        let user = session.student()?;
        if !read {
            return Err(CampusError::validation(
                "notifications cannot be marked unread",
            ));
        }
        self.apply(|state| {
            let owner = state
                .notification(notification_id)
                .map(|n| n.roll_no.clone())
                .ok_or_else(|| CampusError::not_found("notification", notification_id))?;
            if owner != user.roll_no {
                return Err(CampusError::Forbidden);
            }
            state.mark_read(notification_id)
        })
        .await
    }

    pub async fn mark_all_read(&self, session: &Session) -> Result<usize, CampusError> {
        let user = session.student()?;
        self.apply(|state| Ok(state.mark_all_read(&user.roll_no)))
            .await
    }

    async fn send_to(&self, subscriber_id: &str, message: &FeedMessage) {
        if let Ok(text) = serde_json::to_string(message) {
            let subscribers = self.subscribers.read().await;
            if let Some(subscriber) = subscribers.get(subscriber_id) {
                let _ = subscriber.sender.send(Message::text(text));
            }
        }
    }

    /// Keeps one live notification socket open for `user` until the client
    /// goes away or `token` is logged out.
    pub async fn handle_feed(&self, ws: WebSocket, user: User, token: String) {
        let subscriber_id = Uuid::new_v4().to_string();
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel();

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(
                subscriber_id.clone(),
                Subscriber {
                    roll_no: user.roll_no.clone(),
                    token,
                    sender: tx,
                },
            );
        }
        info!("notification feed {subscriber_id} opened for {}", user.roll_no);

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_tx.send(message).await {
                    warn!("Failed to send feed message: {e}");
                    return;
                }
            }
            // sender dropped: the feed was unsubscribed
            let _ = ws_tx.send(Message::close()).await;
        });

        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) if msg.is_close() => break,
                Ok(msg) if msg.is_text() => {
                    let reply = FeedMessage::Error {
                        message: "the notification feed is read-only".to_string(),
                    };
                    self.send_to(&subscriber_id, &reply).await;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error on feed {subscriber_id}: {e}");
                    break;
                }
            }
        }

        self.subscribers.write().await.remove(&subscriber_id);
        debug!("notification feed {subscriber_id} closed");
    }
}
