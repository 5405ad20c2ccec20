use std::convert::Infallible;

use log::error;
use serde::de::DeserializeOwned;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::error::CampusError;
use crate::messages::{
    AdminLogin, BookSlot, ErrorReply, FeedAuth, MarkRead, MarkedRead, NotificationFilter,
    OfferSlots, ReportFilter, StudentLogin, SubmitReport, UpdateReportStatus,
};
use crate::models::{NewFaculty, NewMeetRequest, NewStudent};
use crate::schedule::Schedule;
use crate::server::Server;
use crate::session::Session;

const MAX_BODY_BYTES: u64 = 64 * 1024;

fn reject(error: CampusError) -> Rejection {
    warp::reject::custom(error)
}

fn with_server(server: Server) -> impl Filter<Extract = (Server,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn bearer() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(|header: Option<String>| async move {
        header
            .as_deref()
            .and_then(|value| value.trim().split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| reject(CampusError::Unauthorized))
    })
}

async fn resolve_session(token: String, server: Server) -> Result<Session, Rejection> {
    server.authenticate(&token).await.map_err(reject)
}

fn authenticated(server: Server) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    bearer().and(with_server(server)).and_then(resolve_session)
}

fn created<T: serde::Serialize>(value: &T) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::CREATED)
}

async fn login_student(body: StudentLogin, server: Server) -> Result<impl Reply, Rejection> {
    let reply = server.login_student(&body.roll_no).await.map_err(reject)?;
    Ok(warp::reply::json(&reply))
}

async fn login_admin(body: AdminLogin, server: Server) -> Result<impl Reply, Rejection> {
    let reply = server
        .login_admin(&body.id, &body.password)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&reply))
}

async fn logout(token: String, server: Server) -> Result<impl Reply, Rejection> {
    server.logout(&token).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_students(session: Session, server: Server) -> Result<impl Reply, Rejection> {
    let students = server.students(&session).await.map_err(reject)?;
    Ok(warp::reply::json(&students))
}

async fn add_student(
    session: Session,
    body: NewStudent,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let student = server.add_student(&session, body).await.map_err(reject)?;
    Ok(created(&student))
}

async fn list_faculty(_session: Session, server: Server) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&server.faculty().await))
}

async fn add_faculty(
    session: Session,
    body: NewFaculty,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let member = server.add_faculty(&session, body).await.map_err(reject)?;
    Ok(created(&member))
}

async fn update_schedule(
    faculty_id: String,
    session: Session,
    body: Schedule,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let member = server
        .update_schedule(&session, &faculty_id, body)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&member))
}

async fn timetable(
    faculty_id: String,
    _session: Session,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let schedule = server.timetable(&faculty_id).await.map_err(reject)?;
    Ok(warp::reply::json(&schedule))
}

async fn list_reports(
    session: Session,
    filter: ReportFilter,
    server: Server,
) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&server.reports(&session, filter.kind).await))
}

async fn get_report(
    report_id: String,
    session: Session,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let report = server.report(&session, &report_id).await.map_err(reject)?;
    Ok(warp::reply::json(&report))
}

async fn submit_report(
    session: Session,
    body: SubmitReport,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let report = server.submit_report(&session, body).await.map_err(reject)?;
    Ok(created(&report))
}

async fn update_report_status(
    report_id: String,
    session: Session,
    body: UpdateReportStatus,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let report = server
        .set_report_status(&session, &report_id, body.status)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&report))
}

async fn resolve_report(
    report_id: String,
    session: Session,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let report = server
        .resolve_report(&session, &report_id)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&report))
}

async fn list_meetings(session: Session, server: Server) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&server.meetings(&session).await))
}

async fn get_meeting(
    request_id: String,
    session: Session,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let request = server
        .meeting(&session, &request_id)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&request))
}

async fn submit_meeting(
    session: Session,
    body: NewMeetRequest,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let request = server
        .submit_meeting(&session, body)
        .await
        .map_err(reject)?;
    Ok(created(&request))
}

async fn offer_slots(
    request_id: String,
    session: Session,
    body: OfferSlots,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let request = server
        .offer_meeting_slots(&session, &request_id, body.slots)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&request))
}

async fn book_slot(
    request_id: String,
    session: Session,
    body: BookSlot,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let request = server
        .book_meeting_slot(&session, &request_id, body.slot)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&request))
}

async fn complete_meeting(
    request_id: String,
    session: Session,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let request = server
        .complete_meeting(&session, &request_id)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&request))
}

async fn list_notifications(
    session: Session,
    filter: NotificationFilter,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let feed = server
        .notifications(&session, filter.roll_no)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&feed))
}

async fn mark_read(
    notification_id: String,
    session: Session,
    body: MarkRead,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let notification = server
        .mark_read(&session, &notification_id, body.read)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&notification))
}

async fn mark_all_read(session: Session, server: Server) -> Result<impl Reply, Rejection> {
    let updated = server.mark_all_read(&session).await.map_err(reject)?;
    Ok(warp::reply::json(&MarkedRead { updated }))
}

async fn open_feed(
    ws: warp::ws::Ws,
    auth: FeedAuth,
    server: Server,
) -> Result<impl Reply, Rejection> {
    let session = server.authenticate(&auth.token).await.map_err(reject)?;
    let user = session.student().map_err(reject)?.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        server.handle_feed(socket, user, auth.token).await;
    }))
}

fn session_routes(
    server: &Server,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let student = warp::path!("login" / "student")
        .and(warp::post())
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(login_student);

    let admin = warp::path!("login" / "admin")
        .and(warp::post())
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(login_admin);

    let logout = warp::path!("logout")
        .and(warp::post())
        .and(bearer())
        .and(with_server(server.clone()))
        .and_then(logout);

    student.or(admin).or(logout)
}

fn roster_routes(
    server: &Server,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_students = warp::path!("students")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(list_students);

    let add_student = warp::path!("students")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(add_student);

    let list_faculty = warp::path!("faculty")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(list_faculty);

    let add_faculty = warp::path!("faculty")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(add_faculty);

    let update_schedule = warp::path!("faculty" / String / "schedule")
        .and(warp::put())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(update_schedule);

    let timetable = warp::path!("faculty" / String / "timetable")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(timetable);

    list_students
        .or(add_student)
        .or(list_faculty)
        .or(add_faculty)
        .or(update_schedule)
        .or(timetable)
}

fn report_routes(
    server: &Server,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("reports")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(warp::query::<ReportFilter>())
        .and(with_server(server.clone()))
        .and_then(list_reports);

    let submit = warp::path!("reports")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(submit_report);

    let get = warp::path!("reports" / String)
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(get_report);

    let update_status = warp::path!("reports" / String)
        .and(warp::patch())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(update_report_status);

    let resolve = warp::path!("reports" / String / "resolve")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(resolve_report);

    list.or(submit).or(get).or(update_status).or(resolve)
}

fn meeting_routes(
    server: &Server,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("meetings")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(list_meetings);

    let submit = warp::path!("meetings")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(submit_meeting);

    let get = warp::path!("meetings" / String)
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(get_meeting);

    let offer = warp::path!("meetings" / String / "offer")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(offer_slots);

    let book = warp::path!("meetings" / String / "book")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(book_slot);

    let complete = warp::path!("meetings" / String / "complete")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(complete_meeting);

    list.or(submit).or(get).or(offer).or(book).or(complete)
}

fn notification_routes(
    server: &Server,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("notifications")
        .and(warp::get())
        .and(authenticated(server.clone()))
        .and(warp::query::<NotificationFilter>())
        .and(with_server(server.clone()))
        .and_then(list_notifications);

    let read_all = warp::path!("notifications" / "read-all")
        .and(warp::post())
        .and(authenticated(server.clone()))
        .and(with_server(server.clone()))
        .and_then(mark_all_read);

    let mark = warp::path!("notifications" / String)
        .and(warp::patch())
        .and(authenticated(server.clone()))
        .and(json_body())
        .and(with_server(server.clone()))
        .and_then(mark_read);

    let feed = warp::path!("ws" / "notifications")
        .and(warp::ws())
        .and(warp::query::<FeedAuth>())
        .and(with_server(server.clone()))
        .and_then(open_feed);

    list.or(read_all).or(mark).or(feed)
}

pub fn routes(server: Server) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    session_routes(&server)
        .or(roster_routes(&server))
        .or(report_routes(&server))
        .or(meeting_routes(&server))
        .or(notification_routes(&server))
        .recover(handle_rejection)
}

fn status_of(error: &CampusError) -> StatusCode {
    match error {
        CampusError::Validation(_) | CampusError::SlotNotOffered => StatusCode::BAD_REQUEST,
        CampusError::NotFound { .. } => StatusCode::NOT_FOUND,
        CampusError::InvalidTransition { .. } | CampusError::DuplicateRollNo(_) => {
            StatusCode::CONFLICT
        }
        CampusError::Unauthorized => StatusCode::UNAUTHORIZED,
        CampusError::Forbidden => StatusCode::FORBIDDEN,
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(error) = err.find::<CampusError>() {
        (status_of(error), error.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "content length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected an application/json body".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "no such route".to_string())
    } else {
        error!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorReply { message }),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use warp::hyper::body::Bytes;
    use warp::test::request;

    use super::*;
    use crate::config::AdminCredentials;
    use crate::messages::{NotificationFeed, SessionReply};
    use crate::models::{FacultyMember, MeetRequest, MeetStatus, NotificationKind, Report};
    use crate::seed;

    const APARNA: &str = "715535243011";
    const AMISH: &str = "715525243008";

    fn api() -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + 'static {
        let server = Server::new(
            seed::demo_campus(),
            AdminCredentials::new("admin@campus", "letmein"),
        );
        routes(server)
    }

    fn body<T: DeserializeOwned>(response: &warp::http::Response<Bytes>) -> T {
        serde_json::from_slice(response.body()).unwrap()
    }

    async fn student_token<F>(api: &F, roll_no: &str) -> String
    where
        F: Filter + 'static,
        F::Extract: Reply + Send,
    {
        let response = request()
            .method("POST")
            .path("/login/student")
            .json(&json!({ "rollNo": roll_no }))
            .reply(api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body::<SessionReply>(&response).token
    }

    async fn admin_token<F>(api: &F) -> String
    where
        F: Filter + 'static,
        F::Extract: Reply + Send,
    {
        let response = request()
            .method("POST")
            .path("/login/admin")
            .json(&json!({ "id": "admin@campus", "password": "letmein" }))
            .reply(api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body::<SessionReply>(&response).token
    }

    fn bearer_header(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn student_login_returns_user_or_404() {
        let api = api();
        let response = request()
            .method("POST")
            .path("/login/student")
            .json(&json!({ "rollNo": APARNA }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let session: SessionReply = body(&response);
        assert_eq!(session.role, "student");
        assert_eq!(session.user.unwrap().name, "Aparna");

        let response = request()
            .method("POST")
            .path("/login/student")
            .json(&json!({ "rollNo": "000000000000" }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_login_checks_credentials() {
        let api = api();
        let response = request()
            .method("POST")
            .path("/login/admin")
            .json(&json!({ "id": "admin@campus", "password": "wrong" }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = admin_token(&api).await;
        assert_eq!(token.len(), 32);
    }

    #[tokio::test]
    async fn routes_require_a_session() {
        let api = api();
        let response = request().method("GET").path("/reports").reply(&api).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = request()
            .method("GET")
            .path("/reports")
            .header("authorization", "Bearer not-a-token")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error: ErrorReply = body(&response);
        assert_eq!(error.message, "missing or invalid credentials");
    }

    #[tokio::test]
    async fn bearer_scheme_is_case_insensitive() {
        let api = api();
        let token = student_token(&api, APARNA).await;

        for scheme in ["bearer", "BEARER", "Bearer"] {
            let response = request()
                .method("GET")
                .path("/notifications")
                .header("authorization", format!("{scheme} {token}"))
                .reply(&api)
                .await;
            assert_eq!(response.status(), StatusCode::OK, "scheme {scheme}");
        }

        let response = request()
            .method("GET")
            .path("/notifications")
            .header("authorization", format!("Basic {token}"))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_invalidates_the_token() {
        let api = api();
        let token = student_token(&api, APARNA).await;

        let response = request()
            .method("POST")
            .path("/logout")
            .header("authorization", bearer_header(&token))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = request()
            .method("GET")
            .path("/notifications")
            .header("authorization", bearer_header(&token))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn emergency_report_is_resolved_by_admin() {
        let api = api();
        let student = student_token(&api, APARNA).await;
        let admin = admin_token(&api).await;

        let response = request()
            .method("POST")
            .path("/reports")
            .header("authorization", bearer_header(&student))
            .json(&json!({ "type": "emergency", "description": "fire in lab" }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let report: Report = body(&response);
        let raw: Value = body(&response);
        assert_eq!(raw["type"], "emergency");
        assert_eq!(raw["status"], "Pending");
        assert_eq!(raw["rollNo"], APARNA);
        assert!(raw.get("location").is_none());

        let response = request()
            .method("GET")
            .path("/notifications")
            .header("authorization", bearer_header(&student))
            .reply(&api)
            .await;
        let feed: NotificationFeed = body(&response);
        assert_eq!(feed.unread, 1);
        assert_eq!(feed.notifications[0].kind, NotificationKind::Emergency);
        assert!(!feed.notifications[0].read);

        let response = request()
            .method("POST")
            .path(&format!("/reports/{}/resolve", report.id))
            .header("authorization", bearer_header(&admin))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let resolved: Value = body(&response);
        assert_eq!(resolved["status"], "Resolved");

        let response = request()
            .method("GET")
            .path(&format!("/notifications?rollNo={APARNA}"))
            .header("authorization", bearer_header(&admin))
            .reply(&api)
            .await;
        let feed: NotificationFeed = body(&response);
        assert_eq!(feed.notifications.len(), 2);
        let kinds: Vec<NotificationKind> = feed.notifications.iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&NotificationKind::Admin));
        assert!(kinds.contains(&NotificationKind::Emergency));
    }

    #[tokio::test]
    async fn report_status_updates_are_admin_only_and_forward_only() {
        let api = api();
        let student = student_token(&api, APARNA).await;
        let admin = admin_token(&api).await;

        let response = request()
            .method("POST")
            .path("/reports")
            .header("authorization", bearer_header(&student))
            .json(&json!({ "type": "report", "description": "Broken fan", "location": "Room 12" }))
            .reply(&api)
            .await;
        let report: Report = body(&response);

        let patch = |token: &str, status: &str| {
            request()
                .method("PATCH")
                .path(&format!("/reports/{}", report.id))
                .header("authorization", bearer_header(token))
                .json(&json!({ "status": status }))
        };

        let response = patch(&student, "In Progress").reply(&api).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = patch(&admin, "In Progress").reply(&api).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = patch(&admin, "Pending").reply(&api).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = patch(&admin, "Closed").reply(&api).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = request()
            .method("PATCH")
            .path("/reports/report-missing")
            .header("authorization", bearer_header(&admin))
            .json(&json!({ "status": "Resolved" }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn single_report_is_visible_to_owner_and_admin() {
        let api = api();
        let aparna = student_token(&api, APARNA).await;
        let amish = student_token(&api, AMISH).await;
        let admin = admin_token(&api).await;

        let response = request()
            .method("POST")
            .path("/reports")
            .header("authorization", bearer_header(&aparna))
            .json(&json!({ "type": "report", "description": "Leaking tap" }))
            .reply(&api)
            .await;
        let report: Report = body(&response);

        let get = |token: &str| {
            request()
                .method("GET")
                .path(&format!("/reports/{}", report.id))
                .header("authorization", bearer_header(token))
        };

        let response = get(&aparna).reply(&api).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body::<Report>(&response), report);
        assert_eq!(get(&admin).reply(&api).await.status(), StatusCode::OK);
        assert_eq!(get(&amish).reply(&api).await.status(), StatusCode::FORBIDDEN);

        let response = request()
            .method("GET")
            .path("/meetings/meet-missing")
            .header("authorization", bearer_header(&admin))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn single_meeting_is_visible_to_owner_and_admin() {
        let api = api();
        let aparna = student_token(&api, APARNA).await;
        let amish = student_token(&api, AMISH).await;
        let admin = admin_token(&api).await;

        let response = request()
            .method("POST")
            .path("/meetings")
            .header("authorization", bearer_header(&aparna))
            .json(&json!({
                "department": "CSE",
                "faculty": "Dr. Rajesh",
                "preferredDates": ["2025-12-18"],
                "timeRange": "10:00 AM - 11:00 AM",
                "message": "Internship letter"
            }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let meeting: MeetRequest = body(&response);

        let get = |token: &str| {
            request()
                .method("GET")
                .path(&format!("/meetings/{}", meeting.id))
                .header("authorization", bearer_header(token))
        };

        let response = get(&aparna).reply(&api).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body::<MeetRequest>(&response), meeting);

        let response = get(&admin).reply(&api).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body::<MeetRequest>(&response), meeting);

        let response = get(&amish).reply(&api).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let error: ErrorReply = body(&response);
        assert_eq!(error.message, "not allowed for this session");
    }

    #[tokio::test]
    async fn blank_report_description_is_rejected() {
        let api = api();
        let student = student_token(&api, APARNA).await;

        let response = request()
            .method("POST")
            .path("/reports")
            .header("authorization", bearer_header(&student))
            .json(&json!({ "type": "report", "description": "   " }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = request()
            .method("GET")
            .path("/reports")
            .header("authorization", bearer_header(&student))
            .reply(&api)
            .await;
        let reports: Vec<Report> = body(&response);
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn report_listing_is_scoped_by_role() {
        let api = api();
        let aparna = student_token(&api, APARNA).await;
        let amish = student_token(&api, AMISH).await;
        let admin = admin_token(&api).await;

        for (token, kind) in [(&aparna, "report"), (&amish, "emergency")] {
            let response = request()
                .method("POST")
                .path("/reports")
                .header("authorization", bearer_header(token))
                .json(&json!({ "type": kind, "description": "something" }))
                .reply(&api)
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let list = |token: &str, path: &str| {
            request()
                .method("GET")
                .path(path)
                .header("authorization", bearer_header(token))
        };

        let mine: Vec<Report> = body(&list(&aparna, "/reports").reply(&api).await);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].roll_no, APARNA);

        let all: Vec<Report> = body(&list(&admin, "/reports").reply(&api).await);
        assert_eq!(all.len(), 2);

        let emergencies: Vec<Report> =
            body(&list(&admin, "/reports?type=emergency").reply(&api).await);
        assert_eq!(emergencies.len(), 1);
        assert_eq!(emergencies[0].roll_no, AMISH);
    }

    #[tokio::test]
    async fn meeting_request_offer_and_booking() {
        let api = api();
        let student = student_token(&api, APARNA).await;
        let admin = admin_token(&api).await;

        let response = request()
            .method("POST")
            .path("/meetings")
            .header("authorization", bearer_header(&student))
            .json(&json!({
                "department": "AI & DS",
                "faculty": "Dr. Sangeetha",
                "preferredDates": ["2025-12-16"],
                "timeRange": "2:00 PM - 3:00 PM",
                "message": "Discuss project proposal"
            }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let meeting: MeetRequest = body(&response);
        assert_eq!(meeting.status, MeetStatus::Pending);

        let slot = json!({ "date": "2025-12-16", "time": "2:00 PM - 3:00 PM" });

        let response = request()
            .method("POST")
            .path(&format!("/meetings/{}/offer", meeting.id))
            .header("authorization", bearer_header(&student))
            .json(&json!({ "slots": [slot.clone()] }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = request()
            .method("POST")
            .path(&format!("/meetings/{}/offer", meeting.id))
            .header("authorization", bearer_header(&admin))
            .json(&json!({ "slots": [slot.clone()] }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let offered: Value = body(&response);
        assert_eq!(offered["status"], "Offered");
        assert_eq!(offered["offeredSlots"][0], slot);
        assert!(offered.get("bookedSlot").is_none());

        let response = request()
            .method("POST")
            .path(&format!("/meetings/{}/book", meeting.id))
            .header("authorization", bearer_header(&student))
            .json(&json!({ "slot": { "date": "2025-12-17", "time": "2:00 PM - 3:00 PM" } }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = request()
            .method("POST")
            .path(&format!("/meetings/{}/book", meeting.id))
            .header("authorization", bearer_header(&student))
            .json(&json!({ "slot": slot.clone() }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let booked: Value = body(&response);
        assert_eq!(booked["status"], "Booked");
        assert_eq!(booked["bookedSlot"], slot);

        let response = request()
            .method("POST")
            .path(&format!("/meetings/{}/complete", meeting.id))
            .header("authorization", bearer_header(&admin))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let done: MeetRequest = body(&response);
        assert_eq!(done.status, MeetStatus::Resolved);

        let response = request()
            .method("GET")
            .path("/notifications")
            .header("authorization", bearer_header(&student))
            .reply(&api)
            .await;
        let feed: NotificationFeed = body(&response);
        assert_eq!(feed.notifications.len(), 4);
        assert!(feed
            .notifications
            .iter()
            .all(|n| n.kind == NotificationKind::Meeting));
    }

    #[tokio::test]
    async fn meetings_need_a_preferred_date() {
        let api = api();
        let student = student_token(&api, APARNA).await;

        let response = request()
            .method("POST")
            .path("/meetings")
            .header("authorization", bearer_header(&student))
            .json(&json!({
                "department": "CSE",
                "faculty": "Prof. Meera",
                "preferredDates": [],
                "timeRange": "11:00 AM - 12:00 PM",
                "message": "Doubt clearing"
            }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = request()
            .method("GET")
            .path("/meetings")
            .header("authorization", bearer_header(&student))
            .reply(&api)
            .await;
        let meetings: Vec<MeetRequest> = body(&response);
        assert!(meetings.is_empty());
    }

    #[tokio::test]
    async fn notifications_are_marked_read_by_their_owner() {
        let api = api();
        let aparna = student_token(&api, APARNA).await;
        let amish = student_token(&api, AMISH).await;

        for description in ["first", "second"] {
            request()
                .method("POST")
                .path("/reports")
                .header("authorization", bearer_header(&aparna))
                .json(&json!({ "type": "report", "description": description }))
                .reply(&api)
                .await;
        }

        let response = request()
            .method("GET")
            .path("/notifications")
            .header("authorization", bearer_header(&aparna))
            .reply(&api)
            .await;
        let feed: NotificationFeed = body(&response);
        assert_eq!(feed.unread, 2);
        let id = feed.notifications[0].id.clone();

        let mark = |token: &str, read: bool| {
            request()
                .method("PATCH")
                .path(&format!("/notifications/{id}"))
                .header("authorization", bearer_header(token))
                .json(&json!({ "read": read }))
        };

        assert_eq!(mark(&amish, true).reply(&api).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(mark(&aparna, false).reply(&api).await.status(), StatusCode::BAD_REQUEST);
        for _ in 0..2 {
            let response = mark(&aparna, true).reply(&api).await;
            assert_eq!(response.status(), StatusCode::OK);
            let raw: Value = body(&response);
            assert_eq!(raw["read"], true);
        }

        let response = request()
            .method("GET")
            .path(&format!("/notifications?rollNo={AMISH}"))
            .header("authorization", bearer_header(&aparna))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = request()
            .method("POST")
            .path("/notifications/read-all")
            .header("authorization", bearer_header(&aparna))
            .reply(&api)
            .await;
        let marked: MarkedRead = body(&response);
        assert_eq!(marked.updated, 1);

        let response = request()
            .method("GET")
            .path("/notifications")
            .header("authorization", bearer_header(&aparna))
            .reply(&api)
            .await;
        let feed: NotificationFeed = body(&response);
        assert_eq!(feed.unread, 0);
        assert!(feed.notifications.iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn admin_manages_roster() {
        let api = api();
        let admin = admin_token(&api).await;
        let student = student_token(&api, APARNA).await;

        let add = |token: &str, roll_no: &str| {
            request()
                .method("POST")
                .path("/students")
                .header("authorization", bearer_header(token))
                .json(&json!({
                    "rollNo": roll_no,
                    "name": "Divya",
                    "class": "B",
                    "department": "CSE",
                    "year": "2"
                }))
        };

        assert_eq!(add(&student, "715535243099").reply(&api).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(add(&admin, "71553524301").reply(&api).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(add(&admin, "71553524301A").reply(&api).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(add(&admin, "715535243099").reply(&api).await.status(), StatusCode::CREATED);
        assert_eq!(add(&admin, "715535243099").reply(&api).await.status(), StatusCode::CONFLICT);

        let response = request()
            .method("GET")
            .path("/students")
            .header("authorization", bearer_header(&admin))
            .reply(&api)
            .await;
        let students: Vec<Value> = body(&response);
        assert_eq!(students.len(), 5);

        student_token(&api, "715535243099").await;
    }

    #[tokio::test]
    async fn admin_manages_faculty_schedules() {
        let api = api();
        let admin = admin_token(&api).await;
        let student = student_token(&api, APARNA).await;

        let response = request()
            .method("POST")
            .path("/faculty")
            .header("authorization", bearer_header(&admin))
            .json(&json!({
                "name": "Dr. Lakshmi",
                "title": "Dr.",
                "department": "EEE",
                "subjects": "Power Systems, Machines"
            }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let member: FacultyMember = body(&response);
        assert_eq!(member.subjects, vec!["Power Systems", "Machines"]);

        let schedule = json!({
            "Monday": [
                { "time": "9:00 AM - 10:00 AM", "subject": "Machines", "className": "EEE - II A" },
                { "time": "1:00 PM - 2:00 PM", "subject": "Lunch Break" },
                { "time": "2:00 PM - 3:00 PM", "available": true }
            ]
        });
        let put = |token: &str, body: &Value| {
            request()
                .method("PUT")
                .path(&format!("/faculty/{}/schedule", member.id))
                .header("authorization", bearer_header(token))
                .json(body)
        };

        assert_eq!(put(&student, &schedule).reply(&api).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            put(&admin, &json!({ "Someday": [] })).reply(&api).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(put(&admin, &schedule).reply(&api).await.status(), StatusCode::OK);

        let response = request()
            .method("GET")
            .path(&format!("/faculty/{}/timetable", member.id))
            .header("authorization", bearer_header(&student))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let timetable: Value = body(&response);
        assert_eq!(timetable, schedule);

        let response = request()
            .method("GET")
            .path("/faculty")
            .header("authorization", bearer_header(&student))
            .reply(&api)
            .await;
        let faculty: Vec<FacultyMember> = body(&response);
        assert_eq!(faculty.len(), 9);
    }

    #[tokio::test]
    async fn unknown_paths_and_methods() {
        let api = api();
        let response = request().method("GET").path("/nowhere").reply(&api).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = request().method("DELETE").path("/reports").reply(&api).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn feed_pushes_new_notifications() {
        let api = api();
        let token = student_token(&api, APARNA).await;

        let mut client = warp::test::ws()
            .path(&format!("/ws/notifications?token={token}"))
            .handshake(api.clone())
            .await
            .expect("handshake");

        // let the feed register before the report is filed
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let response = request()
            .method("POST")
            .path("/reports")
            .header("authorization", bearer_header(&token))
            .json(&json!({ "type": "emergency", "description": "gas leak" }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let frame = client.recv().await.expect("feed frame");
        let pushed: Value = serde_json::from_str(frame.to_str().unwrap()).unwrap();
        assert_eq!(pushed["type"], "notification");
        assert_eq!(pushed["notification"]["type"], "emergency");
        assert_eq!(pushed["notification"]["rollNo"], APARNA);
    }

    #[tokio::test]
    async fn logout_hangs_up_the_feed() {
        let api = api();
        let token = student_token(&api, APARNA).await;
        let other = student_token(&api, APARNA).await;

        let mut client = warp::test::ws()
            .path(&format!("/ws/notifications?token={token}"))
            .handshake(api.clone())
            .await
            .expect("handshake");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let response = request()
            .method("POST")
            .path("/logout")
            .header("authorization", bearer_header(&token))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = request()
            .method("POST")
            .path("/reports")
            .header("authorization", bearer_header(&other))
            .json(&json!({ "type": "report", "description": "Projector broken" }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let next =
            tokio::time::timeout(std::time::Duration::from_millis(200), client.recv()).await;
        if let Ok(Ok(frame)) = next {
            assert!(
                !frame.is_text(),
                "logged-out feed received {:?}",
                frame.to_str()
            );
        }
    }

    #[tokio::test]
    async fn feed_rejects_admin_and_unknown_tokens() {
        let api = api();
        let admin = admin_token(&api).await;

        let result = warp::test::ws()
            .path(&format!("/ws/notifications?token={admin}"))
            .handshake(api.clone())
            .await;
        assert!(result.is_err());

        let result = warp::test::ws()
            .path("/ws/notifications?token=bogus")
            .handshake(api.clone())
            .await;
        assert!(result.is_err());
    }
}
