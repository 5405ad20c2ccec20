use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CampusError {
    #[error("{0}")]
    Validation(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("a student with roll number {0} already exists")]
    DuplicateRollNo(String),
    #[error("the selected slot was not offered for this request")]
    SlotNotOffered,
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("not allowed for this session")]
    Forbidden,
}

impl CampusError {
    pub fn validation(message: impl Into<String>) -> Self {
        CampusError::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: &str) -> Self {
        CampusError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        CampusError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl warp::reject::Reject for CampusError {}
