use std::collections::HashMap;

use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::RwLock;

use crate::error::CampusError;
use crate::models::User;

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Student(User),
    Admin,
}

impl Session {
    pub fn student(&self) -> Result<&User, CampusError> {
        match self {
            Session::Student(user) => Ok(user),
            Session::Admin => Err(CampusError::Forbidden),
        }
    }

    pub fn admin(&self) -> Result<(), CampusError> {
        match self {
            Session::Admin => Ok(()),
            Session::Student(_) => Err(CampusError::Forbidden),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Session::Student(_) => "student",
            Session::Admin => "admin",
        }
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>, // token -> session
}

impl SessionStore {
    fn generate_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }

    pub async fn open(&self, session: Session) -> String {
        let token = Self::generate_token();
        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);
        token
    }

    pub async fn get(&self, token: &str) -> Result<Session, CampusError> {
        let sessions = self.sessions.read().await;
        sessions.get(token).cloned().ok_or(CampusError::Unauthorized)
    }

    pub async fn close(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token).is_some()
    }
}
