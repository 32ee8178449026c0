//! Session persistence boundary.
//!
//! Sessions are owned by the caller's store. The pipeline only reports the
//! outcome of one invocation through [`SessionStore::update`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, TryOnError};
use crate::types::{FitRecommendation, TryOnResult};

/// Lifecycle status of a try-on session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Completed,
    Failed,
}

/// A try-on session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnSession {
    pub id: String,
    pub owner_id: String,
    pub customer_image_ref: String,
    pub garment_image_ref: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_recommendation: Option<FitRecommendation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryOnSession {
    /// A fresh session in `processing`.
    pub fn new(id: &str, owner_id: &str, customer_image_ref: &str, garment_image_ref: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            customer_image_ref: customer_image_ref.to_string(),
            garment_image_ref: garment_image_ref.to_string(),
            status: SessionStatus::Processing,
            result_image_ref: None,
            fit_recommendation: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The fields the pipeline writes back after an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub status: SessionStatus,
    pub result_image_ref: Option<String>,
    pub fit_recommendation: Option<FitRecommendation>,
}

impl SessionUpdate {
    /// Success completes the session, pending keeps it processing, anything else fails it.
    pub fn from_result(result: &TryOnResult) -> Self {
        let status = if result.success {
            SessionStatus::Completed
        } else if result.is_pending() {
            SessionStatus::Processing
        } else {
            SessionStatus::Failed
        };
        Self {
            status,
            result_image_ref: result.result_image_ref.clone(),
            fit_recommendation: result.fit_recommendation.clone(),
        }
    }
}

/// Persistence collaborator for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<()>;
}

/// Process-local store, for the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, TryOnSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: TryOnSession) {
        self.lock().insert(session.id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Option<TryOnSession> {
        self.lock().get(session_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TryOnSession>> {
        // A poisoned map is still structurally valid
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<()> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| TryOnError::Session {
                session_id: session_id.to_string(),
                message: "no such session".to_string(),
            })?;

        session.status = update.status;
        if update.result_image_ref.is_some() {
            session.result_image_ref = update.result_image_ref;
        }
        if update.fit_recommendation.is_some() {
            session.fit_recommendation = update.fit_recommendation;
        }
        session.updated_at = Utc::now();
        Ok(())
    }
}
