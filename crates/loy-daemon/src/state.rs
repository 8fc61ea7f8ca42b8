//! Shared runtime state for loy-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Session tokens are
//! in-memory only: losing them on restart just forces a re-login, matching
//! the original service's cookie behavior.

use std::collections::HashMap;
use std::sync::Arc;

use loy_db::Repository;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub build: BuildInfo,
    /// Bearer token -> user id.
    sessions: RwLock<HashMap<Uuid, i64>>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            build: BuildInfo {
                service: "loy-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh session token for a user.
    pub async fn issue_session(&self, user_id: i64) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.write().await.insert(token, user_id);
        token
    }

    /// Resolve a bearer token to a user id.
    pub async fn session_user(&self, token: Uuid) -> Option<i64> {
        self.sessions.read().await.get(&token).copied()
    }
}
