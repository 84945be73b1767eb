//! Sessions: one transcript owner per session id.
//!
//! A session's transcript sits behind an async mutex that a turn holds from
//! start to finish, so two turns never interleave on one conversation. The
//! registry bounds how many sessions live at once and evicts the least
//! recently used when full.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use loopclaw_core::message::{SessionId, Transcript};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info};

use crate::loop_runner::{AgentLoop, TurnSummary};
use crate::stream_event::StreamEvent;

/// Events buffered between a running turn and a slow consumer.
pub const EVENT_BUFFER: usize = 64;

pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_active: AtomicU64,
    transcript: Mutex<Transcript>,
}

/// Listing entry for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// `None` while a turn holds the transcript.
    pub messages: Option<usize>,
    pub busy: bool,
}

impl Session {
    fn new(id: SessionId, system_prompt: &str, tick: u64) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            last_active: AtomicU64::new(tick),
            transcript: Mutex::new(Transcript::new(system_prompt)),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// A copy of the transcript. Waits for a running turn to finish.
    pub async fn transcript(&self) -> Transcript {
        self.transcript.lock().await.clone()
    }

    /// Back to just the system message.
    pub async fn reset(&self) {
        self.transcript.lock().await.reset();
        info!(session_id = %self.id, "Session reset");
    }

    /// Run one turn with the transcript locked for its whole duration.
    pub async fn run_turn(
        &self,
        agent: &AgentLoop,
        message: &str,
        events: &mpsc::Sender<StreamEvent>,
    ) -> TurnSummary {
        let mut transcript = self.transcript.lock().await;
        debug!(session_id = %self.id, "Transcript locked for turn");
        agent.run_turn(&mut transcript, message, events).await
    }

    fn info(&self) -> SessionInfo {
        let messages = self.transcript.try_lock().ok().map(|t| t.len());
        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at,
            busy: messages.is_none(),
            messages,
        }
    }
}

/// Run a turn on a background task and hand back its event stream.
///
/// Dropping the receiver stops the turn at its next step boundary.
pub fn stream_turn(agent: Arc<AgentLoop>, session: Arc<Session>, message: String) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        session.run_turn(&agent, &message, &tx).await;
    });
    rx
}

/// Live sessions keyed by id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    system_prompt: String,
    max_sessions: usize,
    clock: AtomicU64,
}

impl SessionRegistry {
    pub fn new(system_prompt: impl Into<String>, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            max_sessions: max_sessions.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn touch(&self, session: &Session) {
        session.last_active.store(self.tick(), Ordering::Relaxed);
    }

    fn insert(&self, sessions: &mut HashMap<SessionId, Arc<Session>>, id: SessionId) -> Arc<Session> {
        if sessions.len() >= self.max_sessions
            && let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.last_active.load(Ordering::Relaxed))
                .map(|s| s.id.clone())
        {
            sessions.remove(&oldest);
            info!(session_id = %oldest, "Evicted least recently used session");
        }
        let session = Arc::new(Session::new(id.clone(), &self.system_prompt, self.tick()));
        sessions.insert(id, session.clone());
        session
    }

    /// Start a new session with a fresh id.
    pub async fn create(&self) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        let session = self.insert(&mut sessions, SessionId::new());
        info!(session_id = %session.id, total = sessions.len(), "Session created");
        session
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        self.touch(&session);
        Some(session)
    }

    /// Look up a session, creating it under that id if absent.
    pub async fn get_or_create(&self, id: &SessionId) -> Arc<Session> {
        if let Some(session) = self.get(id).await {
            return session;
        }
        let mut sessions = self.sessions.write().await;
        // Another caller may have created it between the two locks.
        if let Some(session) = sessions.get(id) {
            return session.clone();
        }
        self.insert(&mut sessions, id.clone())
    }

    /// Reset a session's transcript. `false` if the id is unknown.
    pub async fn reset(&self, id: &SessionId) -> bool {
        match self.get(id).await {
            Some(session) => {
                session.reset().await;
                true
            }
            None => false,
        }
    }

    /// Drop a session. A turn already running on it finishes undisturbed.
    pub async fn evict(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session evicted");
        }
        removed
    }

    /// All sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self.sessions.read().await.values().map(|s| s.info()).collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}
