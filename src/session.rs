use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::pipeline::DocumentContext;

/// One answered (question, answer) pair.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    /// True when the answer carries the synthetic short-answer note.
    pub padded: bool,
    pub created_at: String,
}

#[derive(Default)]
struct Session {
    document: Option<Arc<DocumentContext>>,
    history: Vec<Exchange>,
}

/// Process-local, per-session state: the current document's derived
/// context and the exchange history. Cleared on process restart.
///
/// History storage is bounded at `max_entries`; callers window the
/// display separately.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_entries: usize,
}

impl SessionStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    /// Replace the session's document context wholesale. The previous
    /// index is dropped; history survives.
    pub fn set_document(&self, session_id: &str, document: Arc<DocumentContext>) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.entry(session_id.to_string()).or_default().document = Some(document);
    }

    pub fn document(&self, session_id: &str) -> Option<Arc<DocumentContext>> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(session_id).and_then(|s| s.document.clone())
    }

    pub fn record_exchange(&self, session_id: &str, exchange: Exchange) {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.entry(session_id.to_string()).or_default();
        session.history.push(exchange);
        if session.history.len() > self.max_entries {
            let excess = session.history.len() - self.max_entries;
            session.history.drain(..excess);
        }
    }

    /// The most recent `n` exchanges, newest first.
    pub fn recent_exchanges(&self, session_id: &str, n: usize) -> Vec<Exchange> {
        let sessions = self.sessions.read().unwrap();
        match sessions.get(session_id) {
            Some(s) => s.history.iter().rev().take(n).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(session_id);
    }
}
