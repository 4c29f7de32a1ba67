//! Conversation session controller
//!
//! A [`Session`] owns the transcript, the draft and the pending flag, and
//! runs at most one request against its [`Transport`] at a time. The state
//! lives in a `watch` channel, which doubles as the change notification
//! front ends subscribe to. Mutations happen inside `send_modify` /
//! `send_if_modified` and never span an await.

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::{ChatMessage, SessionState, DISPATCH_FAILURE_TEXT};
use crate::transport::Transport;

/// Why a call to [`Session::submit`] did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The draft was empty or whitespace only.
    EmptyDraft,
    /// Another request is still outstanding.
    Pending,
}

/// How a call to [`Session::submit`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Ignored(IgnoreReason),
    /// The backend answered and its reply was appended.
    Replied,
    /// The request failed and the fixed error text was appended.
    Failed,
}

/// Handle to one conversation. Clones share the same state.
#[derive(Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
    transport: Arc<dyn Transport>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self {
            state: Arc::new(state),
            transport,
        }
    }

    /// Replace the draft with `text`.
    pub fn update_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_if_modified(|state| {
            if state.draft == text {
                return false;
            }
            state.draft = text;
            true
        });
    }

    /// Send the current draft and wait for the reply.
    ///
    /// Does nothing when the draft is blank or a request is already in
    /// flight. Otherwise the user message is appended, the draft cleared and
    /// the session marked pending before the transport is called, so a second
    /// `submit` racing this one sees the pending flag and backs off.
    ///
    /// Transport errors never escape: they become an assistant message with
    /// [`DISPATCH_FAILURE_TEXT`]. The pending flag is cleared on every exit,
    /// including when this future is dropped before the transport resolves.
    pub async fn submit(&self) -> Submission {
        match self.accept() {
            Ok(dispatch) => dispatch.run().await,
            Err(reason) => Submission::Ignored(reason),
        }
    }

    /// The synchronous half of [`submit`](Session::submit): apply the guards
    /// and, if the draft is accepted, append it, clear the draft and mark the
    /// session pending. The returned [`Dispatch`] performs the request.
    pub fn accept(&self) -> Result<Dispatch, IgnoreReason> {
        let mut accepted = Err(IgnoreReason::Pending);
        self.state.send_if_modified(|state| {
            if state.pending {
                return false;
            }
            if state.draft.trim().is_empty() {
                accepted = Err(IgnoreReason::EmptyDraft);
                return false;
            }
            let text = std::mem::take(&mut state.draft);
            state.transcript.push(ChatMessage::user(text.clone()));
            state.pending = true;
            accepted = Ok(text);
            true
        });

        match accepted {
            Ok(query) => Ok(Dispatch {
                query,
                transport: Arc::clone(&self.transport),
                guard: DispatchGuard::new(Arc::clone(&self.state)),
            }),
            Err(reason) => {
                tracing::debug!(?reason, "submit ignored");
                Err(reason)
            }
        }
    }

    /// Snapshot of the current state.
    pub fn view_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that is marked changed after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

/// An accepted submission whose request has not resolved yet.
///
/// Dropping it before [`run`](Dispatch::run) completes records a dispatch
/// failure, so the session is never left pending.
pub struct Dispatch {
    query: String,
    transport: Arc<dyn Transport>,
    guard: DispatchGuard,
}

impl Dispatch {
    /// The text that will be sent.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Send the query and append the reply, or the fixed error text.
    pub async fn run(self) -> Submission {
        let Dispatch { query, transport, guard } = self;
        tracing::info!(chars = query.chars().count(), "dispatching chat query");

        match transport.send(&query).await {
            Ok(reply) => {
                tracing::info!(chars = reply.chars().count(), "assistant replied");
                guard.resolve(reply);
                Submission::Replied
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat dispatch failed");
                guard.resolve(DISPATCH_FAILURE_TEXT.to_string());
                Submission::Failed
            }
        }
    }
}

/// Closes out an in-flight dispatch. If dropped without [`resolve`] (the
/// dispatch was dropped or the transport panicked) it records a dispatch
/// failure so the session never stays pending.
///
/// [`resolve`]: DispatchGuard::resolve
struct DispatchGuard {
    state: Arc<watch::Sender<SessionState>>,
    done: bool,
}

impl DispatchGuard {
    fn new(state: Arc<watch::Sender<SessionState>>) -> Self {
        Self { state, done: false }
    }

    fn resolve(mut self, reply: String) {
        self.finish(reply);
    }

    fn finish(&mut self, reply: String) {
        self.done = true;
        self.state.send_modify(|state| {
            state.transcript.push(ChatMessage::assistant(reply));
            state.pending = false;
        });
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!("chat dispatch abandoned before the backend answered");
            self.finish(DISPATCH_FAILURE_TEXT.to_string());
        }
    }
}
