//! Session facade over the multiplexer.
//!
//! A [`Session`] can only be initialized. `init` consumes it and yields an
//! [`ActiveSession`] that tracks the pull cursor and exposes push, pull and
//! the sync round used by editors.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::mux::{Multiplexer, MuxHandle};
use crate::transport::{FrameSink, FrameStream};
use tandem_protocol::{Change, EditorEvent, Replica, Request, Response};

/// A session that has not fetched the document yet.
pub struct Session {
    mux: MuxHandle,
    config: ClientConfig,
}

impl Session {
    /// Wraps an existing multiplexer handle.
    pub fn new(mux: MuxHandle, config: ClientConfig) -> Self {
        Self { mux, config }
    }

    /// Spawns a multiplexer over `sink` and `stream` and wraps it.
    pub fn connect<S: FrameSink, R: FrameStream>(sink: S, stream: R, config: ClientConfig) -> Self {
        let mux = Multiplexer::spawn(sink, stream, &config);
        Self::new(mux, config)
    }

    /// Fetches the document and starts tracking changes from its sequence
    /// id. Returns the active session and the document text.
    pub async fn init(self) -> ClientResult<(ActiveSession, String)> {
        match self.mux.call_as::<_, Response>(&Request::Start).await? {
            Response::Start {
                document,
                current_id,
                title,
            } => {
                tracing::debug!(
                    client_id = %self.config.client_id,
                    current_id,
                    chars = document.chars().count(),
                    "session.init"
                );
                let session = ActiveSession {
                    mux: self.mux,
                    config: self.config,
                    last_pulled: current_id,
                    title,
                };
                Ok((session, document))
            }
            other => Err(ClientError::unexpected("start", other.kind())),
        }
    }
}

/// Result of one [`ActiveSession::sync`] round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRound {
    /// Remote changes as they were applied to the replica.
    pub applied: Vec<Change>,
    /// Number of local changes pushed.
    pub pushed: usize,
}

/// An initialized session.
pub struct ActiveSession {
    mux: MuxHandle,
    config: ClientConfig,
    last_pulled: u64,
    title: Option<String>,
}

impl ActiveSession {
    /// Submits local changes to the sequencer.
    pub async fn push(&self, changes: &[Change]) -> ClientResult<()> {
        let request = Request::Push {
            changes: changes.to_vec(),
        };
        match self.mux.call_as::<_, Response>(&request).await? {
            Response::PushAck => {
                tracing::debug!(count = changes.len(), "session.push");
                Ok(())
            }
            other => Err(ClientError::unexpected("push", other.kind())),
        }
    }

    /// Fetches changes sequenced since the last pull and advances the cursor.
    pub async fn pull(&mut self) -> ClientResult<Vec<Change>> {
        let request = Request::Pull {
            last_pulled: self.last_pulled,
        };
        match self.mux.call_as::<_, Response>(&request).await? {
            Response::Pull {
                pulled_changes,
                current_id,
            } => {
                tracing::debug!(
                    from = self.last_pulled,
                    to = current_id,
                    count = pulled_changes.len(),
                    "session.pull"
                );
                self.last_pulled = current_id;
                Ok(pulled_changes)
            }
            other => Err(ClientError::unexpected("pull", other.kind())),
        }
    }

    /// Runs one synchronization round for `replica`.
    ///
    /// Pulls, integrates the pulled changes, then pushes whatever is left in
    /// the outgoing queue. If the push fails the changes go back to the head
    /// of the queue.
    pub async fn sync(&mut self, replica: &mut Replica) -> ClientResult<SyncRound> {
        let pulled = self.pull().await?;
        let applied = replica.integrate(&pulled)?;

        let outgoing = replica.take_outgoing();
        if !outgoing.is_empty() {
            if let Err(err) = self.push(&outgoing).await {
                replica.requeue(outgoing);
                return Err(err);
            }
        }

        Ok(SyncRound {
            applied,
            pushed: outgoing.len(),
        })
    }

    /// Registers a handler for editor presence events, replacing any
    /// previous one. Events that do not decode are dropped.
    pub fn on_editors<F>(&self, mut handler: F) -> ClientResult<()>
    where
        F: FnMut(EditorEvent) + Send + 'static,
    {
        self.mux
            .on_event(EditorEvent::KIND, move |body| match EditorEvent::from_body(body) {
                Ok(event) => handler(event),
                Err(err) => tracing::warn!(error = %err, "session.editors.malformed"),
            })
    }

    /// Creates a replica of `document` stamped with this session's client id.
    pub fn replica(&self, document: impl Into<String>) -> Replica {
        Replica::new(self.config.client_id.as_str(), document)
    }

    /// Closes the connection.
    pub fn close(&self) {
        self.mux.close();
    }

    /// Returns the document title, if the sequencer sent one.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the sequence id of the last pull.
    pub fn last_pulled(&self) -> u64 {
        self.last_pulled
    }

    /// Returns the client id.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Returns the underlying multiplexer handle.
    pub fn handle(&self) -> &MuxHandle {
        &self.mux
    }
}
