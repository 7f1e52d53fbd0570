//! In-memory loopback sequencer.
//!
//! Holds the authoritative document and its change log and answers start,
//! push and pull calls from any number of in-memory connections. Pushes are
//! applied verbatim, so clients must pull before they push and must not sync
//! at the same time.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tandem_client::{duplex, ClientConfig, FrameStream, MemorySink, MemoryStream, Session};
use tandem_protocol::{CallFrame, Change, Request, Response, ResponseFrame};

/// A shared in-memory sequencer.
///
/// Cloning yields another handle to the same document.
#[derive(Clone, Default)]
pub struct LoopbackSequencer {
    state: Arc<Mutex<SequencerState>>,
}

#[derive(Default)]
struct SequencerState {
    document: String,
    title: Option<String>,
    log: Vec<Change>,
    connections: Vec<MemorySink>,
}

impl SequencerState {
    fn current_id(&self) -> u64 {
        self.log.len() as u64
    }

    fn answer(&mut self, request: Request) -> Response {
        match request {
            Request::Start => Response::Start {
                document: self.document.clone(),
                current_id: self.current_id(),
                title: self.title.clone(),
            },
            Request::Push { changes } => {
                for change in changes {
                    if let Err(err) = change.apply(&mut self.document) {
                        tracing::warn!(error = %err, "sequencer.push.rejected");
                        continue;
                    }
                    self.log.push(change);
                }
                Response::PushAck
            }
            Request::Pull { last_pulled } => {
                let start = usize::try_from(last_pulled)
                    .unwrap_or(usize::MAX)
                    .min(self.log.len());
                Response::Pull {
                    pulled_changes: self.log[start..].to_vec(),
                    current_id: self.current_id(),
                }
            }
        }
    }

    fn reply(&mut self, connection: usize, text: &str) -> Option<String> {
        let call = CallFrame::decode(text).ok()?;
        let response = match serde_json::from_value::<Request>(call.message) {
            Ok(request) => serde_json::to_value(self.answer(request)).ok()?,
            Err(err) => {
                tracing::warn!(connection, error = %err, "sequencer.request.malformed");
                Value::Null
            }
        };
        ResponseFrame {
            id: call.id,
            response,
        }
        .encode()
        .ok()
    }
}

impl LoopbackSequencer {
    /// Creates a sequencer holding an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequencer holding `document`.
    pub fn with_document(document: impl Into<String>) -> Self {
        let sequencer = Self::new();
        sequencer.state.lock().document = document.into();
        sequencer
    }

    /// Sets the title sent with start responses.
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state.lock().title = Some(title.into());
        self
    }

    /// Opens a connection and returns the client's transport ends.
    ///
    /// Must be called within a tokio runtime; the server side runs on a
    /// spawned task until the client closes its sink.
    pub fn connect(&self) -> (MemorySink, MemoryStream) {
        let (client, (server_sink, mut server_stream)) = duplex();

        let index = {
            let mut state = self.state.lock();
            state.connections.push(server_sink);
            state.connections.len() - 1
        };

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(Ok(text)) = server_stream.recv().await {
                let mut guard = state.lock();
                if let Some(frame) = guard.reply(index, &text) {
                    let _ = guard.connections[index].try_send(frame);
                }
            }
        });

        client
    }

    /// Opens a connection and wraps it in a session.
    pub fn session(&self, config: ClientConfig) -> Session {
        let (sink, stream) = self.connect();
        Session::connect(sink, stream, config)
    }

    /// Sends an event frame to every open connection.
    pub fn broadcast_event(&self, body: &Value) {
        let Ok(text) = serde_json::to_string(body) else {
            return;
        };
        for sink in &self.state.lock().connections {
            if !sink.is_closed() {
                let _ = sink.try_send(text.as_str());
            }
        }
    }

    /// Returns the authoritative document.
    pub fn document(&self) -> String {
        self.state.lock().document.clone()
    }

    /// Returns every sequenced change, oldest first.
    pub fn log(&self) -> Vec<Change> {
        self.state.lock().log.clone()
    }

    /// Returns the current sequence id.
    pub fn current_id(&self) -> u64 {
        self.state.lock().current_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_client::FrameSink;

    async fn call(
        sink: &mut MemorySink,
        stream: &mut MemoryStream,
        id: &str,
        request: Request,
    ) -> Response {
        let frame = CallFrame {
            id: id.into(),
            message: serde_json::to_value(request).unwrap(),
        };
        sink.send(frame.encode().unwrap()).await.unwrap();
        let text = stream.recv().await.unwrap().unwrap();
        let frame: ResponseFrame = serde_json::from_str(&text).unwrap();
        assert_eq!(frame.id, id);
        serde_json::from_value(frame.response).unwrap()
    }

    #[tokio::test]
    async fn answers_start_push_pull() {
        let sequencer = LoopbackSequencer::with_document("abc").with_title("Notes");
        let (mut sink, mut stream) = sequencer.connect();

        let start = call(&mut sink, &mut stream, "1", Request::Start).await;
        assert_eq!(
            start,
            Response::Start {
                document: "abc".into(),
                current_id: 0,
                title: Some("Notes".into()),
            }
        );

        let changes = vec![Change::insert(3, "d", "me"), Change::delete(0, 1, "me")];
        let ack = call(
            &mut sink,
            &mut stream,
            "2",
            Request::Push {
                changes: changes.clone(),
            },
        )
        .await;
        assert_eq!(ack, Response::PushAck);
        assert_eq!(sequencer.document(), "bcd");
        assert_eq!(sequencer.current_id(), 2);

        let pull = call(&mut sink, &mut stream, "3", Request::Pull { last_pulled: 1 }).await;
        assert_eq!(
            pull,
            Response::Pull {
                pulled_changes: changes[1..].to_vec(),
                current_id: 2,
            }
        );

        // A cursor from the future yields nothing.
        let pull = call(&mut sink, &mut stream, "4", Request::Pull { last_pulled: 9 }).await;
        assert_eq!(
            pull,
            Response::Pull {
                pulled_changes: vec![],
                current_id: 2,
            }
        );
    }

    #[tokio::test]
    async fn invalid_pushed_change_is_skipped() {
        let sequencer = LoopbackSequencer::with_document("ab");
        let (mut sink, mut stream) = sequencer.connect();

        let changes = vec![Change::delete(1, 5, "me"), Change::insert(2, "c", "me")];
        call(&mut sink, &mut stream, "1", Request::Push { changes }).await;

        assert_eq!(sequencer.document(), "abc");
        assert_eq!(sequencer.log(), vec![Change::insert(2, "c", "me")]);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let sequencer = LoopbackSequencer::new();
        let (_a_sink, mut a_stream) = sequencer.connect();
        let (_b_sink, mut b_stream) = sequencer.connect();

        let body = serde_json::json!({"type": "editor", "editors": 2});
        sequencer.broadcast_event(&body);

        for stream in [&mut a_stream, &mut b_stream] {
            let text = stream.recv().await.unwrap().unwrap();
            assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), body);
        }
    }
}
