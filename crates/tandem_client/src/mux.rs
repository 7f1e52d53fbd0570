//! Call/event multiplexer over a single frame transport.
//!
//! One task owns the connection. It assigns correlation ids to outgoing
//! calls, keeps the table of pending calls, resolves them as responses
//! arrive and hands events to their registered handlers. Callers talk to it
//! through a cloneable [`MuxHandle`] and get their results back over
//! single-shot channels, so waiting on a call never stalls the receive loop.
//! Frames are written by a second task, so a slow send does not hold up
//! inbound responses either.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, CloseReason};
use crate::transport::{FrameSink, FrameStream};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tandem_protocol::{CallFrame, Frame, ResponseFrame};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Commands handled back to back before inbound frames get a turn.
const COMMAND_BURST: usize = 32;

/// Upper bound on how long abandoned call records linger.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

type Reply = oneshot::Sender<ClientResult<Value>>;
type EventHandler = Box<dyn FnMut(Value) + Send>;

enum Command {
    Call { message: Value, reply: Reply },
    Register { kind: String, handler: EventHandler },
    Close,
}

struct Outgoing {
    id: String,
    text: String,
}

struct SendFailure {
    id: String,
    error: ClientError,
}

/// Owns the sink and writes queued frames in order.
struct Writer<S> {
    sink: S,
    frames: mpsc::UnboundedReceiver<Outgoing>,
    failures: mpsc::UnboundedSender<SendFailure>,
}

impl<S: FrameSink> Writer<S> {
    /// Runs until the multiplexer goes away or a send fails for good, then
    /// closes the sink.
    async fn run(mut self) {
        loop {
            let next = tokio::select! {
                biased;
                () = self.failures.closed() => None,
                next = self.frames.recv() => next,
            };
            let Some(Outgoing { id, text }) = next else {
                break;
            };

            let sent = tokio::select! {
                biased;
                () = self.failures.closed() => break,
                sent = self.sink.send(text) => sent,
            };
            match sent {
                Ok(()) => tracing::trace!(id = %id, "mux.frame.sent"),
                Err(error) => {
                    let fatal = !error.is_retryable();
                    let _ = self.failures.send(SendFailure { id, error });
                    if fatal {
                        break;
                    }
                }
            }
        }

        if let Err(err) = self.sink.close().await {
            tracing::debug!(error = %err, "mux.sink.close_failed");
        }
        tracing::trace!("mux.writer.stopped");
    }
}

/// The connection-owning side of the multiplexer.
///
/// Created together with its first [`MuxHandle`]; drive it with
/// [`Multiplexer::run`] or let [`Multiplexer::spawn`] do so on the current
/// runtime.
pub struct Multiplexer<S, R> {
    writer: Option<Writer<S>>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    failures: mpsc::UnboundedReceiver<SendFailure>,
    stream: R,
    commands: mpsc::UnboundedReceiver<Command>,
    pending: HashMap<String, Reply>,
    handlers: HashMap<String, EventHandler>,
    closed: Arc<RwLock<Option<CloseReason>>>,
    sweep_every: Duration,
}

impl<S: FrameSink, R: FrameStream> Multiplexer<S, R> {
    /// Creates a multiplexer over `sink` and `stream`.
    pub fn new(sink: S, stream: R, config: &ClientConfig) -> (Self, MuxHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (outgoing, frames) = mpsc::unbounded_channel();
        let (failures_tx, failures) = mpsc::unbounded_channel();
        let closed = Arc::new(RwLock::new(None));
        let sweep_every = config
            .call_timeout
            .map_or(SWEEP_INTERVAL, |limit| limit.min(SWEEP_INTERVAL));

        let mux = Self {
            writer: Some(Writer {
                sink,
                frames,
                failures: failures_tx,
            }),
            outgoing,
            failures,
            stream,
            commands: rx,
            pending: HashMap::new(),
            handlers: HashMap::new(),
            closed: Arc::clone(&closed),
            sweep_every,
        };
        let handle = MuxHandle {
            commands: tx,
            closed,
            call_timeout: config.call_timeout,
        };
        (mux, handle)
    }

    /// Creates a multiplexer and runs it on a new tokio task.
    pub fn spawn(sink: S, stream: R, config: &ClientConfig) -> MuxHandle {
        let (mux, handle) = Self::new(sink, stream, config);
        tokio::spawn(mux.run());
        handle
    }

    /// Runs until the connection closes and returns why it closed.
    ///
    /// Every call still pending at that point is rejected with the reason.
    /// The writer task stops once this returns and closes the sink.
    pub async fn run(mut self) -> CloseReason {
        if let Some(writer) = self.writer.take() {
            tokio::spawn(writer.run());
        }
        let period = self.sweep_every;
        let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut streak = 0usize;
        let reason = loop {
            // A steady flow of commands must not starve the receive side.
            if streak >= COMMAND_BURST {
                streak = 0;
                let ready = tokio::select! {
                    biased;
                    frame = self.stream.recv() => Some(frame),
                    () = std::future::ready(()) => None,
                };
                if let Some(frame) = ready {
                    if let Some(reason) = self.on_frame(frame) {
                        break reason;
                    }
                    continue;
                }
            }

            tokio::select! {
                biased;

                failure = self.failures.recv() => {
                    if let Some(reason) = self.on_send_failure(failure) {
                        break reason;
                    }
                }

                command = self.commands.recv() => {
                    streak += 1;
                    if let Some(reason) = self.on_command(command) {
                        break reason;
                    }
                }

                frame = self.stream.recv() => {
                    streak = 0;
                    if let Some(reason) = self.on_frame(frame) {
                        break reason;
                    }
                }

                _ = sweep.tick() => self.prune_abandoned(),
            }
        };

        self.shutdown(reason.clone());
        reason
    }

    fn on_command(&mut self, command: Option<Command>) -> Option<CloseReason> {
        match command {
            Some(Command::Call { message, reply }) => self.issue(message, reply),
            Some(Command::Register { kind, handler }) => {
                self.handlers.insert(kind, handler);
            }
            Some(Command::Close) => return Some(CloseReason::ClosedByClient),
            None => return Some(CloseReason::HandleDropped),
        }
        None
    }

    fn on_frame(&mut self, frame: Option<ClientResult<String>>) -> Option<CloseReason> {
        match frame {
            Some(Ok(text)) => {
                self.dispatch(&text);
                None
            }
            Some(Err(err)) => Some(transport_reason(err)),
            None => Some(CloseReason::PeerClosed),
        }
    }

    fn on_send_failure(&mut self, failure: Option<SendFailure>) -> Option<CloseReason> {
        match failure {
            Some(SendFailure { id, error }) if error.is_retryable() => {
                tracing::debug!(id = %id, error = %error, "mux.call.send_failed");
                if let Some(waiter) = self.pending.remove(&id) {
                    let _ = waiter.send(Err(error));
                }
                None
            }
            Some(SendFailure { error, .. }) => Some(transport_reason(error)),
            None => Some(CloseReason::Stopped),
        }
    }

    /// Frames one call and queues it for the writer.
    fn issue(&mut self, message: Value, reply: Reply) {
        self.prune_abandoned();

        let id = Uuid::new_v4().to_string();
        let frame = CallFrame {
            id: id.clone(),
            message,
        };
        let text = match frame.encode() {
            Ok(text) => text,
            Err(err) => {
                let _ = reply.send(Err(err.into()));
                return;
            }
        };

        // Recorded before the frame can reach the wire.
        self.pending.insert(id.clone(), reply);
        if self.outgoing.send(Outgoing { id: id.clone(), text }).is_err() {
            if let Some(waiter) = self.pending.remove(&id) {
                let _ = waiter.send(Err(ClientError::transport_fatal("writer stopped")));
            }
            return;
        }
        tracing::debug!(id = %id, pending = self.pending.len(), "mux.call.queued");
    }

    /// Drops records whose callers stopped waiting.
    fn prune_abandoned(&mut self) {
        let before = self.pending.len();
        self.pending.retain(|_, waiter| !waiter.is_closed());
        let pruned = before - self.pending.len();
        if pruned > 0 {
            tracing::debug!(pruned, pending = self.pending.len(), "mux.pending.pruned");
        }
    }

    /// Routes one inbound frame.
    fn dispatch(&mut self, text: &str) {
        match Frame::parse(text) {
            Ok(Frame::Response(ResponseFrame { id, response })) => {
                match self.pending.remove(&id) {
                    Some(waiter) => {
                        if waiter.send(Ok(response)).is_err() {
                            tracing::debug!(id = %id, "mux.response.abandoned");
                        } else {
                            tracing::debug!(id = %id, "mux.response.resolved");
                        }
                    }
                    None => tracing::warn!(id = %id, "mux.response.unknown_id"),
                }
            }
            Ok(Frame::Event { kind, body }) => match self.handlers.get_mut(&kind) {
                Some(handler) => {
                    tracing::trace!(kind = %kind, "mux.event.dispatched");
                    handler(body);
                }
                None => tracing::trace!(kind = %kind, "mux.event.unhandled"),
            },
            Err(err) => tracing::warn!(error = %err, "mux.frame.dropped"),
        }
    }

    fn shutdown(&mut self, reason: CloseReason) {
        *self.closed.write() = Some(reason.clone());
        self.commands.close();

        let mut rejected = 0usize;
        for (_, waiter) in self.pending.drain() {
            if waiter.send(Err(ClientError::Closed(reason.clone()))).is_ok() {
                rejected += 1;
            }
        }
        // Calls that raced with the close never reached the wire.
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Call { reply, .. } = command {
                if reply.send(Err(ClientError::Closed(reason.clone()))).is_ok() {
                    rejected += 1;
                }
            }
        }
        tracing::debug!(reason = %reason, rejected, "mux.closed");
    }
}

fn transport_reason(err: ClientError) -> CloseReason {
    match err {
        ClientError::Transport { message, .. } => CloseReason::Transport(message),
        other => CloseReason::Transport(other.to_string()),
    }
}

/// A cloneable handle for issuing calls and registering event handlers.
///
/// The connection closes with [`CloseReason::HandleDropped`] once every
/// handle is gone. A handle captured inside an event handler keeps the
/// connection open.
#[derive(Clone)]
pub struct MuxHandle {
    commands: mpsc::UnboundedSender<Command>,
    closed: Arc<RwLock<Option<CloseReason>>>,
    call_timeout: Option<Duration>,
}

impl MuxHandle {
    /// Sends `message` as a call and waits for the raw response payload.
    pub async fn call<M: Serialize + ?Sized>(&self, message: &M) -> ClientResult<Value> {
        let message = serde_json::to_value(message)?;
        self.call_value(message).await
    }

    /// Sends an already-encoded payload as a call.
    pub async fn call_value(&self, message: Value) -> ClientResult<Value> {
        if let Some(reason) = self.close_reason() {
            return Err(ClientError::Closed(reason));
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Call { message, reply })
            .map_err(|_| self.closed_error())?;

        let outcome = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| ClientError::Timeout)?,
            None => rx.await,
        };
        outcome.map_err(|_| self.closed_error())?
    }

    /// Sends a call and decodes the response as `T`.
    ///
    /// A response that does not decode is a [`ClientError::Protocol`] error.
    pub async fn call_as<M, T>(&self, message: &M) -> ClientResult<T>
    where
        M: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.call(message).await?;
        serde_json::from_value(value).map_err(|err| ClientError::Protocol(err.to_string()))
    }

    /// Registers the handler for events tagged `kind`, replacing any
    /// previous one.
    ///
    /// The handler runs on the multiplexer task, in frame order.
    pub fn on_event<F>(&self, kind: impl Into<String>, handler: F) -> ClientResult<()>
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.commands
            .send(Command::Register {
                kind: kind.into(),
                handler: Box::new(handler),
            })
            .map_err(|_| self.closed_error())
    }

    /// Closes the connection. Pending calls fail with
    /// [`CloseReason::ClosedByClient`].
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Returns true once the multiplexer has shut down.
    pub fn is_closed(&self) -> bool {
        self.closed.read().is_some()
    }

    /// Returns why the connection closed, if it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed.read().clone()
    }

    fn closed_error(&self) -> ClientError {
        ClientError::Closed(self.close_reason().unwrap_or(CloseReason::Stopped))
    }
}
