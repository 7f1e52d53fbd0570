//! Protocol messages and frames.
//!
//! Every frame is a single JSON object. Calls and their responses share an
//! `id`; events carry a `type` tag and no `id`.

use crate::change::Change;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request sent to the sequencer inside a call frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireRequest", into = "WireRequest")]
pub enum Request {
    /// Fetches the document and the current sequence id. Sent as `"start"`.
    Start,
    /// Submits local changes.
    Push {
        /// Changes in the order they were made.
        changes: Vec<Change>,
    },
    /// Fetches changes sequenced after `last_pulled`.
    Pull {
        /// Sequence id of the last pull.
        last_pulled: u64,
    },
}

/// A response from the sequencer inside a response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireResponse", into = "WireResponse")]
pub enum Response {
    /// Answer to `Request::Start`.
    Start {
        /// Full document text.
        document: String,
        /// Sequence id the document corresponds to.
        current_id: u64,
        /// Document title; only sent by later protocol versions.
        title: Option<String>,
    },
    /// Acknowledges a push. Sent as `"push"`.
    PushAck,
    /// Answer to `Request::Pull`.
    Pull {
        /// Changes sequenced since the requested id.
        pulled_changes: Vec<Change>,
        /// Sequence id after the last pulled change.
        current_id: u64,
    },
}

impl Response {
    /// Returns the message kind, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Start { .. } => "start",
            Response::PushAck => "push",
            Response::Pull { .. } => "pull",
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireRequest {
    Keyword(StartKeyword),
    Tagged(TaggedRequest),
}

#[derive(Clone, Serialize, Deserialize)]
enum StartKeyword {
    #[serde(rename = "start")]
    Start,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedRequest {
    Push {
        changes: Vec<Change>,
    },
    Pull {
        #[serde(rename = "lastPulled")]
        last_pulled: u64,
    },
}

impl From<WireRequest> for Request {
    fn from(wire: WireRequest) -> Self {
        match wire {
            WireRequest::Keyword(StartKeyword::Start) => Request::Start,
            WireRequest::Tagged(TaggedRequest::Push { changes }) => Request::Push { changes },
            WireRequest::Tagged(TaggedRequest::Pull { last_pulled }) => {
                Request::Pull { last_pulled }
            }
        }
    }
}

impl From<Request> for WireRequest {
    fn from(request: Request) -> Self {
        match request {
            Request::Start => WireRequest::Keyword(StartKeyword::Start),
            Request::Push { changes } => WireRequest::Tagged(TaggedRequest::Push { changes }),
            Request::Pull { last_pulled } => {
                WireRequest::Tagged(TaggedRequest::Pull { last_pulled })
            }
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireResponse {
    Keyword(PushKeyword),
    Tagged(TaggedResponse),
}

#[derive(Clone, Serialize, Deserialize)]
enum PushKeyword {
    #[serde(rename = "push")]
    Push,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedResponse {
    Start {
        document: String,
        #[serde(rename = "currentId")]
        current_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Pull {
        #[serde(rename = "pulledChanges")]
        pulled_changes: Vec<Change>,
        #[serde(rename = "currentId")]
        current_id: u64,
    },
}

impl From<WireResponse> for Response {
    fn from(wire: WireResponse) -> Self {
        match wire {
            WireResponse::Keyword(PushKeyword::Push) => Response::PushAck,
            WireResponse::Tagged(TaggedResponse::Start {
                document,
                current_id,
                title,
            }) => Response::Start {
                document,
                current_id,
                title,
            },
            WireResponse::Tagged(TaggedResponse::Pull {
                pulled_changes,
                current_id,
            }) => Response::Pull {
                pulled_changes,
                current_id,
            },
        }
    }
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        match response {
            Response::PushAck => WireResponse::Keyword(PushKeyword::Push),
            Response::Start {
                document,
                current_id,
                title,
            } => WireResponse::Tagged(TaggedResponse::Start {
                document,
                current_id,
                title,
            }),
            Response::Pull {
                pulled_changes,
                current_id,
            } => WireResponse::Tagged(TaggedResponse::Pull {
                pulled_changes,
                current_id,
            }),
        }
    }
}

/// Presence information pushed by the sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorEvent {
    /// Opaque presence payload.
    pub editors: Value,
}

impl EditorEvent {
    /// Event-type tag on the wire.
    pub const KIND: &'static str = "editor";

    /// Decodes the event from a full event frame body.
    pub fn from_body(body: Value) -> ProtocolResult<Self> {
        Ok(serde_json::from_value(body)?)
    }

    /// Builds the event frame, `type` tag included.
    pub fn to_body(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(Self::KIND.into()));
        map.insert("editors".into(), self.editors.clone());
        Value::Object(map)
    }
}

/// An outbound call frame: `{"id": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    /// Correlation id, echoed back in the response.
    pub id: String,
    /// Request payload.
    pub message: Value,
}

impl CallFrame {
    /// Encodes the frame as JSON text.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a call frame from JSON text.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A response frame: `{"id": ..., "response": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Correlation id of the call being answered.
    pub id: String,
    /// Response payload; `null` if absent.
    #[serde(default)]
    pub response: Value,
}

impl ResponseFrame {
    /// Encodes the frame as JSON text.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A received frame, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A response to an earlier call.
    Response(ResponseFrame),
    /// An unsolicited event.
    Event {
        /// Event-type tag.
        kind: String,
        /// The whole frame object, `type` included.
        body: Value,
    },
}

impl Frame {
    /// Parses and classifies a frame from JSON text.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        Self::classify(serde_json::from_str(text)?)
    }

    /// Classifies a decoded frame.
    ///
    /// A frame with a non-null `id` is a response, whatever else it carries.
    /// Without one, it must have a string `type` to be an event.
    pub fn classify(value: Value) -> ProtocolResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(ProtocolError::UnexpectedFrame(
                "frame is not an object".into(),
            ));
        };

        match map.remove("id") {
            Some(Value::String(id)) => {
                let response = map.remove("response").unwrap_or(Value::Null);
                Ok(Frame::Response(ResponseFrame { id, response }))
            }
            Some(other) => Err(ProtocolError::UnexpectedFrame(format!(
                "id is not a string: {other}"
            ))),
            // A null id is treated as absent.
            Some(Value::Null) | None => match map.get("type") {
                Some(Value::String(kind)) => Ok(Frame::Event {
                    kind: kind.clone(),
                    body: Value::Object(map),
                }),
                _ => Err(ProtocolError::UnexpectedFrame(
                    "frame has neither an id nor a type".into(),
                )),
            },
        }
    }
}
