//! Streaming response aggregation over the Spark WebSocket protocol.
//!
//! One request frame goes out after connect; content deltas stream back until
//! the terminal marker, an upstream error code, or the caller's wait bound.
//! Every call owns its own [`StreamSession`] — nothing is shared between
//! requests, so concurrent generations cannot corrupt each other's buffers.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::Config;
use crate::error::GenerateError;

/// Inbound `header.status` value signaling no further frames will arrive.
const TERMINAL_STATUS: i64 = 2;

// ---------------------------------------------------------------------------
// Wire frames
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    header: RequestHeader,
    parameter: Parameter,
    payload: RequestPayload,
}

#[derive(Debug, Serialize)]
struct RequestHeader {
    app_id: String,
    uid: String,
}

#[derive(Debug, Serialize)]
struct Parameter {
    chat: ChatParams,
}

#[derive(Debug, Serialize)]
struct ChatParams {
    domain: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct RequestPayload {
    message: RequestMessage,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    text: Vec<ChatTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatRequest {
    /// Build the single outbound frame for one conversation (system + user).
    pub fn new(config: &Config, system: &str, user: &str) -> Self {
        let uid: String = uuid::Uuid::new_v4().simple().to_string();
        Self {
            header: RequestHeader {
                app_id: config.app_id.clone(),
                uid: uid[..10].to_string(),
            },
            parameter: Parameter {
                chat: ChatParams {
                    domain: config.domain.clone(),
                    temperature: config.temperature,
                    max_tokens: config.max_tokens,
                },
            },
            payload: RequestPayload {
                message: RequestMessage {
                    text: vec![
                        ChatTurn {
                            role: "system".to_string(),
                            content: system.to_string(),
                        },
                        ChatTurn {
                            role: "user".to_string(),
                            content: user.to_string(),
                        },
                    ],
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseFrame {
    pub header: ResponseHeader,
    #[serde(default)]
    pub payload: Option<ResponsePayload>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    pub code: i64,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePayload {
    #[serde(default)]
    pub choices: Option<Choices>,
}

#[derive(Debug, Deserialize)]
pub struct Choices {
    #[serde(default)]
    pub text: Vec<ContentDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ContentDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ResponseFrame {
    /// The content delta carried by this frame, if any. Frames without a
    /// payload or choice are skipped by the aggregator.
    fn content_delta(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .choices
            .as_ref()?
            .text
            .first()?
            .content
            .as_deref()
    }
}

// ---------------------------------------------------------------------------
// Session state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Open,
    Done,
    Failed,
}

/// Per-request accumulation state. Append-only while `Open`; once the status
/// leaves `Open` it never reverts, and later frames are ignored.
#[derive(Debug)]
pub struct StreamSession {
    buffer: String,
    status: StreamStatus,
    error_code: Option<i64>,
    error_message: Option<String>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            status: StreamStatus::Open,
            error_code: None,
            error_message: None,
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn error_code(&self) -> Option<i64> {
        self.error_code
    }

    /// Fold one inbound frame into the session, in arrival order.
    pub fn apply_frame(&mut self, frame: &ResponseFrame) {
        if self.status != StreamStatus::Open {
            return;
        }
        if frame.header.code != 0 {
            self.status = StreamStatus::Failed;
            self.error_code = Some(frame.header.code);
            self.error_message = frame.header.message.clone();
            return;
        }
        if let Some(delta) = frame.content_delta() {
            self.buffer.push_str(delta);
        }
        if frame.header.status == TERMINAL_STATUS {
            self.status = StreamStatus::Done;
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AggregateResult {
    pub text: String,
    pub status: StreamStatus,
    /// True when the wait bound elapsed before a terminal frame. Whatever was
    /// buffered at that instant is the final text; nothing is sent upstream.
    pub timed_out: bool,
}

/// Open the signed connection, send the request frame, and accumulate content
/// deltas until DONE, FAILED, or the wait bound.
pub async fn aggregate(
    signed_url: &str,
    request: &ChatRequest,
    wait: Duration,
) -> Result<AggregateResult, GenerateError> {
    let (mut ws, _) = connect_async(signed_url)
        .await
        .map_err(|e| GenerateError::Transport(e.to_string()))?;
    tracing::debug!("websocket connected");

    let outbound =
        serde_json::to_string(request).map_err(|e| GenerateError::Transport(e.to_string()))?;
    ws.send(Message::Text(outbound.into()))
        .await
        .map_err(|e| GenerateError::Transport(e.to_string()))?;

    let mut session = StreamSession::new();
    let drive = async {
        while let Some(message) = ws.next().await {
            let message = message.map_err(|e| GenerateError::Transport(e.to_string()))?;
            match message {
                Message::Text(text) => {
                    let frame: ResponseFrame = match serde_json::from_str(text.as_ref()) {
                        Ok(frame) => frame,
                        Err(err) => {
                            // Malformed frames are dropped; the terminal
                            // marker can still arrive on a later frame.
                            tracing::debug!("ignoring unparseable frame: {err}");
                            continue;
                        }
                    };
                    session.apply_frame(&frame);
                    match session.status() {
                        StreamStatus::Open => {}
                        StreamStatus::Done => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        StreamStatus::Failed => break,
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok::<(), GenerateError>(())
    };

    let timed_out = match tokio::time::timeout(wait, drive).await {
        Ok(result) => {
            result?;
            false
        }
        // Partial acceptance: keep the buffer, send no cancellation upstream.
        Err(_) => true,
    };

    if session.status() == StreamStatus::Failed {
        let code = session.error_code().unwrap_or(-1);
        let message = session
            .error_message
            .clone()
            .unwrap_or_else(|| "unspecified upstream error".to_string());
        return Err(GenerateError::Upstream { code, message });
    }

    tracing::debug!(
        chars = session.text().len(),
        timed_out,
        "aggregation finished"
    );
    let status = if timed_out {
        StreamStatus::Open
    } else {
        session.status
    };
    Ok(AggregateResult {
        text: session.buffer,
        status,
        timed_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn frame(json: &str) -> ResponseFrame {
        serde_json::from_str(json).unwrap()
    }

    fn content_frame(content: &str, status: i64) -> ResponseFrame {
        frame(&format!(
            r#"{{"header":{{"code":0,"status":{status}}},
                "payload":{{"choices":{{"text":[{{"content":"{content}"}}]}}}}}}"#
        ))
    }

    #[test]
    fn happy_path_accumulates_in_arrival_order() {
        let mut session = StreamSession::new();
        session.apply_frame(&content_frame("A", 1));
        assert_eq!(session.status(), StreamStatus::Open);
        session.apply_frame(&content_frame("B", 2));
        assert_eq!(session.text(), "AB");
        assert_eq!(session.status(), StreamStatus::Done);
    }

    #[test]
    fn nonzero_code_fails_immediately_with_empty_buffer() {
        let mut session = StreamSession::new();
        session.apply_frame(&frame(
            r#"{"header":{"code":1,"status":0,"message":"quota exceeded"}}"#,
        ));
        assert_eq!(session.status(), StreamStatus::Failed);
        assert_eq!(session.error_code(), Some(1));
        assert_eq!(session.text(), "");
    }

    #[test]
    fn frames_after_terminal_state_are_ignored() {
        let mut session = StreamSession::new();
        session.apply_frame(&content_frame("done", 2));
        session.apply_frame(&content_frame("late", 1));
        assert_eq!(session.text(), "done");
        assert_eq!(session.status(), StreamStatus::Done);

        let mut failed = StreamSession::new();
        failed.apply_frame(&frame(r#"{"header":{"code":7}}"#));
        failed.apply_frame(&content_frame("late", 2));
        assert_eq!(failed.status(), StreamStatus::Failed);
        assert_eq!(failed.text(), "");
    }

    #[test]
    fn frames_without_payload_or_choice_are_skipped() {
        let mut session = StreamSession::new();
        session.apply_frame(&frame(r#"{"header":{"code":0,"status":1}}"#));
        session.apply_frame(&frame(
            r#"{"header":{"code":0,"status":1},"payload":{"choices":{"text":[]}}}"#,
        ));
        assert_eq!(session.text(), "");
        assert_eq!(session.status(), StreamStatus::Open);
    }

    /// One-connection server: accepts, reads the request frame, replies with
    /// the given frames, then either stalls or closes.
    async fn spawn_stream_server(frames: Vec<String>, stall: bool) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.next().await;
            for frame in frames {
                if ws.send(Message::Text(frame.into())).await.is_err() {
                    return;
                }
            }
            if stall {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            let _ = ws.close(None).await;
        });
        format!("ws://{addr}")
    }

    fn request() -> ChatRequest {
        ChatRequest::new(&Config::default(), "be terse", "make a button")
    }

    #[tokio::test]
    async fn aggregate_collects_deltas_until_the_terminal_frame() {
        let url = spawn_stream_server(
            vec![
                r#"{"header":{"code":0,"status":1},"payload":{"choices":{"text":[{"content":"A"}]}}}"#.to_string(),
                r#"{"header":{"code":0,"status":2},"payload":{"choices":{"text":[{"content":"B"}]}}}"#.to_string(),
            ],
            false,
        )
        .await;
        let result = aggregate(&url, &request(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.text, "AB");
        assert_eq!(result.status, StreamStatus::Done);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn aggregate_surfaces_upstream_error_codes() {
        let url = spawn_stream_server(
            vec![r#"{"header":{"code":10163,"status":0,"message":"invalid parameter"}}"#.to_string()],
            false,
        )
        .await;
        let err = aggregate(&url, &request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            GenerateError::Upstream { code, message } => {
                assert_eq!(code, 10163);
                assert_eq!(message, "invalid parameter");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn aggregate_keeps_the_buffer_when_the_wait_elapses() {
        let url = spawn_stream_server(
            vec![
                r#"{"header":{"code":0,"status":1},"payload":{"choices":{"text":[{"content":"partial"}]}}}"#.to_string(),
            ],
            true,
        )
        .await;
        let result = aggregate(&url, &request(), Duration::from_millis(300))
            .await
            .unwrap();
        assert!(result.timed_out);
        assert_eq!(result.text, "partial");
        assert_eq!(result.status, StreamStatus::Open);
    }

    #[tokio::test]
    async fn aggregate_reports_a_refused_connection_as_transport() {
        let err = aggregate("ws://127.0.0.1:1/", &request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Transport(_)));
    }

    #[test]
    fn request_frame_has_the_expected_shape() {
        let config = Config {
            app_id: "app123".to_string(),
            ..Config::default()
        };
        let request = ChatRequest::new(&config, "be terse", "make a button");
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();

        assert_eq!(value["header"]["app_id"], "app123");
        assert_eq!(value["header"]["uid"].as_str().unwrap().len(), 10);
        assert_eq!(value["parameter"]["chat"]["domain"], "spark-x");
        assert_eq!(value["parameter"]["chat"]["max_tokens"], 4096);
        let turns = value["payload"]["message"]["text"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "system");
        assert_eq!(turns[1]["role"], "user");
        assert_eq!(turns[1]["content"], "make a button");
    }
}
