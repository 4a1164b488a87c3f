//! Frame stream over a WebSocket at `/ws`.
//!
//! Every message is a JSON object `{"event": ..., "data": ...}`. Frames of a
//! session are processed one at a time in arrival order; an undecodable
//! frame gets no reply.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use facestat_core::pipeline::detection_result::ProcessedFrame;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const GREETING: &str = "Connected to detection server";

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ClientEvent {
    VideoFrame { frame: String },
}

#[derive(Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ServerEvent {
    Status { message: &'static str },
    DetectionResult(ProcessedFrame),
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(mut socket: WebSocket, state: Arc<AppState>) {
    log::info!("Client connected");
    if send(&mut socket, &ServerEvent::Status { message: GREETING }).await.is_err() {
        return;
    }

    while let Some(received) = socket.recv().await {
        let text = match received {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log::debug!("Socket error: {e}");
                break;
            }
        };
        let Some(reply) = handle_text(&state, &text).await else {
            continue;
        };
        if send(&mut socket, &reply).await.is_err() {
            break;
        }
    }
    log::info!("Client disconnected");
}

/// Turns one inbound text message into the reply to send, if any.
async fn handle_text(state: &AppState, text: &str) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            log::debug!("Ignoring message: {e}");
            return None;
        }
    };

    match event {
        ClientEvent::VideoFrame { frame } => {
            let pipeline = Arc::clone(&state.pipeline);
            match tokio::task::spawn_blocking(move || pipeline.process(&frame)).await {
                Ok(processed) => processed.map(ServerEvent::DetectionResult),
                Err(e) => {
                    log::warn!("Frame task failed: {e}");
                    None
                }
            }
        }
    }
}

async fn send(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Could not serialize reply: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use facestat_core::pipeline::frame_codec::encode_jpeg_data_uri;
    use facestat_core::shared::frame::Frame;
    use image::{Rgb, RgbImage};
    use rstest::rstest;
    use serde_json::{json, Value};

    fn frame_message(frame: &str) -> String {
        json!({ "event": "video_frame", "data": { "frame": frame } }).to_string()
    }

    fn jpeg_uri() -> String {
        let frame = Frame::from(RgbImage::from_pixel(48, 32, Rgb([120, 80, 40])));
        encode_jpeg_data_uri(&frame, 90).unwrap()
    }

    #[test]
    fn test_greeting_wire_shape() {
        let value = serde_json::to_value(ServerEvent::Status { message: GREETING }).unwrap();
        assert_eq!(
            value,
            json!({ "event": "status", "data": { "message": "Connected to detection server" } })
        );
    }

    #[test]
    fn test_video_frame_is_parsed() {
        let parsed: ClientEvent = serde_json::from_str(&frame_message("data:x;base64,AA==")).unwrap();
        let ClientEvent::VideoFrame { frame } = parsed;
        assert_eq!(frame, "data:x;base64,AA==");
    }

    #[tokio::test]
    async fn test_valid_frame_gets_detection_result() {
        let state = test_state();
        let reply = handle_text(&state, &frame_message(&jpeg_uri())).await.unwrap();

        let value: Value = serde_json::to_value(reply).unwrap();
        assert_eq!(value["event"], "detection_result");
        let data = &value["data"];
        assert_eq!(data["face_count"], 0);
        assert_eq!(data["detections"], json!([]));
        assert!(data["processed_frame"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert!(data["timestamp"].is_string());

        let stats = state.statistics.statistics();
        assert_eq!(stats.detections_per_minute.len(), 1);
        assert!(stats.last_detection_time.is_some());
    }

    #[rstest]
    #[case::not_json("hello")]
    #[case::unknown_event(r#"{"event":"ping","data":{}}"#)]
    #[case::missing_frame(r#"{"event":"video_frame","data":{}}"#)]
    #[case::not_a_data_uri(r#"{"event":"video_frame","data":{"frame":"abc"}}"#)]
    #[tokio::test]
    async fn test_bad_messages_get_no_reply(#[case] text: &str) {
        let state = test_state();
        assert!(handle_text(&state, text).await.is_none());
        assert!(state.statistics.statistics().last_detection_time.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_image_gets_no_reply() {
        let state = test_state();
        let junk = format!("data:image/jpeg;base64,{}", BASE64.encode(b"not a jpeg"));
        assert!(handle_text(&state, &frame_message(&junk)).await.is_none());
        assert!(state.statistics.statistics().detections_per_minute.is_empty());
    }
}
