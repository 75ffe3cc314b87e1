// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Camera-stream WebSocket: clients push base64 JPEG frames, the server
//! samples them, runs detection on the sampled frames and pushes results
//! plus a rolling aggregate back.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

use super::server::AppState;
use crate::storage::RecordSource;
use crate::vision::image_utils::decode_base64_image;
use crate::vision::{FrameSampler, StreamAggregate};

pub async fn camera_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_stream(socket, state))
}

async fn handle_stream(mut socket: WebSocket, state: AppState) {
    let mut sampler = FrameSampler::new(state.settings.frame_stride);
    let mut aggregate = StreamAggregate::default();

    info!(
        "📷 Camera stream connected (stride: {})",
        state.settings.frame_stride
    );

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                    let _ = send_error(&mut socket, "Invalid JSON message").await;
                    continue;
                };

                match parsed["type"].as_str() {
                    Some("frame") => {
                        state
                            .metrics
                            .stream_frames_total
                            .fetch_add(1, Ordering::Relaxed);

                        if !sampler.should_process() {
                            aggregate.observe_skip();
                            continue;
                        }

                        let Some(data) = parsed["data"].as_str() else {
                            let _ = send_error(&mut socket, "Frame message missing data").await;
                            continue;
                        };

                        let image = match decode_base64_image(data) {
                            Ok((image, _info)) => image,
                            Err(e) => {
                                let _ =
                                    send_error(&mut socket, &format!("Invalid frame: {}", e)).await;
                                continue;
                            }
                        };

                        // Stream frames skip annotation; clients draw from boxes
                        match state.diagnosis.detect_sick_chickens(&image, false) {
                            Ok(outcome) => {
                                aggregate
                                    .observe_frame(outcome.total_chickens, outcome.sick_count);

                                // Only alerting frames are worth persisting
                                if outcome.has_sick_chickens {
                                    state
                                        .store
                                        .record_detection(
                                            RecordSource::Stream,
                                            outcome.total_chickens,
                                            outcome.healthy_count,
                                            outcome.sick_count,
                                            json!(outcome.detections),
                                        )
                                        .await;
                                }

                                let reply = json!({
                                    "type": "detection",
                                    "result": outcome,
                                    "aggregate": aggregate,
                                });
                                if socket
                                    .send(Message::Text(reply.to_string()))
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Stream detection failed: {}", e);
                                if send_error(&mut socket, &e.to_string()).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some("end") => {
                        let reply = json!({
                            "type": "summary",
                            "aggregate": aggregate,
                        });
                        let _ = socket.send(Message::Text(reply.to_string())).await;
                        break;
                    }
                    other => {
                        debug!("Ignoring unknown stream message type: {:?}", other);
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!("Camera stream socket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    info!(
        "📷 Camera stream closed: {} frames seen, {} processed, {} sick frames",
        aggregate.frames_seen, aggregate.frames_processed, aggregate.sick_frames
    );
}

async fn send_error(socket: &mut WebSocket, message: &str) -> Result<(), axum::Error> {
    let reply = json!({
        "type": "error",
        "error": message,
    });
    socket.send(Message::Text(reply.to_string())).await
}
