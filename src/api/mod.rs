// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod camera_stream;
pub mod chat;
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod knowledge;
pub mod server;
pub mod usage;

pub use chat::{ChatRequest, ChatResponse};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, ModelsLoaded, ServiceInfo};
pub use server::{build_router, start_server, AppState, Metrics};
