//! Webhook and status handlers.
//!
//! The telephony provider drives the call by fetching `/voice` for gather
//! instructions and posting each transcript to `/process_speech`; both
//! answer with call-control XML. `/status` and `/health` are for the humans
//! and pollers on our side.

use axum::extract::{Extension, Form};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use holdline_call::CallManager;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// An XML body with the content type the provider expects.
pub struct Xml(pub String);

impl IntoResponse for Xml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], self.0).into_response()
    }
}

/// Form body the provider posts after gathering speech.
#[derive(Debug, Deserialize)]
pub struct SpeechCallback {
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: String,

    #[serde(rename = "CallSid", default)]
    pub call_sid: String,

    /// Recognition confidence, logged only.
    #[serde(rename = "Confidence")]
    pub confidence: Option<f64>,
}

/// Handler for `GET|POST /voice`.
pub async fn voice(Extension(manager): Extension<Arc<CallManager>>) -> Xml {
    Xml(manager.voice_document().to_xml())
}

/// Handler for `POST /process_speech`.
pub async fn process_speech(
    Extension(manager): Extension<Arc<CallManager>>,
    Form(callback): Form<SpeechCallback>,
) -> Xml {
    let response = manager.process_speech(
        &callback.speech_result,
        &callback.call_sid,
        callback.confidence,
    );
    Xml(response.to_xml())
}

/// Handler for `GET /status`: the lifecycle snapshot, side-effect free.
pub async fn status(Extension(manager): Extension<Arc<CallManager>>) -> Json<Value> {
    let status = manager.status();
    Json(serde_json::to_value(status).unwrap_or_else(|_| json!({"error": "unserializable"})))
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by monitoring and
/// CI to verify the server is running.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
