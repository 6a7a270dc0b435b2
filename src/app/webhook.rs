//! The webhook transport: signature check, event fan-out, acknowledgement.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;

use crate::app::line::LineClient;
use crate::router::QueryRouter;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<QueryRouter>,
    pub line: Arc<LineClient>,
    pub channel_secret: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/webhook", post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reply_token: Option<String>,
    #[serde(default)]
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Verify, parse, and run one pipeline per event. The acknowledgement is
/// held until every pipeline has finished, mirroring the platform's
/// batch-delivery contract.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return StatusCode::UNAUTHORIZED;
    };
    if !verify_signature(&state.channel_secret, &body, signature) {
        tracing::warn!("webhook signature mismatch");
        return StatusCode::UNAUTHORIZED;
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(?err, "unparseable webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let mut pipelines = JoinSet::new();
    for event in payload.events {
        let state = state.clone();
        pipelines.spawn(async move { dispatch_event(state, event).await });
    }
    while let Some(joined) = pipelines.join_next().await {
        if let Err(err) = joined {
            tracing::error!(?err, "event pipeline aborted");
        }
    }

    StatusCode::OK
}

/// Answer one event. Only text messages produce a reply; everything else
/// is acknowledged and dropped, as the platform expects.
async fn dispatch_event(state: AppState, event: WebhookEvent) {
    if event.kind != "message" {
        return;
    }
    let Some(message) = event.message else {
        return;
    };
    if message.kind != "text" {
        return;
    }
    let (Some(text), Some(reply_token)) = (message.text, event.reply_token) else {
        return;
    };

    let answer = state.router.answer(text.trim()).await;
    if let Err(err) = state.line.reply(&reply_token, &answer).await {
        tracing::error!(?err, "reply send failed");
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Check the platform signature: base64(HMAC-SHA256(channel secret, body)).
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    let Ok(claimed) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };
    mac.verify_slice(&claimed).is_ok()
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"events":[]}"#;
        let signature = sign("secret", body);
        assert!(verify_signature("secret", body, &signature));
    }

    #[test]
    fn rejects_wrong_secret_or_tampered_body() {
        let body = br#"{"events":[]}"#;
        let signature = sign("secret", body);
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("secret", br#"{"events":[{}]}"#, &signature));
        assert!(!verify_signature("secret", body, "not base64!"));
    }

    #[test]
    fn parses_platform_event_payload() {
        let raw = r#"{
            "destination": "U0000",
            "events": [{
                "type": "message",
                "replyToken": "abcd1234",
                "source": {"type": "user", "userId": "U1"},
                "message": {"id": "5", "type": "text", "text": "植牙"}
            }, {
                "type": "follow",
                "replyToken": "efgh5678"
            }]
        }"#;
        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.events.len(), 2);

        let first = &payload.events[0];
        assert_eq!(first.kind, "message");
        assert_eq!(first.reply_token.as_deref(), Some("abcd1234"));
        let message = first.message.as_ref().unwrap();
        assert_eq!(message.kind, "text");
        assert_eq!(message.text.as_deref(), Some("植牙"));

        assert!(payload.events[1].message.is_none());
    }
}
