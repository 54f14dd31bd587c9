use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use super::{failure, AppState};
use crate::sources::ChatMessage;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/chat", post(chat))
}

/// Pull `messages` and the optional `context` object out of a chat body.
fn parse_chat(body: Value) -> Option<(Vec<ChatMessage>, Option<Value>)> {
    // ---
    let Value::Object(mut fields) = body else {
        return None;
    };
    let messages = serde_json::from_value(fields.remove("messages")?).ok()?;
    let context = fields.remove("context").filter(Value::is_object);
    Some((messages, context))
}

/// `POST /api/chat {messages, context?}`. Upstream failures still answer
/// `success: true` with a canned reply.
async fn chat(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    // ---
    let Some((messages, context)) = body.ok().and_then(|Json(body)| parse_chat(body)) else {
        return failure(StatusCode::BAD_REQUEST, "Invalid messages format");
    };
    tracing::debug!("POST /api/chat: {} messages", messages.len());

    let reply = state.chat.reply(&messages, context.as_ref()).await;
    Json(json!({ "success": true, "reply": reply })).into_response()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_chat() {
        // ---
        let (messages, context) = parse_chat(json!({
            "messages": [{ "role": "user", "content": "Is it safe to run outside?" }],
            "context": { "stationId": "MHXY_001" }
        }))
        .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert!(context.is_some());

        let (_, context) = parse_chat(json!({ "messages": [], "context": "nope" })).unwrap();
        assert!(context.is_none());

        assert!(parse_chat(json!({ "messages": "hello" })).is_none());
        assert!(parse_chat(json!({ "context": {} })).is_none());
        assert!(parse_chat(json!([1, 2])).is_none());
    }
}
