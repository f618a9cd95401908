//! HttpBackend and Conversation against a local axum server speaking the
//! chat backend's HTTP surface.

use axum::Json;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use chatq_core::api::client::TENANT_HEADER;
use chatq_core::api::{ApiError, ChatBackend, HttpBackend};
use chatq_core::app::domain::{ERROR_APOLOGY, ExchangeOutcome, FeedbackKind, Role};
use chatq_core::app::{Conversation, FeedbackOutcome, SendOutcome};
use chatq_core::config::ClientConfig;
use chatq_core::session::{InMemorySessionStore, SESSION_ID_KEY, SessionStore};

const TENANT: &str = "acme";

#[derive(Clone, Default)]
struct Server {
    /// Body chunks for the next stream; `None` answers 500.
    stream_chunks: Arc<Mutex<Option<Vec<&'static str>>>>,
    seen: Arc<Mutex<Seen>>,
}

#[derive(Default)]
struct Seen {
    tenants: Vec<Option<String>>,
    authorization: Vec<Option<String>>,
    questions: Vec<Value>,
    feedback: Vec<Value>,
    handoffs: Vec<Value>,
}

impl Server {
    async fn note_headers(&self, headers: &HeaderMap) {
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let mut seen = self.seen.lock().await;
        seen.tenants.push(header_value(TENANT_HEADER));
        seen.authorization
            .push(header_value(header::AUTHORIZATION.as_str()));
    }
}

async fn stream(State(server): State<Server>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    server.note_headers(&headers).await;
    server.seen.lock().await.questions.push(body);

    let Some(chunks) = server.stream_chunks.lock().await.take() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    };
    let body = futures::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, std::io::Error>(Bytes::from_static(c.as_bytes()))),
    );
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn answer(State(server): State<Server>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    server.note_headers(&headers).await;
    server.seen.lock().await.questions.push(body);
    Json(json!({
        "sessionId": "s-9",
        "answer": "Keine passende Antwort gefunden.",
        "confidenceScore": 0.2,
        "sources": null,
        "handoffTriggered": true,
        "handoffMessage": "Ein Mitarbeiter wird sich bei Ihnen melden."
    }))
}

async fn history(
    State(server): State<Server>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Response {
    server.note_headers(&headers).await;
    if session_id != "s-known" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        {"id": 1, "role": "USER", "content": "Wann habt ihr offen?", "createdAt": "2025-01-01T10:00:00"},
        {"id": 2, "role": "ASSISTANT", "content": "Bis 18 Uhr.", "confidenceScore": 0.9, "faqEntryId": 4},
        {"id": 3, "role": "SYSTEM", "content": "Ein Mitarbeiter wurde informiert."}
    ]))
    .into_response()
}

async fn feedback(State(server): State<Server>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    server.note_headers(&headers).await;
    server.seen.lock().await.feedback.push(body);
    StatusCode::CREATED
}

async fn handoff(State(server): State<Server>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    server.note_headers(&headers).await;
    server.seen.lock().await.handoffs.push(body);
    Json(json!({"id": 77, "status": "OPEN", "createdAt": "2025-01-01T10:00:00"}))
}

async fn spawn_server(server: Server) -> String {
    let app = Router::new()
        .route("/api/chat", post(answer))
        .route("/api/chat/stream", post(stream))
        .route("/api/chat/history/{session_id}", get(history))
        .route("/api/chat/feedback", post(feedback))
        .route("/api/chat/handoff", post(handoff))
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/chat")
}

fn backend_for(base_url: String) -> HttpBackend {
    let config = ClientConfig {
        base_url,
        tenant_id: TENANT.to_string(),
        ..ClientConfig::default()
    };
    HttpBackend::new(&config).unwrap()
}

#[tokio::test]
async fn streams_a_reply_split_across_chunks() {
    let server = Server::default();
    *server.stream_chunks.lock().await = Some(vec![
        "event:token\ndata:Wir haben\n\nevent:tok",
        "en\ndata: bis 18 Uhr ge\u{f6}",
        "ffnet.\n\nevent:metadata\ndata:{\"sessionId\":\"s-1\",\"confidenceScore\":0.85,",
        "\"sources\":[{\"type\":\"FAQ\",\"title\":\"Zeiten\",\"id\":4}],\"handoffTriggered\":false}\n\n",
        "event:messageId\ndata:{\"messageId\":31}\n\n",
    ]);
    let base_url = spawn_server(server.clone()).await;
    let store = Arc::new(InMemorySessionStore::new());
    let backend = Arc::new(backend_for(base_url).with_auth_token(Some("t0k".to_string())));
    let mut conversation = Conversation::new(backend, store.clone());

    let outcome = conversation
        .send("Wann habt ihr offen?", CancellationToken::new())
        .await;

    assert_eq!(outcome, SendOutcome::Finished(ExchangeOutcome::Completed));
    let answer = &conversation.state().messages[1];
    assert_eq!(answer.content, "Wir haben bis 18 Uhr geöffnet.");
    assert_eq!(answer.id, Some(31));
    assert_eq!(answer.sources[0].title, "Zeiten");
    assert_eq!(store.get(SESSION_ID_KEY).await.unwrap().as_deref(), Some("s-1"));

    let seen = server.seen.lock().await;
    assert_eq!(seen.tenants, vec![Some(TENANT.to_string())]);
    assert_eq!(seen.authorization, vec![Some("Bearer t0k".to_string())]);
    assert_eq!(seen.questions, vec![json!({"question": "Wann habt ihr offen?"})]);
}

#[tokio::test]
async fn asks_without_streaming() {
    let server = Server::default();
    let base_url = spawn_server(server.clone()).await;
    let store = Arc::new(InMemorySessionStore::new());
    let mut conversation = Conversation::new(Arc::new(backend_for(base_url)), store.clone());

    let outcome = conversation.ask("Kann ich k\u{fc}ndigen?", CancellationToken::new()).await;

    assert_eq!(outcome, SendOutcome::Finished(ExchangeOutcome::Completed));
    let messages = &conversation.state().messages;
    assert_eq!(messages[1].content, "Keine passende Antwort gefunden.");
    assert!(messages[1].sources.is_empty());
    assert_eq!(messages[2].content, "Ein Mitarbeiter wird sich bei Ihnen melden.");
    assert_eq!(store.get(SESSION_ID_KEY).await.unwrap().as_deref(), Some("s-9"));

    let seen = server.seen.lock().await;
    assert_eq!(seen.tenants, vec![Some(TENANT.to_string())]);
    assert_eq!(seen.questions, vec![json!({"question": "Kann ich kündigen?"})]);
}

#[tokio::test]
async fn server_error_shows_apology() {
    let server = Server::default();
    let base_url = spawn_server(server).await;
    let backend = Arc::new(backend_for(base_url));
    let mut conversation = Conversation::new(backend, Arc::new(InMemorySessionStore::new()));

    let outcome = conversation.send("hi", CancellationToken::new()).await;

    assert_eq!(outcome, SendOutcome::Finished(ExchangeOutcome::Failed));
    assert_eq!(conversation.state().messages[1].content, ERROR_APOLOGY);
    assert!(!conversation.state().is_loading());
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let base_url = spawn_server(Server::default()).await;
    let backend = backend_for(base_url);

    let err = backend.history("s-unknown").await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}

#[tokio::test]
async fn resumes_session_from_history() {
    let base_url = spawn_server(Server::default()).await;
    let store = Arc::new(InMemorySessionStore::new());
    store.set(SESSION_ID_KEY, "s-known").await.unwrap();

    let conversation = Conversation::open(Arc::new(backend_for(base_url)), store).await;

    let messages = &conversation.state().messages;
    assert_eq!(conversation.session_id(), Some("s-known"));
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "Bis 18 Uhr.");
    assert_eq!(messages[1].id, Some(2));
    assert_eq!(messages[2].role, Role::Assistant);
}

#[tokio::test]
async fn feedback_and_handoff_reach_the_backend() {
    let server = Server::default();
    *server.stream_chunks.lock().await = Some(vec![
        "event:token\ndata:Antwort\n\n",
        "event:metadata\ndata:{\"sessionId\":\"s-5\",\"handoffTriggered\":false}\n\n",
        "event:messageId\ndata:{\"messageId\":9}\n\n",
    ]);
    let base_url = spawn_server(server.clone()).await;
    let mut conversation = Conversation::new(
        Arc::new(backend_for(base_url)),
        Arc::new(InMemorySessionStore::new()),
    );
    conversation.send("Frage", CancellationToken::new()).await;

    let outcome = conversation
        .submit_feedback(1, FeedbackKind::Negative, Some("falsch".to_string()))
        .await;
    let ticket = conversation
        .request_handoff(Some("Jo".to_string()), "jo@example.com", None)
        .await
        .unwrap();

    assert_eq!(outcome, FeedbackOutcome::Recorded);
    assert_eq!(ticket.id, 77);
    let seen = server.seen.lock().await;
    assert_eq!(
        seen.feedback,
        vec![json!({"messageId": 9, "feedbackType": "NEGATIVE", "comment": "falsch"})]
    );
    assert_eq!(
        seen.handoffs,
        vec![json!({"sessionId": "s-5", "name": "Jo", "email": "jo@example.com"})]
    );
}
