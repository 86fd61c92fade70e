use agency::agent::{Agent, LlmAgent};
use agency::cancellation::CancellationSignal;
use agency::client_wrapper::{ClientWrapper, GenerationError};
use agency::clients::ollama::OllamaClient;
use agency::message::AgentRole;
use agency::orchestration::{AgentRegistry, Orchestrator};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy)]
enum Reply {
    /// 200 with `{"response": ...}` echoing the first prompt line.
    Generated,
    /// 200 with valid JSON lacking the `response` field.
    MissingField,
    /// 200 with a body that is not JSON.
    PlainText,
    /// 500 for every request.
    ServerError,
    /// 500 only when the prompt was built for the Developer, 200 otherwise.
    FailDeveloper,
    /// Sleeps before answering.
    Slow(Duration),
}

struct MockOllama {
    reply: Reply,
    requests: Mutex<Vec<serde_json::Value>>,
}

async fn generate(
    State(state): State<Arc<MockOllama>>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, String) {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    state.requests.lock().unwrap().push(body);
    let first_line = prompt.lines().next().unwrap_or_default().to_string();
    let generated = || serde_json::json!({ "response": format!("reply to: {}", first_line), "done": true }).to_string();

    match state.reply {
        Reply::Generated => (StatusCode::OK, generated()),
        Reply::MissingField => (StatusCode::OK, r#"{"done":true}"#.to_string()),
        Reply::PlainText => (StatusCode::OK, "just some text".to_string()),
        Reply::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "model crashed".to_string()),
        Reply::FailDeveloper if first_line.starts_with("You are a Developer") => {
            (StatusCode::INTERNAL_SERVER_ERROR, "model crashed".to_string())
        }
        Reply::FailDeveloper => (StatusCode::OK, generated()),
        Reply::Slow(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, generated())
        }
    }
}

/// Start a mock `/api/generate` server and return its endpoint URL.
async fn start_mock(reply: Reply) -> (String, Arc<MockOllama>) {
    let state = Arc::new(MockOllama {
        reply,
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/api/generate", post(generate))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/generate", addr), state)
}

#[tokio::test]
async fn test_generate_returns_the_response_field() {
    let (endpoint, state) = start_mock(Reply::Generated).await;
    let client = OllamaClient::new(endpoint, "llama3");

    let text = client
        .generate("You are terse.\nInstruction: hi\n", &CancellationSignal::new())
        .await
        .unwrap();
    assert_eq!(text, "reply to: You are terse.");

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "llama3");
    assert_eq!(requests[0]["max_tokens"], 512);
    assert_eq!(requests[0]["stream"], false);
}

#[tokio::test]
async fn test_missing_response_field_returns_raw_body() {
    let (endpoint, _) = start_mock(Reply::MissingField).await;
    let client = OllamaClient::new(endpoint, "llama3");

    let text = client.generate("prompt", &CancellationSignal::new()).await.unwrap();
    assert_eq!(text, r#"{"done":true}"#);
}

#[tokio::test]
async fn test_non_json_body_is_returned_verbatim() {
    let (endpoint, _) = start_mock(Reply::PlainText).await;
    let client = OllamaClient::new(endpoint, "llama3");

    let text = client.generate("prompt", &CancellationSignal::new()).await.unwrap();
    assert_eq!(text, "just some text");
}

#[tokio::test]
async fn test_failure_status_is_reported_with_body() {
    let (endpoint, _) = start_mock(Reply::ServerError).await;
    let client = OllamaClient::new(endpoint, "llama3");

    let err = client
        .generate("prompt", &CancellationSignal::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::Status {
            status: 500,
            reason: Some("Internal Server Error".to_string()),
            body: "model crashed".to_string(),
        }
    );
}

#[tokio::test]
async fn test_slow_backend_surfaces_as_timeout_diagnostic() {
    let (endpoint, _) = start_mock(Reply::Slow(Duration::from_secs(2))).await;
    let client = Arc::new(
        OllamaClient::new(endpoint, "llama3").with_timeout(Duration::from_millis(200)),
    );
    let tester = LlmAgent::new(AgentRole::Tester, client);

    let msg = tester
        .handle(&[], None, &CancellationSignal::new())
        .await
        .unwrap();
    assert_eq!(msg.content, "Tester Exception: Request timed out");
    assert_eq!(msg.from, "qa");
}

#[tokio::test]
async fn test_unreachable_backend_becomes_exception_message() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Arc::new(OllamaClient::new(
        format!("http://{}/api/generate", addr),
        "llama3",
    ));
    let rm = LlmAgent::new(AgentRole::ReleaseManager, client);

    let msg = rm.handle(&[], None, &CancellationSignal::new()).await.unwrap();
    assert!(msg.content.starts_with("ReleaseManager Exception:"), "{}", msg.content);
}

#[tokio::test]
async fn test_cancellation_interrupts_an_in_flight_request() {
    let (endpoint, _) = start_mock(Reply::Slow(Duration::from_secs(5))).await;
    let client = OllamaClient::new(endpoint, "llama3");
    let signal = CancellationSignal::new();

    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client.generate("prompt", &signal).await.unwrap_err();
    assert_eq!(err, GenerationError::Cancelled);
}

#[tokio::test]
async fn test_pipeline_keeps_going_when_developer_call_fails() {
    let (endpoint, state) = start_mock(Reply::FailDeveloper).await;
    let client: Arc<dyn ClientWrapper> = Arc::new(OllamaClient::new(endpoint, "llama3"));

    let mut registry = AgentRegistry::new();
    for role in [
        AgentRole::ProductManager,
        AgentRole::Developer,
        AgentRole::Tester,
        AgentRole::ReleaseManager,
    ]
    .iter()
    {
        registry.register(LlmAgent::new(*role, client.clone())).unwrap();
    }
    let orchestrator = Orchestrator::new(registry);

    orchestrator
        .start_conversation("Build a payment module", &CancellationSignal::new())
        .await
        .unwrap();

    let log = orchestrator.get_conversation();
    assert_eq!(log.len(), 4);
    assert_eq!(log[1].from, "dev");
    assert!(log[1].content.contains("Error"), "{}", log[1].content);
    assert!(log[1].content.contains("500"), "{}", log[1].content);
    assert!(log[2].content.starts_with("reply to: You are a QA tester."));

    // The tester's prompt carries the developer's diagnostic as context.
    let requests = state.requests.lock().unwrap();
    let tester_prompt = requests[2]["prompt"].as_str().unwrap();
    assert!(tester_prompt.contains("Developer (dev): Developer Error: HTTP 500"));
    assert!(!tester_prompt.contains("Instruction:"));
}

#[tokio::test]
async fn test_product_manager_prompt_carries_the_initial_request() {
    let (endpoint, state) = start_mock(Reply::Generated).await;
    let client = Arc::new(OllamaClient::new(endpoint, "llama3"));
    let pm = LlmAgent::new(AgentRole::ProductManager, client);

    pm.handle(&[], Some("Build a payment module"), &CancellationSignal::new())
        .await
        .unwrap();

    let requests = state.requests.lock().unwrap();
    let prompt = requests[0]["prompt"].as_str().unwrap();
    assert_eq!(
        prompt,
        format!(
            "{}\nInstruction: Build a payment module\n",
            AgentRole::ProductManager.system_prompt()
        )
    );
}
