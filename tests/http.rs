//! Wire format and HTTP behavior of the generation backend client.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mediagen::config::Config;
use mediagen::dispatch::http::{
    HttpTaskBackend, QUERY_PATH, SUBMIT_PATH, parse_query_response, parse_submit_response,
};
use mediagen::dispatch::{
    GenerationRequest, StatusQuery, TaskBackend, TaskId, TaskStatus, TaskType,
};
use mediagen::error::GenerationError;

/// Helper: bind a TCP listener on an OS-assigned port.
async fn mock_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Serve one request with `status` and a JSON body; return the raw request text.
fn serve_once(
    listener: TcpListener,
    status: &'static str,
    body: String,
) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        request
    })
}

/// Read headers plus a `Content-Length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let body_len = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

fn backend(port: u16, api_key: Option<&str>) -> HttpTaskBackend {
    HttpTaskBackend::new(
        format!("http://127.0.0.1:{port}/"),
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Envelope parsing
// ---------------------------------------------------------------------------

#[test]
fn submit_envelope_yields_ids_in_order() {
    let body = br#"{"code":1,"message":"ok","data":{"task_ids":[101,102]}}"#;
    assert_eq!(parse_submit_response(body).unwrap(), vec![TaskId(101), TaskId(102)]);
}

#[test]
fn query_envelope_decodes_records() {
    let body = br#"{"code":1,"data":{"tasks":[
        {"id":101,"status":2,"output":"https://x/a.png","generation_id":9001},
        {"id":102,"status":0,"failure":"NSFW content","failureCode":"NSFW"},
        {"id":103,"status":9}
    ]}}"#;
    let records = parse_query_response(body).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].status, TaskStatus::Succeeded);
    assert_eq!(records[0].output.as_deref(), Some("https://x/a.png"));
    assert_eq!(records[0].generation_id, Some(9001));
    assert_eq!(records[1].status, TaskStatus::Failed);
    assert_eq!(records[1].failure.as_deref(), Some("NSFW content"));
    assert_eq!(records[1].failure_code.as_deref(), Some("NSFW"));
    assert_eq!(records[2].status, TaskStatus::Unknown(9));
    assert!(!records[2].status.is_terminal());
}

#[test]
fn query_envelope_without_tasks_is_empty() {
    let records = parse_query_response(br#"{"code":1,"data":{}}"#).unwrap();
    assert!(records.is_empty());
}

#[test]
fn error_codes_map_to_variants() {
    let cases = [
        (1010, "rate"),
        (1011, "credits"),
        (1005, "model"),
        (1006, "task"),
        (1007, "params"),
        (4242, "other"),
    ];
    for (code, kind) in cases {
        let body = format!(r#"{{"code":0,"message":"bad","error":"detail","error_code":{code}}}"#);
        let err = parse_submit_response(body.as_bytes()).unwrap_err();
        let ok = match kind {
            "rate" => matches!(err, GenerationError::RateLimited { .. }),
            "credits" => matches!(err, GenerationError::InsufficientCredits { .. }),
            "model" => matches!(err, GenerationError::ModelNotFound { .. }),
            "task" => matches!(err, GenerationError::TaskNotFound { .. }),
            "params" => matches!(err, GenerationError::InvalidParams { .. }),
            _ => matches!(err, GenerationError::Rejected { code: Some(4242), .. }),
        };
        assert!(ok, "code {code} mapped to {err:?}");
    }
}

#[test]
fn failure_envelope_prefers_error_text() {
    let err = parse_submit_response(br#"{"code":0,"message":"Bad Request","error":"prompt too long"}"#)
        .unwrap_err();
    match err {
        GenerationError::Rejected { code, message } => {
            assert_eq!(code, None);
            assert_eq!(message, "prompt too long");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn success_without_data_is_schema_error() {
    let err = parse_submit_response(br#"{"code":1}"#).unwrap_err();
    assert!(matches!(err, GenerationError::SchemaParse(_)));
}

#[test]
fn failure_envelope_without_data_keeps_error_code() {
    let err = parse_query_response(br#"{"code":0,"message":"slow down","error_code":1010}"#)
        .unwrap_err();
    assert!(matches!(err, GenerationError::RateLimited { .. }), "{err:?}");
}

#[test]
fn malformed_body_is_schema_error() {
    let err = parse_query_response(b"<html>oops</html>").unwrap_err();
    assert!(matches!(err, GenerationError::SchemaParse(_)));
}

#[test]
fn status_query_wire_shape() {
    let query = StatusQuery {
        task_ids: vec![TaskId(1), TaskId(2)],
        statuses: TaskStatus::TERMINAL.to_vec(),
        task_type: TaskType::Character,
        tool: None,
    };
    let json = serde_json::to_value(&query).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"task_ids": [1, 2], "status": [2, 0, 4, 5], "type": 11})
    );
}

#[test]
fn processing_query_omits_ids_and_names_tool() {
    let query = StatusQuery {
        task_ids: Vec::new(),
        statuses: vec![TaskStatus::Processing],
        task_type: TaskType::Video,
        tool: Some("image-to-video".into()),
    };
    let json = serde_json::to_value(&query).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"status": [1], "type": 2, "tool": "image-to-video"})
    );
}

#[test]
fn generation_request_flattens_params() {
    let mut req = GenerationRequest::new("a cat", "Seedream 4.5");
    req.params.insert("size".into(), serde_json::json!("1024x1024"));
    let json = serde_json::to_value(&req).unwrap();

    assert_eq!(json["target_model"], "Seedream 4.5");
    assert_eq!(json["size"], "1024x1024");
    assert!(json.get("images").is_none());
    assert!(json.get("end_frame_image").is_none());
}

// ---------------------------------------------------------------------------
// HTTP round trips
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_json_with_bearer_token() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(
        listener,
        "200 OK",
        r#"{"code":1,"data":{"task_ids":[7]}}"#.to_string(),
    );

    let ids = backend(port, Some("sk-test"))
        .submit_task(&GenerationRequest::new("a cat", "Art Pro"))
        .await
        .unwrap();
    assert_eq!(ids, vec![TaskId(7)]);

    let raw = server.await.unwrap();
    assert!(raw.starts_with(&format!("POST {SUBMIT_PATH} ")), "{raw}");
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert!(raw.contains(r#""target_model":"Art Pro""#));
}

#[tokio::test]
async fn query_round_trip() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(
        listener,
        "200 OK",
        r#"{"code":1,"data":{"tasks":[{"id":5,"status":2,"output":"https://x/v.mp4"}]}}"#.to_string(),
    );

    let query = StatusQuery {
        task_ids: vec![TaskId(5)],
        statuses: TaskStatus::TERMINAL.to_vec(),
        task_type: TaskType::Video,
        tool: None,
    };
    let records = backend(port, None).query_tasks(&query).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, TaskId(5));

    let raw = server.await.unwrap();
    assert!(raw.starts_with(&format!("POST {QUERY_PATH} ")));
    assert!(!raw.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn unauthorized_maps_to_auth_failed() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(listener, "401 Unauthorized", "{}".to_string());

    let err = backend(port, Some("bad"))
        .submit_task(&GenerationRequest::new("a", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::AuthFailed { .. }), "{err:?}");
    assert!(!err.is_retryable());
    server.await.unwrap();
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(listener, "429 Too Many Requests", "{}".to_string());

    let err = backend(port, None)
        .submit_task(&GenerationRequest::new("a", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::RateLimited { .. }), "{err:?}");
    assert!(err.is_retryable());
    server.await.unwrap();
}

#[tokio::test]
async fn server_error_is_retryable_upstream() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(listener, "502 Bad Gateway", r#"{"oops":true}"#.to_string());

    let err = backend(port, None)
        .submit_task(&GenerationRequest::new("a", "b"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, GenerationError::Upstream { status: Some(502), .. }),
        "{err:?}"
    );
    assert!(err.is_retryable());
    assert_eq!(err.user_message(), "generation service error (HTTP 502)");
    server.await.unwrap();
}

#[tokio::test]
async fn query_rejection_is_channel_failure() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(
        listener,
        "200 OK",
        r#"{"code":0,"error":"task lookup failed","error_code":1006}"#.to_string(),
    );

    let query = StatusQuery {
        task_ids: vec![TaskId(1)],
        statuses: TaskStatus::TERMINAL.to_vec(),
        task_type: TaskType::Image,
        tool: None,
    };
    let err = backend(port, None).query_tasks(&query).await.unwrap_err();
    assert!(matches!(err, GenerationError::QueryFailed { .. }), "{err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn connection_refused_is_request_error() {
    let (listener, port) = mock_listener().await;
    drop(listener);

    let err = backend(port, None)
        .submit_task(&GenerationRequest::new("a", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Request(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn base_url_trailing_slash_is_trimmed() {
    assert_eq!(backend(8080, None).base_url(), "http://127.0.0.1:8080");
}

#[test]
fn debug_redacts_api_key() {
    let config = Config {
        api_key: Some("sk-secret-123".into()),
        ..Config::default()
    };
    let backend = HttpTaskBackend::from_config(&config).unwrap();

    let rendered = format!("{backend:?} {config:?}");
    assert!(!rendered.contains("sk-secret-123"));
    assert!(rendered.contains("[REDACTED]"));
}
