//! HTTP 客户端测试：本地 axum 桩服务模拟分析服务端

use std::net::SocketAddr;

use axum::{
    extract::Multipart,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use tos_analyzer::config::{PayloadMode, ServiceSection};
use tos_analyzer::core::{AnalysisStatus, Document, Label, Session, SessionError, CHAT_APOLOGY};
use tos_analyzer::service::{AnalysisService, HttpAnalysisService};

/// 回显 multipart 字段：每个字段生成一条结果，clause_text 为 "字段名:文件名:内容"，category 为 Content-Type
async fn ingest_multipart(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut results = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        results.push(json!({
            "clause_number": results.len() + 1,
            "text": format!("{}:{}:{}", name, filename, String::from_utf8_lossy(&data)),
            "label": "Benign",
            "category": content_type,
            "explanation": "echo",
        }));
    }
    Ok(Json(Value::Array(results)))
}

async fn ingest_text(Json(body): Json<Value>) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    json!({
        "doc_id": "txt-1",
        "results": [
            {"clause_text": text, "label": "Risky", "risk_category": "privacy", "reasoning": "r"}
        ]
    })
    .into()
}

async fn ingest_status_only() -> Json<Value> {
    json!({"doc_id": "abc", "status": "ingested"}).into()
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn query(Json(body): Json<Value>) -> Json<Value> {
    let q = body["query"].as_str().unwrap_or_default();
    let ns = body.get("namespace").and_then(Value::as_str).unwrap_or("-");
    json!({
        "response": format!("ns={} q={}", ns, q),
        "chunks": [{"id": 1}, {"id": 2}],
    })
    .into()
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/", get(|| async { Json(json!({"message": "ok"})) }))
        .route("/ingest", post(ingest_multipart))
        .route("/ingest-text", post(ingest_text))
        .route("/ingest-status", post(ingest_status_only))
        .route("/broken", post(broken))
        .route("/query", post(query));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn section(addr: SocketAddr) -> ServiceSection {
    ServiceSection {
        base_url: format!("http://{}", addr),
        ..ServiceSection::default()
    }
}

#[tokio::test]
async fn test_multipart_upload_uses_configured_field() {
    let addr = spawn_stub().await;
    let service = HttpAnalysisService::new(&section(addr));

    let out = service
        .ingest(&Document::new(b"clause body".to_vec(), "tos.txt"))
        .await
        .unwrap();
    assert_eq!(out.results.len(), 1);
    assert_eq!(out.results[0].clause_text, "file:tos.txt:clause body");
    assert_eq!(out.results[0].label, Label::Fair);
    assert_eq!(out.results[0].reasoning, "echo");
    assert_eq!(out.results[0].risk_category, "text/plain");
}

#[tokio::test]
async fn test_multipart_content_type_follows_extension() {
    let addr = spawn_stub().await;
    let service = HttpAnalysisService::new(&section(addr));

    let pdf = service
        .ingest(&Document::new(b"%PDF-1.4".to_vec(), "terms.pdf"))
        .await
        .unwrap();
    assert_eq!(pdf.results[0].risk_category, "application/pdf");

    let unknown = service
        .ingest(&Document::new(b"??".to_vec(), "terms.docx"))
        .await
        .unwrap();
    assert_eq!(unknown.results[0].risk_category, "application/octet-stream");
}

#[tokio::test]
async fn test_text_payload_and_document_id() {
    let addr = spawn_stub().await;
    let cfg = ServiceSection {
        ingest_path: "/ingest-text".into(),
        payload: PayloadMode::Text,
        ..section(addr)
    };
    let service = HttpAnalysisService::new(&cfg);

    let out = service.ingest(&Document::from_text("pasted terms")).await.unwrap();
    assert_eq!(out.document_id.as_deref(), Some("txt-1"));
    assert_eq!(out.results[0].clause_text, "pasted terms");
    assert_eq!(out.results[0].risk_category, "privacy");
}

#[tokio::test]
async fn test_status_object_yields_empty_success_and_namespace() {
    let addr = spawn_stub().await;
    let cfg = ServiceSection {
        ingest_path: "/ingest-status".into(),
        ..section(addr)
    };
    let service = HttpAnalysisService::new(&cfg);
    let mut session = Session::default();
    session.select_document(Document::from_text("terms"));

    assert_eq!(session.start_analysis(&service).await, AnalysisStatus::Succeeded);
    assert!(session.state().has_analysis_results);
    assert!(session.state().results.is_empty());

    session.send_message(&service, "is it fair?").await;
    let answer = session.state().chat_transcript.last().unwrap();
    assert_eq!(answer.content, "ns=abc q=is it fair?");
    assert_eq!(answer.supporting_chunks.len(), 2);
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let addr = spawn_stub().await;
    let cfg = ServiceSection {
        ingest_path: "/broken".into(),
        ..section(addr)
    };
    let service = HttpAnalysisService::new(&cfg);

    let err = service.ingest(&Document::from_text("x")).await.unwrap_err();
    assert_eq!(err, SessionError::http_status(500));

    let mut session = Session::default();
    session.select_document(Document::from_text("x"));
    session.start_analysis(&service).await;
    assert!(session.state().error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_connection_refused_in_chat() {
    // 绑定后立即释放端口，得到一个无人监听的地址
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = HttpAnalysisService::new(&section(addr));
    assert!(service.ping().await.is_err());

    let mut session = Session::default();
    assert!(session.send_message(&service, "anyone there?").await);
    let s = session.state();
    assert_eq!(s.chat_transcript.len(), 2);
    assert_eq!(s.chat_transcript[1].content, CHAT_APOLOGY);
    assert!(s.error.as_deref().unwrap().starts_with("Failed to get response"));
}

#[tokio::test]
async fn test_ping_reachable_service() {
    let addr = spawn_stub().await;
    let service = HttpAnalysisService::new(&section(addr));
    assert!(service.ping().await.is_ok());
}
