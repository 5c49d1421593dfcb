//! Backend load plus Claude analysis, both against local stand-in servers.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use backend_client::BackendClient;
use catedra_audit::analysis::ClaudeAnalyzer;
use catedra_audit::dashboard::{self, DashboardSummary};
use catedra_audit::pipeline::{AuditConfig, AuditPipeline};
use catedra_audit::store::StateStore;
use catedra_audit::traits::PostAnalyzer;
use catedra_common::Sentiment;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn backend() -> Router {
    Router::new()
        .route(
            "/api/catedras/",
            get(|| async {
                Json(json!({"count": 2, "next": null, "results": [
                    {"id": 1, "codigo": "ALG1", "nombre": "Algoritmos I", "titular": "Rosa", "menciones_fb": 5},
                    {"id": 2, "codigo": "BD", "nombre": "Bases de Datos", "titular": "Ale", "menciones_fb": 0}
                ]}))
            }),
        )
        .route("/api/grupos/", get(|| async { Json(json!([])) }))
        .route("/api/tareas/", get(|| async { Json(json!([])) }))
        .route(
            "/api/sesiones/",
            get(|| async {
                Json(json!([
                    {"id": 1, "usuario_id": 1, "tarea_id": 1, "estado": "PROCESANDO", "posts_encontrados": 3, "fecha": "2024-05-01"}
                ]))
            }),
        )
        .route(
            "/api/posts/",
            get(|| async {
                Json(json!({"next": null, "results": [
                    {"id": 10, "grupo_id": 1, "post_id": "fb_10", "texto": "Algoritmos I con Rosa es lo mejor", "procesado": false},
                    {"id": 11, "grupo_id": 1, "post_id": "fb_11", "texto": "Alguien vende una calculadora?", "procesado": false},
                    {"id": 12, "grupo_id": 1, "post_id": "fb_12", "texto": "ya analizado", "procesado": true}
                ]}))
            }),
        )
}

fn tool_reply(input: Value) -> Json<Value> {
    Json(json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "tool_use", "id": "toolu_1", "name": "record_post_analysis", "input": input}],
        "stop_reason": "tool_use"
    }))
}

async fn messages(headers: HeaderMap, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("sk-ant-test") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if body["tool_choice"]["type"] != "tool" {
        return Err(StatusCode::BAD_REQUEST);
    }

    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    if prompt.contains("Algoritmos I con Rosa") {
        Ok(tool_reply(json!({
            "department_name": "Algoritmos I",
            "recommendation_summary": "Recomiendan cursar con Rosa.",
            "sentiment": "positive",
            "confidence": 0.93
        })))
    } else {
        Ok(tool_reply(json!({
            "department_name": "",
            "recommendation_summary": "",
            "sentiment": "neutral",
            "confidence": 0.1
        })))
    }
}

#[tokio::test]
async fn load_audit_and_read_back() {
    let backend_url = spawn(backend()).await;
    let claude_url = spawn(Router::new().route("/v1/messages", post(messages))).await;

    let client = BackendClient::new(format!("{backend_url}/api"));
    let mut store = StateStore::default();
    store.load_all(&client).await.unwrap();

    let summary = DashboardSummary::from_store(&store);
    assert_eq!(summary.departments, 2);
    assert_eq!(summary.pending_posts, 2);
    assert_eq!(summary.active_sessions, 1);

    let analyzer = ClaudeAnalyzer::new("sk-ant-test", "claude-haiku-4-5-20251001")
        .with_base_url(format!("{claude_url}/v1"));
    let pipeline = AuditPipeline::new(
        Arc::new(analyzer),
        AuditConfig {
            pacing: Duration::from_millis(1),
            analysis_timeout: Duration::from_secs(5),
        },
    );

    let stats = pipeline
        .run(&mut store, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.matched, 1);
    assert_eq!(stats.no_result, 1);
    assert_eq!(store.department(1).unwrap().mentions, 6);
    assert!(store.post(10).unwrap().processed);
    assert!(!store.post(11).unwrap().processed);

    let feed = dashboard::recommendation_feed(&store);
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].department_name, "Algoritmos I");
    assert_eq!(feed[0].recommendation.sentiment, Sentiment::Positive);
    assert_eq!(feed[0].recommendation.text, "Recomiendan cursar con Rosa.");
}

#[tokio::test]
async fn provider_http_error_is_an_error() {
    let claude_url = spawn(Router::new().route("/v1/messages", post(messages))).await;
    let analyzer = ClaudeAnalyzer::new("wrong-key", "claude-haiku-4-5-20251001")
        .with_base_url(format!("{claude_url}/v1"));

    let err = analyzer
        .analyze("Algoritmos I con Rosa", &["Algoritmos I".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"), "{err}");
}
