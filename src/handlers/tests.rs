//! Router tests
//!
//! Drive the full axum router against the in-memory store.

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::classifier::{Classification, Classifier};
    use crate::config::Config;
    use crate::error::ClassificationError;
    use crate::hub::BroadcastHub;
    use crate::models::Label;
    use crate::store::MemoryEventStore;
    use crate::{create_router, AppState};

    /// Anomaly when the first feature is above 0.5, score = first feature
    fn first_feature_classifier() -> Arc<dyn Classifier> {
        Arc::new(|features: &[f64]| -> Result<Classification, ClassificationError> {
            let score = features[0];
            let label = if score > 0.5 { Label::Anomaly } else { Label::Normal };
            Ok(Classification::new(label, Some(score)))
        })
    }

    fn test_state() -> AppState {
        let config = Config {
            database_url: crate::config::MEMORY_DATABASE_URL.to_string(),
            ..Config::default()
        };
        AppState::new(
            config,
            Arc::new(MemoryEventStore::new()),
            first_feature_classifier(),
            Arc::new(BroadcastHub::new(16)),
        )
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn features(first: f64) -> Vec<f64> {
        let mut v = vec![0.0; 20];
        v[0] = first;
        v
    }

    #[tokio::test]
    async fn test_ingest_returns_stored_event_and_broadcasts() {
        let state = test_state();
        let mut sub = state.hub.register();
        let app = create_router(state);

        let (status, body) = send(
            &app,
            post_json(
                "/api/ingest",
                json!({ "features": features(0.73), "meta": { "source_ip": "10.0.0.1" } }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!(1));
        assert_eq!(body["label"], json!(1));
        assert_eq!(body["score"], json!(0.73));
        assert_eq!(body["meta"]["source_ip"], json!("10.0.0.1"));
        assert!(body.get("features").is_none());

        let pushed = sub.recv().await.unwrap();
        assert_eq!(pushed.id, 1);
    }

    #[tokio::test]
    async fn test_ingest_wrong_dimension_is_bad_request() {
        let app = create_router(test_state());

        let (status, body) = send(&app, post_json("/api/ingest", json!({ "features": [1.0, 2.0] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!(400));

        let (status, _) = send(&app, post_json("/api/ingest", json!({ "features": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, listed) = send(&app, get("/api/events")).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_ingest_non_numeric_features_rejected() {
        let app = create_router(test_state());
        let (status, body) = send(
            &app,
            post_json("/api/ingest", json!({ "features": ["a", 1.0] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!(400));
        assert!(body["error"].is_string());

        let malformed = Request::builder()
            .method("POST")
            .uri("/api/ingest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!(400));
    }

    #[tokio::test]
    async fn test_bad_query_params_return_json_error() {
        let app = create_router(test_state());

        for uri in [
            "/api/events?label=2",
            "/api/events?limit=abc",
            "/api/events?from_time=yesterday",
        ] {
            let (status, body) = send(&app, get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["status"], json!(400), "{}", uri);
            assert!(body["error"].is_string(), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_list_events_filters_and_orders() {
        let app = create_router(test_state());
        for first in [0.1, 0.9, 0.3, 0.8] {
            let (status, _) = send(&app, post_json("/api/ingest", json!({ "features": features(first) }))).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, get("/api/events?limit=3")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body.as_array().unwrap().iter().map(|e| e["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![4, 3, 2]);
        assert_eq!(body[0]["features"].as_array().unwrap().len(), 20);

        let (_, body) = send(&app, get("/api/events?min_score=0.5")).await;
        let scores: Vec<f64> = body.as_array().unwrap().iter().map(|e| e["score"].as_f64().unwrap()).collect();
        assert_eq!(scores, vec![0.8, 0.9]);

        let (_, body) = send(&app, get("/api/events?label=0")).await;
        let ids: Vec<i64> = body.as_array().unwrap().iter().map(|e| e["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1]);

        let (_, body) = send(&app, get("/api/events?from_time=2999-01-01T00:00:00Z")).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_list_events_limit_bounds() {
        let app = create_router(test_state());

        let (status, _) = send(&app, get("/api/events?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/api/events?limit=1001")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/api/events?limit=1000")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_windows() {
        let app = create_router(test_state());

        let (status, body) = send(&app, get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window"], json!("5m"));
        assert_eq!(body["total_events"], json!(0));
        assert_eq!(body["anomaly_count"], json!(0));
        assert_eq!(body["anomaly_rate"], json!(0.0));
        assert_eq!(body["avg_score"], json!(0.0));

        for first in [0.9, 0.1] {
            send(&app, post_json("/api/ingest", json!({ "features": features(first) }))).await;
        }

        let (status, body) = send(&app, get("/api/stats?window=1h")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window"], json!("1h"));
        assert_eq!(body["total_events"], json!(2));
        assert_eq!(body["anomaly_count"], json!(1));
        assert_eq!(body["anomaly_rate"], json!(0.5));
        assert!((body["avg_score"].as_f64().unwrap() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stats_invalid_window() {
        let app = create_router(test_state());
        let (status, body) = send(&app, get("/api/stats?window=2h")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("2h"));
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let state = test_state();
        let _sub = state.hub.register();
        let app = create_router(state);

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["service"], json!("IDS Dashboard Backend"));
        assert_eq!(body["model_loaded"], json!(true));
        assert_eq!(body["model"], json!("custom"));
        assert_eq!(body["model_sha256"], Value::Null);
        assert_eq!(body["feature_dim"], json!(20));
        assert_eq!(body["store"], json!("memory"));
        assert_eq!(body["stored_events"], json!(0));
        assert_eq!(body["subscribers"], json!(1));

        let (status, body) = send(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["health"], json!("/health"));
    }
}
