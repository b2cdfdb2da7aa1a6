//! Router-level tests for the watershed API.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use storage::{MemoryResultStore, ResultStore};
use terrain_grid::{StaticGridProvider, ZarrGridProvider};
use test_utils::{missing_grid_config, south_flowing, SyntheticTerrain};
use watershed::{DelineationConfig, DelineationService};
use watershed_api::config::ApiConfig;
use watershed_api::state::AppState;
use watershed_api::{cors_layer, create_router};

fn router_for(service: DelineationService) -> Router {
    let state = Arc::new(AppState::from_service(service));
    create_router(state, cors_layer(&ApiConfig::default()))
}

fn synthetic_router(terrain: &SyntheticTerrain, config: DelineationConfig) -> Router {
    let grids = Arc::new(StaticGridProvider::new(Arc::new(terrain.build()), "synthetic"));
    let store: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::new(16));
    router_for(DelineationService::new(grids, Some(store), config))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn bottom_centre(terrain: &SyntheticTerrain) -> Value {
    let (lon, lat) = terrain.cell_center(2, 4);
    json!({ "lat": lat, "lon": lon, "snap_to_stream": false })
}

#[tokio::test]
async fn test_health() {
    let router = synthetic_router(&south_flowing(5), DelineationConfig::default());
    let (status, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_delineate_then_cached() {
    let terrain = south_flowing(5);
    let router = synthetic_router(&terrain, DelineationConfig::default());

    let (status, body) = send(&router, post_json("/api/delineate", bottom_centre(&terrain))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watershed"]["type"], "Feature");
    assert_eq!(body["watershed"]["geometry"]["type"], "Polygon");
    assert_eq!(body["watershed"]["properties"]["num_cells"], 5);
    assert_eq!(body["pour_point"]["geometry"]["type"], "Point");
    assert_eq!(body["pour_point"]["properties"]["snapped"], false);
    assert_eq!(body["metadata"]["from_cache"], false);
    assert_eq!(body["metadata"]["snap_radius"], Value::Null);

    let (status, again) = send(&router, post_json("/api/delineate", bottom_centre(&terrain))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["metadata"]["from_cache"], true);
    assert_eq!(again["watershed"], body["watershed"]);
}

#[tokio::test]
async fn test_invalid_latitude() {
    let router = synthetic_router(&south_flowing(5), DelineationConfig::default());
    let (status, body) = send(
        &router,
        post_json("/api/delineate", json!({ "lat": 95.0, "lon": -77.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parameter");
    assert!(body["detail"].as_str().is_some());
}

#[tokio::test]
async fn test_malformed_body() {
    let router = synthetic_router(&south_flowing(5), DelineationConfig::default());
    let (status, body) = send(
        &router,
        post_json("/api/delineate", json!({ "latitude": 38.9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parameter");
}

#[tokio::test]
async fn test_outside_grid() {
    let router = synthetic_router(&south_flowing(5), DelineationConfig::default());
    let (status, body) = send(
        &router,
        post_json("/api/delineate", json!({ "lat": 10.0, "lon": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "out_of_coverage");
}

#[tokio::test]
async fn test_result_too_large() {
    let terrain = south_flowing(5);
    let router = synthetic_router(
        &terrain,
        DelineationConfig {
            max_watershed_cells: 3,
            ..DelineationConfig::default()
        },
    );
    let (status, body) = send(&router, post_json("/api/delineate", bottom_centre(&terrain))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "result_too_large");
}

#[tokio::test]
async fn test_status_and_cache_clear() {
    let terrain = south_flowing(5);
    let router = synthetic_router(&terrain, DelineationConfig::default());

    let (status, body) = send(&router, get("/api/delineate/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["cache_enabled"], true);
    assert_eq!(body["cache_backend"], "memory");

    send(&router, post_json("/api/delineate", bottom_centre(&terrain))).await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/delineate/cache")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
}

#[tokio::test]
async fn test_missing_grids() {
    let dir = tempfile::tempdir().unwrap();
    let grids = Arc::new(ZarrGridProvider::new(missing_grid_config(&dir)));
    let router = router_for(DelineationService::new(
        grids,
        None,
        DelineationConfig::default(),
    ));

    let (status, body) = send(&router, get("/api/delineate/status")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
    assert_eq!(body["cache_enabled"], false);

    let (status, body) = send(
        &router,
        post_json("/api/delineate", json!({ "lat": 38.9, "lon": -77.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "missing_data");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let router = synthetic_router(&south_flowing(5), DelineationConfig::default());
    let response = router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );
}
