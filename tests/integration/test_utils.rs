//! Test utilities for integration tests.
//!
//! This module provides fixtures for building instances, routers and requests,
//! and helpers for decoding tile responses.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use prost::Message;
use tower::ServiceExt;

use roadtile_server::format::vector_tile::{Feature, Layer, Tile};
use roadtile_server::instance::{
    Coordinate, DataInstance, InstanceManager, Segment, SegmentStore, Tags,
};
use roadtile_server::tile::TileCoordinate;
use roadtile_server::{create_router, RouterConfig, TileService};

// =============================================================================
// Geometry Fixtures
// =============================================================================

/// The tile used by the `mytown` example.
pub fn mytown_tile() -> TileCoordinate {
    TileCoordinate::new(14, 8300, 5371).unwrap()
}

/// Position at a fraction of a tile, (0, 0) being the north-west corner.
pub fn tile_point(tile: &TileCoordinate, fx: f64, fy: f64) -> Coordinate {
    let b = tile.bounds();
    Coordinate::new(
        b.west + (b.east - b.west) * fx,
        b.north - (b.north - b.south) * fy,
    )
}

/// Build tags from string pairs.
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A road crossing the `mytown` tile from west to east.
pub fn road(id: u64, pairs: &[(&str, &str)]) -> Segment {
    let tile = mytown_tile();
    Segment::new(
        id,
        vec![tile_point(&tile, 0.1, 0.5), tile_point(&tile, 0.9, 0.5)],
        tags(pairs),
    )
}

/// A store of `count` roads all tagged with the same highway value.
pub fn uniform_store(count: u64, highway: &str) -> SegmentStore {
    let tile = mytown_tile();
    let segments = (0..count).map(|i| {
        let fy = 0.05 + 0.9 * (i as f64) / (count.max(1) as f64);
        Segment::new(
            i,
            vec![tile_point(&tile, 0.1, fy), tile_point(&tile, 0.9, fy)],
            tags(&[("highway", highway)]),
        )
    });
    SegmentStore::from_segments(segments).unwrap()
}

// =============================================================================
// Registry and Router Fixtures
// =============================================================================

/// A registry holding a single instance.
pub async fn registry_with(name: &str, store: SegmentStore) -> InstanceManager {
    let manager = InstanceManager::new();
    manager.register(DataInstance::new(name, store)).await;
    manager
}

/// The `mytown` registry: one primary road spanning the example tile.
pub async fn mytown_registry() -> InstanceManager {
    let store = SegmentStore::from_segments([road(
        0,
        &[("highway", "primary"), ("name", "Main Street")],
    )])
    .unwrap();
    registry_with("mytown", store).await
}

/// Router over the `mytown` registry.
pub async fn mytown_router(config: RouterConfig) -> Router {
    create_router(TileService::new(mytown_registry().await), config)
}

/// Default router configuration for tests (no request tracing).
pub fn test_config() -> RouterConfig {
    RouterConfig::new().with_tracing(false)
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Issue a GET request and collect the response.
pub async fn get(router: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Parse a JSON response body.
pub fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

// =============================================================================
// MVT Helpers
// =============================================================================

/// Decode an MVT response body.
pub fn decode_mvt(body: &[u8]) -> Tile {
    Tile::decode(body).unwrap()
}

/// Resolve the tag indices of a feature to string pairs.
pub fn feature_properties(layer: &Layer, feature: &Feature) -> BTreeMap<String, String> {
    feature
        .tags
        .chunks(2)
        .map(|pair| {
            let key = layer.keys[pair[0] as usize].clone();
            let value = layer.values[pair[1] as usize]
                .string_value
                .clone()
                .unwrap();
            (key, value)
        })
        .collect()
}
