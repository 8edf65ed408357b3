//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - The `mytown` example end to end in both formats
//! - Error cases (invalid coordinates, unknown instance, unknown format)
//! - Health and instance listing endpoints
//! - HTTP response codes and headers

use axum::http::StatusCode;

use roadtile_server::format::LAYER_NAME;
use roadtile_server::instance::{DataInstance, InstanceManager, Segment, SegmentStore};
use roadtile_server::tile::TileCoordinate;
use roadtile_server::{create_router, MvtLockPolicy, TileService};

use super::test_utils::{
    decode_mvt, feature_properties, get, json, mytown_registry, mytown_router, registry_with,
    road, tags, test_config, tile_point,
};

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_mytown_geojson() {
    let router = mytown_router(test_config()).await;

    let (status, headers, body) = get(router, "/mytown/tiles/14/8300/5371.geojson").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(headers.get("x-tile-features").unwrap(), "1");

    let collection = json(&body);
    assert_eq!(collection["type"], "FeatureCollection");

    let features = collection["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);

    let properties = &features[0]["properties"];
    assert_eq!(properties["highway"], "primary");
    assert_eq!(properties["name"], "Main Street");
    assert!(properties.get("class").is_none());
    assert_eq!(features[0]["geometry"]["type"], "LineString");
}

#[tokio::test]
async fn test_mytown_mvt() {
    let router = mytown_router(test_config()).await;

    let (status, headers, body) = get(router, "/mytown/tiles/14/8300/5371.mvt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/x-protobuf"
    );

    let tile = decode_mvt(&body);
    assert_eq!(tile.layers.len(), 1);

    let layer = &tile.layers[0];
    assert_eq!(layer.name, LAYER_NAME);
    assert_eq!(layer.extent, Some(4096));
    assert_eq!(layer.features.len(), 1);

    let properties = feature_properties(layer, &layer.features[0]);
    assert_eq!(properties.get("class").map(String::as_str), Some("primary"));
    assert!(!properties.contains_key("highway"));
    assert!(!properties.contains_key("name"));
}

#[tokio::test]
async fn test_mvt_with_shared_lock() {
    let service = TileService::new(mytown_registry().await).with_mvt_lock(MvtLockPolicy::Shared);
    let router = create_router(service, test_config());

    let (status, _, body) = get(router, "/mytown/tiles/14/8300/5371.mvt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decode_mvt(&body).layers[0].features.len(), 1);
}

#[tokio::test]
async fn test_tile_without_roads() {
    // Neighbor of the example tile, two tiles away
    let (status, _, body) = get(
        mytown_router(test_config()).await,
        "/mytown/tiles/14/8302/5371.geojson",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["features"], serde_json::json!([]));

    let (status, _, body) = get(
        mytown_router(test_config()).await,
        "/mytown/tiles/14/8302/5371.mvt",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tile = decode_mvt(&body);
    assert_eq!(tile.layers[0].name, LAYER_NAME);
    assert!(tile.layers[0].features.is_empty());
}

#[tokio::test]
async fn test_diagonal_road_only_on_tiles_it_crosses() {
    let center = |x: i32, y: i32| {
        let tile = TileCoordinate::new(14, x, y).unwrap();
        tile_point(&tile, 0.5, 0.5)
    };
    let diagonal = Segment::new(
        0,
        vec![center(8300, 5371), center(8310, 5381)],
        tags(&[("highway", "primary")]),
    );
    let store = SegmentStore::from_segments([diagonal]).unwrap();
    let router = create_router(
        TileService::new(registry_with("mytown", store).await),
        test_config(),
    );

    // Corner of the road's bounding box, several tiles from the line
    let (status, headers, body) = get(router.clone(), "/mytown/tiles/14/8310/5371.geojson").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-tile-features").unwrap(), "0");
    assert_eq!(json(&body)["features"], serde_json::json!([]));

    let (status, headers, body) = get(router.clone(), "/mytown/tiles/14/8310/5371.mvt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-tile-features").unwrap(), "0");
    assert!(decode_mvt(&body).layers[0].features.is_empty());

    // Midway along the line, both formats carry the road
    let (_, headers, body) = get(router.clone(), "/mytown/tiles/14/8305/5376.geojson").await;
    assert_eq!(headers.get("x-tile-features").unwrap(), "1");
    assert_eq!(json(&body)["features"].as_array().unwrap().len(), 1);

    let (_, headers, body) = get(router, "/mytown/tiles/14/8305/5376.mvt").await;
    assert_eq!(headers.get("x-tile-features").unwrap(), "1");
    assert_eq!(decode_mvt(&body).layers[0].features.len(), 1);
}

#[tokio::test]
async fn test_parent_tile_includes_road() {
    let (status, _, body) = get(
        mytown_router(test_config()).await,
        "/mytown/tiles/13/4150/2685.geojson",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["features"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Invalid Coordinates
// =============================================================================

#[tokio::test]
async fn test_invalid_coordinates_not_found() {
    let uris = [
        "/mytown/tiles/abc/8300/5371",
        "/mytown/tiles/14/abc/5371",
        "/mytown/tiles/14/8300/abc",
        "/mytown/tiles/14/-1/5371",
        "/mytown/tiles/14/16384/5371",
        "/mytown/tiles/14/8300/16384",
        "/mytown/tiles/31/0/0",
        "/mytown/tiles/-1/0/0",
        "/mytown/tiles/1.5/0/0",
    ];

    for uri in uris {
        for suffix in [".geojson", ".mvt"] {
            let uri = format!("{}{}", uri, suffix);
            let (status, _, body) = get(mytown_router(test_config()).await, &uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);

            let error = json(&body);
            assert_eq!(error["error"], "invalid_coordinate", "{}", uri);
            assert_eq!(error["status"], 404);
        }
    }
}

#[tokio::test]
async fn test_invalid_coordinates_checked_before_instance() {
    for suffix in [".geojson", ".mvt"] {
        let uri = format!("/nowhere/tiles/14/-1/5371{}", suffix);
        let (status, _, body) = get(mytown_router(test_config()).await, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"], "invalid_coordinate");
    }
}

#[tokio::test]
async fn test_unsupported_format() {
    for uri in [
        "/mytown/tiles/14/8300/5371.png",
        "/mytown/tiles/14/8300/5371",
        "/mytown/tiles/14/8300/5371.pbf",
    ] {
        let (status, _, body) = get(mytown_router(test_config()).await, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json(&body)["error"], "unsupported_format");
    }
}

// =============================================================================
// Unknown Instance
// =============================================================================

#[tokio::test]
async fn test_unknown_instance_geojson_no_content() {
    let (status, _, body) = get(
        mytown_router(test_config()).await,
        "/nowhere/tiles/14/8300/5371.geojson",
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unknown_instance_mvt_not_found() {
    let (status, _, body) = get(
        mytown_router(test_config()).await,
        "/nowhere/tiles/14/8300/5371.mvt",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "not_found");
}

#[tokio::test]
async fn test_unknown_instance_strict() {
    let config = test_config().with_strict_not_found(true);

    for suffix in [".geojson", ".mvt"] {
        let uri = format!("/nowhere/tiles/14/8300/5371{}", suffix);
        let (status, _, body) = get(mytown_router(config.clone()).await, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json(&body)["error"], "not_found");
    }
}

#[tokio::test]
async fn test_inactive_instance_treated_as_unknown() {
    let registry = mytown_registry().await;
    registry.deactivate("mytown").await;
    let router = create_router(TileService::new(registry), test_config());

    let (status, _, _) = get(router.clone(), "/mytown/tiles/14/8300/5371.geojson").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = get(router, "/mytown/tiles/14/8300/5371.mvt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Service Endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (status, _, body) = get(mytown_router(test_config()).await, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let health = json(&body);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_instances() {
    let manager = InstanceManager::new();
    manager
        .register(DataInstance::new("zeta", SegmentStore::new()))
        .await;
    manager
        .register(DataInstance::new(
            "mytown",
            SegmentStore::from_segments([road(0, &[("highway", "primary")])]).unwrap(),
        ))
        .await;
    manager.deactivate("zeta").await;

    let router = create_router(TileService::new(manager), test_config());
    let (status, _, body) = get(router, "/instances").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        serde_json::json!({
            "instances": [
                {"name": "mytown", "segments": 1, "active": true},
                {"name": "zeta", "segments": 0, "active": false}
            ]
        })
    );
}

#[tokio::test]
async fn test_cors_headers() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let router = mytown_router(test_config()).await;
    let request = Request::builder()
        .uri("/mytown/tiles/14/8300/5371.mvt")
        .header("origin", "https://maps.example.com")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight_allows_content_type_only() {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    let router = mytown_router(test_config()).await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/mytown/tiles/14/8300/5371.mvt")
        .header("origin", "https://maps.example.com")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let allowed = response
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"), "{}", allowed);
    assert!(!allowed.contains("authorization"), "{}", allowed);
}
