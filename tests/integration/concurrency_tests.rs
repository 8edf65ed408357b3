//! Concurrency tests for tile rendering against instances being rewritten.
//!
//! A writer repeatedly swaps the store of an instance between two versions
//! that differ in every segment. Every tile rendered concurrently must come
//! entirely from one version: same segment count, one class throughout.

use std::collections::HashSet;
use std::sync::Arc;

use prost::Message;

use roadtile_server::format::vector_tile::Tile;
use roadtile_server::instance::InstanceRegistry;
use roadtile_server::{MvtLockPolicy, TileFormat, TileRequest, TileService};

use super::test_utils::{feature_properties, mytown_tile, registry_with, uniform_store};

const PRIMARY_COUNT: u64 = 40;
const MOTORWAY_COUNT: u64 = 25;
const WRITES: usize = 200;
const READERS: usize = 8;
const READS_PER_READER: usize = 100;

/// Check an MVT tile came from a single store version.
fn assert_consistent_mvt(bytes: &[u8]) {
    let tile = Tile::decode(bytes).unwrap();
    let layer = &tile.layers[0];

    let classes: HashSet<String> = layer
        .features
        .iter()
        .map(|f| feature_properties(layer, f)["class"].clone())
        .collect();
    assert_eq!(classes.len(), 1, "mixed classes: {:?}", classes);

    let expected = match classes.iter().next().map(String::as_str) {
        Some("primary") => PRIMARY_COUNT,
        Some("motorway") => MOTORWAY_COUNT,
        other => panic!("unexpected class {:?}", other),
    };
    assert_eq!(layer.features.len() as u64, expected);
}

/// Check a GeoJSON tile came from a single store version.
fn assert_consistent_geojson(bytes: &[u8]) {
    let collection: serde_json::Value = serde_json::from_slice(bytes).unwrap();
    let features = collection["features"].as_array().unwrap();

    let highways: HashSet<&str> = features
        .iter()
        .map(|f| f["properties"]["highway"].as_str().unwrap())
        .collect();
    assert_eq!(highways.len(), 1, "mixed highways: {:?}", highways);

    let expected = match highways.iter().next().copied() {
        Some("primary") => PRIMARY_COUNT,
        Some("motorway") => MOTORWAY_COUNT,
        other => panic!("unexpected highway {:?}", other),
    };
    assert_eq!(features.len() as u64, expected);
}

async fn run_stress(policy: MvtLockPolicy) {
    let registry = registry_with("mytown", uniform_store(PRIMARY_COUNT, "primary")).await;
    let service = Arc::new(TileService::new(registry).with_mvt_lock(policy));

    let writer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let instance = service.registry().try_get("mytown").await.unwrap();
            for i in 0..WRITES {
                let store = if i % 2 == 0 {
                    uniform_store(MOTORWAY_COUNT, "motorway")
                } else {
                    uniform_store(PRIMARY_COUNT, "primary")
                };

                if i % 3 == 0 {
                    // Rebuild in place while holding the write guard
                    let mut guard = instance.write().await;
                    guard.clear();
                    tokio::task::yield_now().await;
                    for segment in store.segments() {
                        guard.insert(segment.clone()).unwrap();
                    }
                } else {
                    instance.replace_store(store).await;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for r in 0..READERS {
        let service = Arc::clone(&service);
        readers.push(tokio::spawn(async move {
            let format = if r % 2 == 0 {
                TileFormat::Mvt
            } else {
                TileFormat::GeoJson
            };
            let request = TileRequest::new("mytown", mytown_tile(), format);

            for _ in 0..READS_PER_READER {
                let response = service.get_tile(&request).await.unwrap();
                match format {
                    TileFormat::Mvt => assert_consistent_mvt(&response.data),
                    TileFormat::GeoJson => assert_consistent_geojson(&response.data),
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_writer_exclusive_mvt() {
    run_stress(MvtLockPolicy::Exclusive).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_writer_shared_mvt() {
    run_stress(MvtLockPolicy::Shared).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mvt_requests_identical() {
    let registry = registry_with("mytown", uniform_store(PRIMARY_COUNT, "primary")).await;
    let service = Arc::new(TileService::new(registry));
    let request = TileRequest::new("mytown", mytown_tile(), TileFormat::Mvt);

    let expected = service.get_tile(&request).await.unwrap().data;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = Arc::clone(&service);
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            service.get_tile(&request).await.unwrap().data
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), expected);
    }
}
