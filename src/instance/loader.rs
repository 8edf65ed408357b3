//! Loading instances from GeoJSON files.
//!
//! Each `*.geojson` file in a data directory becomes one instance named after
//! the file stem (`mytown.geojson` → `mytown`). `LineString` features become
//! one segment each and `MultiLineString` features one segment per line.
//! Scalar properties become tags; other geometry types are skipped.

use std::path::Path;

use geojson::{Feature, GeoJson, JsonObject, Value as GeoJsonValue};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::LoadError;

use super::{Coordinate, DataInstance, InstanceManager, Segment, SegmentStore, Tags};

/// File extension of loadable instance files.
const INSTANCE_EXTENSION: &str = "geojson";

/// Load every instance file in `dir` into a new registry.
///
/// Files are loaded in name order. A file that cannot be read or parsed fails
/// the whole load.
pub async fn load_instances(dir: impl AsRef<Path>) -> Result<InstanceManager, LoadError> {
    let dir = dir.as_ref();
    let display = dir.display().to_string();

    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|source| LoadError::Io {
            path: display.clone(),
            source,
        })?;
    if !metadata.is_dir() {
        return Err(LoadError::NotADirectory(display));
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| LoadError::Io {
            path: display.clone(),
            source,
        })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(INSTANCE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let manager = InstanceManager::new();
    for path in paths {
        let instance = load_instance_file(&path).await?;
        manager.register(instance).await;
    }

    Ok(manager)
}

/// Load a single instance file.
pub async fn load_instance_file(path: impl AsRef<Path>) -> Result<DataInstance, LoadError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LoadError::Parse {
            path: path_str.clone(),
            message: "file name is not valid UTF-8".to_string(),
        })?
        .to_string();

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path_str.clone(),
            source,
        })?;

    let store = store_from_geojson(&text).map_err(|message| LoadError::Parse {
        path: path_str.clone(),
        message,
    })?;

    info!(
        instance = %name,
        segments = store.len(),
        path = %path_str,
        "Loaded instance"
    );

    Ok(DataInstance::new(name, store))
}

/// Build a segment store from GeoJSON text.
///
/// Segment ids are assigned in document order starting at 0. Invalid segments
/// are skipped with a warning.
pub fn store_from_geojson(text: &str) -> Result<SegmentStore, String> {
    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| e.to_string())?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    let mut store = SegmentStore::new();
    let mut next_id = 0u64;

    for (index, feature) in features.into_iter().enumerate() {
        let tags = feature
            .properties
            .as_ref()
            .map(tags_from_properties)
            .unwrap_or_default();

        let lines = match feature.geometry.map(|g| g.value) {
            Some(GeoJsonValue::LineString(line)) => vec![line],
            Some(GeoJsonValue::MultiLineString(lines)) => lines,
            Some(other) => {
                debug!(
                    feature = index,
                    geometry = geometry_kind(&other),
                    "Skipping non-linear feature"
                );
                continue;
            }
            None => {
                debug!(feature = index, "Skipping feature without geometry");
                continue;
            }
        };

        for line in lines {
            let id = next_id;
            next_id += 1;

            // Positions always carry at least lon and lat once parsed
            let geometry = line
                .iter()
                .map(|position| Coordinate::new(position[0], position[1]))
                .collect();

            if let Err(e) = store.insert(Segment::new(id, geometry, tags.clone())) {
                warn!(feature = index, "Skipping segment: {}", e);
            }
        }
    }

    Ok(store)
}

fn geometry_kind(value: &GeoJsonValue) -> &'static str {
    match value {
        GeoJsonValue::Point(_) => "Point",
        GeoJsonValue::MultiPoint(_) => "MultiPoint",
        GeoJsonValue::LineString(_) => "LineString",
        GeoJsonValue::MultiLineString(_) => "MultiLineString",
        GeoJsonValue::Polygon(_) => "Polygon",
        GeoJsonValue::MultiPolygon(_) => "MultiPolygon",
        GeoJsonValue::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Convert GeoJSON properties to tags, stringifying scalars.
fn tags_from_properties(properties: &JsonObject) -> Tags {
    properties
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
