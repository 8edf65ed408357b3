//! Road classification for vector tiles.
//!
//! Reduces the detailed `highway` tag of a segment to the coarse `class`
//! attribute used by MVT styles. Only the binary format is classified; the
//! GeoJSON format keeps the original tags.

use std::collections::BTreeMap;

use crate::instance::Tags;

/// Tag inspected by the classifier.
pub const HIGHWAY_KEY: &str = "highway";

/// Attribute emitted by the classifier.
pub const CLASS_KEY: &str = "class";

/// Attributes derived for the binary format. Holds at most the `class` key.
pub type ClassifiedAttributes = BTreeMap<&'static str, String>;

/// Map a `highway` value to its rendering class.
///
/// Returns `None` for values outside the table.
pub fn road_class(highway: &str) -> Option<&str> {
    let class = match highway {
        "motorway" | "motorway_link" => "motorway",
        "trunk" | "trunk_link" => "trunk",
        "primary" | "primary_link" => "primary",
        "secondary" | "secondary_link" => "secondary",
        "tertiary" | "tertiary_link" => "tertiary",
        "unclassified" | "residential" | "living_street" | "road" => "minor",
        "service" | "track" => highway,
        "pedestrian" | "path" | "footway" | "cycleway" | "steps" | "bridleway" | "corridor" => {
            "path"
        }
        _ => return None,
    };
    Some(class)
}

/// Derive the MVT attributes of a segment from its tags.
///
/// Emits `class` when the `highway` tag is present and recognised, and nothing
/// otherwise.
pub fn classify(tags: &Tags) -> ClassifiedAttributes {
    let mut attributes = ClassifiedAttributes::new();
    if let Some(class) = tags.get(HIGHWAY_KEY).and_then(|h| road_class(h)) {
        attributes.insert(CLASS_KEY, class.to_string());
    }
    attributes
}
