//! GeoJSON types for delineation responses (RFC 7946).

use serde::{Deserialize, Serialize};

/// A linear ring of `[lon, lat]` positions, first position repeated last.
pub type Ring = Vec<[f64; 2]>;

/// GeoJSON geometry types produced by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point geometry.
    Point {
        /// Coordinates as [longitude, latitude].
        coordinates: [f64; 2],
    },

    /// One outer ring followed by its holes.
    Polygon {
        coordinates: Vec<Ring>,
    },

    /// Several polygons.
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lon, lat],
        }
    }

    /// Polygon when there is a single part, MultiPolygon otherwise.
    pub fn from_parts(mut parts: Vec<Vec<Ring>>) -> Self {
        if parts.len() == 1 {
            Geometry::Polygon {
                coordinates: parts.remove(0),
            }
        } else {
            Geometry::MultiPolygon { coordinates: parts }
        }
    }

    /// Number of polygon parts (0 for points).
    pub fn part_count(&self) -> usize {
        match self {
            Geometry::Point { .. } => 0,
            Geometry::Polygon { .. } => 1,
            Geometry::MultiPolygon { coordinates } => coordinates.len(),
        }
    }

    /// Polygon parts as slices of rings.
    pub fn parts(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Point { .. } => Vec::new(),
            Geometry::Polygon { coordinates } => vec![coordinates.as_slice()],
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|p| p.as_slice()).collect()
            }
        }
    }
}

/// A GeoJSON Feature with typed properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature<P> {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: Geometry,

    pub properties: P,
}

impl<P> Feature<P> {
    pub fn new(geometry: Geometry, properties: P) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serialization() {
        let json = serde_json::to_value(Geometry::point(-77.0, 38.9)).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -77.0);
    }

    #[test]
    fn test_from_parts() {
        let ring: Ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let single = Geometry::from_parts(vec![vec![ring.clone()]]);
        assert!(matches!(single, Geometry::Polygon { .. }));
        assert_eq!(single.part_count(), 1);

        let multi = Geometry::from_parts(vec![vec![ring.clone()], vec![ring]]);
        let json = serde_json::to_value(&multi).unwrap();
        assert_eq!(json["type"], "MultiPolygon");
        assert_eq!(multi.parts().len(), 2);
    }

    #[test]
    fn test_feature_type_tag() {
        let feature = Feature::new(Geometry::point(1.0, 2.0), serde_json::json!({"a": 1}));
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["properties"]["a"], 1);
    }
}
