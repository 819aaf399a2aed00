//! Great-circle distance and track geometry.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two WGS84 points
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// GeoJSON LineString with `[lon, lat]` coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLine {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

/// Bounding box of a track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// Track geometry for map display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub geojson: Option<TrackLine>,
    pub bounds: Option<TrackBounds>,
    pub points_count: usize,
}

impl TrackGeometry {
    /// Build from ordered (lat, lon) positions
    pub fn from_positions(positions: &[(f64, f64)]) -> Self {
        if positions.is_empty() {
            return Self {
                geojson: None,
                bounds: None,
                points_count: 0,
            };
        }

        let mut bounds = TrackBounds {
            min_lat: f64::INFINITY,
            min_lon: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for &(lat, lon) in positions {
            bounds.min_lat = bounds.min_lat.min(lat);
            bounds.min_lon = bounds.min_lon.min(lon);
            bounds.max_lat = bounds.max_lat.max(lat);
            bounds.max_lon = bounds.max_lon.max(lon);
        }

        Self {
            geojson: Some(TrackLine {
                kind: "LineString".to_string(),
                coordinates: positions.iter().map(|&(lat, lon)| [lon, lat]).collect(),
            }),
            bounds: Some(bounds),
            points_count: positions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_distance() {
        assert_eq!(haversine_m(45.0, -122.0, 45.0, -122.0), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_geometry_bounds_and_coordinate_order() {
        let geometry = TrackGeometry::from_positions(&[(45.0, -122.0), (45.5, -122.7), (44.9, -121.9)]);
        assert_eq!(geometry.points_count, 3);

        let bounds = geometry.bounds.unwrap();
        assert_eq!(bounds.min_lat, 44.9);
        assert_eq!(bounds.max_lat, 45.5);
        assert_eq!(bounds.min_lon, -122.7);
        assert_eq!(bounds.max_lon, -121.9);

        let line = geometry.geojson.unwrap();
        assert_eq!(line.kind, "LineString");
        assert_eq!(line.coordinates[0], [-122.0, 45.0]);
    }

    #[test]
    fn test_empty_geometry() {
        let geometry = TrackGeometry::from_positions(&[]);
        assert!(geometry.geojson.is_none());
        assert!(geometry.bounds.is_none());
        assert_eq!(geometry.points_count, 0);
    }

    #[test]
    fn test_bounds_serialize_camel_case() {
        let geometry = TrackGeometry::from_positions(&[(1.0, 2.0)]);
        let json = serde_json::to_value(geometry.bounds.unwrap()).unwrap();
        assert_eq!(json["minLat"], 1.0);
        assert_eq!(json["maxLon"], 2.0);
    }
}
