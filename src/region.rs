//! Area of interest geometry.
//!
//! A region is a single planar geometry in lon/lat degrees. It can be parsed
//! from GeoJSON or a bounding box string, serialized back to a GeoJSON
//! geometry for catalog queries, and tested for intersection against image
//! footprints. Polygons are not checked for self-intersection here; the
//! catalog rejects malformed geometry.

use crate::error::RegionError;
use geo::{coord, Intersects, LineString, Point, Polygon, Rect};
use geojson::{GeoJson, Geometry, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user-specified area used to spatially filter images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Region {
    Point {
        lon: f64,
        lat: f64,
    },
    Rectangle {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },
    /// Exterior ring as (lon, lat) vertices. Closing vertex optional.
    Polygon { ring: Vec<(f64, f64)> },
}

/// Intermediate shape used for intersection tests.
enum Shape {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
}

impl Region {
    /// Rectangle from two corners in any order.
    pub fn rectangle(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Self {
        Region::Rectangle {
            min_lon: lon1.min(lon2),
            min_lat: lat1.min(lat2),
            max_lon: lon1.max(lon2),
            max_lat: lat1.max(lat2),
        }
    }

    /// Parse a region from GeoJSON text.
    ///
    /// Accepts a bare geometry, a Feature, or a FeatureCollection (first
    /// feature with a geometry wins).
    pub fn from_geojson(text: &str) -> Result<Self, RegionError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| RegionError::GeoJson(e.to_string()))?;

        let geometry = match geojson {
            GeoJson::Geometry(g) => g,
            GeoJson::Feature(f) => f.geometry.ok_or(RegionError::Empty)?,
            GeoJson::FeatureCollection(fc) => fc
                .features
                .into_iter()
                .find_map(|f| f.geometry)
                .ok_or(RegionError::Empty)?,
        };

        Self::from_geometry(&geometry)
    }

    /// Convert a GeoJSON geometry. Only Point and Polygon (exterior ring) are supported.
    pub fn from_geometry(geometry: &Geometry) -> Result<Self, RegionError> {
        match &geometry.value {
            Value::Point(pos) => {
                let (lon, lat) = position(pos)?;
                Ok(Region::Point { lon, lat })
            }
            Value::Polygon(rings) => {
                let exterior = rings.first().ok_or(RegionError::Empty)?;
                let ring = exterior
                    .iter()
                    .map(|p| position(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if ring.is_empty() {
                    return Err(RegionError::Empty);
                }
                Ok(Region::Polygon { ring })
            }
            other => Err(RegionError::Unsupported(value_type(other).to_string())),
        }
    }

    /// Parse `MIN_LON,MIN_LAT,MAX_LON,MAX_LAT`.
    pub fn from_bbox(text: &str) -> Result<Self, RegionError> {
        let parts: Vec<f64> = text
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| RegionError::BBox(text.to_string()))?;

        match parts.as_slice() {
            [a, b, c, d] => Ok(Region::rectangle(*a, *b, *c, *d)),
            _ => Err(RegionError::BBox(text.to_string())),
        }
    }

    /// GeoJSON geometry for catalog `intersects` filters.
    pub fn to_geometry(&self) -> Geometry {
        let value = match self {
            Region::Point { lon, lat } => Value::Point(vec![*lon, *lat]),
            Region::Rectangle {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            } => Value::Polygon(vec![vec![
                vec![*min_lon, *min_lat],
                vec![*max_lon, *min_lat],
                vec![*max_lon, *max_lat],
                vec![*min_lon, *max_lat],
                vec![*min_lon, *min_lat],
            ]]),
            Region::Polygon { ring } => {
                let mut coords: Vec<Vec<f64>> = ring.iter().map(|(x, y)| vec![*x, *y]).collect();
                // GeoJSON rings must be closed
                if ring.first() != ring.last() {
                    if let Some((x, y)) = ring.first() {
                        coords.push(vec![*x, *y]);
                    }
                }
                Value::Polygon(vec![coords])
            }
        };
        Geometry::new(value)
    }

    /// Whether two regions share at least one point.
    pub fn intersects(&self, other: &Region) -> bool {
        match (self.shape(), other.shape()) {
            (Shape::Point(a), Shape::Point(b)) => a.intersects(&b),
            (Shape::Point(a), Shape::Polygon(b)) => a.intersects(&b),
            (Shape::Polygon(a), Shape::Point(b)) => a.intersects(&b),
            (Shape::Polygon(a), Shape::Polygon(b)) => a.intersects(&b),
        }
    }

    fn shape(&self) -> Shape {
        match self {
            Region::Point { lon, lat } => Shape::Point(Point::new(*lon, *lat)),
            Region::Rectangle {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            } => Shape::Polygon(
                Rect::new(
                    coord! { x: *min_lon, y: *min_lat },
                    coord! { x: *max_lon, y: *max_lat },
                )
                .to_polygon(),
            ),
            Region::Polygon { ring } => {
                Shape::Polygon(Polygon::new(LineString::from(ring.clone()), vec![]))
            }
        }
    }
}

impl FromStr for Region {
    type Err = RegionError;

    /// GeoJSON if the text looks like JSON, otherwise a bounding box.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim_start().starts_with('{') {
            Self::from_geojson(s)
        } else {
            Self::from_bbox(s)
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Point { lon, lat } => write!(f, "point ({:.4}, {:.4})", lon, lat),
            Region::Rectangle {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            } => write!(
                f,
                "rectangle ({:.4}, {:.4}) - ({:.4}, {:.4})",
                min_lon, min_lat, max_lon, max_lat
            ),
            Region::Polygon { ring } => write!(f, "polygon ({} vertices)", ring.len()),
        }
    }
}

fn position(pos: &[f64]) -> Result<(f64, f64), RegionError> {
    match pos {
        [lon, lat, ..] => Ok((*lon, *lat)),
        _ => Err(RegionError::Empty),
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
        #[allow(unreachable_patterns)]
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AOI: &str = r#"{"type":"Polygon","coordinates":[[[76.816,13.006],[76.816,12.901],[76.899,12.901],[76.899,13.006],[76.816,13.006]]]}"#;

    #[test]
    fn test_parse_polygon_geometry() {
        let region = Region::from_geojson(AOI).unwrap();
        match region {
            Region::Polygon { ref ring } => assert_eq!(ring.len(), 5),
            _ => panic!("expected polygon"),
        }
    }

    #[test]
    fn test_parse_feature_collection() {
        let text = format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{}}}]}}"#,
            AOI
        );
        assert!(matches!(
            Region::from_geojson(&text),
            Ok(Region::Polygon { .. })
        ));
    }

    #[test]
    fn test_unsupported_geometry() {
        let text = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        assert!(matches!(
            Region::from_geojson(text),
            Err(RegionError::Unsupported(t)) if t == "LineString"
        ));
    }

    #[test]
    fn test_bbox_normalizes_corners() {
        let region = Region::from_bbox("10, 5, 0, -5").unwrap();
        assert_eq!(region, Region::rectangle(0.0, -5.0, 10.0, 5.0));
        assert!(Region::from_bbox("1,2,3").is_err());
        assert!(Region::from_bbox("a,b,c,d").is_err());
    }

    #[test]
    fn test_from_str_dispatch() {
        assert!(matches!("0,0,1,1".parse::<Region>(), Ok(Region::Rectangle { .. })));
        assert!(matches!(AOI.parse::<Region>(), Ok(Region::Polygon { .. })));
    }

    #[test]
    fn test_polygon_ring_is_closed_on_export() {
        let region = Region::Polygon {
            ring: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
        };
        match region.to_geometry().value {
            Value::Polygon(rings) => {
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[0][0], rings[0][3]);
            }
            _ => panic!("expected polygon"),
        }
    }

    #[test]
    fn test_intersects() {
        let aoi = Region::rectangle(0.0, 0.0, 10.0, 10.0);
        let overlapping = Region::rectangle(5.0, 5.0, 15.0, 15.0);
        let disjoint = Region::rectangle(20.0, 20.0, 30.0, 30.0);
        let inside = Region::Point { lon: 1.0, lat: 1.0 };

        assert!(aoi.intersects(&overlapping));
        assert!(!aoi.intersects(&disjoint));
        assert!(aoi.intersects(&inside));
        assert!(inside.intersects(&aoi));
        assert!(!inside.intersects(&Region::Point { lon: 2.0, lat: 2.0 }));
    }
}
