//! VOR and DVOR navigation beacons from OpenStreetMap, queried through the Overpass API.

use crate::crs::WGS84;
use crate::download;
use crate::error::Result;
use crate::io::{FeatureRow, VectorWriter, SHAPEFILE_DRIVER};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, Geometry, OGRFieldType, OGRwkbGeometryType};
use log::info;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// South, west, north, east. Larger than Germany so that beacons across the border whose
/// buffers reach into Bavaria are included.
pub const QUERY_BBOX: (f64, f64, f64, f64) = (
    44.653024159812,
    -0.21972656250000003,
    56.65622649350222,
    22.96142578125,
);

/// Tag key and the values that classify a beacon, checked in order
type TagRules = &'static [(&'static str, &'static [&'static str])];

const VOR_RULES: TagRules = &[
    ("beacon:type", &["VOR", "VOR-DME", "VOR/DME", "VOR;DME", "VOR;TACAN"]),
    ("type", &["VOR/DME"]),
    ("beacon_t_1", &["VOR", "VOR;TACAN"]),
];

const DVOR_RULES: TagRules = &[
    ("beacon:type", &["DVOR", "DVOR/DME", "DVOR;DME", "DVOR;TACAN", "DVORTAC"]),
    ("beacon_t_1", &["DVOR", "DVOR-DME", "DVOR/DME", "DVOR;DME"]),
];

pub fn overpass_query() -> String {
    let (south, west, north, east) = QUERY_BBOX;
    format!(
        "[out:json][timeout:250];\nnwr[\"airmark\"=\"beacon\"]({},{},{},{});\nout geom;",
        south, west, north, east
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Beacon {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Nodes of an Overpass JSON response. Ways and relations are ignored.
pub fn parse_beacons(json: &str) -> Result<Vec<Beacon>> {
    let response: OverpassResponse = serde_json::from_str(json)?;
    Ok(response
        .elements
        .into_iter()
        .filter(|element| element.kind == "node")
        .filter_map(|element| match (element.lon, element.lat) {
            (Some(lon), Some(lat)) => Some(Beacon {
                id: element.id,
                lon,
                lat,
                tags: element.tags,
            }),
            _ => None,
        })
        .collect())
}

impl Beacon {
    /// Value of the first rule whose key carries one of its values
    fn matched(&self, rules: TagRules) -> Option<&str> {
        rules.iter().find_map(|(key, values)| {
            self.tags
                .get(*key)
                .map(String::as_str)
                .filter(|value| values.iter().any(|v| v == value))
        })
    }

    /// The tag value that makes this a VOR
    pub fn vor_type(&self) -> Option<&str> {
        self.matched(VOR_RULES)
    }

    /// The tag value that makes this a DVOR
    pub fn dvor_type(&self) -> Option<&str> {
        self.matched(DVOR_RULES)
    }

    pub fn is_vor(&self) -> bool {
        self.vor_type().is_some()
    }

    pub fn is_dvor(&self) -> bool {
        self.dvor_type().is_some()
    }
}

/// Beacons paired with the tag value they were classified by
fn write_beacons(path: &Path, beacons: &[(&Beacon, &str)]) -> Result<usize> {
    let srs = SpatialRef::from_epsg(WGS84)?;
    let mut writer = VectorWriter::create(
        path,
        SHAPEFILE_DRIVER,
        Some(&srs),
        OGRwkbGeometryType::wkbPoint,
        &[
            ("osm_id", OGRFieldType::OFTInteger64),
            ("name", OGRFieldType::OFTString),
            ("ref", OGRFieldType::OFTString),
            ("btype", OGRFieldType::OFTString),
        ],
    )?;

    let text = |value: Option<&String>| value.map(|v| FieldValue::StringValue(v.clone()));
    let rows = beacons.iter().map(|(beacon, btype)| -> Result<FeatureRow> {
        Ok((
            Geometry::from_wkt(&format!("POINT ({} {})", beacon.lon, beacon.lat))?,
            vec![
                Some(FieldValue::Integer64Value(beacon.id)),
                text(beacon.tags.get("name")),
                text(beacon.tags.get("ref")),
                Some(FieldValue::StringValue(btype.to_string())),
            ],
        ))
    });
    writer.write_all(rows)
}

/// Query the beacons and write `VOR.shp` and `DVOR.shp` into `output_dir`
pub fn fetch_beacons(overpass_url: &str, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)?;

    info!("Querying airmark beacons from {}", overpass_url);
    let query = overpass_query();
    let body = download::post_form(overpass_url, &[("data", query.as_str())])?;
    let beacons = parse_beacons(&body)?;
    info!("{} beacon nodes", beacons.len());

    let vor: Vec<(&Beacon, &str)> = beacons
        .iter()
        .filter_map(|b| b.vor_type().map(|t| (b, t)))
        .collect();
    let dvor: Vec<(&Beacon, &str)> = beacons
        .iter()
        .filter_map(|b| b.dvor_type().map(|t| (b, t)))
        .collect();

    let vor_path = output_dir.join("VOR.shp");
    let dvor_path = output_dir.join("DVOR.shp");
    let vor_count = write_beacons(&vor_path, &vor)?;
    let dvor_count = write_beacons(&dvor_path, &dvor)?;
    info!("Wrote {} VOR and {} DVOR beacons", vor_count, dvor_count);

    Ok((vor_path, dvor_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon(tags: &[(&str, &str)]) -> Beacon {
        Beacon {
            id: 1,
            lon: 11.0,
            lat: 48.0,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_query_contains_bbox_and_filter() {
        let query = overpass_query();
        assert!(query.starts_with("[out:json][timeout:250];"));
        assert!(query.contains(
            "nwr[\"airmark\"=\"beacon\"](44.653024159812,-0.21972656250000003,56.65622649350222,22.96142578125);"
        ));
        assert!(query.ends_with("out geom;"));
    }

    #[test]
    fn test_parse_keeps_nodes_only() {
        let json = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 42, "lat": 48.35, "lon": 11.78,
                 "tags": {"airmark": "beacon", "beacon:type": "DVOR/DME", "name": "Munich"}},
                {"type": "way", "id": 7, "nodes": [1, 2]},
                {"type": "node", "id": 43, "lat": 49.5, "lon": 11.0}
            ]
        }"#;

        let beacons = parse_beacons(json).unwrap();
        assert_eq!(beacons.len(), 2);
        assert_eq!(beacons[0].id, 42);
        assert_eq!(beacons[0].lon, 11.78);
        assert_eq!(beacons[0].tags.get("name").map(String::as_str), Some("Munich"));
        assert!(beacons[1].tags.is_empty());
    }

    #[test]
    fn test_vor_classification() {
        assert!(beacon(&[("beacon:type", "VOR/DME")]).is_vor());
        assert!(beacon(&[("type", "VOR/DME")]).is_vor());
        assert!(beacon(&[("beacon_t_1", "VOR;TACAN")]).is_vor());
        assert!(!beacon(&[("type", "VOR")]).is_vor());
        assert!(!beacon(&[("beacon:type", "DVOR")]).is_vor());
    }

    #[test]
    fn test_dvor_classification() {
        assert!(beacon(&[("beacon:type", "DVORTAC")]).is_dvor());
        assert!(beacon(&[("beacon_t_1", "DVOR-DME")]).is_dvor());
        // DVOR-DME only counts under beacon_t_1
        assert!(!beacon(&[("beacon:type", "DVOR-DME")]).is_dvor());
        assert!(!beacon(&[("type", "DVOR/DME")]).is_dvor());
    }

    #[test]
    fn test_unclassified_beacon() {
        let ndb = beacon(&[("beacon:type", "NDB")]);
        assert!(!ndb.is_vor());
        assert!(!ndb.is_dvor());
        assert_eq!(ndb.vor_type(), None);
        assert_eq!(beacon(&[]).dvor_type(), None);
    }

    #[test]
    fn test_type_comes_from_matching_tag() {
        let b = beacon(&[("beacon:type", "NDB"), ("beacon_t_1", "VOR")]);
        assert_eq!(b.vor_type(), Some("VOR"));
        assert_eq!(b.dvor_type(), None);

        let b = beacon(&[("beacon:type", "TACAN"), ("type", "VOR/DME"), ("beacon_t_1", "VOR")]);
        assert_eq!(b.vor_type(), Some("VOR/DME"));

        let b = beacon(&[("beacon:type", "DVORTAC"), ("beacon_t_1", "DVOR-DME")]);
        assert_eq!(b.dvor_type(), Some("DVORTAC"));
    }

    #[test]
    fn test_written_btype_is_classifying_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("VOR.shp");
        let b = beacon(&[("beacon:type", "NDB"), ("beacon_t_1", "VOR"), ("name", "Walda")]);
        let btype = b.vor_type().unwrap();

        assert_eq!(write_beacons(&path, &[(&b, btype)]).unwrap(), 1);

        let layer = crate::io::read_vector_layer(&path, None).unwrap();
        assert_eq!(layer.features.len(), 1);
        assert_eq!(layer.features[0].field_as_string("btype").as_deref(), Some("VOR"));
        assert_eq!(layer.features[0].field_as_string("name").as_deref(), Some("Walda"));
    }
}
