use crate::error::{BywindError, Result};
use roxmltree::{Document, Node};

pub const BLDG_NS: &str = "http://www.opengis.net/citygml/building/1.0";
pub const GML_NS: &str = "http://www.opengis.net/gml";

/// Ground outline of one LoD2 building
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingFootprint {
    pub gml_id: String,
    pub function: String,
    pub ground_surface: Vec<[f64; 3]>,
}

impl BuildingFootprint {
    /// Polygon Z WKT of the ground surface, ring closed if the source left it open
    pub fn to_wkt(&self) -> String {
        let mut ring: Vec<String> = self
            .ground_surface
            .iter()
            .map(|[x, y, z]| format!("{} {} {}", x, y, z))
            .collect();

        if let (Some(first), Some(last)) = (self.ground_surface.first(), self.ground_surface.last()) {
            if first != last {
                ring.push(ring[0].clone());
            }
        }

        format!("POLYGON Z (({}))", ring.join(", "))
    }
}

/// All `bldg:Building` elements that carry a `bldg:function`
pub fn extract_buildings<'a, 'input>(doc: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
    doc.descendants()
        .filter(|node| node.has_tag_name((BLDG_NS, "Building")))
        .filter(|building| find_descendant(*building, BLDG_NS, "function").is_some())
        .collect()
}

/// Id, function code and first ground-surface polygon of a building
pub fn extract_footprint(building: Node<'_, '_>) -> Result<BuildingFootprint> {
    let gml_id = building
        .attribute((GML_NS, "id"))
        .ok_or(BywindError::MissingBuildingAttribute("gml:id"))?
        .to_string();

    let function = find_descendant(building, BLDG_NS, "function")
        .and_then(|node| node.text())
        .map(|text| text.trim().to_string())
        .ok_or(BywindError::MissingBuildingAttribute("bldg:function"))?;

    for ground_surface in descendants_named(building, BLDG_NS, "GroundSurface") {
        for polygon in descendants_named(ground_surface, GML_NS, "Polygon") {
            if let Some(pos_list) = find_descendant(polygon, GML_NS, "posList") {
                let ground_surface = parse_pos_list(pos_list.text().unwrap_or_default())?;
                return Ok(BuildingFootprint {
                    gml_id,
                    function,
                    ground_surface,
                });
            }
        }
    }

    Err(BywindError::MissingGroundSurface(gml_id))
}

/// Parse every building with a function in a CityGML document
pub fn parse_footprints(xml: &str) -> Result<Vec<BuildingFootprint>> {
    let doc = Document::parse(xml)?;
    let footprints = extract_buildings(&doc)
        .into_iter()
        .map(extract_footprint)
        .collect::<Result<Vec<_>>>()?;
    Ok(footprints)
}

/// Split a whitespace separated `gml:posList` into XYZ triples
fn parse_pos_list(text: &str) -> Result<Vec<[f64; 3]>> {
    let values = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| BywindError::InvalidCoordinates(token.to_string()))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.is_empty() || values.len() % 3 != 0 {
        return Err(BywindError::InvalidCoordinates(format!(
            "{} values is not a list of XYZ triples",
            values.len()
        )));
    }

    Ok(values
        .chunks_exact(3)
        .map(|xyz| [xyz[0], xyz[1], xyz[2]])
        .collect())
}

fn descendants_named<'a, 'input>(
    node: Node<'a, 'input>,
    ns: &'static str,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    // skip(1): `descendants` starts with the node itself
    node.descendants()
        .skip(1)
        .filter(move |child| child.has_tag_name((ns, name)))
}

fn find_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    ns: &'static str,
    name: &'static str,
) -> Option<Node<'a, 'input>> {
    descendants_named(node, ns, name).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<core:CityModel xmlns:core="http://www.opengis.net/citygml/1.0"
    xmlns:bldg="http://www.opengis.net/citygml/building/1.0"
    xmlns:gml="http://www.opengis.net/gml">
  <core:cityObjectMember>
    <bldg:Building gml:id="DEBY_LOD2_1">
      <bldg:function>31001_1000</bldg:function>
      <bldg:boundedBy>
        <bldg:RoofSurface>
          <bldg:lod2MultiSurface><gml:MultiSurface><gml:surfaceMember><gml:Polygon>
            <gml:exterior><gml:LinearRing>
              <gml:posList>9 9 9 9 9 9 9 9 9</gml:posList>
            </gml:LinearRing></gml:exterior>
          </gml:Polygon></gml:surfaceMember></gml:MultiSurface></bldg:lod2MultiSurface>
        </bldg:RoofSurface>
      </bldg:boundedBy>
      <bldg:boundedBy>
        <bldg:GroundSurface>
          <bldg:lod2MultiSurface><gml:MultiSurface><gml:surfaceMember><gml:Polygon>
            <gml:exterior><gml:LinearRing>
              <gml:posList>0 0 500 10 0 500 10 10 500 0 0 500</gml:posList>
            </gml:LinearRing></gml:exterior>
          </gml:Polygon></gml:surfaceMember></gml:MultiSurface></bldg:lod2MultiSurface>
        </bldg:GroundSurface>
      </bldg:boundedBy>
    </bldg:Building>
  </core:cityObjectMember>
  <core:cityObjectMember>
    <bldg:Building gml:id="DEBY_LOD2_2">
      <bldg:measuredHeight>4.0</bldg:measuredHeight>
    </bldg:Building>
  </core:cityObjectMember>
</core:CityModel>"#;

    #[test]
    fn test_extract_buildings_requires_function() {
        let doc = Document::parse(TILE).unwrap();
        let buildings = extract_buildings(&doc);
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].attribute((GML_NS, "id")), Some("DEBY_LOD2_1"));
    }

    #[test]
    fn test_extract_footprint_uses_ground_surface() {
        let footprints = parse_footprints(TILE).unwrap();
        assert_eq!(footprints.len(), 1);

        let footprint = &footprints[0];
        assert_eq!(footprint.gml_id, "DEBY_LOD2_1");
        assert_eq!(footprint.function, "31001_1000");
        // Roof polygon (all 9s) must not be picked
        assert_eq!(
            footprint.ground_surface,
            vec![[0.0, 0.0, 500.0], [10.0, 0.0, 500.0], [10.0, 10.0, 500.0], [0.0, 0.0, 500.0]]
        );
    }

    #[test]
    fn test_missing_ground_surface_is_typed_error() {
        let xml = r#"<root xmlns:bldg="http://www.opengis.net/citygml/building/1.0"
            xmlns:gml="http://www.opengis.net/gml">
            <bldg:Building gml:id="B1"><bldg:function>31001_3240</bldg:function></bldg:Building>
        </root>"#;
        let err = parse_footprints(xml).unwrap_err();
        assert!(matches!(err, BywindError::MissingGroundSurface(id) if id == "B1"));
    }

    #[test]
    fn test_pos_list_must_be_triples() {
        assert!(parse_pos_list("1 2 3 4").is_err());
        assert!(parse_pos_list("").is_err());
        assert!(parse_pos_list("1 2 x").is_err());
        assert_eq!(parse_pos_list("1 2 3").unwrap(), vec![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_wkt_closes_open_ring() {
        let footprint = BuildingFootprint {
            gml_id: "B".to_string(),
            function: "31001_1000".to_string(),
            ground_surface: vec![[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
        };
        assert_eq!(
            footprint.to_wkt(),
            "POLYGON Z ((0 0 1, 1 0 1, 1 1 1, 0 0 1))"
        );
    }
}
