//! Protective forest layers of the Bavarian forest function map (Waldfunktionskarte) WFS.

use crate::download;
use crate::error::Result;
use crate::io::{self, SHAPEFILE_DRIVER};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub const WFS_URL: &str =
    "https://www.fovgis.bayern.de/arcgis/services/fov/waldfunktionskarte/MapServer/WFSServer";

const WFS_PARAMETERS: &str =
    "SERVICE=WFS&REQUEST=GetFeature&VERSION=2.0.0&SRSNAME=urn:ogc:def:crs:EPSG::25832";

pub const LAYER_NAMES: [&str; 7] = [
    "Bodenschutzwald",
    "Erholungswald",
    "Lawinenschutzwald",
    "regionaler_Klimaschutzwald",
    "Schutzwald_fuer_Immissionen_Laerm_und_lokales_Klima",
    "Schutzwald_fuer_Lebensraum_Landschaftsbild_Genressourcen_und_historisch_wertvollen_Waldbestand",
    "Sichtschutzwald",
];

/// GetFeature request for one layer, in EPSG:25832
pub fn wfs_url(base_url: &str, layer: &str) -> String {
    format!(
        "{}?{}&TYPENAMES=fov_waldfunktionskarte:{}",
        base_url, WFS_PARAMETERS, layer
    )
}

/// Download every layer as GML into `downloads_dir` and copy it to `{layer}.shp` in `output_dir`
pub fn fetch_forest(base_url: &str, downloads_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let mut outputs = Vec::with_capacity(LAYER_NAMES.len());
    for layer in LAYER_NAMES {
        info!("Fetching forest layer {}", layer);
        let name = format!("{}.gml", layer);
        download::download_file(&name, &wfs_url(base_url, layer), downloads_dir)?;

        let gml = downloads_dir.join(&name);
        let shp = output_dir.join(format!("{}.shp", layer));
        io::merge_layers(&[gml.as_path()], None, &shp, SHAPEFILE_DRIVER)?;
        outputs.push(shp);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wfs_url() {
        assert_eq!(
            wfs_url(WFS_URL, "Erholungswald"),
            "https://www.fovgis.bayern.de/arcgis/services/fov/waldfunktionskarte/MapServer/WFSServer\
             ?SERVICE=WFS&REQUEST=GetFeature&VERSION=2.0.0&SRSNAME=urn:ogc:def:crs:EPSG::25832\
             &TYPENAMES=fov_waldfunktionskarte:Erholungswald"
        );
    }

    #[test]
    fn test_layer_names_unique() {
        let mut names = LAYER_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);
    }
}
