//! Filter and merge the Geofabrik shapefile extracts of the Bavarian sub-regions.
//!
//! The `.shp.zip` archives of every region under
//! <https://download.geofabrik.de/europe/germany/bayern.html> are expected to be extracted
//! into one sub-directory per region.

use crate::error::Result;
use crate::io::{self, SHAPEFILE_DRIVER};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Layer stem and the attribute filter applied to it
pub const LAYERS: [(&str, &str); 2] = [
    ("gis_osm_waterways_free_1", "fclass IN ('stream', 'ditch')"),
    (
        "gis_osm_pois_a_free_1",
        "fclass IN ('archaeological', 'monument', 'memorial', 'castle')",
    ),
];

/// Region sub-directories, sorted for a stable feature order
pub fn region_dirs(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(base_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Write one filtered shapefile per entry of [`LAYERS`] into `output_dir`
pub fn prepare_geofabrik(base_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let regions = region_dirs(base_dir)?;
    if regions.is_empty() {
        warn!("No region directories in {}", base_dir.display());
    }
    info!("Merging Geofabrik extracts of {} regions", regions.len());
    fs::create_dir_all(output_dir)?;

    let mut outputs = Vec::with_capacity(LAYERS.len());
    for (stem, filter) in LAYERS {
        let inputs: Vec<PathBuf> = regions
            .iter()
            .map(|region| region.join(format!("{}.shp", stem)))
            .collect();
        let inputs: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();

        let output = output_dir.join(format!("{}.shp", stem));
        io::merge_layers(&inputs, Some(filter), &output, SHAPEFILE_DRIVER)?;
        outputs.push(output);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_dirs_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("unterfranken")).unwrap();
        fs::create_dir(dir.path().join("oberbayern")).unwrap();
        fs::write(dir.path().join("bayern.html"), "").unwrap();

        let dirs = region_dirs(dir.path()).unwrap();
        assert_eq!(
            dirs,
            vec![dir.path().join("oberbayern"), dir.path().join("unterfranken")]
        );
    }

    #[test]
    fn test_missing_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(region_dirs(&dir.path().join("geofabrik")).is_err());
    }
}
