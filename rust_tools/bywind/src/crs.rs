use crate::error::{BywindError, Result};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::Geometry;
use log::{debug, info, warn};

/// ETRS89 / UTM zone 32N, the CRS of the Bavarian cadastral layers
pub const ETRS89_UTM32N: u32 = 25832;
pub const WGS84: u32 = 4326;

/// Linear unit factor of a metric CRS is 1.0
pub fn is_metric_unit(linear_units: f64) -> bool {
    (linear_units - 1.0).abs() < 0.01
}

/// Spatial reference for an EPSG code that must be projected in meters,
/// since buffers and pixel sizes are given in meters
pub fn metric_spatial_ref(epsg: u32) -> Result<SpatialRef> {
    let spatial_ref = SpatialRef::from_epsg(epsg)?;

    if spatial_ref.is_geographic() {
        return Err(BywindError::CrsError(format!(
            "EPSG:{} is geographic, distances in meters need a projected CRS",
            epsg
        )));
    }

    let linear_units = spatial_ref.linear_units();
    if !is_metric_unit(linear_units) {
        return Err(BywindError::CrsError(format!(
            "EPSG:{} has non-meter units (units={:.6})",
            epsg, linear_units
        )));
    }

    info!("Using EPSG:{} (meters)", epsg);
    Ok(spatial_ref)
}

/// Reproject geometries into `target` unless they already share it.
/// Layers without a CRS are assumed to be in `target`.
pub fn reproject_geometries(
    geometries: Vec<Geometry>,
    source: Option<&SpatialRef>,
    target: &SpatialRef,
    label: &str,
) -> Result<Vec<Geometry>> {
    let source = match source {
        Some(srs) => srs,
        None => {
            warn!("{} has no CRS, assuming the target CRS", label);
            return Ok(geometries);
        }
    };

    if source == target {
        return Ok(geometries);
    }

    debug!("Reprojecting {} geometries of {}", geometries.len(), label);
    geometries
        .iter()
        .map(|geometry| geometry.transform_to(target).map_err(BywindError::from))
        .collect()
}
