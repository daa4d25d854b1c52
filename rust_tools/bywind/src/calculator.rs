//! Availability rasters over a region, progressively reduced by exclusion layers.
//!
//! Geometry work (reprojection, buffering, rasterization) is delegated to GDAL; this module
//! only keeps the availability grid and the bookkeeping around it.

use crate::chunking::{ChunkBounds, ChunkGrid};
use crate::crs;
use crate::error::{BywindError, Result};
use crate::exclusion::{Constraint, RasterExclusion, ValueRange, VectorExclusion};
use crate::io::{self, RasterMetadata};
use gdal::raster::rasterize;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::Geometry;
use gdal::{Dataset, DriverManager};
use log::{debug, info};
use ndarray::{s, Array2, Zip};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Cell value of available land in saved rasters
pub const AVAILABLE: u8 = 100;
/// Cell value of excluded land in saved rasters
pub const EXCLUDED: u8 = 0;
/// Cells outside the region
pub const OUTSIDE: u8 = 255;

const BUFFER_QUAD_SEGMENTS: u32 = 8;
const RASTERIZE_BATCH: usize = 10_000;
const SAMPLE_CHUNK: usize = 2048;

pub trait ExclusionCalculator {
    fn exclude_vector(&mut self, exclusion: &VectorExclusion) -> Result<()>;

    fn exclude_raster(&mut self, exclusion: &RasterExclusion) -> Result<()>;

    /// Share of region cells still available, 0..=100
    fn percent_available(&self) -> f64;

    fn save(&self, path: &Path) -> Result<()>;

    fn exclude(&mut self, constraint: &Constraint) -> Result<()> {
        info!("Excluding {}", constraint);
        match constraint {
            Constraint::Vector(v) => self.exclude_vector(v),
            Constraint::Raster(r) => self.exclude_raster(r),
        }
    }
}

/// Builds calculators over a fixed region, optionally seeded from a saved availability raster
pub trait CalculatorFactory {
    type Calculator: ExclusionCalculator;

    fn create(&self, initial: Option<&Path>) -> Result<Self::Calculator>;
}

/// Region polygon layer plus raster grid settings
#[derive(Debug, Clone)]
pub struct RegionConfig {
    pub source: PathBuf,
    pub where_clause: Option<String>,
    pub epsg: u32,
    pub pixel_size: f64,
    pub compression: String,
}

/// Grid covering the region envelope, snapped to whole pixels
pub fn region_grid(envelope: (f64, f64, f64, f64), pixel_size: f64, projection: String) -> Result<RasterMetadata> {
    if pixel_size <= 0.0 {
        return Err(BywindError::InvalidPixelSize(pixel_size));
    }

    let (min_x, max_x, min_y, max_y) = envelope;
    let x0 = (min_x / pixel_size).floor() * pixel_size;
    let x1 = (max_x / pixel_size).ceil() * pixel_size;
    let y0 = (min_y / pixel_size).floor() * pixel_size;
    let y1 = (max_y / pixel_size).ceil() * pixel_size;

    let width = ((x1 - x0) / pixel_size).round() as usize;
    let height = ((y1 - y0) / pixel_size).round() as usize;
    if width == 0 || height == 0 {
        return Err(BywindError::InvalidDimensions(width, height));
    }

    Ok(RasterMetadata {
        width,
        height,
        band_count: 1,
        geotransform: [x0, pixel_size, 0.0, y1, 0.0, -pixel_size],
        projection,
        nodata: Some(f64::from(OUTSIDE)),
        pixel_width: pixel_size,
        pixel_height: pixel_size,
    })
}

/// Burn geometries into a zeroed in-memory band: 1 on cells whose centre lies inside a polygon
/// and on cells a line or point falls on
fn rasterize_geometries(grid: &RasterMetadata, geometries: &[Geometry]) -> Result<Array2<u8>> {
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut dataset = driver.create_with_band_type::<u8, _>("", grid.width, grid.height, 1)?;
    dataset.set_geo_transform(&grid.geotransform)?;
    dataset.set_projection(&grid.projection)?;

    for batch in geometries.chunks(RASTERIZE_BATCH) {
        let burn_values = vec![1.0; batch.len()];
        rasterize(&mut dataset, &[1], batch, &burn_values, None)?;
    }

    io::read_band::<u8>(&dataset, 1)
}

/// 1 where a warped value falls in `range`; NaN cells never match
pub fn value_hits(values: &Array2<f64>, range: &ValueRange) -> Array2<u8> {
    let (height, width) = values.dim();
    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|row| {
            values
                .row(row)
                .iter()
                .map(|&value| u8::from(range.contains(value)))
                .collect()
        })
        .collect();

    let flat: Vec<u8> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((height, width), flat).expect("Shape mismatch")
}

/// Nearest-neighbour warp of a source raster onto one block of the region grid.
/// Cells the source does not cover, and source nodata, come back as NaN.
fn warp_block(source: &Dataset, grid: &RasterMetadata, bounds: &ChunkBounds, label: &str) -> Result<Array2<f64>> {
    let gt = &grid.geotransform;
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut block = driver.create_with_band_type::<f64, _>("", bounds.width(), bounds.height(), 1)?;
    block.set_geo_transform(&[
        gt[0] + bounds.x_min as f64 * gt[1],
        gt[1],
        0.0,
        gt[3] + bounds.y_min as f64 * gt[5],
        0.0,
        gt[5],
    ])?;
    block.set_projection(&grid.projection)?;
    {
        let mut band = block.rasterband(1)?;
        band.set_no_data_value(Some(f64::NAN))?;
        band.fill(f64::NAN, None)?;
    }

    io::warp_nearest(source, &block, label)?;
    io::read_band::<f64>(&block, 1)
}

/// Availability share of region cells, 0..=100
pub fn percent_available(region: &Array2<u8>, availability: &Array2<u8>) -> f64 {
    let region_cells = region.iter().filter(|&&r| r > 0).count();
    if region_cells == 0 {
        return 0.0;
    }
    let available_cells = Zip::from(region)
        .and(availability)
        .fold(0usize, |acc, &r, &a| acc + usize::from(r > 0 && a > 0));
    100.0 * available_cells as f64 / region_cells as f64
}

/// Region mask and grid shared by every calculator of a scenario run
pub struct GdalCalculatorFactory {
    grid: RasterMetadata,
    region: Arc<Array2<u8>>,
    epsg: u32,
    compression: String,
}

impl GdalCalculatorFactory {
    pub fn new(config: &RegionConfig) -> Result<Self> {
        io::validate_compression(&config.compression)?;
        let srs = crs::metric_spatial_ref(config.epsg)?;

        info!(
            "Rasterizing region {} ({:?}) at {} m",
            config.source.display(),
            config.where_clause,
            config.pixel_size
        );
        let (layer_srs, geometries) =
            io::read_geometries(&config.source, config.where_clause.as_deref())?;
        if geometries.is_empty() {
            return Err(BywindError::EmptyRegion(config.source.display().to_string()));
        }
        let label = config.source.display().to_string();
        let geometries = crs::reproject_geometries(geometries, layer_srs.as_ref(), &srs, &label)?;

        let envelope = geometries.iter().map(|g| g.envelope()).fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), env| {
                (
                    min_x.min(env.MinX),
                    max_x.max(env.MaxX),
                    min_y.min(env.MinY),
                    max_y.max(env.MaxY),
                )
            },
        );

        let grid = region_grid(envelope, config.pixel_size, srs.to_wkt()?)?;
        info!("Region grid: {}x{} cells", grid.width, grid.height);

        let region = Arc::new(rasterize_geometries(&grid, &geometries)?);

        Ok(Self {
            grid,
            region,
            epsg: config.epsg,
            compression: config.compression.clone(),
        })
    }

    pub fn grid(&self) -> &RasterMetadata {
        &self.grid
    }
}

impl CalculatorFactory for GdalCalculatorFactory {
    type Calculator = GdalExclusionCalculator;

    fn create(&self, initial: Option<&Path>) -> Result<GdalExclusionCalculator> {
        let mut availability = (*self.region).clone();

        if let Some(path) = initial {
            info!("Seeding availability from {}", path.display());
            let (dataset, metadata) = io::open_raster(path, 1)?;
            if metadata.width != self.grid.width || metadata.height != self.grid.height {
                return Err(BywindError::RasterMismatch {
                    path: path.display().to_string(),
                    width: metadata.width,
                    height: metadata.height,
                    expected_width: self.grid.width,
                    expected_height: self.grid.height,
                });
            }

            let seed = io::read_band::<u8>(&dataset, 1)?;
            let nodata = metadata.nodata;
            Zip::from(&mut availability).and(&seed).for_each(|a, &v| {
                let is_nodata = nodata.map_or(false, |nd| f64::from(v) == nd);
                if is_nodata || v == EXCLUDED {
                    *a = 0;
                }
            });
        }

        Ok(GdalExclusionCalculator {
            grid: self.grid.clone(),
            region: Arc::clone(&self.region),
            availability,
            srs: SpatialRef::from_epsg(self.epsg)?,
            compression: self.compression.clone(),
        })
    }
}

pub struct GdalExclusionCalculator {
    grid: RasterMetadata,
    region: Arc<Array2<u8>>,
    availability: Array2<u8>,
    srs: SpatialRef,
    compression: String,
}

impl GdalExclusionCalculator {
    fn apply_hits(&mut self, hits: &Array2<u8>, bounds: &ChunkBounds) {
        let window = self
            .availability
            .slice_mut(s![bounds.y_min..bounds.y_max, bounds.x_min..bounds.x_max]);
        Zip::from(window).and(hits).for_each(|a, &hit| {
            if hit > 0 {
                *a = 0;
            }
        });
    }
}

impl ExclusionCalculator for GdalExclusionCalculator {
    fn exclude_vector(&mut self, exclusion: &VectorExclusion) -> Result<()> {
        let label = exclusion.source.display().to_string();
        let (layer_srs, geometries) =
            io::read_geometries(&exclusion.source, exclusion.where_clause.as_deref())?;

        if geometries.is_empty() {
            info!("{}: no matching features, nothing excluded", label);
            return Ok(());
        }

        let geometries = crs::reproject_geometries(geometries, layer_srs.as_ref(), &self.srs, &label)?;
        let geometries = match exclusion.buffer {
            Some(distance) if distance > 0.0 => {
                debug!("Buffering {} geometries by {} m", geometries.len(), distance);
                geometries
                    .iter()
                    .map(|g| g.buffer(distance, BUFFER_QUAD_SEGMENTS).map_err(BywindError::from))
                    .collect::<Result<Vec<_>>>()?
            }
            _ => geometries,
        };

        let hits = rasterize_geometries(&self.grid, &geometries)?;
        let bounds = ChunkBounds {
            x_min: 0,
            y_min: 0,
            x_max: self.grid.width,
            y_max: self.grid.height,
        };
        self.apply_hits(&hits, &bounds);

        debug!("{}: {:.3}% available", label, self.percent_available());
        Ok(())
    }

    fn exclude_raster(&mut self, exclusion: &RasterExclusion) -> Result<()> {
        let label = exclusion.source.display().to_string();
        let (dataset, source) = io::open_raster(&exclusion.source, 1)?;

        if source.projection.is_empty() {
            return Err(BywindError::CrsError(format!("{} has no CRS", label)));
        }
        if SpatialRef::from_wkt(&source.projection)? != self.srs {
            debug!("{}: warping into the region CRS", label);
        }

        let grid = ChunkGrid::new(self.grid.width, self.grid.height, SAMPLE_CHUNK)?;
        for (_, bounds) in grid.iter() {
            let values = warp_block(&dataset, &self.grid, &bounds, &label)?;
            let hits = value_hits(&values, &exclusion.value);
            self.apply_hits(&hits, &bounds);
        }

        debug!("{}: {:.3}% available", label, self.percent_available());
        Ok(())
    }

    fn percent_available(&self) -> f64 {
        percent_available(&self.region, &self.availability)
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut values = Array2::from_elem((self.grid.height, self.grid.width), OUTSIDE);
        Zip::from(&mut values)
            .and(self.region.as_ref())
            .and(&self.availability)
            .for_each(|v, &r, &a| {
                if r > 0 {
                    *v = if a > 0 { AVAILABLE } else { EXCLUDED };
                }
            });

        let options = io::creation_options(&self.compression, None);
        let mut dataset = io::create_output_dataset::<u8>(path, &self.grid, 1, options)?;
        dataset
            .rasterband(1)?
            .set_no_data_value(Some(f64::from(OUTSIDE)))?;
        io::write_band(&mut dataset, 1, &values)?;

        info!("Saved availability raster {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FeatureRow, VectorWriter, SHAPEFILE_DRIVER};
    use gdal::vector::OGRwkbGeometryType;
    use ndarray::arr2;

    #[test]
    fn test_region_grid_snaps_to_pixels() {
        let grid = region_grid((3.0, 38.0, 1.0, 29.0), 10.0, String::new()).unwrap();
        assert_eq!((grid.width, grid.height), (4, 3));
        assert_eq!(grid.geotransform, [0.0, 10.0, 0.0, 30.0, 0.0, -10.0]);
    }

    #[test]
    fn test_region_grid_rejects_bad_pixel_size() {
        assert!(region_grid((0.0, 1.0, 0.0, 1.0), 0.0, String::new()).is_err());
    }

    #[test]
    fn test_percent_available() {
        let region = arr2(&[[1, 1, 0], [1, 1, 0]]);
        let availability = arr2(&[[1, 0, 0], [1, 1, 1]]);
        // 3 of 4 region cells, the cell outside the region does not count
        assert!((percent_available(&region, &availability) - 75.0).abs() < 1e-9);
        assert_eq!(percent_available(&arr2(&[[0u8]]), &arr2(&[[1u8]])), 0.0);
    }

    #[test]
    fn test_value_hits_skip_nan() {
        let values = arr2(&[[0.0, 5.0, 18.0, f64::NAN], [17.0, 17.5, f64::NAN, 40.0]]);
        let range = ValueRange::parse("(17-]").unwrap();
        assert_eq!(value_hits(&values, &range), arr2(&[[0, 0, 1, 0], [0, 1, 0, 1]]));
        assert_eq!(
            value_hits(&values, &ValueRange::Exact(0.0)),
            arr2(&[[1, 0, 0, 0], [0, 0, 0, 0]])
        );
    }

    #[test]
    fn test_rasterize_burns_centres_and_lines() {
        let wkt = SpatialRef::from_epsg(25832).unwrap().to_wkt().unwrap();
        let grid = region_grid((0.0, 40.0, 0.0, 30.0), 10.0, wkt).unwrap();
        let geometries = vec![
            // Reaches into column 1 and row 1 without covering their centres
            Geometry::from_wkt("POLYGON ((0 0, 14 0, 14 14, 0 14, 0 0))").unwrap(),
            Geometry::from_wkt("LINESTRING (0 25, 40 25)").unwrap(),
        ];
        let burned = rasterize_geometries(&grid, &geometries).unwrap();
        assert_eq!(burned, arr2(&[[1, 1, 1, 1], [0, 0, 0, 0], [1, 0, 0, 0]]));
    }

    // 100 m square at 700000/5400000 in EPSG:25832 without its north-east quarter:
    // a 10x10 grid at 10 m with 75 region cells
    const REGION_WKT: &str = "POLYGON ((700000 5400000, 700100 5400000, 700100 5400050, \
        700050 5400050, 700050 5400100, 700000 5400100, 700000 5400000))";
    const REGION_CELLS: f64 = 75.0;

    fn write_layer(path: &Path, geometry_type: OGRwkbGeometryType::Type, wkts: &[&str]) {
        let srs = SpatialRef::from_epsg(25832).unwrap();
        let mut writer =
            VectorWriter::create(path, SHAPEFILE_DRIVER, Some(&srs), geometry_type, &[]).unwrap();
        let rows = wkts
            .iter()
            .map(|wkt| -> Result<FeatureRow> { Ok((Geometry::from_wkt(wkt)?, Vec::new())) });
        writer.write_all(rows).unwrap();
    }

    fn write_raster(path: &Path, geotransform: [f64; 6], epsg: u32, nodata: Option<f64>, data: &Array2<f64>) {
        let (height, width) = data.dim();
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let mut dataset = driver
            .create_with_band_type::<f64, _>(path, width, height, 1)
            .unwrap();
        dataset.set_geo_transform(&geotransform).unwrap();
        dataset
            .set_projection(&SpatialRef::from_epsg(epsg).unwrap().to_wkt().unwrap())
            .unwrap();
        dataset.rasterband(1).unwrap().set_no_data_value(nodata).unwrap();
        io::write_band(&mut dataset, 1, data).unwrap();
    }

    fn factory(dir: &Path, pixel_size: f64) -> GdalCalculatorFactory {
        let source = dir.join("region.shp");
        if !source.exists() {
            write_layer(&source, OGRwkbGeometryType::wkbPolygon, &[REGION_WKT]);
        }
        GdalCalculatorFactory::new(&RegionConfig {
            source,
            where_clause: None,
            epsg: 25832,
            pixel_size,
            compression: "DEFLATE".to_string(),
        })
        .unwrap()
    }

    // Point in the south-west corner cell (row 9, col 0)
    fn corner_point(dir: &Path) -> PathBuf {
        let path = dir.join("point.shp");
        write_layer(&path, OGRwkbGeometryType::wkbPoint, &["POINT (700005 5400005)"]);
        path
    }

    fn assert_available(calculator: &GdalExclusionCalculator, cells: f64) {
        let expected = 100.0 * cells / REGION_CELLS;
        assert!(
            (calculator.percent_available() - expected).abs() < 1e-9,
            "{} != {}",
            calculator.percent_available(),
            expected
        );
    }

    #[test]
    fn test_region_rasterized() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);
        assert_eq!((factory.grid().width, factory.grid().height), (10, 10));

        let calculator = factory.create(None).unwrap();
        assert_eq!(calculator.region.iter().filter(|&&r| r > 0).count(), 75);
        assert_eq!(calculator.region[[0, 9]], 0);
        assert_available(&calculator, 75.0);
    }

    #[test]
    fn test_calculators_share_region() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);
        let a = factory.create(None).unwrap();
        let b = factory.create(None).unwrap();
        assert!(Arc::ptr_eq(&a.region, &b.region));
        assert!(Arc::ptr_eq(&a.region, &factory.region));
    }

    #[test]
    fn test_vector_exclusion_buffers_only_positive_distances() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);
        let point = corner_point(dir.path());

        let mut bare = factory.create(None).unwrap();
        bare.exclude_vector(&VectorExclusion::new(&point)).unwrap();
        assert_available(&bare, 74.0);

        let mut zero = factory.create(None).unwrap();
        zero.exclude_vector(&VectorExclusion::new(&point).buffer(0.0)).unwrap();
        assert_available(&zero, 74.0);

        // 15 m around the cell centre reaches the three neighbouring centres
        let mut buffered = factory.create(None).unwrap();
        buffered.exclude_vector(&VectorExclusion::new(&point).buffer(15.0)).unwrap();
        assert_available(&buffered, 71.0);
    }

    #[test]
    fn test_save_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);
        let mut calculator = factory.create(None).unwrap();
        calculator
            .exclude_vector(&VectorExclusion::new(corner_point(dir.path())))
            .unwrap();

        let path = dir.path().join("out").join("available.tif");
        calculator.save(&path).unwrap();

        let (dataset, metadata) = io::open_raster(&path, 1).unwrap();
        assert_eq!(metadata.nodata, Some(f64::from(OUTSIDE)));
        let values = io::read_band::<u8>(&dataset, 1).unwrap();
        assert_eq!(values[[0, 9]], OUTSIDE);
        assert_eq!(values[[9, 0]], EXCLUDED);
        assert_eq!(values[[0, 0]], AVAILABLE);
        assert_eq!(values.iter().filter(|&&v| v == AVAILABLE).count(), 74);
    }

    #[test]
    fn test_seeded_calculator_continues_saved_state() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);
        let point = corner_point(dir.path());

        let mut first = factory.create(None).unwrap();
        first.exclude_vector(&VectorExclusion::new(&point)).unwrap();
        let saved = dir.path().join("first.tif");
        first.save(&saved).unwrap();

        let mut seeded = factory.create(Some(&saved)).unwrap();
        assert_available(&seeded, 74.0);
        assert_eq!(seeded.availability[[9, 0]], 0);
        assert_eq!(seeded.availability[[0, 9]], 0);

        seeded
            .exclude_vector(&VectorExclusion::new(&point).buffer(15.0))
            .unwrap();
        assert_available(&seeded, 71.0);
    }

    #[test]
    fn test_seed_treats_zero_and_nodata_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);

        let mut data = Array2::from_elem((10, 10), 1.0);
        data[[9, 0]] = 0.0;
        data[[9, 1]] = 7.0;
        let seed = dir.path().join("seed.tif");
        write_raster(&seed, factory.grid().geotransform, 25832, Some(7.0), &data);

        let calculator = factory.create(Some(&seed)).unwrap();
        assert_available(&calculator, 73.0);
    }

    #[test]
    fn test_seed_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let fine = factory(dir.path(), 10.0);
        let saved = dir.path().join("fine.tif");
        fine.create(None).unwrap().save(&saved).unwrap();

        let coarse = factory(dir.path(), 20.0);
        assert_eq!((coarse.grid().width, coarse.grid().height), (5, 5));
        assert!(matches!(
            coarse.create(Some(&saved)),
            Err(BywindError::RasterMismatch {
                width: 10,
                height: 10,
                expected_width: 5,
                expected_height: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_raster_exclusion_on_region_grid() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);

        let mut data = Array2::zeros((10, 10));
        data[[9, 0]] = 20.0;
        data[[8, 0]] = 17.0;
        let path = dir.path().join("speed.tif");
        write_raster(&path, factory.grid().geotransform, 25832, None, &data);

        let mut calculator = factory.create(None).unwrap();
        calculator
            .exclude_raster(&RasterExclusion {
                source: path,
                value: ValueRange::parse("(17-]").unwrap(),
            })
            .unwrap();
        assert_available(&calculator, 74.0);
        assert_eq!(calculator.availability[[9, 0]], 0);
        assert_eq!(calculator.availability[[8, 0]], 1);
    }

    #[test]
    fn test_raster_exclusion_warps_other_crs() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(dir.path(), 10.0);

        // One 20 degree pixel over 0..20 E, 40..60 N holds the whole region
        let covering = dir.path().join("covering.tif");
        write_raster(&covering, [0.0, 20.0, 0.0, 60.0, 0.0, -20.0], 4326, None, &arr2(&[[20.0]]));
        let mut calculator = factory.create(None).unwrap();
        calculator
            .exclude_raster(&RasterExclusion {
                source: covering,
                value: ValueRange::parse("(17-]").unwrap(),
            })
            .unwrap();
        assert_available(&calculator, 0.0);

        // A source east of the region leaves every cell untouched, even for value 0
        let elsewhere = dir.path().join("elsewhere.tif");
        write_raster(&elsewhere, [20.0, 20.0, 0.0, 60.0, 0.0, -20.0], 4326, None, &arr2(&[[0.0]]));
        let mut calculator = factory.create(None).unwrap();
        calculator
            .exclude_raster(&RasterExclusion {
                source: elsewhere,
                value: ValueRange::Exact(0.0),
            })
            .unwrap();
        assert_available(&calculator, 75.0);
    }
}
