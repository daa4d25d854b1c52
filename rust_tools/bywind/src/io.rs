use crate::chunking::ChunkBounds;
use crate::error::{BywindError, Result};
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, GdalType, RasterBand};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    FieldValue, Geometry, Layer, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType,
};
use gdal::{Dataset, DriverManager};
use log::{debug, info, warn};
use ndarray::Array2;
use std::path::Path;

pub const SHAPEFILE_DRIVER: &str = "ESRI Shapefile";
pub const GEOPACKAGE_DRIVER: &str = "GPKG";

#[derive(Debug, Clone)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub geotransform: [f64; 6],
    pub projection: String,
    pub nodata: Option<f64>,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Extract metadata from a dataset without reading all data
pub fn extract_metadata_from_dataset(dataset: &Dataset) -> Result<RasterMetadata> {
    let rasterband: RasterBand = dataset.rasterband(1)?;

    let width = rasterband.x_size();
    let height = rasterband.y_size();

    if width == 0 || height == 0 {
        return Err(BywindError::InvalidDimensions(width, height));
    }

    let nodata = rasterband.no_data_value();
    let geotransform = dataset.geo_transform()?;
    let pixel_width = geotransform[1].abs();
    let pixel_height = geotransform[5].abs();

    if pixel_width <= 0.0 {
        return Err(BywindError::InvalidPixelSize(pixel_width));
    }

    Ok(RasterMetadata {
        width,
        height,
        band_count: dataset.raster_count() as usize,
        geotransform,
        projection: dataset.projection(),
        nodata,
        pixel_width,
        pixel_height,
    })
}

/// Open a raster and fail early when it has fewer bands than required
pub fn open_raster(path: &Path, min_bands: usize) -> Result<(Dataset, RasterMetadata)> {
    info!("Opening raster: {}", path.display());
    let dataset = Dataset::open(path)?;
    let metadata = extract_metadata_from_dataset(&dataset)?;

    if metadata.band_count < min_bands {
        return Err(BywindError::MissingBand(
            path.display().to_string(),
            metadata.band_count,
            min_bands,
        ));
    }

    debug!(
        "Raster {}: {}x{}, {} bands, pixel {:.3} x {:.3}",
        path.display(),
        metadata.width,
        metadata.height,
        metadata.band_count,
        metadata.pixel_width,
        metadata.pixel_height
    );
    Ok((dataset, metadata))
}

/// Read a whole band into a row-major array
pub fn read_band<T: GdalType + Copy>(dataset: &Dataset, band_index: usize) -> Result<Array2<T>> {
    let rasterband = dataset.rasterband(band_index)?;
    let bounds = ChunkBounds {
        x_min: 0,
        y_min: 0,
        x_max: rasterband.x_size(),
        y_max: rasterband.y_size(),
    };
    read_band_window(dataset, band_index, &bounds)
}

/// Read one block of a band
pub fn read_band_window<T: GdalType + Copy>(
    dataset: &Dataset,
    band_index: usize,
    bounds: &ChunkBounds,
) -> Result<Array2<T>> {
    let rasterband = dataset.rasterband(band_index)?;

    let buffer = rasterband.read_as::<T>(bounds.offset(), bounds.size(), bounds.size(), None)?;
    let (_, data_vec) = buffer.into_shape_and_vec();
    let data = Array2::from_shape_vec((bounds.height(), bounds.width()), data_vec)?;

    Ok(data)
}

/// Warp `source` onto the grid of `target` with nearest-neighbour resampling.
/// Cells without a valid source pixel keep their current value.
pub fn warp_nearest(source: &Dataset, target: &Dataset, label: &str) -> Result<()> {
    let rv = unsafe {
        gdal_sys::GDALReprojectImage(
            source.c_dataset(),
            std::ptr::null(),
            target.c_dataset(),
            std::ptr::null(),
            gdal_sys::GDALResampleAlg::GRA_NearestNeighbour,
            0.0,
            0.0,
            None,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    };

    if rv != gdal_sys::CPLErr::CE_None {
        return Err(BywindError::WarpFailed(label.to_string()));
    }
    Ok(())
}

/// Write a block into a band of an open output dataset
pub fn write_band_window<T: GdalType + Copy>(
    dataset: &mut Dataset,
    band_index: usize,
    data: &Array2<T>,
    bounds: &ChunkBounds,
) -> Result<()> {
    let (rows, cols) = data.dim();
    if rows != bounds.height() || cols != bounds.width() {
        return Err(BywindError::InvalidDimensions(cols, rows));
    }

    let mut raster_band = dataset.rasterband(band_index)?;

    // Iteration order of Array2 is logical row-major even for non-standard layouts
    let values: Vec<T> = data.iter().copied().collect();
    let mut buffer = Buffer::new(bounds.size(), values);

    raster_band.write(bounds.offset(), bounds.size(), &mut buffer)?;

    debug!(
        "Wrote block to band {} at ({},{}) size {}x{}",
        band_index,
        bounds.x_min,
        bounds.y_min,
        bounds.width(),
        bounds.height()
    );
    Ok(())
}

/// Write a whole band
pub fn write_band<T: GdalType + Copy>(
    dataset: &mut Dataset,
    band_index: usize,
    data: &Array2<T>,
) -> Result<()> {
    let (rows, cols) = data.dim();
    let bounds = ChunkBounds {
        x_min: 0,
        y_min: 0,
        x_max: cols,
        y_max: rows,
    };
    write_band_window(dataset, band_index, data, &bounds)
}

/// Create a GeoTIFF sharing the input's grid and projection
pub fn create_output_dataset<T: GdalType>(
    path: &Path,
    metadata: &RasterMetadata,
    num_bands: usize,
    options: Vec<String>,
) -> Result<Dataset> {
    info!("Creating output dataset: {}", path.display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;

    let mut dataset = if options.is_empty() {
        driver.create_with_band_type::<T, _>(path, metadata.width, metadata.height, num_bands)?
    } else {
        let mut gdal_options = CslStringList::new();
        for opt in options {
            gdal_options.add_string(&opt)?;
        }

        driver.create_with_band_type_with_options::<T, _>(
            path,
            metadata.width,
            metadata.height,
            num_bands,
            &gdal_options,
        )?
    };

    dataset.set_geo_transform(&metadata.geotransform)?;
    dataset.set_projection(&metadata.projection)?;

    Ok(dataset)
}

/// Validate compression type
pub fn validate_compression(compression: &str) -> Result<()> {
    let valid_types = ["DEFLATE", "LZW", "ZSTD", "PACKBITS", "NONE"];
    if !valid_types.contains(&compression) {
        return Err(BywindError::InvalidCompression(compression.to_string()));
    }
    Ok(())
}

/// GeoTIFF creation options for mask outputs
pub fn creation_options(compression: &str, nbits: Option<u8>) -> Vec<String> {
    let mut options = vec![
        format!("COMPRESS={}", compression),
        "TILED=YES".to_string(),
        "BIGTIFF=IF_SAFER".to_string(),
    ];
    // 1-bit masks are a fraction of the byte-sized file
    if let Some(bits) = nbits {
        options.push(format!("NBITS={}", bits));
    }
    options
}

/// One feature with its attribute values in layer field order
pub struct VectorFeature {
    pub geometry: Geometry,
    pub fields: Vec<(String, Option<FieldValue>)>,
}

/// All features of a vector layer, after an optional attribute filter
pub struct VectorLayerData {
    pub srs: Option<SpatialRef>,
    pub field_defs: Vec<(String, OGRFieldType::Type)>,
    pub features: Vec<VectorFeature>,
}

impl VectorFeature {
    /// String value of a named attribute
    pub fn field_as_string(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref())
            .and_then(|value| value.clone().into_string())
    }
}

/// Read the first layer of a vector dataset. Features without geometry are dropped.
pub fn read_vector_layer(path: &Path, filter: Option<&str>) -> Result<VectorLayerData> {
    debug!("Reading vector layer: {} (filter: {:?})", path.display(), filter);
    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;

    if let Some(query) = filter {
        layer.set_attribute_filter(query)?;
    }

    let srs = layer.spatial_ref();
    let field_defs = layer
        .defn()
        .fields()
        .map(|field| (field.name(), field.field_type()))
        .collect();

    let mut features = Vec::new();
    let mut skipped = 0usize;
    for feature in layer.features() {
        match feature.geometry() {
            Some(geometry) => features.push(VectorFeature {
                geometry: geometry.clone(),
                fields: feature.fields().collect(),
            }),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{}: skipped {} features without geometry", path.display(), skipped);
    }

    Ok(VectorLayerData {
        srs,
        field_defs,
        features,
    })
}

/// Geometries of the first layer matching an optional attribute filter
pub fn read_geometries(path: &Path, filter: Option<&str>) -> Result<(Option<SpatialRef>, Vec<Geometry>)> {
    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;

    if let Some(query) = filter {
        layer.set_attribute_filter(query)?;
    }

    let srs = layer.spatial_ref();
    let geometries: Vec<Geometry> = layer
        .features()
        .filter_map(|feature| feature.geometry().cloned())
        .collect();

    debug!(
        "{}: {} geometries (filter: {:?})",
        path.display(),
        geometries.len(),
        filter
    );
    Ok((srs, geometries))
}

/// Geometry plus values in the field order given at creation; `None` leaves a field unset
pub type FeatureRow = (Geometry, Vec<Option<FieldValue>>);

/// Single-layer vector output (Shapefile or GeoPackage)
pub struct VectorWriter {
    dataset: Dataset,
    layer_name: String,
    // Names as stored by the driver, which may shorten or launder them
    field_names: Vec<String>,
    // GeoPackage commits every feature written outside a transaction
    transactional: bool,
    written: usize,
}

impl VectorWriter {
    pub fn create(
        path: &Path,
        driver_name: &str,
        srs: Option<&SpatialRef>,
        geometry_type: OGRwkbGeometryType::Type,
        field_defs: &[(&str, OGRFieldType::Type)],
    ) -> Result<Self> {
        let driver = DriverManager::get_driver_by_name(driver_name)?;
        if path.exists() {
            debug!("Replacing existing dataset {}", path.display());
            driver.delete(path)?;
        }

        let layer_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "layer".to_string());

        let mut dataset = driver.create_vector_only(path)?;
        let field_names = {
            let layer = dataset.create_layer(LayerOptions {
                name: &layer_name,
                srs,
                ty: geometry_type,
                ..Default::default()
            })?;
            layer.create_defn_fields(field_defs)?;
            layer.defn().fields().map(|field| field.name()).collect()
        };

        info!("Created {} layer {}", driver_name, path.display());
        Ok(Self {
            dataset,
            layer_name,
            field_names,
            transactional: driver_name == GEOPACKAGE_DRIVER,
            written: 0,
        })
    }

    /// Append all rows. On GeoPackage the rows are committed together and rolled back if
    /// any row fails.
    pub fn write_all<I>(&mut self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<FeatureRow>>,
    {
        if !self.transactional {
            let mut layer = self.dataset.layer_by_name(&self.layer_name)?;
            let count = write_rows(&mut layer, &self.field_names, rows)?;
            self.written += count;
            return Ok(count);
        }

        let mut transaction = self.dataset.start_transaction()?;
        let result = {
            let mut layer = transaction.layer_by_name(&self.layer_name)?;
            write_rows(&mut layer, &self.field_names, rows)
        };

        match result {
            Ok(count) => {
                transaction.commit()?;
                self.written += count;
                Ok(count)
            }
            Err(e) => {
                transaction.rollback()?;
                Err(e)
            }
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

fn write_rows<I>(layer: &mut Layer<'_>, field_names: &[String], rows: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<FeatureRow>>,
{
    let mut count = 0;
    for row in rows {
        let (geometry, values) = row?;
        let mut names = Vec::with_capacity(values.len());
        let mut set_values = Vec::with_capacity(values.len());
        for (name, value) in field_names.iter().zip(values) {
            if let Some(value) = value {
                names.push(name.as_str());
                set_values.push(value);
            }
        }

        layer.create_feature_fields(geometry, &names, &set_values)?;
        count += 1;
    }
    Ok(count)
}

/// Values of `feature` in the order of `field_names`, unset where the feature lacks the field
fn values_for(feature: &VectorFeature, field_names: &[&str]) -> Vec<Option<FieldValue>> {
    field_names
        .iter()
        .map(|name| {
            feature
                .fields
                .iter()
                .find(|(field, _)| field == name)
                .and_then(|(_, value)| value.clone())
        })
        .collect()
}

/// Concatenate the filtered features of several layers into one output layer.
/// The schema and CRS of the first input are used for the output.
pub fn merge_layers(
    inputs: &[&Path],
    filter: Option<&str>,
    output: &Path,
    driver_name: &str,
) -> Result<usize> {
    let layers = inputs
        .iter()
        .map(|path| read_vector_layer(path, filter))
        .collect::<Result<Vec<_>>>()?;

    let (srs, field_defs) = match layers.first() {
        Some(first) => (first.srs.clone(), first.field_defs.clone()),
        None => (None, Vec::new()),
    };
    let field_defs: Vec<(&str, OGRFieldType::Type)> = field_defs
        .iter()
        .map(|(name, ty)| (name.as_str(), *ty))
        .collect();
    let field_names: Vec<&str> = field_defs.iter().map(|(name, _)| *name).collect();

    let mut writer = VectorWriter::create(
        output,
        driver_name,
        srs.as_ref(),
        OGRwkbGeometryType::wkbUnknown,
        &field_defs,
    )?;

    let rows = layers
        .iter()
        .flat_map(|layer| layer.features.iter())
        .map(|feature| Ok((feature.geometry.clone(), values_for(feature, &field_names))));
    writer.write_all(rows)?;

    info!(
        "Merged {} features from {} layers into {}",
        writer.written(),
        inputs.len(),
        output.display()
    );
    Ok(writer.written())
}
