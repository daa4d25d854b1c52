//! LoD2 building footprints: download the CityGML tiles of a district in chunks, then split
//! the merged footprints into residential, health, mixed and other buildings.

use crate::building_function::BuildingCategory;
use crate::citygml::{self, BuildingFootprint};
use crate::crs::ETRS89_UTM32N;
use crate::download;
use crate::error::{BywindError, Result};
use crate::io::{self, FeatureRow, VectorWriter, GEOPACKAGE_DRIVER, SHAPEFILE_DRIVER};
use crate::metalink::{self, MetalinkFile};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, Geometry, OGRFieldType, OGRwkbGeometryType};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Metalink of the LoD2 tiles of all of Bavaria (state key 09)
pub const METALINK_URL: &str = "https://geodaten.bayern.de/odd/a/lod2/citygml/meta/metalink/09.meta4";
pub const DEFAULT_CHUNK_SIZE: usize = 100;

const ID_FIELD: &str = "id";
const FUNCTION_FIELD: &str = "GFK";

fn footprint_fields() -> [(&'static str, OGRFieldType::Type); 2] {
    [
        (ID_FIELD, OGRFieldType::OFTString),
        (FUNCTION_FIELD, OGRFieldType::OFTString),
    ]
}

/// `Chunk_{start}_{chunk_size}.gpkg` in `dir`
pub fn chunk_path(dir: &Path, start: usize, chunk_size: usize) -> PathBuf {
    dir.join(format!("Chunk_{}_{}.gpkg", start, chunk_size))
}

/// Download and convert every tile listed in the metalink, `chunk_size` tiles per GeoPackage.
///
/// Tiles go to `downloads/GML`, chunk files to `downloads/intermediate`. Chunks whose file
/// already exists are skipped. A chunk that fails is logged and skipped; the start indices of
/// failed chunks are returned.
pub fn fetch_buildings(metalink_url: &str, downloads_dir: &Path, chunk_size: usize) -> Result<Vec<usize>> {
    if chunk_size == 0 {
        return Err(BywindError::InvalidChunkSize(chunk_size));
    }

    info!("Fetching metalink {}", metalink_url);
    let manifest = download::fetch_text(metalink_url)?;
    let files = metalink::parse_metalink(&manifest)?;
    info!("{} CityGML tiles listed", files.len());

    let gml_dir = downloads_dir.join("GML");
    let chunk_dir = downloads_dir.join("intermediate");
    fs::create_dir_all(&chunk_dir)?;

    let mut failed_chunks = Vec::new();
    for (chunk_idx, chunk) in files.chunks(chunk_size).enumerate() {
        let start = chunk_idx * chunk_size;
        let path = chunk_path(&chunk_dir, start, chunk_size);
        if path.exists() {
            debug!("Chunk {} already converted", start);
            continue;
        }

        info!("Downloading GML files: chunk {}", start);
        match convert_chunk(chunk, &gml_dir, &path) {
            Ok(count) => info!("Wrote {} buildings to {}", count, path.display()),
            Err(e) => {
                error!("Failed to convert {}: {}", path.display(), e);
                failed_chunks.push(start);
            }
        }
    }

    if failed_chunks.is_empty() {
        info!("All chunks converted");
    } else {
        warn!("Failed chunks: {:?}", failed_chunks);
    }
    Ok(failed_chunks)
}

fn convert_chunk(chunk: &[MetalinkFile], gml_dir: &Path, path: &Path) -> Result<usize> {
    let mut footprints: Vec<BuildingFootprint> = Vec::new();
    for file in chunk {
        let xml = download::download_file(&file.name, &file.url, gml_dir)?;
        footprints.extend(citygml::parse_footprints(&xml)?);
    }

    let result = write_footprints(&footprints, path);
    if result.is_err() && path.exists() {
        // The rolled-back GeoPackage still exists and would mark the chunk as done
        fs::remove_file(path)?;
    }
    result
}

fn write_footprints(footprints: &[BuildingFootprint], path: &Path) -> Result<usize> {
    let srs = SpatialRef::from_epsg(ETRS89_UTM32N)?;
    let mut writer = VectorWriter::create(
        path,
        GEOPACKAGE_DRIVER,
        Some(&srs),
        OGRwkbGeometryType::wkbPolygon25D,
        &footprint_fields(),
    )?;

    let rows = footprints.iter().map(|footprint| -> Result<FeatureRow> {
        Ok((
            Geometry::from_wkt(&footprint.to_wkt())?,
            vec![
                Some(FieldValue::StringValue(footprint.gml_id.clone())),
                Some(FieldValue::StringValue(footprint.function.clone())),
            ],
        ))
    });
    writer.write_all(rows)
}

/// One footprint as stored in a chunk file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildingRecord {
    pub id: String,
    pub function: String,
    pub wkt: String,
}

/// Drop exact duplicates (same id, function and geometry), keeping the first occurrence
pub fn dedupe(records: Vec<BuildingRecord>) -> Vec<BuildingRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

/// Records per category, in `BuildingCategory::ALL` order
pub fn partition(records: Vec<BuildingRecord>) -> Vec<(BuildingCategory, Vec<BuildingRecord>)> {
    let mut groups: Vec<(BuildingCategory, Vec<BuildingRecord>)> = BuildingCategory::ALL
        .iter()
        .map(|&category| (category, Vec::new()))
        .collect();

    for record in records {
        let category = BuildingCategory::classify(&record.function);
        if let Some((_, group)) = groups.iter_mut().find(|(c, _)| *c == category) {
            group.push(record);
        }
    }
    groups
}

fn read_chunk_file(path: &Path) -> Result<Vec<BuildingRecord>> {
    let layer = io::read_vector_layer(path, None)?;
    layer
        .features
        .iter()
        .map(|feature| -> Result<BuildingRecord> {
            let id = feature
                .field_as_string(ID_FIELD)
                .ok_or(BywindError::MissingBuildingAttribute("id"))?;
            let function = feature
                .field_as_string(FUNCTION_FIELD)
                .ok_or(BywindError::MissingBuildingAttribute("function"))?;
            Ok(BuildingRecord {
                id,
                function,
                wkt: feature.geometry.wkt()?,
            })
        })
        .collect()
}

/// Merge all chunk GeoPackages and write one shapefile per building category into `output_dir`
pub fn prepare_buildings(chunk_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut chunk_files: Vec<PathBuf> = fs::read_dir(chunk_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "gpkg"))
        .collect();
    chunk_files.sort();
    info!("Merging {} chunk files from {}", chunk_files.len(), chunk_dir.display());

    let mut records = Vec::new();
    for path in &chunk_files {
        records.extend(read_chunk_file(path)?);
    }
    let total = records.len();
    let records = dedupe(records);
    info!("{} buildings ({} duplicates dropped)", records.len(), total - records.len());

    fs::create_dir_all(output_dir)?;
    let srs = SpatialRef::from_epsg(ETRS89_UTM32N)?;

    let mut outputs = Vec::new();
    for (category, group) in partition(records) {
        let path = output_dir.join(format!("{}.shp", category.file_stem()));
        let mut writer = VectorWriter::create(
            &path,
            SHAPEFILE_DRIVER,
            Some(&srs),
            OGRwkbGeometryType::wkbPolygon25D,
            &footprint_fields(),
        )?;
        let rows = group.into_iter().map(|record| -> Result<FeatureRow> {
            Ok((
                Geometry::from_wkt(&record.wkt)?,
                vec![
                    Some(FieldValue::StringValue(record.id)),
                    Some(FieldValue::StringValue(record.function)),
                ],
            ))
        });
        writer.write_all(rows)?;
        info!("{:?}: {} buildings -> {}", category, writer.written(), path.display());
        outputs.push(path);
    }
    Ok(outputs)
}
