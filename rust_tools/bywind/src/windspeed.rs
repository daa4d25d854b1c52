//! Binary wind-speed masks from the rendered legend colours of the Bavarian wind atlas
//! (layer `windgeschwindigkeit_120m`, exported from the WMS as an RGB GeoTIFF).
//!
//! Legend: <https://www.lfu.bayern.de/gdi/legende/energieatlas/windatlas2021/windgeschwindigkeit_120m.png>

use crate::chunking::ChunkGrid;
use crate::error::Result;
use crate::io;
use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

pub type Rgb = (u8, u8, u8);

/// Legend classes up to 4.5 m/s
pub const BLOCKLIST_4_5: &[Rgb] = &[
    (0, 15, 135),   // up to 3.5 m/s
    (3, 42, 149),   // 3.5 - 3.6
    (7, 70, 164),   // 3.6 - 3.7
    (10, 97, 179),  // 3.7 - 3.8
    (14, 125, 194), // 3.8 - 3.9
    (8, 156, 208),  // 3.9 - 4.0
    (0, 187, 238),  // 4.0 - 4.1
    (82, 232, 221), // 4.1 - 4.2
    (36, 210, 161), // 4.2 - 4.3
    (45, 195, 137), // 4.3 - 4.4
    (54, 180, 115), // 4.4 - 4.5
];

/// Additional classes between 4.5 and 4.8 m/s
const EXTRA_4_8: &[Rgb] = &[
    (110, 195, 53), // 4.5 - 4.6
    (150, 205, 15), // 4.6 - 4.7
    (180, 215, 0),  // 4.7 - 4.8
];

/// Named set of legend colours below a wind-speed threshold
#[derive(Debug, Clone, PartialEq)]
pub struct Blocklist {
    pub name: &'static str,
    pub colors: Vec<Rgb>,
}

/// The 4.5 m/s and 4.8 m/s thresholds
pub fn default_blocklists() -> Vec<Blocklist> {
    let mut colors_4_8 = BLOCKLIST_4_5.to_vec();
    colors_4_8.extend_from_slice(EXTRA_4_8);

    vec![
        Blocklist {
            name: "4.5m",
            colors: BLOCKLIST_4_5.to_vec(),
        },
        Blocklist {
            name: "4.8m",
            colors: colors_4_8,
        },
    ]
}

/// 1 where the pixel colour is not blocklisted, 0 where it is
pub fn compute_mask(
    red: &Array2<u8>,
    green: &Array2<u8>,
    blue: &Array2<u8>,
    blocklist: &[Rgb],
) -> Result<Array2<u8>> {
    let (nrows, ncols) = red.dim();

    let rows: Vec<Vec<u8>> = (0..nrows)
        .into_par_iter()
        .map(|row| {
            (0..ncols)
                .map(|col| {
                    let pixel = (red[[row, col]], green[[row, col]], blue[[row, col]]);
                    u8::from(!blocklist.contains(&pixel))
                })
                .collect()
        })
        .collect();

    let flat: Vec<u8> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((nrows, ncols), flat)?)
}

/// Wind atlas export in `downloads/windspeed`
pub fn default_input(downloads_dir: &Path) -> PathBuf {
    downloads_dir.join("windspeed").join("windspeed_120.tif")
}

/// Masks are written next to their input
pub fn output_dir_for(input: &Path) -> PathBuf {
    input
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Output file for a blocklist, e.g. `windspeed_120_4.5m.tif`
pub fn mask_path(output_dir: &Path, blocklist: &Blocklist) -> PathBuf {
    output_dir.join(format!("windspeed_120_{}.tif", blocklist.name))
}

/// Write one 1-bit mask per blocklist, reading the RGB input block by block
pub fn write_masks(
    input: &Path,
    output_dir: &Path,
    blocklists: &[Blocklist],
    chunk_size: usize,
    compression: &str,
) -> Result<Vec<PathBuf>> {
    io::validate_compression(compression)?;
    std::fs::create_dir_all(output_dir)?;

    let (dataset, metadata) = io::open_raster(input, 3)?;
    info!("Wind speed raster: {}x{}", metadata.width, metadata.height);

    let mut outputs = Vec::with_capacity(blocklists.len());
    let mut datasets = Vec::with_capacity(blocklists.len());
    for blocklist in blocklists {
        let path = mask_path(output_dir, blocklist);
        let options = io::creation_options(compression, Some(1));
        datasets.push(io::create_output_dataset::<u8>(&path, &metadata, 1, options)?);
        outputs.push(path);
    }

    let grid = ChunkGrid::new(metadata.width, metadata.height, chunk_size)?;
    for (chunk_idx, bounds) in grid.iter() {
        debug!("Block {}/{}", chunk_idx + 1, grid.total_chunks);

        let red = io::read_band_window::<u8>(&dataset, 1, &bounds)?;
        let green = io::read_band_window::<u8>(&dataset, 2, &bounds)?;
        let blue = io::read_band_window::<u8>(&dataset, 3, &bounds)?;

        for (blocklist, out) in blocklists.iter().zip(datasets.iter_mut()) {
            let mask = compute_mask(&red, &green, &blue, &blocklist.colors)?;
            io::write_band_window(out, 1, &mask, &bounds)?;
        }
    }

    for path in &outputs {
        info!("Wrote wind speed mask {}", path.display());
    }
    Ok(outputs)
}
