use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bywind")]
#[command(about = "Prepare input layers and compute wind turbine eligibility for Bavaria")]
#[command(version)]
pub struct Args {
    /// Directory holding the prepared input layers
    #[arg(long, value_name = "DIR", default_value = "./input", global = true)]
    pub input_dir: PathBuf,

    /// Directory for result rasters and tables
    #[arg(long, value_name = "DIR", default_value = "./output", global = true)]
    pub output_dir: PathBuf,

    /// Directory for raw downloads and intermediate files
    #[arg(long, value_name = "DIR", default_value = "./downloads", global = true)]
    pub downloads_dir: PathBuf,

    /// Number of threads (default: all available)
    #[arg(short, long, value_name = "N", global = true)]
    pub threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download LoD2 CityGML tiles and convert them to GeoPackage chunks
    FetchBuildings {
        /// Metalink listing the tiles
        #[arg(long, value_name = "URL", default_value = crate::buildings::METALINK_URL)]
        metalink_url: String,

        /// Tiles per GeoPackage chunk
        #[arg(long, value_name = "N", default_value_t = crate::buildings::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Merge building chunks and split them by building function
    PrepBuildings,

    /// Query VOR/DVOR beacons from OpenStreetMap
    FetchBeacons {
        /// Overpass API interpreter endpoint
        #[arg(long, value_name = "URL", default_value = crate::beacons::OVERPASS_URL)]
        overpass_url: String,
    },

    /// Download the protective forest layers
    FetchForest {
        /// Forest function map WFS endpoint
        #[arg(long, value_name = "URL", default_value = crate::forest::WFS_URL)]
        wfs_url: String,
    },

    /// Filter and merge the Geofabrik regional extracts
    PrepGeofabrik,

    /// Derive binary wind-speed masks from the RGB wind atlas raster
    PrepWindspeed {
        /// RGB GeoTIFF exported from the wind atlas; masks are written next to it
        /// (default: <downloads-dir>/windspeed/windspeed_120.tif)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Block size in pixels
        #[arg(long, value_name = "PIXELS", default_value_t = 1024)]
        chunk_size: usize,

        /// Compression (DEFLATE, LZW, ZSTD, PACKBITS, NONE)
        #[arg(long, default_value = "DEFLATE")]
        compression: String,
    },

    /// Share of the region excluded by each constraint set
    ConstrainedAreas {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// JSON file with named constraint sets replacing the built-in ones
        #[arg(long, value_name = "FILE")]
        constraints: Option<PathBuf>,
    },

    /// Available area for settlement setbacks of 0 to 1900 m, with and without forest use
    ForestSweep {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

/// Region, grid and turbine parameters shared by the scenario runs
#[derive(ClapArgs, Debug)]
pub struct ScenarioArgs {
    /// Pixel size in meters (default: 10 for constrained-areas, 100 for forest-sweep)
    #[arg(short, long, value_name = "METERS")]
    pub pixel_size: Option<f64>,

    /// Turbine hub height in meters
    #[arg(long, value_name = "METERS", default_value_t = 120.0)]
    pub hub_height: f64,

    /// Turbine rotor diameter in meters
    #[arg(long, value_name = "METERS", default_value_t = 155.0)]
    pub rotor_diameter: f64,

    /// Region layer, relative to the input directory
    #[arg(long, value_name = "FILE", default_value = "ALKIS-Vereinfacht/VerwaltungsEinheit.shp")]
    pub region: PathBuf,

    /// Attribute filter selecting the region polygon
    #[arg(long, value_name = "SQL", default_value = "art = 'Bundesland'")]
    pub region_filter: String,

    /// Projected CRS of the analysis grid
    #[arg(long, value_name = "CODE", default_value_t = crate::crs::ETRS89_UTM32N)]
    pub epsg: u32,

    /// Compression of the result rasters
    #[arg(long, default_value = "DEFLATE")]
    pub compression: String,
}
