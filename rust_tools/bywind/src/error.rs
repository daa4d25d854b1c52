use thiserror::Error;

#[derive(Error, Debug)]
pub enum BywindError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(Box<ureq::Error>),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Metalink entry {0} has no {1}")]
    InvalidMetalinkEntry(usize, &'static str),

    #[error("Building {0} has no ground surface polygon")]
    MissingGroundSurface(String),

    #[error("Building element has no {0}")]
    MissingBuildingAttribute(&'static str),

    #[error("Invalid coordinate list: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid value range: {0}")]
    InvalidValueRange(String),

    #[error("Region {0} contains no features matching the filter")]
    EmptyRegion(String),

    #[error("Input raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Pixel size is non-positive: {0}")]
    InvalidPixelSize(f64),

    #[error("Raster {path} is {width}x{height}, expected {expected_width}x{expected_height}")]
    RasterMismatch {
        path: String,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },

    #[error("Raster {0} has {1} bands, expected at least {2}")]
    MissingBand(String, usize, usize),

    #[error("Invalid chunk size: {0} (must be positive)")]
    InvalidChunkSize(usize),

    #[error("Invalid compression type: {0}")]
    InvalidCompression(String),

    #[error("CRS error: {0}")]
    CrsError(String),

    #[error("Warping {0} onto the region grid failed")]
    WarpFailed(String),
}

impl From<ureq::Error> for BywindError {
    fn from(err: ureq::Error) -> Self {
        BywindError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, BywindError>;
