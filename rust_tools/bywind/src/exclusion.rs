use crate::error::{BywindError, Result};
use log::warn;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Raster values to exclude, written as `v`, `[a-b]`, `(a-b)`, `[a-b)`, `(a-b]`.
/// Either interval bound may be omitted: `(17-]` excludes everything above 17.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRange {
    Exact(f64),
    Interval {
        low: Option<Bound>,
        high: Option<Bound>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

impl ValueRange {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || BywindError::InvalidValueRange(text.to_string());
        let trimmed = text.trim();

        let open = trimmed.chars().next().ok_or_else(invalid)?;
        if open != '[' && open != '(' {
            return trimmed.parse::<f64>().map(ValueRange::Exact).map_err(|_| invalid());
        }

        let close = trimmed.chars().last().ok_or_else(invalid)?;
        if trimmed.len() < 3 || (close != ']' && close != ')') {
            return Err(invalid());
        }

        let body = &trimmed[1..trimmed.len() - 1];
        let (low, high) = split_bounds(body).ok_or_else(invalid)?;

        let parse_bound = |raw: &str, inclusive: bool| -> Result<Option<Bound>> {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            let value = raw.parse::<f64>().map_err(|_| invalid())?;
            Ok(Some(Bound { value, inclusive }))
        };

        let low = parse_bound(low, open == '[')?;
        let high = parse_bound(high, close == ']')?;

        if low.is_none() && high.is_none() {
            return Err(invalid());
        }
        if let (Some(l), Some(h)) = (low, high) {
            if l.value > h.value {
                return Err(invalid());
            }
        }

        Ok(ValueRange::Interval { low, high })
    }

    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match *self {
            ValueRange::Exact(target) => value == target,
            ValueRange::Interval { low, high } => {
                let above_low = low.map_or(true, |b| {
                    if b.inclusive {
                        value >= b.value
                    } else {
                        value > b.value
                    }
                });
                let below_high = high.map_or(true, |b| {
                    if b.inclusive {
                        value <= b.value
                    } else {
                        value < b.value
                    }
                });
                above_low && below_high
            }
        }
    }
}

/// Split `a-b` at the separating dash. A dash right after a digit separates;
/// otherwise a leading dash separates an empty low bound (`-5` is "up to 5").
fn split_bounds(body: &str) -> Option<(&str, &str)> {
    let separator = body
        .char_indices()
        .skip(1)
        .find(|&(i, c)| {
            c == '-'
                && body[..i]
                    .chars()
                    .last()
                    .map_or(false, |prev| prev.is_ascii_digit() || prev == '.')
        })
        .map(|(i, _)| i)
        .or_else(|| body.starts_with('-').then_some(0))?;

    Some((&body[..separator], &body[separator + 1..]))
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRange::Exact(v) => write!(f, "{}", v),
            ValueRange::Interval { low, high } => {
                let open = if low.map_or(false, |b| b.inclusive) { '[' } else { '(' };
                let close = if high.map_or(false, |b| b.inclusive) { ']' } else { ')' };
                let low = low.map(|b| b.value.to_string()).unwrap_or_default();
                let high = high.map(|b| b.value.to_string()).unwrap_or_default();
                write!(f, "{}{}-{}{}", open, low, high, close)
            }
        }
    }
}

/// Exclude features of a vector layer, optionally filtered and buffered
#[derive(Debug, Clone, PartialEq)]
pub struct VectorExclusion {
    pub source: PathBuf,
    pub where_clause: Option<String>,
    pub buffer: Option<f64>,
}

impl VectorExclusion {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            where_clause: None,
            buffer: None,
        }
    }

    pub fn filter(mut self, where_clause: &str) -> Self {
        self.where_clause = Some(where_clause.to_string());
        self
    }

    pub fn buffer(mut self, meters: f64) -> Self {
        self.buffer = Some(meters);
        self
    }
}

/// Exclude raster cells whose value falls in a range
#[derive(Debug, Clone, PartialEq)]
pub struct RasterExclusion {
    pub source: PathBuf,
    pub value: ValueRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Vector(VectorExclusion),
    Raster(RasterExclusion),
}

impl Constraint {
    pub fn source(&self) -> &Path {
        match self {
            Constraint::Vector(v) => &v.source,
            Constraint::Raster(r) => &r.source,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Vector(v) => {
                write!(f, "vector {}", v.source.display())?;
                if let Some(clause) = &v.where_clause {
                    write!(f, " where {}", clause)?;
                }
                if let Some(buffer) = v.buffer {
                    write!(f, " buffer {} m", buffer)?;
                }
                Ok(())
            }
            Constraint::Raster(r) => write!(f, "raster {} value {}", r.source.display(), r.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Raster,
    Unknown,
}

/// Classify a constraint layer by file extension
pub fn source_kind(path: &Path) -> SourceKind {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("shp") | Some("gpkg") => SourceKind::Vector,
        Some("tif") | Some("tiff") => SourceKind::Raster,
        _ => SourceKind::Unknown,
    }
}

/// Raster value as written in a declarative constraint file: a number or a range expression
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Number(f64),
    Expression(String),
}

/// Declarative constraint with the `source`/`where`/`buffer`/`value` keys
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintSpec {
    pub source: PathBuf,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub buffer: Option<f64>,
    pub value: Option<ValueSpec>,
}

impl ConstraintSpec {
    /// Resolve against `base_dir` and dispatch on the source extension.
    /// Unknown source types are logged and yield `None`.
    pub fn resolve(&self, base_dir: &Path) -> Result<Option<Constraint>> {
        let source = base_dir.join(&self.source);

        match source_kind(&source) {
            SourceKind::Vector => Ok(Some(Constraint::Vector(VectorExclusion {
                source,
                where_clause: self.where_clause.clone(),
                buffer: self.buffer,
            }))),
            SourceKind::Raster => {
                let value = match &self.value {
                    Some(ValueSpec::Number(v)) => ValueRange::Exact(*v),
                    Some(ValueSpec::Expression(text)) => ValueRange::parse(text)?,
                    None => {
                        return Err(BywindError::InvalidValueRange(format!(
                            "raster constraint {} has no value",
                            source.display()
                        )))
                    }
                };
                Ok(Some(Constraint::Raster(RasterExclusion { source, value })))
            }
            SourceKind::Unknown => {
                warn!("Unknown exclude type ignored: {}", source.display());
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_upper_bound() {
        let range = ValueRange::parse("(17-]").unwrap();
        assert!(!range.contains(17.0));
        assert!(range.contains(17.01));
        assert!(range.contains(90.0));
        assert!(!range.contains(3.0));
    }

    #[test]
    fn test_parse_closed_and_half_open() {
        let closed = ValueRange::parse("[2-5]").unwrap();
        assert!(closed.contains(2.0));
        assert!(closed.contains(5.0));
        assert!(!closed.contains(5.5));

        let half = ValueRange::parse("[2-5)").unwrap();
        assert!(half.contains(2.0));
        assert!(!half.contains(5.0));

        let below = ValueRange::parse("[-5)").unwrap();
        assert!(below.contains(-100.0));
        assert!(!below.contains(5.0));
    }

    #[test]
    fn test_parse_negative_bounds() {
        let range = ValueRange::parse("[-5--1]").unwrap();
        assert!(range.contains(-5.0));
        assert!(range.contains(-1.0));
        assert!(!range.contains(0.0));

        let range = ValueRange::parse("(-3-2)").unwrap();
        assert!(range.contains(-2.5));
        assert!(!range.contains(-3.0));
        assert!(!range.contains(2.0));
    }

    #[test]
    fn test_parse_exact() {
        let range = ValueRange::parse("0").unwrap();
        assert_eq!(range, ValueRange::Exact(0.0));
        assert!(range.contains(0.0));
        assert!(!range.contains(1.0));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ValueRange::parse("").is_err());
        assert!(ValueRange::parse("(-]").is_err());
        assert!(ValueRange::parse("[a-3]").is_err());
        assert!(ValueRange::parse("[5-2]").is_err());
        assert!(ValueRange::parse("[1-2").is_err());
    }

    #[test]
    fn test_display_roundtrip_form() {
        assert_eq!(ValueRange::parse("(17-]").unwrap().to_string(), "(17-)");
        assert_eq!(ValueRange::parse("[1-2]").unwrap().to_string(), "[1-2]");
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(source_kind(Path::new("a/b.shp")), SourceKind::Vector);
        assert_eq!(source_kind(Path::new("a/b.GPKG")), SourceKind::Vector);
        assert_eq!(source_kind(Path::new("a/b.tif")), SourceKind::Raster);
        assert_eq!(source_kind(Path::new("a/b.csv")), SourceKind::Unknown);
        assert_eq!(source_kind(Path::new("a/b")), SourceKind::Unknown);
    }

    #[test]
    fn test_constraint_spec_dispatch() {
        let json = r#"[
            {"source": "Basis-DLM/ver04_f.shp", "where": "ART in ('5510')", "buffer": 6000},
            {"source": "EU-DEM/slope.tif", "value": "(17-]"},
            {"source": "Wind/mask.tif", "value": 0},
            {"source": "notes.txt"}
        ]"#;
        let specs: Vec<ConstraintSpec> = serde_json::from_str(json).unwrap();
        let base = Path::new("/data/input");
        let resolved: Vec<_> = specs.iter().map(|s| s.resolve(base).unwrap()).collect();

        assert_eq!(
            resolved[0],
            Some(Constraint::Vector(
                VectorExclusion::new("/data/input/Basis-DLM/ver04_f.shp")
                    .filter("ART in ('5510')")
                    .buffer(6000.0)
            ))
        );
        assert!(matches!(&resolved[1], Some(Constraint::Raster(r)) if r.value.contains(18.0)));
        assert!(matches!(&resolved[2], Some(Constraint::Raster(r)) if r.value == ValueRange::Exact(0.0)));
        assert_eq!(resolved[3], None);
    }

    #[test]
    fn test_raster_spec_without_value_fails() {
        let spec: ConstraintSpec = serde_json::from_str(r#"{"source": "x.tif"}"#).unwrap();
        assert!(spec.resolve(Path::new(".")).is_err());
    }
}
