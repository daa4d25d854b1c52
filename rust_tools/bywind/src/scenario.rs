//! Constraint catalogs and the two scenario runs: constrained area per constraint set, and
//! the settlement-distance sweep with and without forest use.
//!
//! Filters and setback distances follow the supplementary material of Risch et al.

use crate::calculator::{CalculatorFactory, ExclusionCalculator};
use crate::error::Result;
use crate::exclusion::{Constraint, ConstraintSpec, RasterExclusion, ValueRange, VectorExclusion};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Reference turbine used to derive setback distances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Turbine {
    pub hub_height: f64,
    pub rotor_diameter: f64,
}

impl Default for Turbine {
    fn default() -> Self {
        Self {
            hub_height: 120.0,
            rotor_diameter: 155.0,
        }
    }
}

impl Turbine {
    pub fn radius(&self) -> f64 {
        self.rotor_diameter / 2.0
    }

    /// Hub height plus blade tip
    pub fn total_height(&self) -> f64 {
        self.hub_height + self.radius()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    pub name: String,
    pub constraints: Vec<Constraint>,
}

fn vector(base: &Path, relative: &str) -> VectorExclusion {
    VectorExclusion::new(base.join(relative))
}

fn raster(base: &Path, relative: &str, value: ValueRange) -> Constraint {
    Constraint::Raster(RasterExclusion {
        source: base.join(relative),
        value,
    })
}

/// Social and political constraints except national borders
fn settlement_and_infrastructure(base: &Path, turbine: &Turbine) -> Vec<Constraint> {
    let height = turbine.total_height();
    let radius = turbine.radius();

    let dlm = |layer: &str| vector(base, &format!("Basis-DLM/{}.shp", layer));

    vec![
        // Buildings for health treatment
        vector(base, "Gebäude/health.shp").buffer(3.0 * height),
        // Airports
        dlm("ver04_f")
            .filter("ART in ('5510','5511','5512') OR NTZ in ('2000','3000') AND ZUS IS NULL")
            .buffer(6000.0),
        // Airfields
        dlm("ver04_f")
            .filter("ART in ('5520', '5540', '5550') AND (ZUS IS NULL or ZUS = 'None')")
            .buffer(1750.0),
        // Camping
        dlm("sie02_f").filter("FKT = '4330'").buffer(3.0 * height),
        // Cemetery
        dlm("sie02_f").filter("OBJART = '41009'"),
        // Industrial / commercial
        dlm("sie02_f").filter("OBJART ='41002'").buffer(2.0 * height),
        // Military
        dlm("geb03_f").filter("ADF = '4720'"),
        // Mineral extraction
        dlm("sie02_f").filter("OBJART ='41005' OR OBJART ='41004'"),
        // Motorways
        dlm("ver01_l").filter("WDM = '1301'").buffer(40.0 + radius),
        dlm("ver01_f")
            .filter("OBJART_TXT = 'AX_Platz' and FKT != '5310'")
            .buffer(40.0 + radius),
        // Outer areas
        dlm("sie02_f")
            .filter(
                "OBJART = '41001' OR (OBJART='41007' AND FKT in ('1110', '1120', '1130', '1150', '1160', '1170'))",
            )
            .buffer(3.0 * height),
        // Power lines
        dlm("sie03_l").filter("OBJART_TXT = 'AX_Leitung'").buffer(2.0 * radius),
        // Primary roads
        dlm("ver01_l").filter("WDM = '1303'").buffer(20.0 + radius),
        // Railways
        dlm("ver03_l").filter("OBJART_TXT = 'AX_Bahnstrecke'").buffer(2.0 * radius),
        dlm("ver03_f").buffer(2.0 * radius),
        dlm("ver06_f")
            .filter("OBJART_TXT ='AX_Bahnverkehrsanlage'")
            .buffer(2.0 * radius),
        // Recreational
        dlm("sie02_f").filter("OBJART = '41008'"),
        // Regional roads
        dlm("ver01_l")
            .filter("WDM != '1301' AND WDM != '1303' AND WDM != '1305'")
            .buffer(radius),
        // Secondary roads
        dlm("ver01_l").filter("WDM = '1305'").buffer(radius),
        // Navigation beacons from OSM (fetch-beacons)
        vector(base, "DVOR/DVOR.shp").buffer(10_000.0),
        vector(base, "DVOR/VOR.shp").buffer(15_000.0),
        // Historical sites from OSM (prep-geofabrik)
        vector(base, "OSM/gis_osm_pois_a_free_1.shp"),
    ]
    .into_iter()
    .map(Constraint::Vector)
    .collect()
}

pub fn social_political(base: &Path, turbine: &Turbine) -> Vec<Constraint> {
    let mut constraints = settlement_and_infrastructure(base, turbine);
    // National borders, converted from polygons to lines beforehand
    constraints.push(Constraint::Vector(
        vector(base, "Grenzen/VG250_STA.shp").buffer(100.0),
    ));
    constraints
}

pub fn physical(base: &Path) -> Vec<Constraint> {
    vec![
        // Lakes and harbour basins
        Constraint::Vector(
            vector(base, "Basis-DLM/gew01_f.shp")
                .filter("OBJART_TXT='AX_Hafenbecken' OR OBJART_TXT='AX_StehendesGewaesser'")
                .buffer(50.0),
        ),
        // Rivers
        Constraint::Vector(
            vector(base, "Basis-DLM/gew01_f.shp")
                .filter(
                    "OBJART_TXT='AX_Fliessgewaesser' OR OBJART_TXT='AX_Kanal' OR OBJART_TXT='AX_Wasserlauf' OR OBJART_TXT='AX_Gewaesserachse'",
                )
                .buffer(50.0),
        ),
        // Streams from OSM (prep-geofabrik)
        Constraint::Vector(vector(base, "OSM/gis_osm_waterways_free_1.shp")),
        // Slope above 17 degrees, EU-DEM cropped to Bavaria
        raster(
            base,
            "EU-DEM/EU-DEM-Slope-BY.tif",
            ValueRange::Interval {
                low: Some(crate::exclusion::Bound {
                    value: 17.0,
                    inclusive: false,
                }),
                high: None,
            },
        ),
    ]
}

pub fn conservation(base: &Path, turbine: &Turbine) -> Vec<Constraint> {
    vec![
        // National parks
        vector(base, "nlp_epsg25832_shp/nlp_epsg25832_shp.shp"),
        // Nature reserves
        vector(base, "nsg_epsg25832_shp/nsg_epsg25832_shp.shp"),
        // Special protection areas for birds
        vector(base, "vogelschutz_epsg25832_shp/vogelschutz_epsg25832_shp.shp")
            .buffer(10.0 * turbine.total_height()),
        vector(base, "Alpenplan/Alpenplan.shp").filter("zone = 'C'"),
        vector(base, "Wasserschutz/Wasserschutz.shp").buffer(50.0),
        // Biosphere reserve core zones
        vector(base, "Biosphäre/Kernzone.shp"),
    ]
    .into_iter()
    .map(Constraint::Vector)
    .collect()
}

/// Cells below the wind-speed threshold (mask value 0, prep-windspeed)
pub fn technical_economic(base: &Path) -> Vec<Constraint> {
    vec![raster(
        base,
        "Windgeschwindigkeit/windspeed_120_4.5m.tif",
        ValueRange::Exact(0.0),
    )]
}

/// The four constraint sets, in reporting order
pub fn constrained_area_sets(base: &Path, turbine: &Turbine) -> Vec<ConstraintSet> {
    vec![
        ConstraintSet {
            name: "social_political".to_string(),
            constraints: social_political(base, turbine),
        },
        ConstraintSet {
            name: "physical".to_string(),
            constraints: physical(base),
        },
        ConstraintSet {
            name: "conservation".to_string(),
            constraints: conservation(base, turbine),
        },
        ConstraintSet {
            name: "technical_economic".to_string(),
            constraints: technical_economic(base),
        },
    ]
}

/// Fixed constraints of the forest sweep
pub fn forest_sweep_base(base: &Path, turbine: &Turbine) -> Vec<Constraint> {
    let mut constraints = settlement_and_infrastructure(base, turbine);
    constraints.extend(physical(base));
    constraints.extend(conservation(base, turbine));
    constraints
}

/// Constraints whose buffer is swept: residential buildings and inner areas
pub fn variable_excludes(base: &Path) -> Vec<VectorExclusion> {
    vec![
        vector(base, "Gebäude/residential.shp"),
        vector(base, "Basis-DLM/sie01_f.shp"),
    ]
}

pub fn forest_use(base: &Path) -> VectorExclusion {
    vector(base, "Basis-DLM/veg02_f.shp")
}

/// Setback distances of the sweep: 0, 100, ..., 1900 m
pub fn default_sweep_buffers() -> Vec<u32> {
    (0..2000).step_by(100).collect()
}

#[derive(Debug, Deserialize)]
struct ConstraintSetSpec {
    name: String,
    constraints: Vec<ConstraintSpec>,
}

/// Load named constraint sets from a JSON list of `{name, constraints: [...]}`.
/// Sources are resolved against `base`; unknown source types are dropped.
pub fn load_constraint_sets(path: &Path, base: &Path) -> Result<Vec<ConstraintSet>> {
    info!("Loading constraint sets from {}", path.display());
    let text = fs::read_to_string(path)?;
    let specs: Vec<ConstraintSetSpec> = serde_json::from_str(&text)?;

    specs
        .into_iter()
        .map(|set| {
            let constraints = set
                .constraints
                .iter()
                .filter_map(|spec| spec.resolve(base).transpose())
                .collect::<Result<Vec<_>>>()?;
            Ok(ConstraintSet {
                name: set.name,
                constraints,
            })
        })
        .collect()
}

fn raster_name(output_dir: &Path, pixel_size: f64, suffix: &str) -> PathBuf {
    output_dir.join(format!("ByWind_{}{}.tif", pixel_size, suffix))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstrainedAreaRow {
    pub scenario: String,
    pub constrained_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestSweepRow {
    pub buffer: u32,
    pub percent_available_no_forest_use: f64,
    pub percent_available_forest_use: f64,
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Share of the region excluded by each constraint set on its own.
/// Writes `ByWind_{res}_{set}.tif` per set and `ByWind_constrained_areas.csv`.
pub fn run_constrained_areas<F: CalculatorFactory>(
    factory: &F,
    sets: &[ConstraintSet],
    output_dir: &Path,
    pixel_size: f64,
) -> Result<Vec<ConstrainedAreaRow>> {
    fs::create_dir_all(output_dir)?;
    let mut rows = Vec::with_capacity(sets.len());

    for set in sets {
        info!("Calculating constrained area ({})", set.name);
        let mut calculator = factory.create(None)?;
        for constraint in &set.constraints {
            calculator.exclude(constraint)?;
        }

        calculator.save(&raster_name(output_dir, pixel_size, &format!("_{}", set.name)))?;

        let constrained_area = 100.0 - calculator.percent_available();
        info!("{}: {:.3}% constrained", set.name, constrained_area);
        rows.push(ConstrainedAreaRow {
            scenario: set.name.clone(),
            constrained_area,
        });
    }

    let csv_path = output_dir.join("ByWind_constrained_areas.csv");
    write_csv(&csv_path, &rows)?;
    info!("Wrote {}", csv_path.display());
    Ok(rows)
}

/// Inputs of the forest-use sweep
pub struct ForestSweep<'a> {
    pub base_constraints: &'a [Constraint],
    pub variable_excludes: &'a [VectorExclusion],
    pub forest: &'a VectorExclusion,
    pub buffers: &'a [u32],
}

/// Available area for each settlement setback, with and without forest use.
///
/// The fixed constraints are applied once and saved as `ByWind_{res}.tif`; every setback
/// starts from that raster. The CSV is rewritten after each setback so an interrupted run
/// keeps its finished rows.
pub fn run_forest_sweep<F: CalculatorFactory>(
    factory: &F,
    sweep: &ForestSweep<'_>,
    output_dir: &Path,
    pixel_size: f64,
) -> Result<Vec<ForestSweepRow>> {
    fs::create_dir_all(output_dir)?;

    let mut base = factory.create(None)?;
    for constraint in sweep.base_constraints {
        base.exclude(constraint)?;
    }
    info!("Fixed constraints: {:.3}% available", base.percent_available());

    let base_path = raster_name(output_dir, pixel_size, "");
    base.save(&base_path)?;
    drop(base);

    let csv_path = output_dir.join("ByWind_results.csv");
    let mut rows = Vec::with_capacity(sweep.buffers.len());

    for &buffer in sweep.buffers {
        info!("Settlement setback {} m", buffer);
        let mut calculator = factory.create(Some(&base_path))?;

        for exclude in sweep.variable_excludes {
            let exclude = exclude.clone().buffer(f64::from(buffer));
            calculator.exclude(&Constraint::Vector(exclude))?;
        }
        let percent_available_forest_use = calculator.percent_available();
        info!("{} m with forest use: {:.3}% available", buffer, percent_available_forest_use);
        calculator.save(&raster_name(output_dir, pixel_size, &format!("_{}_forest_use", buffer)))?;

        calculator.exclude(&Constraint::Vector(sweep.forest.clone()))?;
        let percent_available_no_forest_use = calculator.percent_available();
        info!(
            "{} m without forest use: {:.3}% available",
            buffer, percent_available_no_forest_use
        );
        calculator.save(&raster_name(output_dir, pixel_size, &format!("_{}_no_forest_use", buffer)))?;

        rows.push(ForestSweepRow {
            buffer,
            percent_available_no_forest_use,
            percent_available_forest_use,
        });
        write_csv(&csv_path, &rows)?;
    }

    info!("Wrote {}", csv_path.display());
    Ok(rows)
}
