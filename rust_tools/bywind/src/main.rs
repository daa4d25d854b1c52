use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::path::Path;

use bywind::calculator::{GdalCalculatorFactory, RegionConfig};
use bywind::cli::{Args, Command, ScenarioArgs};
use bywind::error::Result;
use bywind::scenario::{self, ForestSweep, Turbine};
use bywind::{beacons, buildings, forest, geofabrik, windspeed};

/// Turbine and region calculator for a scenario run, with the effective pixel size
fn scenario_setup(
    args: &ScenarioArgs,
    input_dir: &Path,
    default_pixel_size: f64,
) -> Result<(Turbine, GdalCalculatorFactory, f64)> {
    let turbine = Turbine {
        hub_height: args.hub_height,
        rotor_diameter: args.rotor_diameter,
    };
    info!(
        "Turbine: hub height {} m, rotor diameter {} m, total height {} m",
        turbine.hub_height,
        turbine.rotor_diameter,
        turbine.total_height()
    );

    let pixel_size = args.pixel_size.unwrap_or(default_pixel_size);
    let factory = GdalCalculatorFactory::new(&RegionConfig {
        source: input_dir.join(&args.region),
        where_clause: Some(args.region_filter.clone()),
        epsg: args.epsg,
        pixel_size,
        compression: args.compression.clone(),
    })?;

    Ok((turbine, factory, pixel_size))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== ByWind ===");

    // Set thread pool size if specified
    if let Some(n_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global()
            .expect("Failed to build thread pool");
        info!("Using {} threads", n_threads);
    } else {
        info!("Using all available threads");
    }

    let input_dir = args.input_dir.as_path();
    let downloads_dir = args.downloads_dir.as_path();

    match &args.command {
        Command::FetchBuildings {
            metalink_url,
            chunk_size,
        } => {
            let failed = buildings::fetch_buildings(metalink_url, downloads_dir, *chunk_size)?;
            if !failed.is_empty() {
                warn!("{} chunks failed, rerun to retry them", failed.len());
            }
        }
        Command::PrepBuildings => {
            buildings::prepare_buildings(&downloads_dir.join("intermediate"), &input_dir.join("Gebäude"))?;
        }
        Command::FetchBeacons { overpass_url } => {
            beacons::fetch_beacons(overpass_url, &input_dir.join("DVOR"))?;
        }
        Command::FetchForest { wfs_url } => {
            forest::fetch_forest(wfs_url, &downloads_dir.join("Schutzwald"), &input_dir.join("Schutzwald"))?;
        }
        Command::PrepGeofabrik => {
            geofabrik::prepare_geofabrik(&downloads_dir.join("geofabrik"), &input_dir.join("OSM"))?;
        }
        Command::PrepWindspeed {
            input,
            chunk_size,
            compression,
        } => {
            let input = input
                .clone()
                .unwrap_or_else(|| windspeed::default_input(downloads_dir));
            windspeed::write_masks(
                &input,
                &windspeed::output_dir_for(&input),
                &windspeed::default_blocklists(),
                *chunk_size,
                compression,
            )?;
        }
        Command::ConstrainedAreas {
            scenario: scenario_args,
            constraints,
        } => {
            let (turbine, factory, pixel_size) = scenario_setup(scenario_args, input_dir, 10.0)?;
            let sets = match constraints {
                Some(path) => scenario::load_constraint_sets(path, input_dir)?,
                None => scenario::constrained_area_sets(input_dir, &turbine),
            };
            scenario::run_constrained_areas(&factory, &sets, &args.output_dir, pixel_size)?;
        }
        Command::ForestSweep {
            scenario: scenario_args,
        } => {
            let (turbine, factory, pixel_size) = scenario_setup(scenario_args, input_dir, 100.0)?;
            let base_constraints = scenario::forest_sweep_base(input_dir, &turbine);
            let variable_excludes = scenario::variable_excludes(input_dir);
            let forest = scenario::forest_use(input_dir);
            let buffers = scenario::default_sweep_buffers();

            let sweep = ForestSweep {
                base_constraints: &base_constraints,
                variable_excludes: &variable_excludes,
                forest: &forest,
                buffers: &buffers,
            };
            scenario::run_forest_sweep(&factory, &sweep, &args.output_dir, pixel_size)?;
        }
    }

    info!("=== Done! ===");
    Ok(())
}
