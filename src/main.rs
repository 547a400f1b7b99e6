//! Fleet energy simulator entry point: CLI wiring and config-driven engine construction.

use std::process;

use harvest_sim::cli::{self, CliArgs};
use harvest_sim::config::ScenarioConfig;
use harvest_sim::io::export::export_csv;
use harvest_sim::sim::engine::Engine;
use harvest_sim::sim::kpi::EnergyReport;
use harvest_sim::telemetry;
use tracing::{error, info};

fn load_scenario(cli: &CliArgs) -> Result<ScenarioConfig, String> {
    // --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path).map_err(|e| e.to_string())?
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name).map_err(|e| e.to_string())?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(duration_s) = cli.duration_s {
        scenario.simulation.duration_s = duration_s;
    }
    Ok(scenario)
}

fn main() {
    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_help();
            process::exit(1);
        }
    };
    if cli.help {
        cli::print_help();
        return;
    }

    telemetry::init_tracing(cli.log_format);

    let scenario = match load_scenario(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Build and run
    let mut engine = match Engine::from_scenario(&scenario) {
        Ok(engine) => engine,
        Err(e) => {
            error!(%e, "failed to build fleet");
            process::exit(1);
        }
    };
    let samples = engine.run();

    if !cli.quiet {
        for s in &samples {
            println!("{s}");
        }
        println!();
    }

    let report = EnergyReport::from_samples(&samples);
    println!("{report}");

    // Export CSV if requested
    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&samples, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), rows = samples.len(), "telemetry written");
    }
}
