//! Command-line argument parsing.

use std::path::PathBuf;

use crate::telemetry::LogFormat;

/// Parsed CLI arguments.
#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    /// Overrides `simulation.duration_s`.
    pub duration_s: Option<f64>,
    pub telemetry_out: Option<PathBuf>,
    pub log_format: LogFormat,
    /// Suppress per-sample output, print only the report.
    pub quiet: bool,
    pub help: bool,
}

/// Parses the process arguments (excluding the program name).
///
/// # Errors
///
/// Returns a message describing the first invalid argument.
pub fn parse_args() -> Result<CliArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

/// Parses an explicit argument list.
///
/// # Errors
///
/// Returns a message describing the first invalid argument.
pub fn parse_args_from<I, S>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let mut cli = CliArgs::default();

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                cli.help = true;
                return Ok(cli);
            }
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(i, "--scenario requires a path argument")?;
                if cli.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "--preset requires a name argument")?;
                if cli.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--duration" => {
                i += 1;
                let raw = args.next_or_err(i, "--duration requires a number of seconds")?;
                match raw.parse::<f64>() {
                    Ok(d) if d.is_finite() && d > 0.0 => cli.duration_s = Some(d),
                    _ => {
                        return Err(format!(
                            "--duration value \"{raw}\" is not a positive number of seconds"
                        ));
                    }
                }
            }
            "--telemetry-out" => {
                i += 1;
                let path = args.next_or_err(i, "--telemetry-out requires a path argument")?;
                cli.telemetry_out = Some(PathBuf::from(path));
            }
            "--log-json" => cli.log_format = LogFormat::Json,
            "--quiet" | "-q" => cli.quiet = true,
            other => return Err(format!("unknown argument \"{other}\"")),
        }
        i += 1;
    }

    if cli.scenario.is_some() && cli.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    Ok(cli)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_help() {
    eprintln!("harvest-sim: battery and solar-harvesting fleet energy simulator");
    eprintln!();
    eprintln!("Usage: harvest-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, leo, eclipse_stress)");
    eprintln!("  --duration <s>           Override the simulated horizon");
    eprintln!("  --telemetry-out <path>   Export energy samples to CSV");
    eprintln!("  --log-json               Emit logs as JSON on stderr");
    eprintln!("  -q, --quiet              Print only the final report");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}
