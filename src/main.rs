//! lumo-logs - Maintenance tool for the Lumo log directory.
//!
//! Rotation and retention are never scheduled internally; an external
//! scheduler (cron, systemd timer) runs this binary instead.

use std::env;
use std::io;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lumo_logs::access::FormatRegistry;
use lumo_logs::audit::{Category, ExportFormat, QueryOptions, Severity};
use lumo_logs::config::LogSettings;
use lumo_logs::manager::LogManager;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");
const DEFAULT_CONFIG: &str = "/etc/lumo/logs.toml";

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let positional = positional_args(&args);
    let Some(command) = positional.first().cloned() else {
        print_help();
        return ExitCode::FAILURE;
    };

    // Template validation needs no configuration or log directory.
    if command == "validate-format" {
        return validate_format(positional.get(1).map(String::as_str));
    }

    let config_path = get_config_path(&args);
    let settings = match LogSettings::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration loaded from: {}", config_path);

    match run(&command, &positional[1..], &args, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(command = %command, error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(
    command: &str,
    rest: &[String],
    args: &[String],
    settings: &LogSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = LogManager::new(settings)?;

    match command {
        "rotate" => {
            manager.rotate_all()?;
            info!(directory = %manager.directory().display(), "Rotation complete");
        }
        "cleanup" => {
            let policy = settings.retention.policy();
            let removed = manager.audit().cleanup(&policy)?;
            info!(
                removed,
                max_age_days = settings.retention.max_age_days,
                max_entries = settings.retention.max_entries,
                "Retention applied"
            );
            println!("removed {} audit entries", removed);
        }
        "stats" => {
            let stats = manager.audit().stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        "export" => {
            let format = match rest.first() {
                Some(f) => f.parse::<ExportFormat>()?,
                None => ExportFormat::Json,
            };
            let options = export_options(args)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            manager.audit().export(&options, format, &mut out)?;
        }
        other => {
            manager.close()?;
            return Err(format!("unknown command '{}'", other).into());
        }
    }

    manager.close()?;
    Ok(())
}

fn validate_format(template: Option<&str>) -> ExitCode {
    let Some(template) = template else {
        eprintln!("validate-format requires a template argument");
        return ExitCode::FAILURE;
    };

    let unknown = FormatRegistry::standard().validate(template);
    if unknown.is_empty() {
        println!("ok");
        ExitCode::SUCCESS
    } else {
        println!("unknown tokens: {}", unknown.join(" "));
        ExitCode::FAILURE
    }
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Maintenance tool for the Lumo log directory.

USAGE:
    {} [OPTIONS] <COMMAND>

COMMANDS:
    rotate                     Rotate every channel file
    cleanup                    Apply the audit retention policy
    stats                      Print audit statistics as JSON
    export [json|csv]          Write audit entries to stdout
    validate-format <TEMPLATE> Report unknown $tokens in an access template

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {}]
    --category <NAME>      Export filter: audit category
    --severity <LEVEL>     Export filter: audit severity
    --limit <N>            Export filter: maximum entries
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG
    );
}

/// Options that consume the following argument.
const VALUE_OPTIONS: &[&str] = &["-c", "--config", "--category", "--severity", "--limit"];

/// Arguments that are neither options nor option values.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut positional = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_OPTIONS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        positional.push(arg.clone());
    }
    positional
}

/// Value of `--name <value>` or `--name=<value>`.
fn option_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    for (i, arg) in args.iter().enumerate() {
        if names.contains(&arg.as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        for name in names.iter().filter(|n| n.starts_with("--")) {
            if let Some(value) = arg.strip_prefix(name).and_then(|r| r.strip_prefix('=')) {
                return Some(value);
            }
        }
    }
    None
}

/// Get configuration file path from command line arguments.
fn get_config_path(args: &[String]) -> String {
    option_value(args, &["--config", "-c"])
        .unwrap_or(DEFAULT_CONFIG)
        .to_string()
}

fn export_options(args: &[String]) -> Result<QueryOptions, Box<dyn std::error::Error>> {
    let mut options = QueryOptions::default();
    if let Some(category) = option_value(args, &["--category"]) {
        options.category = Some(category.parse::<Category>()?);
    }
    if let Some(severity) = option_value(args, &["--severity"]) {
        options.severity = Some(severity.parse::<Severity>()?);
    }
    if let Some(limit) = option_value(args, &["--limit"]) {
        options.limit = limit.parse()?;
    }
    Ok(options)
}

/// Initialize logging based on settings.
///
/// Diagnostics go to stderr so exports on stdout stay clean.
fn init_logging(settings: &LogSettings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(io::stderr))
                .init();
        }
    }

    Ok(())
}
