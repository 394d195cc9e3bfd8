//! Icon Scanner CLI
//!
//! Lists the DLLs under a directory that embed at least one icon resource.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use icon_scanner::config::DEFAULT_JOBS;
use icon_scanner::{
    run_scan, Backend, JsonReport, ModuleInspector, ModuleLoader, OutputFormat, PeLoader,
    ReportSink, ScanConfig, ScanErrorKind, TextReport,
};

const USAGE: &str = "Please provide a directory with -d or --directory option";

const ABOUT: &str = r#"
Icon Scanner - finds DLLs that embed icon resources

Examples:
  icon_scanner -d C:\Windows\System32              list DLLs with icons
  icon_scanner -d ./modules -e dll -e exe           also inspect executables
  icon_scanner -d ./modules --show-missing          also list DLLs without icons
  icon_scanner -d ./modules --json -j 0             JSON lines, all CPUs
"#;

/// Finds loadable modules that embed icon resources
#[derive(Parser, Debug)]
#[command(name = "icon_scanner")]
#[command(author, version, about = ABOUT, long_about = None)]
#[command(args_override_self = true)]
struct Cli {
    /// Directory to scan recursively
    #[arg(short = 'd', long = "directory", value_name = "PATH")]
    directory: Option<OsString>,

    /// Module extension to inspect, repeatable (default: dll)
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Inspection workers, 0 = one per CPU
    #[arg(short = 'j', long, default_value_t = DEFAULT_JOBS)]
    jobs: usize,

    /// Print JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// Also report modules without icons
    #[arg(long)]
    show_missing: bool,

    /// Use the built-in PE parser even where an OS loader exists
    #[arg(long)]
    portable: bool,
}

/// Parse arguments, dropping any that clap does not recognise.
fn parse_args(args: Vec<OsString>) -> Result<Cli, clap::Error> {
    // A bare `--` would end option parsing and hide the flags after it
    let mut args: Vec<OsString> = args
        .into_iter()
        .enumerate()
        .filter(|(i, arg)| *i == 0 || arg.as_os_str() != OsStr::new("--"))
        .map(|(_, arg)| arg)
        .collect();
    loop {
        match Cli::try_parse_from(&args) {
            Ok(cli) => return Ok(cli),
            Err(err) if err.kind() == ErrorKind::UnknownArgument => {
                let Some(index) = unknown_arg_index(&err, &args) else {
                    return Err(err);
                };
                args.remove(index);
            }
            Err(err) => return Err(err),
        }
    }
}

fn unknown_arg_index(err: &clap::Error, args: &[OsString]) -> Option<usize> {
    let ContextValue::String(invalid) = err.get(ContextKind::InvalidArg)? else {
        return None;
    };
    let invalid = invalid.as_str();
    let with_value = format!("{}=", invalid);
    // clap names only the first letter of an unknown short cluster such as `-vv`
    let short = !invalid.starts_with("--") && invalid.chars().count() == 2;
    args.iter()
        .skip(1)
        .position(|arg| {
            let arg = arg.to_string_lossy();
            arg == invalid
                || arg.starts_with(&with_value)
                || (short && !arg.starts_with("--") && arg.starts_with(invalid))
        })
        .map(|i| i + 1)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = match parse_args(std::env::args_os().collect()) {
        Ok(cli) => cli,
        Err(err) => {
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = err.print();
                    ExitCode::SUCCESS
                }
                _ => {
                    eprintln!("{}", err);
                    ExitCode::from(1)
                }
            };
        }
    };

    let root = match cli.directory {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => {
            println!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    let config = ScanConfig::builder()
        .root(root)
        .extensions(&cli.extensions)
        .jobs(cli.jobs)
        .report_missing(cli.show_missing)
        .format(if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        })
        .backend(if cli.portable {
            Backend::Portable
        } else {
            Backend::Native
        })
        .build();

    info!("Starting icon scan...");
    info!("Root: {:?}", config.root);
    info!("Extensions: {:?}", config.extensions);
    info!("Backend: {:?}", config.backend);

    match config.backend {
        #[cfg(windows)]
        Backend::Native => execute(&config, icon_scanner::SystemLoader),
        _ => execute(&config, PeLoader),
    }
}

fn execute<L: ModuleLoader + Sync>(config: &ScanConfig, loader: L) -> ExitCode {
    let inspector = ModuleInspector::new(loader, config.resource_type);
    let stdout = io::stdout().lock();
    let mut sink: Box<dyn ReportSink> = match config.format {
        OutputFormat::Text => Box::new(TextReport::new(stdout, config.report_missing)),
        OutputFormat::Json => Box::new(JsonReport::new(stdout, config.report_missing)),
    };

    match run_scan(config, &inspector, sink.as_mut()) {
        Ok(summary) => {
            info!(
                "Scan completed: {} inspected, {} with icons, {} without, {} load errors, {} query errors, {} skipped entries in {}ms",
                summary.inspected,
                summary.with_icon,
                summary.without_icon,
                summary.load_failures,
                summary.query_failures,
                summary.error_count(),
                summary.duration_ms
            );
            ExitCode::SUCCESS
        }
        Err(err) if err.kind == ScanErrorKind::PathNotFound => {
            println!("Path does not exist");
            ExitCode::from(1)
        }
        Err(err) if err.kind == ScanErrorKind::Output => {
            eprintln!("{}", err.message);
            ExitCode::from(1)
        }
        Err(err) => {
            println!("Cannot read directory {}: {}", config.root.display(), err.message);
            ExitCode::from(1)
        }
    }
}
