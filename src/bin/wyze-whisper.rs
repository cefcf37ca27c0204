//! wyze-whisper binary: split, extract, repack and merge firmware images

use clap::Parser;
use std::{env, panic, path::PathBuf, process};
use whisper::exit_codes::{EXIT_INVALID_ARGS, EXIT_PANIC, EXIT_SUCCESS};
use whisper::firmware::defaults::DEFAULT_MAKE_TARGET;
use whisper::logger::{JsonLogger, LOG_LEVEL_ENV, is_json_logging, verbose_level};
use whisper::{Config, FailurePolicy, Mode, ToolPaths};

// -V is --verbose here, so clap's own version flag stays off
#[derive(Parser, Debug)]
#[command(about = "Unpack and repack camera firmware images")]
struct Args {
    /// Mode to use
    #[arg(long, value_parser = ["pack", "unpack", "make", "cleanup"])]
    mode: String,

    /// Binary to pack or unpack (only used with --mode pack|unpack)
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Enable verbose logging (LEVEL: DEBUG)
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Directory holding partition files and extraction directories
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// What to do when an external tool fails
    #[arg(long, value_parser = ["abort", "continue"], default_value = "abort")]
    on_tool_failure: String,

    /// Squashfs partition rebuilt by --mode make
    #[arg(long, default_value = DEFAULT_MAKE_TARGET)]
    partition: String,

    /// Log level (trace, debug, info, warn, error, json[:level])
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in wyze-whisper");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("wyze-whisper {}", whisper::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                EXIT_INVALID_ARGS
            } else {
                EXIT_SUCCESS
            };
        }
    };

    // --log-level wins over the environment, and -V only raises the level
    let requested = args
        .log_level
        .clone()
        .or_else(|| env::var(LOG_LEVEL_ENV).ok());
    if args.verbose {
        JsonLogger::init_with_level(verbose_level(requested.as_deref()), "CLI --verbose");
    } else if let Some(ref level) = args.log_level {
        JsonLogger::init_with_level(level, "CLI --log-level");
    } else {
        JsonLogger::init();
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return e.exit_code();
        }
    };
    log::debug!("🔧 {config:?}");

    if let Err(e) = whisper::tools::install_interrupt_handler() {
        log::warn!("⚠️ Could not install interrupt handler: {e}");
    }

    match whisper::run(&config) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            log::error!("❌ {e}");
            if !is_json_logging() {
                eprintln!("Error: {e}");
            }
            e.exit_code()
        }
    }
}

fn build_config(args: &Args) -> whisper::exceptions::Result<Config> {
    let mode: Mode = args.mode.parse()?;
    let policy: FailurePolicy = args.on_tool_failure.parse()?;

    let mut config = Config::new(mode)
        .with_workdir(&args.workdir)
        .with_failure_policy(policy)
        .with_tools(ToolPaths::from_env());
    config.binary = args.binary.clone();
    config.make_target = args.partition.clone();
    Ok(config)
}
