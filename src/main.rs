use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use minservice::{ConsoleHost, MinServiceConfig, ServiceController, ServiceExit};

#[derive(Parser, Debug)]
#[command(name = "minservice")]
#[command(about = "Minimal background service lifecycle controller")]
#[command(version)]
#[command(long_about = "Registers with the host service manager, reports every lifecycle \
transition, runs a periodic background task while running and stops cleanly on STOP or \
SHUTDOWN. On Windows it connects to the Service Control Manager; elsewhere, or with \
--console, Ctrl+C and SIGTERM stand in for the manager's control codes.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "minservice.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to a file instead of stdout
    #[arg(long, value_name = "PATH", help = "Write logs to this file (the SCM discards stdout)")]
    log_file: Option<String>,

    /// Run in the foreground instead of under the service manager
    #[arg(long, help = "Run with the console host even where a service manager is available")]
    console: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the service")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // The event log source is named after the service, so configuration is
    // loaded before logging is up
    let config = match MinServiceConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", args.config, e);
            return Err(e.into());
        }
    };

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = init_logging(&args, &config.service.name)?;

    info!("Starting minservice v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded successfully from: {}", args.config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let exit_code = run_service(&args, config)?;

    info!("minservice exited with code: {}", exit_code);
    drop(_log_guard);

    std::process::exit(exit_code as i32);
}

#[cfg(windows)]
fn run_service(args: &Args, config: MinServiceConfig) -> Result<u32> {
    if args.console {
        return run_console(config);
    }

    match minservice::run_dispatcher(config) {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("Service dispatcher failed: {}", e);
            Ok(e.exit_code())
        }
    }
}

#[cfg(not(windows))]
fn run_service(args: &Args, config: MinServiceConfig) -> Result<u32> {
    if !args.console {
        info!("No native service manager on this platform; running with the console host");
    }
    run_console(config)
}

/// Run the lifecycle under the console host on a dedicated runtime
fn run_console(config: MinServiceConfig) -> Result<u32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let controller = ServiceController::with_heartbeat(config, Arc::new(ConsoleHost::new()));

    let result = runtime.block_on(controller.run());
    match &result {
        Ok(exit) => info!("Service run finished: {:?}", exit.worker),
        Err(e) => error!("Service terminated: {}", e),
    }
    Ok(ServiceExit::process_exit_code(&result))
}

fn init_logging(args: &Args, service_name: &str) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("minservice={}", log_level)));

    let (writer, guard) = match args.log_file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    let ansi = args.log_file.is_none();

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    #[cfg_attr(not(windows), allow(unused_mut))]
    let mut layers = vec![fmt_layer.with_filter(env_filter).boxed()];

    // Under the SCM stdout goes nowhere; mirror lifecycle events to the
    // Application event log
    #[cfg(windows)]
    let event_log_error = if args.console {
        None
    } else {
        use minservice::{event_log_filter, EventLogLayer, EventSource};

        match EventSource::register(service_name) {
            Ok(source) => {
                layers.push(
                    EventLogLayer::new(source)
                        .with_filter(event_log_filter())
                        .boxed(),
                );
                None
            }
            Err(e) => Some(e),
        }
    };
    #[cfg(not(windows))]
    let _ = service_name;

    tracing_subscriber::registry().with(layers).init();

    #[cfg(windows)]
    if let Some(e) = event_log_error {
        tracing::warn!("Event log unavailable for '{}': {}", service_name, e);
    }

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# minservice configuration file");
    println!("# Every key is optional; environment variables such as");
    println!("# MINSERVICE_WORKER__INTERVAL_MS override file values.");
    println!();
    println!("{}", toml::to_string_pretty(&MinServiceConfig::default())?);
    Ok(())
}
