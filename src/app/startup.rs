//! Application startup and command dispatch

use std::io::IsTerminal;

use super::cli::args::{Args, Command, ScanCommand, ServeCommand};
use super::cli::config::{Config, ScanConfig};
use super::cli::display::{render_outcome, status_line, TerminalProgress};
use crate::core::cancel::{install_signal_handlers, CancelToken};
use crate::core::error_handling::{describe_error, log_error_with_context};
use crate::core::logging::init_logging;
use crate::scanner::events::MessageLevel;
use crate::scanner::workflow::ScanWorkflow;
use crate::web::{self, ServerResult};

/// Process exit codes
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// The working copy could not be removed; the run halted before cloning
pub const EXIT_PERMISSION: i32 = 2;

/// Colour unless disabled by flag, config or `NO_COLOR`, or stderr is not a TTY
fn resolve_color(flag: Option<bool>, configured: Option<bool>) -> bool {
    flag.or(configured).unwrap_or_else(|| {
        std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
    })
}

/// Raw argv hint so `--help` is styled before the config is read
fn color_hint(argv: &[String]) -> bool {
    if argv.iter().any(|a| a == "--no-color") {
        return false;
    }
    argv.iter().any(|a| a == "--color") || resolve_color(None, None)
}

/// Parse arguments, load configuration, start logging and run the command.
///
/// Returns the process exit code.
pub async fn startup() -> i32 {
    let argv: Vec<String> = std::env::args().collect();
    let args = match Args::try_parse_styled(&argv, color_hint(&argv)) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let config = match Config::load(args.config_file.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };

    let color = resolve_color(args.color_choice(), config.log.color);
    colored::control::set_override(color);

    let log_level = args.log_level.as_deref().or(config.log.level.as_deref());
    let log_format = args.log_format.as_deref().or(config.log.format.as_deref());
    let log_file = args.log_file.as_deref().or(config.log.file.as_deref());
    if let Err(e) = init_logging(log_level, log_format, log_file, color) {
        eprintln!("Error: {}", e);
        return EXIT_FAILURE;
    }

    log::info!(
        "reposcan {} starting '{}'",
        env!("CARGO_PKG_VERSION"),
        args.command.name()
    );

    let cancel = CancelToken::new();
    install_signal_handlers(cancel.clone());

    let mut scan_config = config.scan.clone();
    scan_config.merge(args.command.scan_options());

    match &args.command {
        Command::Scan(cmd) => run_scan(cmd, &scan_config, &cancel, color).await,
        Command::Serve(cmd) => run_serve(cmd, &config, &scan_config, cancel).await,
        Command::Clean(_) => run_clean(&scan_config),
    }
}

async fn run_scan(cmd: &ScanCommand, scan: &ScanConfig, cancel: &CancelToken, color: bool) -> i32 {
    let workflow = match scan.build_workflow() {
        Ok(workflow) => workflow,
        Err(e) => {
            log_error_with_context(&e, "Configuration");
            return EXIT_FAILURE;
        }
    };

    let progress = TerminalProgress::new(color);
    match workflow.execute(&cmd.url, cancel, &progress).await {
        Ok(outcome) => {
            if cmd.json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        log::error!("Failed to serialize outcome: {}", e);
                        return EXIT_FAILURE;
                    }
                }
            } else {
                print!("{}", render_outcome(&outcome, !cmd.no_report, color));
            }
            EXIT_OK
        }
        Err(e) => {
            log::debug!("Scan of {} failed: {:?}", cmd.url, e);
            let message = describe_error(&e, "Repository scan failed");
            eprintln!("{}", status_line(MessageLevel::Error, &message, color));
            if e.is_permission_denied() {
                EXIT_PERMISSION
            } else {
                EXIT_FAILURE
            }
        }
    }
}

async fn run_serve(cmd: &ServeCommand, config: &Config, scan: &ScanConfig, cancel: CancelToken) -> i32 {
    let workflow = match scan.build_workflow() {
        Ok(workflow) => workflow,
        Err(e) => {
            log_error_with_context(&e, "Configuration");
            return EXIT_FAILURE;
        }
    };

    let bind = cmd.bind.as_deref().unwrap_or(&config.server.bind);
    let default_url = cmd
        .default_url
        .clone()
        .unwrap_or_else(|| config.server.default_url.clone());

    match serve_web(workflow, default_url, bind, cancel).await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            log_error_with_context(&e, "Web server");
            EXIT_FAILURE
        }
    }
}

async fn serve_web(
    workflow: ScanWorkflow,
    default_url: String,
    bind: &str,
    cancel: CancelToken,
) -> ServerResult<()> {
    let state = web::AppState::new(workflow, default_url, cancel.clone())?;
    let listener = web::bind(bind).await?;
    web::serve(listener, state, cancel).await
}

fn run_clean(scan: &ScanConfig) -> i32 {
    let layout = match scan.layout() {
        Ok(layout) => layout,
        Err(e) => {
            log_error_with_context(&e, "Configuration");
            return EXIT_FAILURE;
        }
    };

    match layout.clean() {
        Ok(removed) => {
            log::info!("Removed {} run artefact(s)", removed);
            EXIT_OK
        }
        Err(e) => {
            log_error_with_context(&e, "Clean");
            EXIT_FAILURE
        }
    }
}
