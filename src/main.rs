//! mcp-stdio-server: Model Context Protocol server over stdio
//!
//! Reads JSON-RPC 2.0 messages from stdin, one per line, and writes
//! responses to stdout. Logs go to stderr so they never corrupt the
//! protocol stream.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use mcp_stdio_server::builtin::{self, About};
use mcp_stdio_server::cache::Cache;
use mcp_stdio_server::config;
use mcp_stdio_server::mcp::server::McpServer;
use mcp_stdio_server::mcp::transport::StdioTransport;

/// Model Context Protocol server over stdio.
///
/// Exposes the built-in tools, prompts and resources to an MCP client
/// that launches this process and talks to it over stdin and stdout.
#[derive(Parser, Debug)]
#[command(name = "mcp-stdio-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Instructions returned to the client, overriding the configuration file
    #[arg(long, value_name = "TEXT")]
    instructions: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Output goes to stderr; stdout is
/// reserved for protocol messages.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The GPL notice shown at startup (required by GPLv3 Section 5d).
fn license_notice() -> String {
    format!(
        "mcp-stdio-server {}  Copyright (C) 2026  The Embedded Society\n\
         This program comes with ABSOLUTELY NO WARRANTY.\n\
         This is free software, licensed under GPL-3.0-or-later.\n\
         Source: {}\n",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY")
    )
}

/// Entry point for the mcp-stdio-server binary.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig file: {}", default_path.display());
                    eprintln!("See config/example-config.json for the accepted fields");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    eprintln!("{}", license_notice());

    let version = env!("CARGO_PKG_VERSION");
    info!(version, name = %cfg.server.name, "Starting mcp-stdio-server");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let instructions = args
        .instructions
        .unwrap_or_else(|| cfg.server.instructions.clone());

    let result = runtime.block_on(async {
        let mut server = McpServer::with_identity(StdioTransport::spawn(), &cfg.server.name, version);
        server
            .instructions(instructions.clone())
            .cache(Cache::new(&cfg.cache.prefix));

        if let Err(e) = builtin::register_all(
            &mut server,
            About::new(&cfg.server.name, version, instructions),
        ) {
            return Err(std::io::Error::other(e));
        }

        server.configure_ping(
            cfg.keepalive.enabled,
            cfg.keepalive.interval(),
            cfg.keepalive.timeout(),
            Some(Box::new(|| warn!("Client did not answer keepalive ping"))),
        );

        info!(
            tools = server.tools().count(),
            prompts = server.prompts().count(),
            resources = server.resources().count(),
            resource_templates = server.resource_templates().count(),
            "MCP server ready, waiting for client messages"
        );

        server.run().await
    });

    // The stdin reader task blocks in a read that cannot be cancelled.
    runtime.shutdown_background();

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn license_notice_names_crate_and_licence() {
        let notice = license_notice();
        assert!(notice.starts_with(&format!("mcp-stdio-server {}", env!("CARGO_PKG_VERSION"))));
        assert!(notice.contains("ABSOLUTELY NO WARRANTY"));
        assert!(notice.contains("GPL-3.0-or-later"));
        assert!(notice.contains(env!("CARGO_PKG_REPOSITORY")));
    }

    #[test]
    fn quiet_overrides_everything() {
        assert_eq!(get_log_level(3, true, "trace"), Level::ERROR);
    }

    #[test]
    fn config_level_applies_without_flags() {
        assert_eq!(get_log_level(0, false, "DEBUG"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
    }
}
