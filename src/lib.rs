// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod console;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod server;
pub mod types;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, SendArgs, ServeArgs};
use crate::config::loader::{load_and_validate, load_from_path};
use crate::config::model::{ConfigFile, ServerSection};
use crate::console::ConsoleReporter;
use crate::exec::{ScriptLauncher, StartOutcome, Supervisor, event_channel};
use crate::registry::{ScriptDefinition, ScriptRegistry};
use crate::server::{ServerOptions, TriggerServer};

/// How long shutdown waits for killed scripts to be reaped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config;
    match args.command.unwrap_or_default() {
        Command::Serve(serve_args) => serve(config_path, serve_args).await,
        Command::Send(send_args) => send(config_path, send_args).await,
    }
}

/// Run the daemon.
///
/// This wires together:
/// - config loading and the script registry (fatal on error)
/// - the process supervisor
/// - the console event consumer
/// - the trigger server (fatal if it cannot bind)
/// - Ctrl-C handling
async fn serve(config_path: PathBuf, args: ServeArgs) -> Result<()> {
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let registry = Arc::new(ScriptRegistry::from_config(&cfg)?);

    if args.dry_run {
        print_dry_run(&cfg, &registry);
        return Ok(());
    }

    let (events_tx, events_rx) = event_channel();
    let supervisor = Supervisor::spawn(Arc::clone(&registry), events_tx);
    let console = tokio::spawn(ConsoleReporter::stdout(Arc::clone(&registry)).run(events_rx));

    let server = if cfg.server.enabled && !args.no_server {
        let launcher: Arc<dyn ScriptLauncher> = Arc::new(supervisor.clone());
        let server = TriggerServer::bind(
            &cfg.server_addr(),
            Arc::clone(&registry),
            launcher,
            ServerOptions::from_config(&cfg.server),
        )
        .await?;
        Some(server.spawn())
    } else {
        info!("trigger server disabled");
        None
    };

    for name in args.start.iter() {
        let Some(def) = find_by_name(&registry, name) else {
            bail!("no script named '{name}' in {}", config_path.display());
        };
        match supervisor.start(&def.id, None).await? {
            StartOutcome::Started => {}
            other => warn!(script = %def.id, outcome = ?other, "startup script did not start"),
        }
    }

    info!(scripts = registry.len(), "scriptd running; press Ctrl-C to exit");
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("shutdown requested");

    shutdown(server, supervisor, console, SHUTDOWN_GRACE).await;
    Ok(())
}

/// Stop the daemon in order: no new triggers, kill running scripts, then let
/// the console print every event the supervisor still publishes.
///
/// The console finishes once the supervisor loop ends and drops the event
/// sender, which happens after the last `Supervisor` handle is gone and every
/// killed script was reaped. Returns the console, or `None` if it did not
/// finish within `grace`.
pub async fn shutdown<W>(
    server: Option<JoinHandle<()>>,
    supervisor: Supervisor,
    console: JoinHandle<ConsoleReporter<W>>,
    grace: Duration,
) -> Option<ConsoleReporter<W>>
where
    W: Write + Send + 'static,
{
    if let Some(server) = server {
        server.abort();
        // Awaiting the aborted task drops its launcher handle.
        let _ = server.await;
    }

    match supervisor.stop_all().await {
        Ok(0) => {}
        Ok(stopped) => {
            info!(stopped, "waiting for running scripts to exit");
            wait_until_idle(&supervisor, grace).await;
        }
        Err(e) => warn!(error = %e, "supervisor already stopped"),
    }
    drop(supervisor);

    let console_abort = console.abort_handle();
    match tokio::time::timeout(grace, console).await {
        Ok(Ok(reporter)) => Some(reporter),
        Ok(Err(e)) => {
            warn!(error = %e, "console task failed");
            None
        }
        Err(_) => {
            warn!("console still draining after shutdown grace period; dropping remaining output");
            console_abort.abort();
            None
        }
    }
}

/// One-shot client: send a trigger message and print the reply.
async fn send(config_path: PathBuf, args: SendArgs) -> Result<()> {
    // The sender only needs host/port, so an unreadable or incomplete config
    // is not an error here.
    let server = match load_from_path(&config_path) {
        Ok(raw) => raw.server,
        Err(e) => {
            debug!(error = %e, "no usable config; using default server address");
            ServerSection::default()
        }
    };
    let host = args.host.unwrap_or(server.host);
    let port = args.port.unwrap_or(server.port);
    let addr = format!("{host}:{port}");

    let reply = client::send_message(&addr, &args.message, Duration::from_millis(args.timeout_ms))
        .await
        .with_context(|| format!("sending trigger to {addr}; is scriptd running there?"))?;

    println!("sent '{}', reply: {}", args.message, reply);
    Ok(())
}

async fn wait_until_idle(supervisor: &Supervisor, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        match supervisor.running().await {
            Ok(running) if running.is_empty() => return,
            Ok(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            Err(_) => return,
        }
    }
    warn!("scripts still running after shutdown grace period");
}

fn find_by_name<'a>(registry: &'a ScriptRegistry, name: &str) -> Option<&'a ScriptDefinition> {
    registry
        .iter()
        .find(|def| def.display_name == name || def.file_name() == name)
}

/// Simple dry-run output: print server settings and registered scripts.
fn print_dry_run(cfg: &ConfigFile, registry: &ScriptRegistry) {
    println!("scriptd dry-run");
    if cfg.server.enabled {
        println!("  server = {}", cfg.server_addr());
        println!("  server.detailed_replies = {}", cfg.server.detailed_replies);
    } else {
        println!("  server = disabled");
    }
    println!();

    println!("scripts ({}):", registry.len());
    for def in registry.iter() {
        println!("  - {}", def.display_name);
        println!("      id: {}", def.id);
        if let Some(ref interpreter) = def.interpreter {
            println!("      interpreter: {interpreter}");
        }
        if !def.default_args.is_empty() {
            println!("      args: {:?}", def.default_args);
        }
        if !def.executable_path.exists() {
            println!("      (missing on disk)");
        }
    }

    println!();
    println!("tokens ({}):", registry.bindings().len());
    for binding in registry.bindings() {
        println!(
            "  - {} -> {}",
            String::from_utf8_lossy(&binding.token),
            binding.id
        );
    }

    debug!("dry-run complete (no execution)");
}
