// robbyconsole - Operator console for the TT-Robby table tennis ball machine
// Interactive terminal console plus headless status/watch/tree/invoke/mode commands
use anyhow::{Context, Result};
use clap::Parser;
use notify::{Config, Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

mod binder;
mod client;
mod config;
mod controller;
mod error;
mod host;
mod logging;
mod paths;
mod routines;
mod runtime;
mod tui;
mod types;

use binder::{BoundAction, ConfigTreeBinder, DisplayTree, KeyOrder};
use client::ApiClient;
use config::{Args, Command, ConsoleConfig};
use controller::Event;
use error::ConsoleError;
use host::HostAddress;
use paths::NodePath;

/// Watch the config file and push every successfully parsed revision to the console
fn spawn_config_watcher(config_path: PathBuf, events: UnboundedSender<Event>) -> Result<()> {
    std::thread::spawn(move || -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                warn!("config watcher unavailable: {}", e);
                return Ok(());
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            warn!("cannot watch {}: {}", config_path.display(), e);
            return Ok(());
        }

        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, .. })) => {
                    if matches!(kind, notify::EventKind::Modify(_) | notify::EventKind::Create(_)) {
                        match ConsoleConfig::load_with_path(config_path.to_str()) {
                            Ok(config) => {
                                if events.send(Event::ConfigReloaded(Box::new(config))).is_err() {
                                    break;
                                }
                            }
                            // Half-written files are common while an editor saves
                            Err(e) => warn!("ignoring config change: {}", e),
                        }
                    }
                }
                Err(_) => break,
                _ => {}
            }
        }
        Ok(())
    });

    Ok(())
}

fn print_tree(tree: &DisplayTree, base_url: &str) {
    for (_, node) in tree.iter() {
        println!("{}{}: {}", "  ".repeat(node.depth), node.label, node.display_value());
        for action in &node.actions {
            println!(
                "{}  ⚡ {} -> {} {}",
                "  ".repeat(node.depth),
                action.routine.label,
                action.routine.method,
                action.url(base_url)
            );
        }
    }
}

/// Headless subcommands share the client, routine table and binder with the console
async fn run_command(command: Command, config: &ConsoleConfig) -> Result<()> {
    let host = config.host_address()?;
    let client = ApiClient::new(&host, &config.base_path, config.request_timeout())?;
    let routines = config.routine_table();

    match command {
        Command::Status => {
            let status = client.fetch_status().await?;
            println!("{}", status.summary());
        }
        Command::Watch => {
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)).context("installing Ctrl+C handler")?;

            println!("Watching {} every {} ms, Ctrl+C to stop", client.base_url(), config.status_interval_ms);
            let mut last: Option<String> = None;
            while running.load(Ordering::SeqCst) {
                let line = match client.fetch_status().await {
                    Ok(status) => status.summary(),
                    Err(e) => {
                        warn!("status poll failed: {}", e);
                        format!("⚠️  {}", e)
                    }
                };
                if last.as_deref() != Some(line.as_str()) {
                    println!("{}", line);
                    last = Some(line);
                }

                // Sleep in short steps so Ctrl+C is honoured promptly
                let mut waited = Duration::ZERO;
                while waited < config.status_interval() && running.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    waited += Duration::from_millis(100);
                }
            }
            println!("\n👋 Stopped watching.");
        }
        Command::Tree { url, parent } => {
            let document = client.get_data(&url).await?;
            let parent = parent.unwrap_or_else(|| NodePath::from_base(&url).concrete.segments().next().unwrap_or_default().to_string());
            // Top-level keys live under the parent, like the console's content sidebar
            let binder = ConfigTreeBinder::new(&routines, config.max_tree_depth);
            let tree = binder.bind_tree(&document, NodePath::from_base(&parent), KeyOrder::Insertion)?;
            print_tree(&tree, client.base_url());
        }
        Command::Invoke { path, label } => {
            let node = NodePath::from_base(&path);
            let routine = routines.find(&node.search, &label).cloned().ok_or_else(|| ConsoleError::UnknownRoutine {
                path: node.concrete.to_string(),
                label: label.clone(),
            })?;
            let action = BoundAction { routine, target: node.concrete };
            info!("{} {}", action.routine.method, action.url(client.base_url()));
            let result = client.invoke(&action).await?;
            println!("✅ {} {}: {}", label, action.target, result);
        }
        Command::Mode { mode } => {
            client.set_mode(mode).await?;
            println!("✅ Machine switched to {} mode", mode);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set global config path immediately (before any config loads)
    ConsoleConfig::set_config_path(args.cfg.clone());

    // Headless commands log to stderr right away; the console logs to a file once the config is known
    if args.command.is_some() {
        logging::init_stderr()?;
    }

    let cfg_arg = args.cfg.as_deref();
    let config_path = ConsoleConfig::config_path(cfg_arg)?;
    let config_file_exists = config_path.exists();

    let mut config = if config_file_exists {
        match ConsoleConfig::load_with_path(cfg_arg) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("\n❌ Failed to load config file: {}", e);
                eprintln!("Config file: {}", config_path.display());
                eprintln!("\nPlease fix the config file or delete it to regenerate with defaults.");
                return Err(e.into());
            }
        }
    } else {
        ConsoleConfig {
            config_path: Some(config_path.clone()),
            ..ConsoleConfig::default()
        }
    };

    if let Some(ref host) = args.host {
        HostAddress::parse(host).with_context(|| format!("invalid --host '{}'", host))?;
    }
    let args_provided = config.merge_with_args(&args);
    config.sanitize();

    // Save config only on first run or when the command line changed something
    if !config_file_exists || args_provided {
        config.save().with_context(|| format!("writing {}", config_path.display()))?;
    }

    let rt = tokio::runtime::Runtime::new()?;

    if let Some(command) = args.command {
        return rt.block_on(run_command(command, &config));
    }

    let log_path = config.log_path()?;
    logging::init_file(&log_path)?;
    println!("Using config file: {}", config_path.display());
    println!("Logging to: {}", log_path.display());
    info!("console starting against {}", config.host);

    let host = config.host_address()?;
    let (mut runtime, mut events) = runtime::Runtime::new(rt.handle().clone(), &host, &config)?;

    // Start config watcher for dynamic changes
    spawn_config_watcher(config_path, runtime.sender())?;

    tui::run_console(&mut runtime, &mut events, config)
}
