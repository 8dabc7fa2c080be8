// Config Module - Configuration management and command-line argument parsing
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

use crate::error::{ConsoleError, Result};
use crate::host::HostAddress;
use crate::routines::ActionRoutineTable;
use crate::types::{Mode, NavPanel};

// Global storage for custom config path
static CUSTOM_CONFIG_PATH: OnceLock<Option<String>> = OnceLock::new();

const APP_DIR: &str = "robbyconsole";
const DEFAULT_CONFIG_FILE: &str = "console.conf";
const LOG_FILE: &str = "console.log";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Operator console for the TT-Robby table tennis ball machine",
    long_about = "Polls the ball machine's REST API, shows its configuration as a navigable tree\n\
                  and offers the start/stop/dispense/... actions of every component.\n\
                  Without a subcommand the interactive terminal console is started."
)]
pub struct Args {
    /// Machine address, e.g. http://192.168.188.103:80
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// API base path appended to the machine address
    #[arg(long)]
    pub base_path: Option<String>,

    /// Status poll interval in milliseconds
    #[arg(long)]
    pub status_interval: Option<u64>,

    /// Panel refresh interval in direct mode, in milliseconds
    #[arg(long)]
    pub direct_interval: Option<u64>,

    /// Status refresh interval in program mode, in milliseconds
    #[arg(long)]
    pub program_interval: Option<u64>,

    /// HTTP request timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Config file path or name (e.g., --cfg /full/path or --cfg lab for ~/.config/robbyconsole/lab.conf)
    #[arg(long)]
    pub cfg: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch and print the machine status once
    Status,
    /// Poll the status and print every change until Ctrl+C
    Watch,
    /// Fetch a document (e.g. /balldrivers/config) and print it as a tree with its actions
    Tree {
        url: String,
        /// Concrete path the document's top-level keys live under (default: first segment of URL)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Invoke the action LABEL on the node at PATH (e.g. /balldrivers/0 start)
    Invoke { path: String, label: String },
    /// Switch the machine to another mode (config, direct, program)
    Mode { mode: Mode },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,  // Stores the config file path (not serialized)

    pub host: String,
    pub base_path: String,
    pub status_interval_ms: u64,
    pub direct_interval_ms: u64,   // Selected panel refresh while in direct mode
    pub program_interval_ms: u64,  // Status refresh while in program mode
    pub request_timeout_ms: u64,
    pub max_tree_depth: usize,
    pub panels: Vec<NavPanel>,  // Empty = built-in panels
    pub routines: ActionRoutineTable,  // Merged over the built-in routines, pattern by pattern
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            config_path: None,
            host: HostAddress::default().to_string(),
            base_path: "/api/v1".to_string(),
            status_interval_ms: 10_000,
            direct_interval_ms: 1_000,
            program_interval_ms: 2_000,
            request_timeout_ms: 5_000,
            max_tree_depth: crate::binder::DEFAULT_MAX_DEPTH,
            panels: Vec::new(),
            routines: ActionRoutineTable::new(),
        }
    }
}

impl ConsoleConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        if let Some(ref host) = args.host {
            self.host = host.clone();
            args_provided = true;
        }

        if let Some(ref base_path) = args.base_path {
            self.base_path = base_path.clone();
            args_provided = true;
        }

        if let Some(ms) = args.status_interval {
            self.status_interval_ms = ms;
            args_provided = true;
        }

        if let Some(ms) = args.direct_interval {
            self.direct_interval_ms = ms;
            args_provided = true;
        }

        if let Some(ms) = args.program_interval {
            self.program_interval_ms = ms;
            args_provided = true;
        }

        if let Some(ms) = args.timeout {
            self.request_timeout_ms = ms;
            args_provided = true;
        }

        args_provided
    }

    /// Set the global config path (called once at startup)
    pub fn set_config_path(cfg: Option<String>) {
        let _ = CUSTOM_CONFIG_PATH.set(cfg);
    }

    fn get_config_path_arg() -> Option<&'static str> {
        CUSTOM_CONFIG_PATH.get().and_then(|opt| opt.as_deref())
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| ConsoleError::Validation("HOME is not set".to_string()))?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_DIR);
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        // Priority: explicit arg > global > default
        let cfg = cfg_arg.or_else(|| Self::get_config_path_arg());

        match cfg {
            Some(cfg) => {
                let path = PathBuf::from(cfg);
                if path.is_absolute() || cfg.contains('/') || cfg.contains('\\') {
                    return Ok(path);
                }

                // Otherwise treat as config name in config directory
                let filename = if cfg.ends_with(".conf") {
                    cfg.to_string()
                } else {
                    format!("{}.conf", cfg)
                };
                Ok(Self::config_dir()?.join(filename))
            }
            None => Ok(Self::config_dir()?.join(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Log file used while the terminal UI owns stdout: next to the config file
    pub fn log_path(&self) -> Result<PathBuf> {
        let config_path = match &self.config_path {
            Some(p) => p.clone(),
            None => Self::config_path(None)?,
        };
        Ok(config_path
            .parent()
            .map(|dir| dir.join(LOG_FILE))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE)))
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        let contents = std::fs::read_to_string(&path)?;
        let mut parsed: Self = toml::from_str(&contents)?;
        parsed.config_path = Some(path);
        parsed.sanitize();
        Ok(parsed)
    }

    /// Sanitize config values to handle common formatting issues
    pub fn sanitize(&mut self) {
        self.host = self.host.trim().to_string();
        if let Err(e) = HostAddress::parse(&self.host) {
            warn!("{}; falling back to {}", e, HostAddress::default());
            self.host = HostAddress::default().to_string();
        }

        let base = self.base_path.trim().trim_matches('/');
        self.base_path = if base.is_empty() { String::new() } else { format!("/{}", base) };

        // Clamp numeric values to reasonable ranges
        self.status_interval_ms = self.status_interval_ms.clamp(500, 600_000);
        self.direct_interval_ms = self.direct_interval_ms.clamp(200, 60_000);
        self.program_interval_ms = self.program_interval_ms.clamp(200, 60_000);
        self.request_timeout_ms = self.request_timeout_ms.clamp(100, 60_000);
        self.max_tree_depth = self.max_tree_depth.clamp(1, 1024);

        for panel in &mut self.panels {
            panel.id = panel.id.trim().to_string();
            panel.parent_key = panel.parent_key.trim().trim_matches('/').to_string();
            panel.url = format!("/{}", panel.url.trim().trim_matches('/'));
        }
        self.panels.retain(|p| !p.id.is_empty() && p.url != "/");
    }

    pub fn host_address(&self) -> Result<HostAddress> {
        HostAddress::parse(&self.host)
    }

    /// Configured panels, or the built-in ones when none are configured
    pub fn effective_panels(&self) -> Vec<NavPanel> {
        if self.panels.is_empty() {
            NavPanel::defaults()
        } else {
            self.panels.clone()
        }
    }

    /// Built-in routines with the configured patterns replacing theirs
    pub fn routine_table(&self) -> ActionRoutineTable {
        let mut table = ActionRoutineTable::ball_machine_defaults();
        table.merge(self.routines.clone());
        table
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.config_path {
            Some(p) => p.clone(),
            None => Self::config_path(None)?,
        };

        // Sanitize values before saving
        let mut sanitized = self.clone();
        sanitized.sanitize();

        // Build TOML with comments manually for better documentation
        let mut contents = format!(
            r#"# robbyconsole Configuration File
# Edit this file while the console is running; changes are picked up automatically

# Ball machine address (scheme://host:port)
host = {}

# API base path appended to the address
base_path = {}

# Status poll interval in milliseconds
status_interval_ms = {}

# Direct mode: refresh of the selected panel in milliseconds
direct_interval_ms = {}

# Program mode: refresh of the status in milliseconds
program_interval_ms = {}

# HTTP request timeout in milliseconds
request_timeout_ms = {}

# Maximum nesting depth of a displayed document
max_tree_depth = {}
"#,
            toml_string(&sanitized.host),
            toml_string(&sanitized.base_path),
            sanitized.status_interval_ms,
            sanitized.direct_interval_ms,
            sanitized.program_interval_ms,
            sanitized.request_timeout_ms,
            sanitized.max_tree_depth,
        );

        if !sanitized.panels.is_empty() {
            contents.push_str("\n# Navigation panels (leave out to use the built-in panels)\n");
            for panel in &sanitized.panels {
                contents.push_str("[[panels]]\n");
                contents.push_str(&format!("id = {}\n", toml_string(&panel.id)));
                contents.push_str(&format!("mode = {}\n", toml_string(panel.mode.label())));
                contents.push_str(&format!("parent_key = {}\n", toml_string(&panel.parent_key)));
                contents.push_str(&format!("title = {}\n", toml_string(&panel.title)));
                contents.push_str(&format!("url = {}\n", toml_string(&panel.url)));
                let excluded: Vec<String> = panel.exclude_keys.iter().map(|k| toml_string(k)).collect();
                contents.push_str(&format!("exclude_keys = [{}]\n\n", excluded.join(", ")));
            }
        }

        if !sanitized.routines.is_empty() {
            contents.push_str("\n# Action routines by path pattern; a pattern listed here replaces the built-in one\n");
            #[derive(Serialize)]
            struct RoutineSection<'a> {
                routines: &'a ActionRoutineTable,
            }
            contents.push_str(&toml::to_string(&RoutineSection { routines: &sanitized.routines })?);
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::ActionRoutine;
    use crate::types::HttpMethod;

    fn temp_config_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("robbyconsole-test-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("console.conf")
    }

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.host_address().unwrap(), HostAddress::default());
        assert_eq!(config.status_interval(), Duration::from_secs(10));
        assert_eq!(config.direct_interval_ms, 1000);
        assert_eq!(config.program_interval_ms, 2000);
        assert_eq!(config.effective_panels(), NavPanel::defaults());
    }

    #[test]
    fn test_sanitize() {
        let mut config = ConsoleConfig {
            host: "  robby.local ".to_string(),
            base_path: "api/v1/".to_string(),
            status_interval_ms: 1,
            direct_interval_ms: 10_000_000,
            max_tree_depth: 0,
            ..ConsoleConfig::default()
        };
        config.sanitize();
        assert_eq!(config.host, HostAddress::default().to_string());
        assert_eq!(config.base_path, "/api/v1");
        assert_eq!(config.status_interval_ms, 500);
        assert_eq!(config.direct_interval_ms, 60_000);
        assert_eq!(config.max_tree_depth, 1);
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from(["robbyconsole", "-H", "http://10.0.0.5:8080", "--status-interval", "3000", "status"]);
        let mut config = ConsoleConfig::default();
        assert!(config.merge_with_args(&args));
        assert_eq!(config.host, "http://10.0.0.5:8080");
        assert_eq!(config.status_interval_ms, 3000);
        assert!(matches!(args.command, Some(Command::Status)));

        let args = Args::parse_from(["robbyconsole", "mode", "Continuous"]);
        assert!(!ConsoleConfig::default().merge_with_args(&args));
        assert!(matches!(args.command, Some(Command::Mode { mode: Mode::Direct })));
    }

    #[test]
    fn test_routine_overrides_replace_builtin_pattern() {
        let config = ConsoleConfig {
            routines: ActionRoutineTable::new().with("ballfeeders/[i]", vec![ActionRoutine::post("retract", "", "/retract")]),
            ..ConsoleConfig::default()
        };
        let table = config.routine_table();
        let search = crate::paths::NodePath::from_base("/ballfeeders/0").search;
        let labels: Vec<&str> = table.lookup(&search).iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["retract"]);
        assert_eq!(table.lookup(&crate::paths::NodePath::from_base("/balldrivers/0").search).len(), 2);
    }

    #[test]
    fn test_explicit_config_paths_are_used_as_given() {
        let arg = String::from("/tmp/robby/bench.conf");
        assert_eq!(ConsoleConfig::config_path(Some(&arg)).unwrap(), PathBuf::from("/tmp/robby/bench.conf"));
        assert_eq!(ConsoleConfig::config_path(Some("./bench.conf")).unwrap(), PathBuf::from("./bench.conf"));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_config_path("save");
        let config = ConsoleConfig {
            config_path: Some(path.clone()),
            host: "http://10.0.0.5:8080".to_string(),
            direct_interval_ms: 1500,
            panels: vec![NavPanel::defaults()[1].clone()],
            routines: ActionRoutineTable::new().with("ballfeeders/[i]/motors/[i]", vec![ActionRoutine::put(
                "rotate",
                "quarter turn",
                "/rotate",
                serde_json::json!({"angle": 90.0}),
            )]),
            ..ConsoleConfig::default()
        };
        config.save().unwrap();

        let loaded = ConsoleConfig::load_with_path(path.to_str()).unwrap();
        assert_eq!(loaded.host, "http://10.0.0.5:8080");
        assert_eq!(loaded.direct_interval_ms, 1500);
        assert_eq!(loaded.panels, config.panels);
        assert_eq!(loaded.routines, config.routines);
        assert_eq!(loaded.config_path, Some(path.clone()));

        let search = crate::paths::NodePath::from_base("/ballfeeders/1/motors/0").search;
        assert_eq!(loaded.routine_table().find(&search, "rotate").unwrap().method, HttpMethod::Put);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let path = temp_config_path("malformed");
        std::fs::write(&path, "status_interval_ms = \"soon\"\n").unwrap();
        assert!(matches!(ConsoleConfig::load_with_path(path.to_str()), Err(ConsoleError::TomlParse(_))));
        let _ = std::fs::remove_file(path);
    }
}
