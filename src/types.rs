// Shared types module - Common types used across multiple modules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConsoleError;

// Operating mode of the ball machine, which also selects the console's navigation menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Config,
    Direct,
    Program,
}

impl Mode {
    /// Text the firmware expects in `PUT /system/mode`
    pub fn api_text(&self) -> &'static str {
        match self {
            Mode::Config => "Configuration",
            Mode::Direct => "Continuous",
            Mode::Program => "Program",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Config => "config",
            Mode::Direct => "direct",
            Mode::Program => "program",
        }
    }
}

impl FromStr for Mode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "config" | "configuration" => Ok(Mode::Config),
            "direct" | "continuous" => Ok(Mode::Direct),
            "program" => Ok(Mode::Program),
            other => Err(ConsoleError::Validation(format!("unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        };
        write!(f, "{}", s)
    }
}

// Navigation sidebar entry: a document of the machine shown in one mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPanel {
    pub id: String,
    pub mode: Mode,
    pub parent_key: String,  // Prefix of the concrete paths of the document's top-level keys
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub exclude_keys: Vec<String>,  // Top-level keys hidden from the content sidebar
}

impl NavPanel {
    fn new(id: &str, mode: Mode, parent_key: &str, title: &str, url: &str, exclude_keys: &[&str]) -> Self {
        NavPanel {
            id: id.to_string(),
            mode,
            parent_key: parent_key.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            exclude_keys: exclude_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Panels of the TT-Robby console, in menu order
    pub fn defaults() -> Vec<NavPanel> {
        const COMPONENTS: [&str; 4] = ["machinerotators", "balldrivers", "ballstirrers", "ballfeeders"];
        vec![
            NavPanel::new("sys_config", Mode::Config, "system", "Machine", "/system/config", &COMPONENTS),
            NavPanel::new("bd_config", Mode::Config, "balldrivers", "Ball Drivers", "/balldrivers/config", &[]),
            NavPanel::new("bf_config", Mode::Config, "ballfeeders", "Ball Feeders", "/ballfeeders/config", &[]),
            NavPanel::new("bs_config", Mode::Config, "ballstirrers", "Ball Stirrers", "/ballstirrers/config", &[]),
            NavPanel::new("mr_config", Mode::Config, "machinerotators", "Machine Rotators", "/machinerotators/config", &[]),
            NavPanel::new("bd_direct", Mode::Direct, "balldrivers", "Ball Drivers", "/balldrivers/config", &[]),
            NavPanel::new("bf_direct", Mode::Direct, "ballfeeders", "Ball Feeders", "/ballfeeders/config", &[]),
            NavPanel::new("bs_direct", Mode::Direct, "ballstirrers", "Ball Stirrers", "/ballstirrers/config", &[]),
            NavPanel::new("mr_direct", Mode::Direct, "machinerotators", "Machine Rotators", "/machinerotators/config", &[]),
            NavPanel::new(
                "prog_cycle",
                Mode::Program,
                "system",
                "Shot Cycle",
                "/system/config",
                &["settings", "machinerotators", "balldrivers", "ballstirrers", "ballfeeders"],
            ),
        ]
    }

    pub fn for_mode(panels: &[NavPanel], mode: Mode) -> Vec<NavPanel> {
        panels.iter().filter(|p| p.mode == mode).cloned().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotCycle {
    #[serde(default)]
    pub next_shot_index: i64,
    #[serde(default)]
    pub total_shots: i64,
}

// Top-level machine status as reported by GET /system/status
// The firmware reports `mode`/`status`, newer builds `mode_text`/`status_text`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    #[serde(alias = "mode", default)]
    pub mode_text: String,
    #[serde(alias = "status", default)]
    pub status_text: String,
    #[serde(default)]
    pub shot_cycle: ShotCycle,
}

impl MachineStatus {
    pub fn mode(&self) -> Option<Mode> {
        self.mode_text.parse().ok()
    }

    pub fn summary(&self) -> String {
        format!(
            "Mode: {} | Status: {} | Next Shot in Cycle: {}/{}",
            self.mode_text, self.status_text, self.shot_cycle.next_shot_index, self.shot_cycle.total_shots
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_parsing_accepts_firmware_texts() {
        assert_eq!("direct".parse::<Mode>().unwrap(), Mode::Direct);
        assert_eq!("Continuous".parse::<Mode>().unwrap(), Mode::Direct);
        assert_eq!("Configuration".parse::<Mode>().unwrap(), Mode::Config);
        assert_eq!(" CONFIG ".parse::<Mode>().unwrap(), Mode::Config);
        assert_eq!("Program".parse::<Mode>().unwrap(), Mode::Program);
        assert!("playing".parse::<Mode>().is_err());
    }

    #[test]
    fn test_status_accepts_both_field_spellings() {
        let firmware: MachineStatus = serde_json::from_value(json!({
            "mode": "Configuration",
            "status": "Idle",
            "shot_cycle": {"next_shot_index": 2, "total_shots": 5}
        }))
        .unwrap();
        assert_eq!(firmware.mode(), Some(Mode::Config));
        assert_eq!(firmware.shot_cycle.total_shots, 5);

        let newer: MachineStatus = serde_json::from_value(json!({
            "mode_text": "direct",
            "status_text": "Playing"
        }))
        .unwrap();
        assert_eq!(newer.mode(), Some(Mode::Direct));
        assert_eq!(newer.shot_cycle, ShotCycle::default());
        assert_eq!(newer.summary(), "Mode: direct | Status: Playing | Next Shot in Cycle: 0/0");
    }

    #[test]
    fn test_default_panels_per_mode() {
        let panels = NavPanel::defaults();
        let config: Vec<String> = NavPanel::for_mode(&panels, Mode::Config).into_iter().map(|p| p.id).collect();
        assert_eq!(config, vec!["sys_config", "bd_config", "bf_config", "bs_config", "mr_config"]);
        assert_eq!(NavPanel::for_mode(&panels, Mode::Direct).len(), 4);
        assert_eq!(NavPanel::for_mode(&panels, Mode::Program)[0].id, "prog_cycle");
        assert!(panels[0].exclude_keys.contains(&"balldrivers".to_string()));
    }

    #[test]
    fn test_http_method_serde() {
        let m: HttpMethod = serde_json::from_value(json!("POST")).unwrap();
        assert_eq!(m, HttpMethod::Post);
        assert_eq!(m.as_reqwest(), reqwest::Method::POST);
        assert_eq!(HttpMethod::Put.to_string(), "PUT");
    }
}
