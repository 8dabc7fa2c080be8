// Routines Module - Declarative table of HTTP actions keyed by structural path pattern
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::paths::{PathPattern, SearchPath};
use crate::types::HttpMethod;

/// One invocable HTTP operation, declared for every node whose search path equals its pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRoutine {
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub url_suffix: String,  // Appended to the node's concrete path, e.g. "/start"
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,  // Static JSON body, sent as-is
}

impl ActionRoutine {
    pub fn post(label: &str, description: &str, url_suffix: &str) -> Self {
        ActionRoutine {
            label: label.to_string(),
            description: description.to_string(),
            url_suffix: url_suffix.to_string(),
            method: HttpMethod::Post,
            payload: None,
        }
    }

    pub fn put(label: &str, description: &str, url_suffix: &str, payload: Value) -> Self {
        ActionRoutine {
            label: label.to_string(),
            description: description.to_string(),
            url_suffix: url_suffix.to_string(),
            method: HttpMethod::Put,
            payload: Some(payload),
        }
    }
}

/// Pattern -> routines; the order of routines under one pattern is the button order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionRoutineTable {
    entries: BTreeMap<PathPattern, Vec<ActionRoutine>>,
}

impl ActionRoutineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a routine under `pattern`, after any routines already declared there
    pub fn insert(&mut self, pattern: impl Into<PathPattern>, routine: ActionRoutine) {
        self.entries.entry(pattern.into()).or_default().push(routine);
    }

    pub fn with(mut self, pattern: &str, routines: Vec<ActionRoutine>) -> Self {
        for routine in routines {
            self.insert(pattern, routine);
        }
        self
    }

    /// Routines applicable at `search`, in declaration order; empty when none match
    pub fn lookup(&self, search: &SearchPath) -> &[ActionRoutine] {
        self.entries
            .get(&PathPattern::from(search))
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, search: &SearchPath, label: &str) -> Option<&ActionRoutine> {
        self.lookup(search).iter().find(|r| r.label == label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of self: patterns present in `other` replace ours wholesale
    pub fn merge(&mut self, other: ActionRoutineTable) {
        for (pattern, routines) in other.entries {
            self.entries.insert(pattern, routines);
        }
    }

    /// Routines offered by the TT-Robby firmware's POST/PUT action endpoints
    pub fn ball_machine_defaults() -> Self {
        ActionRoutineTable::new()
            .with("system", vec![
                ActionRoutine::post("start playing", "start playing the current shot cycle", "/start_playing"),
                ActionRoutine::post("stop playing", "stop playing", "/stop_playing"),
                ActionRoutine::post("save settings", "make the current settings permanent", "/save_settings"),
                ActionRoutine::post("load settings", "reload the saved settings", "/load_settings"),
            ])
            .with("balldrivers/[i]", vec![
                ActionRoutine::post("start", "start the ball driver motors at 50% speed", "/start"),
                ActionRoutine::post("stop", "stop the ball driver motors", "/stop"),
            ])
            .with("balldrivers/[i]/motors/[i]", vec![
                ActionRoutine::post("start", "start the motor at 50% speed", "/start"),
                ActionRoutine::post("stop", "stop the motor", "/stop"),
            ])
            .with("ballstirrers/[i]", vec![
                ActionRoutine::post("start", "start the stirrer with its current settings", "/start"),
                ActionRoutine::post("stop", "stop the stirrer", "/stop"),
            ])
            .with("ballstirrers/[i]/motors/[i]", vec![
                ActionRoutine::post("start", "start the stirrer motor", "/start"),
                ActionRoutine::post("stop", "stop the stirrer motor", "/stop"),
            ])
            .with("ballfeeders/[i]", vec![
                ActionRoutine::post("dispense", "feed one ball", "/dispense"),
                ActionRoutine::post("prepare", "move the feeder into its waiting position", "/prepare"),
                ActionRoutine::post("stop", "stop the feeder", "/stop"),
            ])
            .with("ballfeeders/[i]/motors/[i]", vec![
                ActionRoutine::put("rotate", "rotate the feeder motor by 5 degrees", "/rotate", json!({"angle": 5.0})),
                ActionRoutine::post("stop", "stop the feeder motor", "/stop"),
            ])
            .with("machinerotators/[i]", vec![
                ActionRoutine::post("start", "start the rotator with its current settings", "/start"),
                ActionRoutine::post("stop", "stop the rotator", "/stop"),
            ])
    }
}
