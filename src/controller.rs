// Controller Module - Console state and the transitions that drive it
//
// All mutable state of the console lives in `Console`. Transitions never
// perform I/O; they return `Effect`s which the runtime executes, and the
// runtime reports outcomes back as `Event`s.
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::binder::{BoundAction, ConfigTreeBinder, DisplayTree, KeyOrder, NodeId, SidebarEntry, child_value};
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::host::{HostAddress, HostForm};
use crate::logging::EventLog;
use crate::paths::{ConcretePath, NodePath};
use crate::routines::ActionRoutineTable;
use crate::types::{MachineStatus, Mode, NavPanel};

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchStatus { seq: u64 },
    FetchDocument { seq: u64, url: String },
    SetMode { mode: Mode },
    Invoke { action: BoundAction },
    StopModePoll,
    StartModePoll { interval: Duration },
    RestartStatusPoll { interval: Duration },
    Reconnect { host: HostAddress },
}

/// Outcome or timer tick delivered back to the console
#[derive(Debug)]
pub enum Event {
    StatusTick,
    ModeTick,
    Status { seq: u64, result: Result<MachineStatus> },
    Document { seq: u64, url: String, result: Result<Value> },
    ModeSet { mode: Mode, result: Result<Value> },
    ActionDone { label: String, target: ConcretePath, result: Result<Value> },
    ConfigReloaded(Box<ConsoleConfig>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Navigation,
    Content,
    Table,
    Host,
}

/// Sequence tokens for in-flight fetches; responses older than the newest applied one are dropped
#[derive(Debug, Default)]
struct Sequencer {
    next: u64,
    applied_status: u64,
    applied_document: u64,
}

impl Sequencer {
    fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Mark every status fetch issued so far as stale
    fn supersede_status(&mut self) {
        self.applied_status = self.issue();
    }

    fn accept_status(&mut self, seq: u64) -> bool {
        if seq < self.applied_status {
            return false;
        }
        self.applied_status = seq;
        true
    }

    fn accept_document(&mut self, seq: u64) -> bool {
        if seq < self.applied_document {
            return false;
        }
        self.applied_document = seq;
        true
    }
}

pub struct Console {
    routines: ActionRoutineTable,
    all_panels: Vec<NavPanel>,
    max_depth: usize,
    status_interval: Duration,
    direct_interval: Duration,
    program_interval: Duration,

    mode: Mode,
    panels: Vec<NavPanel>,
    selected_panel: usize,
    panel_actions: Vec<BoundAction>,
    document: Option<Value>,
    sidebar: Vec<SidebarEntry>,
    selected_entry: usize,
    tree: Option<DisplayTree>,
    selected_row: NodeId,
    focus: Focus,

    status: Option<MachineStatus>,
    status_line: String,
    mode_poll: Option<Mode>,  // Mode whose scoped interval is running
    seq: Sequencer,
    host_form: HostForm,
    log: EventLog,
}

impl Console {
    pub fn new(config: &ConsoleConfig, host: HostAddress) -> Self {
        let mut console = Console {
            routines: config.routine_table(),
            all_panels: config.effective_panels(),
            max_depth: config.max_tree_depth,
            status_interval: config.status_interval(),
            direct_interval: Duration::from_millis(config.direct_interval_ms),
            program_interval: Duration::from_millis(config.program_interval_ms),
            mode: Mode::Config,
            panels: Vec::new(),
            selected_panel: 0,
            panel_actions: Vec::new(),
            document: None,
            sidebar: Vec::new(),
            selected_entry: 0,
            tree: None,
            selected_row: 0,
            focus: Focus::Navigation,
            status: None,
            status_line: "Connecting...".to_string(),
            mode_poll: None,
            seq: Sequencer::default(),
            host_form: HostForm::new(host),
            log: EventLog::new(),
        };
        console.panels = NavPanel::for_mode(&console.all_panels, console.mode);
        console.bind_panel_actions();
        console
    }

    // --- accessors used by the renderer ---

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn panels(&self) -> &[NavPanel] {
        &self.panels
    }

    pub fn selected_panel(&self) -> usize {
        self.selected_panel
    }

    pub fn current_panel(&self) -> Option<&NavPanel> {
        self.panels.get(self.selected_panel)
    }

    pub fn sidebar(&self) -> &[SidebarEntry] {
        &self.sidebar
    }

    pub fn selected_entry(&self) -> usize {
        self.selected_entry
    }

    pub fn tree(&self) -> Option<&DisplayTree> {
        self.tree.as_ref()
    }

    pub fn selected_row(&self) -> NodeId {
        self.selected_row
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status(&self) -> Option<&MachineStatus> {
        self.status.as_ref()
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    pub fn host_form(&self) -> &HostForm {
        &self.host_form
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn status_interval(&self) -> Duration {
        self.status_interval
    }

    fn mode_interval(&self, mode: Mode) -> Option<Duration> {
        match mode {
            Mode::Config => None,
            Mode::Direct => Some(self.direct_interval),
            Mode::Program => Some(self.program_interval),
        }
    }

    fn set_status_line(&mut self, line: String) {
        self.log.push(&line);
        self.status_line = line;
    }

    // --- lifecycle ---

    /// Initial effects: first status fetch plus the first panel of the starting mode
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::FetchStatus { seq: self.seq.issue() }];
        effects.extend(self.enter_mode(self.mode));
        effects
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::StatusTick => vec![Effect::FetchStatus { seq: self.seq.issue() }],
            Event::ModeTick => self.on_mode_tick(),
            Event::Status { seq, result } => self.apply_status(seq, result),
            Event::Document { seq, url, result } => self.apply_document(seq, &url, result),
            Event::ModeSet { mode, result } => {
                self.mode_set(mode, result);
                Vec::new()
            }
            Event::ActionDone { label, target, result } => {
                self.action_done(&label, &target, result);
                Vec::new()
            }
            Event::ConfigReloaded(config) => self.apply_config(&config),
        }
    }

    fn on_mode_tick(&mut self) -> Vec<Effect> {
        match self.mode_poll {
            Some(Mode::Direct) => self.fetch_current_panel().into_iter().collect(),
            Some(Mode::Program) => vec![Effect::FetchStatus { seq: self.seq.issue() }],
            // A tick from an interval that was already cancelled
            Some(Mode::Config) | None => Vec::new(),
        }
    }

    // --- status polling and mode switching ---

    pub fn apply_status(&mut self, seq: u64, result: Result<MachineStatus>) -> Vec<Effect> {
        if !self.seq.accept_status(seq) {
            debug!("dropping stale status response {}", seq);
            return Vec::new();
        }

        match result {
            Ok(status) => {
                self.status_line = status.summary();
                let reported = status.mode();
                self.status = Some(status);
                match reported {
                    Some(mode) if mode != self.mode => {
                        info!("machine reports mode {}, switching from {}", mode, self.mode);
                        self.log.push(format!("🔄 Machine switched to {} mode", mode));
                        self.switch_mode(mode)
                    }
                    _ => Vec::new(),
                }
            }
            Err(e) => {
                warn!("status poll failed: {}", e);
                self.set_status_line(format!("⚠️  Status unavailable: {}", e));
                Vec::new()
            }
        }
    }

    /// Switch the local mode; no-op when already in `mode`
    pub fn switch_mode(&mut self, mode: Mode) -> Vec<Effect> {
        if mode == self.mode {
            return Vec::new();
        }
        self.enter_mode(mode)
    }

    fn enter_mode(&mut self, mode: Mode) -> Vec<Effect> {
        self.mode = mode;
        self.panels = NavPanel::for_mode(&self.all_panels, mode);
        self.selected_panel = 0;
        self.bind_panel_actions();
        self.clear_document();
        if self.focus != Focus::Host {
            self.focus = Focus::Navigation;
        }

        let mut effects = vec![Effect::StopModePoll];
        self.mode_poll = None;
        effects.extend(self.fetch_current_panel());
        if let Some(interval) = self.mode_interval(mode) {
            effects.push(Effect::StartModePoll { interval });
            self.mode_poll = Some(mode);
        }
        effects
    }

    /// Operator-requested mode change: tell the machine, then switch locally
    pub fn request_mode(&mut self, mode: Mode) -> Vec<Effect> {
        if mode == self.mode {
            return Vec::new();
        }
        self.log.push(format!("➡️  Requesting {} mode", mode));
        // A status poll already in flight still reports the old mode
        self.seq.supersede_status();
        let mut effects = vec![Effect::SetMode { mode }];
        effects.extend(self.switch_mode(mode));
        effects
    }

    pub fn mode_set(&mut self, mode: Mode, result: Result<Value>) {
        match result {
            Ok(_) => self.log.push(format!("✅ Machine accepted {} mode", mode)),
            Err(e) => {
                warn!("mode change to {} failed: {}", mode, e);
                self.set_status_line(format!("❌ Mode change to {} failed: {}", mode, e));
            }
        }
    }

    // --- panels and documents ---

    fn clear_document(&mut self) {
        self.document = None;
        self.sidebar.clear();
        self.selected_entry = 0;
        self.tree = None;
        self.selected_row = 0;
    }

    fn fetch_current_panel(&mut self) -> Option<Effect> {
        let url = self.current_panel()?.url.clone();
        Some(Effect::FetchDocument { seq: self.seq.issue(), url })
    }

    pub fn select_panel(&mut self, index: usize) -> Vec<Effect> {
        if index >= self.panels.len() {
            return Vec::new();
        }
        self.selected_panel = index;
        self.bind_panel_actions();
        self.clear_document();
        self.fetch_current_panel().into_iter().collect()
    }

    /// Re-fetch status and the selected panel
    pub fn refresh(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::FetchStatus { seq: self.seq.issue() }];
        effects.extend(self.fetch_current_panel());
        effects
    }

    pub fn apply_document(&mut self, seq: u64, url: &str, result: Result<Value>) -> Vec<Effect> {
        if self.current_panel().map(|p| p.url.as_str()) != Some(url) {
            debug!("dropping document {} for a panel no longer shown", url);
            return Vec::new();
        }
        if !self.seq.accept_document(seq) {
            debug!("dropping stale document response {} for {}", seq, url);
            return Vec::new();
        }

        match result {
            Ok(document) => {
                let previous_key = self.sidebar.get(self.selected_entry).map(|e| e.key.clone());
                self.sidebar = self.build_sidebar(&document);
                self.document = Some(document);
                self.selected_entry = previous_key
                    .and_then(|key| self.sidebar.iter().position(|e| e.key == key))
                    .unwrap_or(0);
                self.rebind();
            }
            Err(e) => {
                warn!("fetching {} failed: {}", url, e);
                self.set_status_line(format!("⚠️  Could not load {}: {}", url, e));
            }
        }
        Vec::new()
    }

    /// Routines declared for the selected panel's parent object (e.g. "/system")
    fn bind_panel_actions(&mut self) {
        self.panel_actions = match self.current_panel() {
            Some(panel) => ConfigTreeBinder::new(&self.routines, self.max_depth).actions_at(&NodePath::from_base(&panel.parent_key)),
            None => Vec::new(),
        };
    }

    pub fn panel_actions(&self) -> &[BoundAction] {
        &self.panel_actions
    }

    fn build_sidebar(&self, document: &Value) -> Vec<SidebarEntry> {
        let Some(panel) = self.current_panel() else {
            return Vec::new();
        };
        let binder = ConfigTreeBinder::new(&self.routines, self.max_depth);
        binder.sidebar_entries(document, &NodePath::from_base(&panel.parent_key), &panel.exclude_keys)
    }

    pub fn select_entry(&mut self, index: usize) {
        if index >= self.sidebar.len() || (index == self.selected_entry && self.tree.is_some()) {
            return;
        }
        self.selected_entry = index;
        self.selected_row = 0;
        self.tree = None;
        self.rebind();
    }

    /// Bind the selected entry into the main table, keeping the cursor row and a pending edit
    fn rebind(&mut self) {
        let kept_row = self.tree_node(self.selected_row).map(|n| n.path.concrete.clone());
        let kept_edit = self.tree.as_ref().and_then(|tree| {
            let id = tree.editing()?;
            let node = tree.get(id)?;
            Some((node.path.concrete.clone(), node.display_value()))
        });

        let bound = {
            let Some(entry) = self.sidebar.get(self.selected_entry) else {
                self.tree = None;
                return;
            };
            let Some(value) = self.document.as_ref().and_then(|doc| child_value(doc, &entry.key)) else {
                self.tree = None;
                return;
            };
            ConfigTreeBinder::new(&self.routines, self.max_depth).bind_tree(value, entry.path.clone(), KeyOrder::Sorted)
        };

        match bound {
            Ok(mut tree) => {
                self.selected_row = kept_row
                    .and_then(|path| tree.iter().find(|(_, n)| n.path.concrete == path).map(|(id, _)| id))
                    .unwrap_or(0);
                if let Some((path, buffer)) = kept_edit {
                    let id = tree.iter().find(|(_, n)| n.is_leaf() && n.path.concrete == path).map(|(id, _)| id);
                    if let Some(id) = id {
                        if tree.edit_scalar(id).is_ok() {
                            if let Some(b) = tree.edit_buffer_mut(id) {
                                *b = buffer;
                            }
                        }
                    }
                }
                self.tree = Some(tree);
            }
            Err(e) => {
                warn!("{}", e);
                self.tree = None;
                self.set_status_line(format!("⚠️  {}", e));
            }
        }
    }

    fn tree_node(&self, id: NodeId) -> Option<&crate::binder::DisplayNode> {
        self.tree.as_ref().and_then(|t| t.get(id))
    }

    // --- actions ---

    /// Actions of the focused item: the panel, the sidebar entry or the table row under the cursor
    pub fn focused_actions(&self) -> &[BoundAction] {
        match self.focus {
            Focus::Navigation => &self.panel_actions,
            Focus::Content => self.sidebar.get(self.selected_entry).map(|e| e.actions.as_slice()).unwrap_or(&[]),
            Focus::Table => self.tree_node(self.selected_row).map(|n| n.actions.as_slice()).unwrap_or(&[]),
            Focus::Host => &[],
        }
    }

    /// Invoke the `index`-th action of the focused item
    pub fn invoke(&mut self, index: usize) -> Vec<Effect> {
        let Some(action) = self.focused_actions().get(index).cloned() else {
            return Vec::new();
        };
        self.log.push(format!("▶️  {} {}", action.routine.label, action.target));
        vec![Effect::Invoke { action }]
    }

    pub fn action_done(&mut self, label: &str, target: &ConcretePath, result: Result<Value>) {
        match result {
            Ok(_) => self.set_status_line(format!("✅ {} {} succeeded", label, target)),
            Err(e) => {
                warn!("{} {} failed: {}", label, target, e);
                self.set_status_line(format!("❌ {} {} failed: {}", label, target, e));
            }
        }
    }

    // --- local edits ---

    pub fn is_editing(&self) -> bool {
        self.tree.as_ref().and_then(|t| t.editing()).is_some()
    }

    pub fn begin_edit(&mut self) {
        let row = self.selected_row;
        if let Some(tree) = self.tree.as_mut() {
            if let Err(e) = tree.edit_scalar(row) {
                self.status_line = format!("⚠️  {}", e);
            }
        }
    }

    pub fn edit_input(&mut self, c: char) {
        if let Some(tree) = self.tree.as_mut() {
            if let Some(id) = tree.editing() {
                if let Some(buffer) = tree.edit_buffer_mut(id) {
                    buffer.push(c);
                }
            }
        }
    }

    pub fn edit_backspace(&mut self) {
        if let Some(tree) = self.tree.as_mut() {
            if let Some(id) = tree.editing() {
                if let Some(buffer) = tree.edit_buffer_mut(id) {
                    buffer.pop();
                }
            }
        }
    }

    /// Keep the edited value locally; the machine is not written to
    pub fn commit_edit(&mut self) {
        let Some(tree) = self.tree.as_mut() else { return };
        let Some(id) = tree.editing() else { return };
        match tree.commit_buffer(id) {
            Ok(value) => {
                let path = tree.get(id).map(|n| n.path.concrete.to_string()).unwrap_or_default();
                self.log.push(format!("✏️  {} = {} (local only)", path, value));
            }
            Err(e) => self.status_line = format!("⚠️  {}", e),
        }
    }

    pub fn cancel_edit(&mut self) {
        if let Some(tree) = self.tree.as_mut() {
            if let Some(id) = tree.editing() {
                tree.cancel_edit(id);
            }
        }
    }

    // --- cursor and focus ---

    pub fn cycle_focus(&mut self) {
        self.cancel_edit();
        self.focus = match self.focus {
            Focus::Navigation => Focus::Content,
            Focus::Content => Focus::Table,
            Focus::Table | Focus::Host => Focus::Navigation,
        };
    }

    /// Move the cursor of the focused pane; selecting a panel or entry follows the cursor
    pub fn move_cursor(&mut self, delta: isize) -> Vec<Effect> {
        fn step(current: usize, delta: isize, len: usize) -> usize {
            if len == 0 {
                return 0;
            }
            (current as isize + delta).clamp(0, len as isize - 1) as usize
        }

        match self.focus {
            Focus::Navigation => {
                let next = step(self.selected_panel, delta, self.panels.len());
                if next != self.selected_panel {
                    return self.select_panel(next);
                }
            }
            Focus::Content => {
                let next = step(self.selected_entry, delta, self.sidebar.len());
                self.select_entry(next);
            }
            Focus::Table => {
                self.cancel_edit();
                let len = self.tree.as_ref().map(|t| t.len()).unwrap_or(0);
                self.selected_row = step(self.selected_row, delta, len);
            }
            Focus::Host => {}
        }
        Vec::new()
    }

    // --- host address ---

    pub fn open_host_form(&mut self) {
        self.cancel_edit();
        self.focus = Focus::Host;
    }

    pub fn host_input(&mut self, c: char) {
        self.host_form.push_char(c);
    }

    pub fn host_backspace(&mut self) {
        self.host_form.pop_char();
    }

    /// Adopt the typed address; all following requests go to the new machine
    pub fn accept_host(&mut self) -> Vec<Effect> {
        let Some(host) = self.host_form.accept() else {
            return Vec::new();
        };
        self.focus = Focus::Navigation;
        self.set_status_line(format!("🔌 Connecting to {}", host));
        let mut effects = vec![Effect::Reconnect { host }];
        effects.extend(self.refresh());
        effects
    }

    /// Leave the host form, restoring the current address
    pub fn cancel_host(&mut self) {
        self.host_form.cancel();
        self.focus = Focus::Navigation;
    }

    // --- configuration reload ---

    pub fn apply_config(&mut self, config: &ConsoleConfig) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.log.push("🔄 Configuration reloaded");

        self.routines = config.routine_table();
        self.max_depth = config.max_tree_depth;
        self.bind_panel_actions();

        if config.status_interval() != self.status_interval {
            self.status_interval = config.status_interval();
            effects.push(Effect::RestartStatusPoll { interval: self.status_interval });
        }

        let direct = Duration::from_millis(config.direct_interval_ms);
        let program = Duration::from_millis(config.program_interval_ms);
        let intervals_changed = direct != self.direct_interval || program != self.program_interval;
        self.direct_interval = direct;
        self.program_interval = program;
        if intervals_changed {
            if let Some(interval) = self.mode_poll.and_then(|m| self.mode_interval(m)) {
                effects.push(Effect::StopModePoll);
                effects.push(Effect::StartModePoll { interval });
            }
        }

        match config.host_address() {
            Ok(host) if &host != self.host_form.current() => {
                self.host_form.sync_current(host.clone());
                effects.push(Effect::Reconnect { host });
                effects.extend(self.refresh());
            }
            Ok(_) => {}
            Err(e) => warn!("ignoring host from reloaded config: {}", e),
        }

        let panels = config.effective_panels();
        if panels != self.all_panels {
            self.all_panels = panels;
            // Re-enter the mode so the menu and the mode poll match the new panels
            let mode = self.mode;
            effects.retain(|e| !matches!(e, Effect::FetchDocument { .. } | Effect::StopModePoll | Effect::StartModePoll { .. }));
            effects.extend(self.enter_mode(mode));
        } else if let Some(document) = self.document.clone() {
            self.sidebar = self.build_sidebar(&document);
            self.rebind();
        }

        effects
    }
}
