// Binder Module - Turns a fetched JSON document into a display tree with bound actions
//
// Every position of the document (container or scalar) becomes exactly one
// DisplayNode. Nodes whose search path matches a declared pattern carry the
// routines of that pattern, bound to the node's concrete path.
use serde_json::{Map, Value};

use crate::error::{ConsoleError, Result};
use crate::paths::{unescape_segment, ConcretePath, NodePath};
use crate::routines::{ActionRoutine, ActionRoutineTable};

pub const DEFAULT_MAX_DEPTH: usize = 64;

pub type NodeId = usize;

/// Key order for object children
///
/// The main table lists the keys of the selected item sorted, while everything
/// below it (and the content sidebar) keeps the order the API sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrder {
    Sorted,
    Insertion,
}

/// Shape of a JSON value, decided once and matched exhaustively
#[derive(Debug, Clone, Copy)]
pub enum JsonShape<'a> {
    Scalar(&'a Value),
    Sequence(&'a [Value]),
    Mapping(&'a Map<String, Value>),
}

impl<'a> JsonShape<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => JsonShape::Sequence(items),
            Value::Object(map) => JsonShape::Mapping(map),
            other => JsonShape::Scalar(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    Sequence,
    Mapping,
}

/// A routine bound to the concrete path of the node it was found on
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAction {
    pub routine: ActionRoutine,
    pub target: ConcretePath,
}

impl BoundAction {
    /// `base_url + concrete path + suffix`; never contains a wildcard segment
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}{}", base_url, self.target.url_path(), self.routine.url_suffix)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    ReadOnly,
    Editing { buffer: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container {
        shape: ContainerShape,
        children: Vec<NodeId>,
    },
    Leaf {
        value: Value,
        edit: EditState,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayNode {
    pub label: String,
    pub path: NodePath,
    pub depth: usize,  // Relative to the bound root
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub actions: Vec<BoundAction>,
}

impl DisplayNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { edit: EditState::Editing { .. }, .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Container { children, .. } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    /// Text shown in the value column: the edit buffer while editing, the scalar otherwise
    pub fn display_value(&self) -> String {
        match &self.kind {
            NodeKind::Leaf { edit: EditState::Editing { buffer }, .. } => buffer.clone(),
            NodeKind::Leaf { value, .. } => scalar_text(value),
            NodeKind::Container { shape: ContainerShape::Sequence, children } => format!("[{} items]", children.len()),
            NodeKind::Container { shape: ContainerShape::Mapping, children } => format!("{{{} keys}}", children.len()),
        }
    }
}

/// Render a scalar without JSON quoting for strings
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Interpret edited text: JSON scalars keep their type, anything else becomes a string
pub fn parse_scalar(text: &str) -> Value {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(v) if !v.is_array() && !v.is_object() => v,
        _ => Value::String(text.to_string()),
    }
}

/// Arena of display nodes in pre-order; index 0 is the bound root
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTree {
    nodes: Vec<DisplayNode>,
}

impl DisplayTree {
    pub fn root(&self) -> &DisplayNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&DisplayNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DisplayNode)> {
        self.nodes.iter().enumerate()
    }

    /// Node currently being edited, if any
    pub fn editing(&self) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.is_editing())
    }

    /// Put a leaf into editing state; at most one leaf edits at a time
    pub fn edit_scalar(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get(id).ok_or_else(|| ConsoleError::Validation(format!("no node {}", id)))?;
        if !node.is_leaf() {
            return Err(ConsoleError::Validation(format!("{} is not a scalar", node.path.concrete)));
        }
        if let Some(other) = self.editing() {
            self.cancel_edit(other);
        }
        if let Some(NodeKind::Leaf { value, edit }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            *edit = EditState::Editing { buffer: scalar_text(value) };
        }
        Ok(())
    }

    pub fn edit_buffer_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Leaf { edit: EditState::Editing { buffer }, .. }) => Some(buffer),
            _ => None,
        }
    }

    /// Replace the locally cached value and leave editing state. Nothing is sent to the machine.
    pub fn commit_edit(&mut self, id: NodeId, new_value: &str) -> Result<Value> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Leaf { value, edit }) if matches!(edit, EditState::Editing { .. }) => {
                *value = parse_scalar(new_value);
                *edit = EditState::ReadOnly;
                Ok(value.clone())
            }
            _ => Err(ConsoleError::Validation(format!("node {} is not being edited", id))),
        }
    }

    /// Commit whatever is in the edit buffer
    pub fn commit_buffer(&mut self, id: NodeId) -> Result<Value> {
        let text = match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Leaf { edit: EditState::Editing { buffer }, .. }) => buffer.clone(),
            _ => return Err(ConsoleError::Validation(format!("node {} is not being edited", id))),
        };
        self.commit_edit(id, &text)
    }

    /// Discard the pending value; no-op for nodes that are not being edited
    pub fn cancel_edit(&mut self, id: NodeId) {
        if let Some(NodeKind::Leaf { edit, .. }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            *edit = EditState::ReadOnly;
        }
    }
}

/// Top-level entry of a panel document, as listed in the content sidebar
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarEntry {
    pub key: String,
    pub path: NodePath,
    pub actions: Vec<BoundAction>,
}

struct Frame<'v> {
    value: &'v Value,
    path: NodePath,
    label: String,
    depth: usize,
    parent: Option<NodeId>,
    order: KeyOrder,
}

pub struct ConfigTreeBinder<'t> {
    routines: &'t ActionRoutineTable,
    max_depth: usize,
}

impl<'t> ConfigTreeBinder<'t> {
    pub fn new(routines: &'t ActionRoutineTable, max_depth: usize) -> Self {
        ConfigTreeBinder { routines, max_depth }
    }

    /// Routines declared for `path`'s search path, bound to its concrete path
    pub fn actions_at(&self, path: &NodePath) -> Vec<BoundAction> {
        self.routines
            .lookup(&path.search)
            .iter()
            .map(|routine| BoundAction {
                routine: routine.clone(),
                target: path.concrete.clone(),
            })
            .collect()
    }

    /// Walk `value` rooted at `base`, producing one node per JSON position.
    ///
    /// `top_order` applies to the root's own keys; every nested object keeps
    /// insertion order. The walk uses an explicit stack and fails with
    /// [`ConsoleError::DepthLimit`] instead of descending past `max_depth`.
    pub fn bind_tree(&self, value: &Value, base: NodePath, top_order: KeyOrder) -> Result<DisplayTree> {
        let root_label = base
            .concrete
            .segments()
            .last()
            .map(unescape_segment)
            .unwrap_or_else(|| "value".to_string());

        let mut nodes: Vec<DisplayNode> = Vec::new();
        let mut stack = vec![Frame {
            value,
            path: base,
            label: root_label,
            depth: 0,
            parent: None,
            order: top_order,
        }];

        while let Some(frame) = stack.pop() {
            if frame.depth > self.max_depth {
                return Err(ConsoleError::DepthLimit {
                    path: frame.path.concrete.to_string(),
                    limit: self.max_depth,
                });
            }

            let id = nodes.len();
            let mut pending: Vec<Frame> = Vec::new();

            let kind = match JsonShape::of(frame.value) {
                JsonShape::Scalar(v) => NodeKind::Leaf {
                    value: v.clone(),
                    edit: EditState::ReadOnly,
                },
                JsonShape::Sequence(items) => {
                    for (index, item) in items.iter().enumerate() {
                        pending.push(Frame {
                            value: item,
                            path: frame.path.child_index(index),
                            label: format!("[{}]", index),
                            depth: frame.depth + 1,
                            parent: Some(id),
                            order: KeyOrder::Insertion,
                        });
                    }
                    NodeKind::Container {
                        shape: ContainerShape::Sequence,
                        children: Vec::with_capacity(items.len()),
                    }
                }
                JsonShape::Mapping(map) => {
                    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                    if frame.order == KeyOrder::Sorted {
                        entries.sort_by(|a, b| a.0.cmp(b.0));
                    }
                    for (key, item) in entries {
                        pending.push(Frame {
                            value: item,
                            path: frame.path.child(key),
                            label: key.clone(),
                            depth: frame.depth + 1,
                            parent: Some(id),
                            order: KeyOrder::Insertion,
                        });
                    }
                    NodeKind::Container {
                        shape: ContainerShape::Mapping,
                        children: Vec::with_capacity(map.len()),
                    }
                }
            };

            let actions = self.actions_at(&frame.path);
            nodes.push(DisplayNode {
                label: frame.label,
                path: frame.path,
                depth: frame.depth,
                parent: frame.parent,
                kind,
                actions,
            });

            // Pre-order: a parent is always pushed before its children, so this index exists
            if let Some(parent) = frame.parent {
                if let NodeKind::Container { children, .. } = &mut nodes[parent].kind {
                    children.push(id);
                }
            }

            // Reversed so the first child is popped (and numbered) first
            stack.extend(pending.into_iter().rev());
        }

        Ok(DisplayTree { nodes })
    }

    /// Top-level keys of a panel document in insertion order, minus `exclude`, with their actions
    pub fn sidebar_entries(&self, document: &Value, base: &NodePath, exclude: &[String]) -> Vec<SidebarEntry> {
        let keys: Vec<String> = match JsonShape::of(document) {
            JsonShape::Mapping(map) => map.keys().cloned().collect(),
            JsonShape::Sequence(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            JsonShape::Scalar(_) => Vec::new(),
        };

        keys.into_iter()
            .filter(|key| !exclude.iter().any(|ex| ex == key))
            .map(|key| {
                let path = base.child(&key);
                let actions = self.actions_at(&path);
                SidebarEntry { key, path, actions }
            })
            .collect()
    }
}

/// Child of a mapping by key or of a sequence by decimal index
pub fn child_value<'v>(document: &'v Value, key: &str) -> Option<&'v Value> {
    match JsonShape::of(document) {
        JsonShape::Mapping(map) => map.get(key),
        JsonShape::Sequence(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        JsonShape::Scalar(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::WILDCARD;
    use serde_json::json;
    use std::collections::HashSet;

    fn count_values(value: &Value) -> usize {
        match value {
            Value::Array(items) => 1 + items.iter().map(count_values).sum::<usize>(),
            Value::Object(map) => 1 + map.values().map(count_values).sum::<usize>(),
            _ => 1,
        }
    }

    fn start_stop_table() -> ActionRoutineTable {
        ActionRoutineTable::new().with("balldrivers/[i]", vec![
            ActionRoutine::post("start", "", "/start"),
            ActionRoutine::post("stop", "", "/stop"),
        ])
    }

    fn machine_config() -> Value {
        json!({
            "general": {"name": "robby", "volume": 3},
            "balldrivers": [
                {"status": "idle", "motors": [{"speed": 0}, {"speed": 10}]},
                {"status": "running", "motors": []}
            ],
            "shot_cycle": {"shots": [1, 2, 3], "repeat": true, "pause": null}
        })
    }

    #[test]
    fn test_single_driver_scenario() {
        let table = start_stop_table();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"balldrivers": [{"status": "idle"}]});
        let tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();

        let with_actions: Vec<&DisplayNode> = tree.iter().map(|(_, n)| n).filter(|n| !n.actions.is_empty()).collect();
        assert_eq!(with_actions.len(), 1);
        let driver = with_actions[0];
        assert!(!driver.is_leaf());
        assert_eq!(driver.path.concrete.as_str(), "/balldrivers/0");
        assert_eq!(driver.path.search.as_str(), "/balldrivers/[i]");
        let labels: Vec<&str> = driver.actions.iter().map(|a| a.routine.label.as_str()).collect();
        assert_eq!(labels, vec!["start", "stop"]);
        assert_eq!(driver.actions[0].url("http://robby/api/v1"), "http://robby/api/v1/balldrivers/0/start");
    }

    #[test]
    fn test_every_value_visited_once() {
        let table = ActionRoutineTable::ball_machine_defaults();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = machine_config();
        let tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();

        assert_eq!(tree.len(), count_values(&doc));
        let distinct: HashSet<&str> = tree.iter().map(|(_, n)| n.path.concrete.as_str()).collect();
        assert_eq!(distinct.len(), tree.len());
        // name, volume, 2 statuses, 2 speeds, 3 shots, repeat, pause
        assert_eq!(tree.iter().filter(|(_, n)| n.is_leaf()).count(), 11);
    }

    #[test]
    fn test_search_path_is_generalized_concrete_path_for_every_node() {
        let table = ActionRoutineTable::ball_machine_defaults();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let tree = binder.bind_tree(&machine_config(), NodePath::from_base("/system"), KeyOrder::Sorted).unwrap();
        for (_, node) in tree.iter() {
            assert_eq!(node.path.concrete.to_search_path(), node.path.search);
            for action in &node.actions {
                assert!(!action.url("").contains(WILDCARD));
            }
        }
    }

    #[test]
    fn test_action_urls_are_distinct_per_element() {
        let table = ActionRoutineTable::ball_machine_defaults();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"balldrivers": [{}, {}, {"motors": [{}, {}]}]});
        let tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();

        let mut seen = HashSet::new();
        for (_, node) in tree.iter() {
            for action in &node.actions {
                assert!(seen.insert(action.url("http://h:80")), "duplicate url {}", action.url(""));
            }
        }
        // 3 drivers x start/stop + 2 motors x start/stop
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_keys_containing_separators_keep_paths_in_lockstep() {
        let table = start_stop_table();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"x/0": 1, "x": [5], "balldrivers": [{}], "balldrivers/0": {}, "a~1": true});
        let tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();

        assert_eq!(tree.len(), count_values(&doc));
        let concretes: HashSet<&str> = tree.iter().map(|(_, n)| n.path.concrete.as_str()).collect();
        assert_eq!(concretes.len(), tree.len());
        for (_, node) in tree.iter() {
            assert_eq!(node.path.concrete.to_search_path(), node.path.search);
        }

        let slash_key = tree.iter().map(|(_, n)| n).find(|n| n.label == "x/0").unwrap();
        assert_eq!(slash_key.path.search.as_str(), "/x~10");
        assert!(tree.iter().any(|(_, n)| n.label == "a~1" && n.path.concrete.as_str() == "/a~01"));

        // Only the real array element matches "balldrivers/[i]"
        let urls: Vec<String> = tree.iter().flat_map(|(_, n)| n.actions.iter().map(|a| a.url(""))).collect();
        assert_eq!(urls, vec!["/balldrivers/0/start".to_string(), "/balldrivers/0/stop".to_string()]);
        let odd = tree.iter().map(|(_, n)| n).find(|n| n.label == "balldrivers/0").unwrap();
        assert!(odd.actions.is_empty());
        assert_eq!(odd.path.concrete.url_path(), "/balldrivers%2F0");
    }

    #[test]
    fn test_binding_is_idempotent() {
        let table = ActionRoutineTable::ball_machine_defaults();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = machine_config();
        let a = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();
        let b = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_top_level_sorted_nested_insertion_order() {
        let table = ActionRoutineTable::new();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"zeta": 1, "alpha": {"z": 1, "a": 2}, "mid": 3});
        let tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();

        let top: Vec<&str> = tree.root().children().iter().map(|&id| tree.get(id).unwrap().label.as_str()).collect();
        assert_eq!(top, vec!["alpha", "mid", "zeta"]);

        let alpha = tree.get(tree.root().children()[0]).unwrap();
        let nested: Vec<&str> = alpha.children().iter().map(|&id| tree.get(id).unwrap().label.as_str()).collect();
        assert_eq!(nested, vec!["z", "a"]);

        let unsorted = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Insertion).unwrap();
        let top: Vec<&str> = unsorted.root().children().iter().map(|&id| unsorted.get(id).unwrap().label.as_str()).collect();
        assert_eq!(top, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_preorder_layout() {
        let table = ActionRoutineTable::new();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"a": [10, 20], "b": 3});
        let tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();
        let order: Vec<(&str, usize)> = tree.iter().map(|(_, n)| (n.label.as_str(), n.depth)).collect();
        assert_eq!(order, vec![("value", 0), ("a", 1), ("[0]", 2), ("[1]", 2), ("b", 1)]);
        assert_eq!(tree.get(2).unwrap().parent, Some(1));
    }

    #[test]
    fn test_scalar_document_is_single_leaf() {
        let table = ActionRoutineTable::new();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let tree = binder.bind_tree(&json!(7), NodePath::from_base("/system/general/volume"), KeyOrder::Sorted).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().label, "volume");
        assert_eq!(tree.root().display_value(), "7");
    }

    #[test]
    fn test_depth_limit() {
        let table = ActionRoutineTable::new();
        let binder = ConfigTreeBinder::new(&table, 8);
        let mut doc = json!(1);
        for _ in 0..8 {
            doc = json!([doc]);
        }
        assert!(binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).is_ok());

        let doc = json!([doc]);
        match binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted) {
            Err(ConsoleError::DepthLimit { limit, path }) => {
                assert_eq!(limit, 8);
                assert_eq!(path, "/0/0/0/0/0/0/0/0/0");
            }
            other => panic!("expected depth limit error, got {:?}", other),
        }
    }

    #[test]
    fn test_edit_commit_and_cancel() {
        let table = ActionRoutineTable::new();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"speed": 10, "name": "left"});
        let mut tree = binder.bind_tree(&doc, NodePath::root(), KeyOrder::Sorted).unwrap();
        let name = tree.root().children()[0];
        let speed = tree.root().children()[1];

        assert!(tree.edit_scalar(0).is_err());

        tree.edit_scalar(speed).unwrap();
        tree.edit_buffer_mut(speed).unwrap().push('5');
        assert_eq!(tree.get(speed).unwrap().display_value(), "105");
        assert_eq!(tree.commit_buffer(speed).unwrap(), json!(105));
        assert!(!tree.get(speed).unwrap().is_editing());

        tree.edit_scalar(name).unwrap();
        tree.edit_buffer_mut(name).unwrap().push_str("-ish");
        tree.cancel_edit(name);
        assert_eq!(tree.get(name).unwrap().display_value(), "left");
        assert!(tree.commit_edit(name, "x").is_err());
    }

    #[test]
    fn test_only_one_leaf_edits_at_a_time() {
        let table = ActionRoutineTable::new();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let mut tree = binder.bind_tree(&json!([1, 2]), NodePath::root(), KeyOrder::Sorted).unwrap();
        tree.edit_scalar(1).unwrap();
        tree.edit_scalar(2).unwrap();
        assert_eq!(tree.editing(), Some(2));
        assert!(!tree.get(1).unwrap().is_editing());
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("42"), json!(42));
        assert_eq!(parse_scalar(" true "), json!(true));
        assert_eq!(parse_scalar("null"), Value::Null);
        assert_eq!(parse_scalar("left"), json!("left"));
        assert_eq!(parse_scalar("[1]"), json!("[1]"));
    }

    #[test]
    fn test_sidebar_entries_respect_exclusions() {
        let table = ActionRoutineTable::ball_machine_defaults();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!({"general": {}, "balldrivers": 2, "shot_cycle": {}});
        let entries = binder.sidebar_entries(&doc, &NodePath::from_base("system"), &["balldrivers".to_string()]);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["general", "shot_cycle"]);
        assert_eq!(entries[0].path.concrete.as_str(), "/system/general");
    }

    #[test]
    fn test_sidebar_entries_for_component_array() {
        let table = ActionRoutineTable::ball_machine_defaults();
        let binder = ConfigTreeBinder::new(&table, DEFAULT_MAX_DEPTH);
        let doc = json!([{"speed": 1}, {"speed": 2}]);
        let entries = binder.sidebar_entries(&doc, &NodePath::from_base("ballfeeders"), &[]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].key, "1");
        assert_eq!(entries[1].actions[0].url(""), "/ballfeeders/1/dispense");
        assert_eq!(child_value(&doc, "1"), Some(&json!({"speed": 2})));
        assert_eq!(child_value(&doc, "x"), None);
    }
}
