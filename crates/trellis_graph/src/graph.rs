// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph container: owns the nodes, the property schema registry and the
//! undo stack.
//!
//! [`NodeGraph`] is a cheap shared handle. Nodes and properties only keep a
//! [`GraphHandle`], a weak reference that is upgraded on every access.

use crate::commands::UndoCommand;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result, StateError};
use crate::history::UndoStack;
use crate::model::NodeDict;
use crate::node::{Node, NodeId, NodeLifecycle};
use crate::port;
use crate::property::PropertyKind;
use crate::schema::{PropertySchema, SchemaRegistry};
use indexmap::IndexMap;
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

/// Nodes of a graph by id, in insertion order
pub type NodeMap = IndexMap<NodeId, Node>;

pub(crate) struct GraphState {
    nodes: NodeMap,
    node_properties: SchemaRegistry,
    undo_stack: UndoStack,
    acyclic: bool,
}

/// Weak reference to a graph
#[derive(Debug, Clone)]
pub struct GraphHandle(Weak<RefCell<GraphState>>);

impl GraphHandle {
    /// The graph, if it still exists
    pub fn upgrade(&self) -> Result<NodeGraph> {
        self.0
            .upgrade()
            .map(|state| NodeGraph { state })
            .ok_or_else(|| GraphError::from(StateError::GraphDropped))
    }
}

/// A node graph.
///
/// Cloning yields another handle to the same graph.
#[derive(Clone)]
pub struct NodeGraph {
    state: Rc<RefCell<GraphState>>,
}

impl NodeGraph {
    /// Create an empty graph with default settings
    pub fn new() -> Self {
        Self::with_config(&GraphConfig::default())
    }

    /// Create an empty graph
    pub fn with_config(config: &GraphConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(GraphState {
                nodes: NodeMap::new(),
                node_properties: SchemaRegistry::new(),
                undo_stack: UndoStack::with_max_depth(config.undo_limit),
                acyclic: config.acyclic,
            })),
        }
    }

    /// Weak handle to this graph
    pub fn handle(&self) -> GraphHandle {
        GraphHandle(Rc::downgrade(&self.state))
    }

    /// Whether both handles point at the same graph
    pub fn ptr_eq(&self, other: &NodeGraph) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    // ---- nodes ------------------------------------------------------------

    /// Add a detached node.
    ///
    /// The node gets a name unique in the graph and its schema cache moves
    /// into the graph registry. Nodes that are attached, or were removed and
    /// not reset, are rejected.
    pub fn add_node(&self, node: &Node) -> Result<NodeId> {
        let id = node.id();
        match node.lifecycle() {
            NodeLifecycle::Attached => return Err(StateError::AlreadyAttached(id).into()),
            NodeLifecycle::Removed => return Err(StateError::NotReset(id).into()),
            NodeLifecycle::Detached => {}
        }

        let name = self.get_unique_name(&node.name());
        node.apply_property("name", name.into(), true)?;

        let schema = node.attach(self.handle());
        let mut state = self.state.borrow_mut();
        state.node_properties.register(&node.node_type(), schema);
        state.nodes.insert(id, node.clone());
        tracing::debug!("Added node {} ({})", node.name(), id);
        Ok(id)
    }

    /// Remove a node from the graph.
    ///
    /// Links to other nodes are dropped on both sides. The node keeps a
    /// snapshot of its schema and must be reset before it is added again.
    /// Removal is not recorded on the undo stack.
    pub fn remove_node(&self, node: &Node) -> Result<()> {
        let id = node.id();
        match node.attached_graph()? {
            Some(graph) if graph.ptr_eq(self) => {}
            Some(_) => return Err(StateError::ForeignGraph.into()),
            None => return Err(StateError::Detached(id).into()),
        }

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        for (own, remote) in node.links() {
            port::unlink(&state.nodes, &own, &remote)?;
        }

        let model = node.model();
        let mut schema = state
            .node_properties
            .get(model.node_type())
            .cloned()
            .unwrap_or_else(PropertySchema::builtin);
        schema.retain(|name| model.has_property(name));

        state.nodes.shift_remove(&id);
        drop(guard);
        node.detach(schema);
        tracing::debug!("Removed node {} ({})", model.name, id);
        Ok(())
    }

    /// Node by id
    pub fn get_node_by_id(&self, id: &NodeId) -> Option<Node> {
        self.state.borrow().nodes.get(id).cloned()
    }

    /// First node with the given display name
    pub fn get_node_by_name(&self, name: &str) -> Option<Node> {
        self.state
            .borrow()
            .nodes
            .values()
            .find(|node| node.name() == name)
            .cloned()
    }

    /// All nodes in insertion order
    pub fn all_nodes(&self) -> Vec<Node> {
        self.state.borrow().nodes.values().cloned().collect()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    // ---- names ------------------------------------------------------------

    /// A node name not used by any node in the graph.
    ///
    /// Whitespace is collapsed; a taken name gets a numeric suffix, with
    /// any existing suffix replaced.
    pub fn get_unique_name(&self, name: &str) -> String {
        self.unique_name_for(name, None)
    }

    /// Like [`get_unique_name`](Self::get_unique_name), ignoring the name of `exclude`
    pub(crate) fn unique_name_for(&self, name: &str, exclude: Option<NodeId>) -> String {
        let taken: HashSet<String> = self
            .state
            .borrow()
            .nodes
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(_, node)| node.name())
            .collect();
        unique_name(name, &taken)
    }

    // ---- schema registry --------------------------------------------------

    /// Property schema registered for a node type
    pub fn node_properties(&self, node_type: &str) -> Option<PropertySchema> {
        self.state.borrow().node_properties.get(node_type).cloned()
    }

    pub(crate) fn schema_kind(&self, node_type: &str, name: &str) -> Option<PropertyKind> {
        self.state
            .borrow()
            .node_properties
            .property(node_type, name)
            .cloned()
    }

    pub(crate) fn register_property(&self, node_type: &str, name: &str, kind: PropertyKind) {
        self.state
            .borrow_mut()
            .node_properties
            .insert_property(node_type, name, kind);
    }

    // ---- undo -------------------------------------------------------------

    /// The graph's undo stack
    pub fn undo_stack(&self) -> Ref<'_, UndoStack> {
        Ref::map(self.state.borrow(), |state| &state.undo_stack)
    }

    /// Apply a command and record it on the undo stack
    pub fn push_command(&self, command: Box<dyn UndoCommand>) -> Result<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.undo_stack.push(command, &state.nodes)
    }

    /// Open an undo group; pushes until the matching [`end_undo`](Self::end_undo) form one entry
    pub fn begin_undo(&self, text: impl Into<String>) {
        self.state.borrow_mut().undo_stack.begin(text);
    }

    /// Close the innermost undo group
    pub fn end_undo(&self) -> Result<()> {
        Ok(self.state.borrow_mut().undo_stack.end()?)
    }

    /// Undo the last entry and return its text
    pub fn undo(&self) -> Result<String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.undo_stack.undo(&state.nodes)
    }

    /// Redo the last undone entry and return its text
    pub fn redo(&self) -> Result<String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.undo_stack.redo(&state.nodes)
    }

    /// Text of the next undo entry
    pub fn undo_text(&self) -> Option<String> {
        self.undo_stack().undo_text().map(str::to_string)
    }

    /// Text of the next redo entry
    pub fn redo_text(&self) -> Option<String> {
        self.undo_stack().redo_text().map(str::to_string)
    }

    /// Drop all undo history
    pub fn clear_undo_stack(&self) {
        self.state.borrow_mut().undo_stack.clear();
    }

    // ---- connections ------------------------------------------------------

    /// Whether connections that close a cycle are rejected
    pub fn is_acyclic(&self) -> bool {
        self.state.borrow().acyclic
    }

    /// Allow or reject cyclic connections
    pub fn set_acyclic(&self, acyclic: bool) {
        self.state.borrow_mut().acyclic = acyclic;
    }

    /// Whether `to` is downstream of `from` through output links
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let state = self.state.borrow();
        let mut pending = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = pending.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = state.nodes.get(&id) {
                let node_state = node.state();
                pending.extend(
                    node_state
                        .model
                        .outputs()
                        .values()
                        .flat_map(|port| port.connected_ports.keys().copied()),
                );
            }
        }
        false
    }

    // ---- serialization ----------------------------------------------------

    /// Serialized form of every node, keyed by node id
    pub fn serialize(&self) -> IndexMap<NodeId, NodeDict> {
        self.state
            .borrow()
            .nodes
            .values()
            .flat_map(Node::serialize)
            .collect()
    }

    /// Serialized graph as pretty JSON
    pub fn serial(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.serialize())?)
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if !taken.contains(&name) {
        return name;
    }
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit()).trim_end();
    let base = if base.is_empty() { name.as_str() } else { base };
    (1..=taken.len() + 1)
        .map(|i| format!("{base} {i}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{base} {}", taken.len() + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryError;
    use crate::node::NodeType;
    use crate::port::PortDirection;
    use crate::property::{PropertyOptions, PropertyType};
    use crate::value::PropertyValue;
    use crate::view::HeadlessView;
    use crate::ConnectionError;

    fn foo_type() -> NodeType {
        NodeType::new("demo.nodes", "FooNode").with_name("foo")
    }

    fn foo_node() -> Node {
        Node::new(&foo_type(), HeadlessView::new())
    }

    #[test]
    fn test_unique_name() {
        let taken: HashSet<String> = ["foo", "foo 1", "bar2"].map(String::from).into();
        assert_eq!(unique_name("baz", &taken), "baz");
        assert_eq!(unique_name("  foo  ", &taken), "foo 2");
        assert_eq!(unique_name("foo 1", &taken), "foo 2");
        assert_eq!(unique_name("bar2", &taken), "bar 1");
        assert_eq!(unique_name("7", &["7".to_string()].into()), "7 1");
    }

    #[test]
    fn test_count_scenario() {
        let graph = NodeGraph::new();
        let node = foo_node();
        node.create_property("count", 10, PropertyOptions::default()).unwrap();
        graph.add_node(&node).unwrap();

        node.set_property("count", 20).unwrap();
        assert_eq!(node.get_property("count").unwrap().value().unwrap(), 20.into());

        graph.undo().unwrap();
        assert_eq!(node.get_property("count").unwrap().value().unwrap(), 10.into());
        graph.redo().unwrap();
        assert_eq!(node.property_value("count").unwrap(), 20.into());
    }

    #[test]
    fn test_attached_property_round_trip() {
        let graph = NodeGraph::new();
        let view = HeadlessView::new();
        let node = Node::new(&foo_type(), view.clone());
        node.add_text_input("label", "Label", "a").unwrap();
        graph.add_node(&node).unwrap();

        let mut label = node.get_property("label").unwrap();
        assert!(label.is_attached());
        label.set_value("b").unwrap();
        assert_eq!(label.value().unwrap(), "b".into());
        assert_eq!(view.widget("label").map(|w| w.value), Some("b".into()));
        assert_eq!(graph.undo_text().as_deref(), Some("set label (foo)"));

        graph.undo().unwrap();
        assert_eq!(label.value().unwrap(), "a".into());
        assert_eq!(view.widget("label").map(|w| w.value), Some("a".into()));
        graph.redo().unwrap();
        assert_eq!(label.value().unwrap(), "b".into());
        assert!(view.emitted_signals().is_empty());
    }

    #[test]
    fn test_failed_set_records_nothing() {
        let graph = NodeGraph::new();
        let node = foo_node();
        graph.add_node(&node).unwrap();

        assert!(node.set_property("width", "wide").is_err());
        assert!(matches!(
            node.set_property("missing", 1),
            Err(GraphError::UnknownProperty(_))
        ));
        assert!(!graph.undo_stack().can_undo());
    }

    #[test]
    fn test_names_unique_in_graph() {
        let graph = NodeGraph::new();
        let (a, b, c) = (foo_node(), foo_node(), foo_node());
        for node in [&a, &b, &c] {
            graph.add_node(node).unwrap();
        }
        assert_eq!([a.name(), b.name(), c.name()], ["foo", "foo 1", "foo 2"]);

        b.set_name("foo").unwrap();
        assert_eq!(b.name(), "foo 1");
        a.set_name("foo").unwrap();
        assert_eq!(a.name(), "foo");

        c.set_name("bar").unwrap();
        assert_eq!(graph.get_node_by_name("bar"), Some(c.clone()));
        graph.undo().unwrap();
        assert_eq!(c.name(), "foo 2");
    }

    #[test]
    fn test_schema_moves_to_registry() {
        let graph = NodeGraph::new();
        let a = foo_node();
        a.create_property("count", 1, PropertyOptions::default().with_range(0.0, 9.0))
            .unwrap();
        graph.add_node(&a).unwrap();

        let schema = graph.node_properties("demo.nodes.FooNode").unwrap();
        assert_eq!(
            schema.get("count"),
            Some(&crate::PropertyKind::Slider { min: 0.0, max: 9.0 })
        );
        assert!(schema.contains("name"));

        a.create_property("gain", 0.5, PropertyOptions::default()).unwrap();
        let gain = a.get_property("gain").unwrap();
        assert_eq!(gain.property_type(), PropertyType::FloatSlider);
        assert!(graph.node_properties("demo.nodes.FooNode").unwrap().contains("gain"));
    }

    #[test]
    fn test_reattach_rules() {
        let graph = NodeGraph::new();
        let node = foo_node();
        graph.add_node(&node).unwrap();
        assert!(matches!(
            graph.add_node(&node),
            Err(GraphError::State(StateError::AlreadyAttached(_)))
        ));
        assert!(node.reset().is_err());

        graph.remove_node(&node).unwrap();
        assert_eq!(node.lifecycle(), NodeLifecycle::Removed);
        assert!(matches!(
            graph.add_node(&node),
            Err(GraphError::State(StateError::NotReset(_)))
        ));

        let old_id = node.id();
        node.reset().unwrap();
        assert_ne!(node.id(), old_id);
        graph.add_node(&node).unwrap();
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_removed_node_revalidates() {
        let graph = NodeGraph::new();
        let node = foo_node();
        node.create_property("count", 1, PropertyOptions::default()).unwrap();
        graph.add_node(&node).unwrap();
        let id = node.id();

        let mut count = node.get_property("count").unwrap();
        count.set_value(2).unwrap();
        graph.remove_node(&node).unwrap();

        assert!(matches!(count.value(), Err(GraphError::NodeDeleted(d)) if d == id));
        assert!(matches!(count.set_value(3), Err(GraphError::NodeDeleted(_))));
        assert!(count.node().is_none());

        assert!(matches!(graph.undo(), Err(GraphError::NodeDeleted(_))));
        assert!(graph.undo_stack().can_undo());

        let snapshot = node.get_property("count").unwrap();
        assert!(!snapshot.is_attached());
        assert_eq!(snapshot.property_type(), PropertyType::Slider);
        assert_eq!(snapshot.value().unwrap(), 2.into());
    }

    #[test]
    fn test_dropped_graph() {
        let node = foo_node();
        {
            let graph = NodeGraph::new();
            graph.add_node(&node).unwrap();
        }
        assert!(node.graph().is_none());
        assert!(matches!(
            node.set_property("name", "x"),
            Err(GraphError::State(StateError::GraphDropped))
        ));
    }

    #[test]
    fn test_single_connection_replaced() {
        let graph = NodeGraph::new();
        let (a, b, c) = (foo_node(), foo_node(), foo_node());
        for node in [&a, &b, &c] {
            graph.add_node(node).unwrap();
        }
        let a_out = a.add_output("out", true, true).unwrap();
        let b_out = b.add_output("out", true, true).unwrap();
        let c_in = c.add_input("in", false, true).unwrap();

        a_out.connect_to(&c_in).unwrap();
        b_out.connect_to(&c_in).unwrap();

        let linked = c_in.connected_ports().unwrap();
        assert_eq!(linked, vec![b_out.clone()]);
        assert!(a_out.connected_ports().unwrap().is_empty());
        assert_eq!(graph.undo_stack().undo_depth(), 2);
        assert_eq!(graph.undo_text().as_deref(), Some("connect out > in"));

        graph.undo().unwrap();
        assert_eq!(c_in.connected_ports().unwrap(), vec![a_out.clone()]);
        assert!(b_out.connected_ports().unwrap().is_empty());

        graph.redo().unwrap();
        assert_eq!(c_in.connected_ports().unwrap(), vec![b_out]);
    }

    #[test]
    fn test_connection_rules() {
        let graph = NodeGraph::new();
        let (a, b) = (foo_node(), foo_node());
        graph.add_node(&a).unwrap();
        graph.add_node(&b).unwrap();
        let a_in = a.add_input("in", true, true).unwrap();
        let a_out = a.add_output("out", true, true).unwrap();
        let b_in = b.add_input("in", true, true).unwrap();
        let b_out = b.add_output("out", true, true).unwrap();

        assert!(matches!(
            a_out.connect_to(&a_in),
            Err(GraphError::Connection(ConnectionError::SameNode))
        ));
        assert!(matches!(
            a_out.connect_to(&b_out),
            Err(GraphError::Connection(ConnectionError::IncompatibleDirection(_)))
        ));

        a_out.connect_to(&b_in).unwrap();
        a_out.connect_to(&b_in).unwrap();
        assert_eq!(graph.undo_stack().undo_depth(), 1);
        assert!(graph.reaches(a.id(), b.id()));

        assert!(matches!(
            b_out.connect_to(&a_in),
            Err(GraphError::Connection(ConnectionError::Cycle))
        ));
        graph.set_acyclic(false);
        b_out.connect_to(&a_in).unwrap();
        assert!(graph.reaches(b.id(), a.id()));

        b_out.disconnect_from(&a_in).unwrap();
        assert!(a_in.connected_ports().unwrap().is_empty());
        assert_eq!(graph.undo_text().as_deref(), Some("disconnect out > in"));
    }

    #[test]
    fn test_foreign_graph_connection() {
        let (g1, g2) = (NodeGraph::new(), NodeGraph::new());
        let (a, b) = (foo_node(), foo_node());
        g1.add_node(&a).unwrap();
        g2.add_node(&b).unwrap();
        let out = a.add_output("out", true, true).unwrap();
        let input = b.add_input("in", true, true).unwrap();
        assert!(matches!(
            out.connect_to(&input),
            Err(GraphError::State(StateError::ForeignGraph))
        ));
    }

    #[test]
    fn test_remove_node_disconnects() {
        let graph = NodeGraph::new();
        let (a, b) = (foo_node(), foo_node());
        graph.add_node(&a).unwrap();
        graph.add_node(&b).unwrap();
        let out = a.add_output("out", true, true).unwrap();
        let input = b.add_input("in", false, true).unwrap();
        out.connect_to(&input).unwrap();

        graph.remove_node(&b).unwrap();
        assert!(out.connected_ports().unwrap().is_empty());
        assert!(a.serialize()[&a.id()].outputs.is_empty());
        assert!(matches!(input.connected_ports(), Err(GraphError::NodeDeleted(_))));
        assert!(b.inputs().is_empty());
        assert!(b.model().inputs().is_empty());
        assert!(b.model().outputs().is_empty());
        assert_eq!(graph.all_nodes(), vec![a]);
    }

    #[test]
    fn test_held_property_follows_node_into_graph() {
        let graph = NodeGraph::new();
        let node = foo_node();
        node.create_property("count", 10, PropertyOptions::default()).unwrap();
        let mut held = node.get_property("count").unwrap();
        assert!(!held.is_attached());

        graph.add_node(&node).unwrap();
        assert!(held.is_attached());
        held.set_value(20).unwrap();
        assert!(graph.undo_stack().can_undo());
        assert_eq!(held.value().unwrap(), 20.into());

        graph.undo().unwrap();
        assert_eq!(held.value().unwrap(), 10.into());
        assert_eq!(node.property_value("count").unwrap(), 10.into());
    }

    #[test]
    fn test_reset_after_graph_dropped() {
        let (a, b) = (foo_node(), foo_node());
        a.create_property("count", 1, PropertyOptions::default()).unwrap();
        {
            let graph = NodeGraph::new();
            graph.add_node(&a).unwrap();
            graph.add_node(&b).unwrap();
            let out = a.add_output("out", true, true).unwrap();
            let input = b.add_input("in", false, true).unwrap();
            out.connect_to(&input).unwrap();
        }
        assert_eq!(a.lifecycle(), NodeLifecycle::Attached);

        let old_id = a.id();
        assert_ne!(a.reset().unwrap(), old_id);
        assert_eq!(a.lifecycle(), NodeLifecycle::Detached);
        assert_eq!(a.model().outputs()["out"].connection_count(), 0);
        assert_eq!(a.get_property("count").unwrap().property_type(), PropertyType::Slider);

        let graph = NodeGraph::new();
        graph.add_node(&a).unwrap();
        a.set_property("count", 5).unwrap();
        assert!(graph.undo_stack().can_undo());
        graph.undo().unwrap();
        assert_eq!(a.property_value("count").unwrap(), 1.into());
    }

    #[test]
    fn test_reset_refused_while_graph_lives() {
        let graph = NodeGraph::new();
        let node = foo_node();
        graph.add_node(&node).unwrap();
        assert!(matches!(
            node.reset(),
            Err(GraphError::State(StateError::AlreadyAttached(_)))
        ));
    }

    #[test]
    fn test_grouped_resize() {
        let graph = NodeGraph::new();
        let backdrop = Node::backdrop(HeadlessView::new()).unwrap();
        graph.add_node(&backdrop).unwrap();
        let before = backdrop.size();

        backdrop.set_size(320.0, 240.0).unwrap();
        assert_eq!(backdrop.size(), (320.0, 240.0));
        assert_eq!(graph.undo_stack().undo_depth(), 1);
        assert_eq!(graph.undo_text().as_deref(), Some("resize"));

        graph.undo().unwrap();
        assert_eq!(backdrop.size(), before);
        graph.redo().unwrap();
        assert_eq!(backdrop.size(), (320.0, 240.0));
    }

    #[test]
    fn test_undo_during_group_fails() {
        let graph = NodeGraph::new();
        let node = foo_node();
        graph.add_node(&node).unwrap();

        graph.begin_undo("move");
        node.set_pos(1.0, 2.0).unwrap();
        assert!(matches!(
            graph.undo(),
            Err(GraphError::History(HistoryError::GroupOpen))
        ));
        graph.end_undo().unwrap();
        assert!(matches!(
            graph.end_undo(),
            Err(GraphError::History(HistoryError::NoOpenGroup))
        ));

        graph.undo().unwrap();
        assert_eq!(node.pos(), [0.0, 0.0]);
        graph.clear_undo_stack();
        assert!(graph.undo_text().is_none());
    }

    #[test]
    fn test_config_limits_history() {
        let config = GraphConfig {
            undo_limit: 2,
            acyclic: true,
        };
        let graph = NodeGraph::with_config(&config);
        let node = foo_node();
        graph.add_node(&node).unwrap();
        for x in 1..=4 {
            node.set_x_pos(f64::from(x)).unwrap();
        }
        assert_eq!(graph.undo_stack().undo_depth(), 2);
        graph.undo().unwrap();
        graph.undo().unwrap();
        assert_eq!(node.x_pos(), 2.0);
        assert!(graph.undo().is_err());
    }

    #[test]
    fn test_color_storage() {
        let graph = NodeGraph::new();
        let node = foo_node();
        graph.add_node(&node).unwrap();

        node.get_property("color").unwrap().set_color("#ff0000").unwrap();
        assert_eq!(node.property_value("color").unwrap(), PropertyValue::Color([255, 0, 0, 255]));
        node.set_color(1, 2, 3).unwrap();
        assert_eq!(node.color(), [1, 2, 3]);
        graph.undo().unwrap();
        assert_eq!(node.color(), [255, 0, 0]);
    }

    #[test]
    fn test_serialize_graph() {
        let graph = NodeGraph::new();
        let (a, b) = (foo_node(), foo_node());
        graph.add_node(&a).unwrap();
        graph.add_node(&b).unwrap();
        a.add_output("out", true, true)
            .unwrap()
            .connect_to(&b.add_input("in", false, true).unwrap())
            .unwrap();

        let data = graph.serialize();
        assert_eq!(data.len(), 2);
        let links = &data[&b.id()].inputs["in"];
        assert_eq!(links.get(&a.id()), Some(&vec!["out".to_string()]));

        let json: serde_json::Value = serde_json::from_str(&graph.serial().unwrap()).unwrap();
        assert_eq!(
            json[a.id().to_string()]["outputs"]["out"][b.id().to_string()][0],
            "in"
        );
        assert_eq!(
            b.input(0).unwrap().key().unwrap(),
            port::PortKey::new(b.id(), PortDirection::In, "in")
        );
    }
}
