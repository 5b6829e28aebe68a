// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.
//!
//! A [`Node`] is a shared handle to one node: its [`NodeModel`], its view,
//! and, once added to a graph, a weak reference back to that graph. Nodes
//! start detached and keep their property schema locally; adding them to a
//! [`NodeGraph`] moves the schema into the graph's registry.

use crate::error::{ConnectionError, GraphError, Result, StateError};
use crate::graph::{GraphHandle, NodeGraph};
use crate::model::{NodeDict, NodeModel, STRUCTURAL_FIELDS};
use crate::port::{Port, PortDirection, PortKey, PortModel};
use crate::property::{Property, PropertyKind, PropertyOptions, PropertyType};
use crate::schema::PropertySchema;
use crate::value::PropertyValue;
use crate::view::{NodeView, ViewSettings};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Default type identifier prefix
pub const DEFAULT_IDENTIFIER: &str = "trellis.nodes";

const BACKDROP_TEXT: &str = "backdrop_text";

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    /// Namespace of the type, e.g. `trellis.nodes`
    pub identifier: String,
    /// Class name within the namespace
    pub class_name: String,
    /// Default display name of new nodes
    pub name: String,
}

impl NodeType {
    /// Create a type definition; the display name defaults to the class name
    pub fn new(identifier: impl Into<String>, class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            identifier: identifier.into(),
            name: class_name.clone(),
            class_name,
        }
    }

    /// Set the default display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fully-qualified type, `identifier.ClassName`
    pub fn type_id(&self) -> String {
        format!("{}.{}", self.identifier, self.class_name)
    }
}

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLifecycle {
    /// Not in any graph
    Detached,
    /// Owned by a graph
    Attached,
    /// Removed from a graph; must be reset before it is added again
    Removed,
}

pub(crate) struct NodeState {
    pub(crate) model: NodeModel,
    pub(crate) view: Box<dyn NodeView>,
    pub(crate) graph: Option<GraphHandle>,
    /// Schema cache, present while the node is not in a graph
    pub(crate) property_attrs: Option<PropertySchema>,
    pub(crate) lifecycle: NodeLifecycle,
}

impl NodeState {
    /// Write a value into the model, then into the view.
    ///
    /// This is the only write path for property values; undo commands and
    /// detached edits both go through it.
    pub(crate) fn apply_property(
        &mut self,
        name: &str,
        value: PropertyValue,
        block_widget_signal: bool,
    ) -> Result<()> {
        self.model.set_property(name, value.clone())?;
        if self.view.has_widget(name) {
            self.view.set_widget_value(name, &value, block_widget_signal);
        }
        if self.view.has_property(name) {
            self.view.set_property(name, &value);
        }
        tracing::trace!("Set {}.{} = {}", self.model.name, name, value);
        Ok(())
    }

    fn view_settings(&self) -> Result<ViewSettings> {
        let mut settings = match serde_json::to_value(self.model.to_dict())? {
            serde_json::Value::Object(map) => map,
            _ => ViewSettings::new(),
        };
        settings.insert("id".to_string(), self.model.id().to_string().into());
        if let Some(custom) = settings.remove("custom") {
            settings.insert("widgets".to_string(), custom);
        }
        Ok(settings)
    }
}

/// A node instance.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeState>>);

impl Node {
    /// Create a detached node from a type definition
    pub fn new(node_type: &NodeType, view: impl NodeView + 'static) -> Self {
        let model = NodeModel::new(node_type.type_id(), node_type.name.clone());
        Self::with_model(model, Box::new(view))
    }

    /// Create a backdrop node: a resizable frame with a text note
    pub fn backdrop(view: impl NodeView + 'static) -> Result<Self> {
        let node_type = NodeType::new(DEFAULT_IDENTIFIER, "Backdrop");
        let mut model = NodeModel::new(node_type.type_id(), node_type.name);
        model.color = [5, 129, 138, 255];
        let node = Self::with_model(model, Box::new(view));
        node.create_property(
            BACKDROP_TEXT,
            "",
            PropertyOptions::of_type(PropertyType::Text),
        )?;
        Ok(node)
    }

    fn with_model(model: NodeModel, mut view: Box<dyn NodeView>) -> Self {
        view.set_id(model.id());
        for (name, value) in model.properties() {
            view.set_property(&name, &value);
        }
        Self(Rc::new(RefCell::new(NodeState {
            model,
            view,
            graph: None,
            property_attrs: Some(PropertySchema::builtin()),
            lifecycle: NodeLifecycle::Detached,
        })))
    }

    pub(crate) fn from_state(state: Rc<RefCell<NodeState>>) -> Self {
        Self(state)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<NodeState>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn state(&self) -> Ref<'_, NodeState> {
        self.0.borrow()
    }

    pub(crate) fn apply_property(
        &self,
        name: &str,
        value: PropertyValue,
        block_widget_signal: bool,
    ) -> Result<()> {
        self.0
            .borrow_mut()
            .apply_property(name, value, block_widget_signal)
    }

    /// Unique node id
    pub fn id(&self) -> NodeId {
        self.state().model.id()
    }

    /// Fully-qualified node type
    pub fn node_type(&self) -> String {
        self.state().model.node_type().to_string()
    }

    /// Lifecycle state
    pub fn lifecycle(&self) -> NodeLifecycle {
        self.state().lifecycle
    }

    /// The graph this node belongs to, if it is attached and the graph still exists
    pub fn graph(&self) -> Option<NodeGraph> {
        self.attached_graph().ok().flatten()
    }

    /// The owning graph; fails if the node was attached to a graph that no longer exists
    pub(crate) fn attached_graph(&self) -> Result<Option<NodeGraph>> {
        let handle = self.state().graph.clone();
        handle.as_ref().map(GraphHandle::upgrade).transpose()
    }

    /// Move to Attached; hands back the local schema cache for the graph registry
    pub(crate) fn attach(&self, graph: GraphHandle) -> PropertySchema {
        let mut state = self.0.borrow_mut();
        state.graph = Some(graph);
        state.lifecycle = NodeLifecycle::Attached;
        state
            .property_attrs
            .take()
            .unwrap_or_else(PropertySchema::builtin)
    }

    /// Move to Removed, keeping a snapshot of the node's schema; ports are dropped
    pub(crate) fn detach(&self, schema: PropertySchema) {
        let mut state = self.0.borrow_mut();
        state.model.clear_ports();
        state.graph = None;
        state.lifecycle = NodeLifecycle::Removed;
        state.property_attrs = Some(schema);
    }

    /// Snapshot of the node model
    pub fn model(&self) -> NodeModel {
        self.state().model.clone()
    }

    /// Run a closure against the node's view
    pub fn with_view<R>(&self, f: impl FnOnce(&dyn NodeView) -> R) -> R {
        f(self.state().view.as_ref())
    }

    /// Whether embedded widget signals are blocked while commands write values
    pub fn block_widget_signal(&self) -> bool {
        self.state().model.block_widget_signal
    }

    /// Give the node a fresh id so it can be added to a graph again.
    ///
    /// A node whose graph was dropped without removing it counts as
    /// detached here; its links are cleared and the schema of its custom
    /// properties is inferred from their values.
    pub fn reset(&self) -> Result<NodeId> {
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        if state.lifecycle == NodeLifecycle::Attached {
            let live = state.graph.as_ref().is_some_and(|graph| graph.upgrade().is_ok());
            if live {
                return Err(StateError::AlreadyAttached(state.model.id()).into());
            }
            let mut schema = PropertySchema::builtin();
            for (name, value) in state.model.custom_properties() {
                let kind = PropertyOptions::default()
                    .resolve_kind(value)
                    .unwrap_or_else(|_| PropertyKind::new(PropertyType::Hidden));
                schema.insert(name, kind);
            }
            state.property_attrs = Some(schema);
        }
        state.model.clear_links();
        let id = state.model.reassign_id();
        state.view.set_id(id);
        state.graph = None;
        state.lifecycle = NodeLifecycle::Detached;
        state.property_attrs.get_or_insert_with(PropertySchema::builtin);
        tracing::debug!("Reset node {} ({})", state.model.name, id);
        Ok(id)
    }

    // ---- properties -------------------------------------------------------

    /// Create a new custom property.
    ///
    /// The type is inferred from the value when `options` has none. Fails
    /// without touching the node if the name is taken or no property type
    /// fits.
    pub fn create_property(
        &self,
        name: &str,
        value: impl Into<PropertyValue>,
        options: PropertyOptions,
    ) -> Result<()> {
        let value = value.into();
        let kind = options.resolve_kind(&value)?;
        let mut property = Property::new(name, kind);
        property.set_value(value)?;
        self.add_property(&property)
    }

    /// Add a custom property from a constructed [`Property`].
    ///
    /// The value goes into the model, the schema into the node's cache or,
    /// once attached, the graph registry.
    pub fn add_property(&self, property: &Property) -> Result<()> {
        let name = property.name();
        let value = property.value()?;
        let (graph, node_type) = {
            let state = self.state();
            if state.model.has_property(name) {
                return Err(GraphError::DuplicateProperty(name.to_string()));
            }
            (state.graph.clone(), state.model.node_type().to_string())
        };
        let graph = graph.as_ref().map(GraphHandle::upgrade).transpose()?;

        {
            let mut state = self.0.borrow_mut();
            state.model.add_custom_property(name, value)?;
            if graph.is_none() {
                state
                    .property_attrs
                    .get_or_insert_with(PropertySchema::builtin)
                    .insert(name, property.kind().clone());
            }
        }
        if let Some(graph) = graph {
            graph.register_property(&node_type, name, property.kind().clone());
        }
        Ok(())
    }

    /// Whether `name` is a built-in or custom property
    pub fn has_property(&self, name: &str) -> bool {
        self.state().model.has_property(name)
    }

    /// Accessor for one property
    pub fn get_property(&self, name: &str) -> Result<Property> {
        if !self.has_property(name) {
            return Err(GraphError::UnknownProperty(name.to_string()));
        }
        let kind = self.schema_kind(name)?;
        let state = self.state();
        Ok(match &state.graph {
            Some(graph) => Property::attached(graph.clone(), state.model.id(), name, kind),
            None => Property::detached_for(
                self.downgrade(),
                name,
                kind,
                state.model.get_property(name).unwrap_or_default(),
            ),
        })
    }

    /// Current value of one property
    pub fn property_value(&self, name: &str) -> Result<PropertyValue> {
        self.state()
            .model
            .get_property(name)
            .ok_or_else(|| GraphError::UnknownProperty(name.to_string()))
    }

    /// Set one property; undoable while the node is in a graph
    pub fn set_property(&self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.get_property(name)?.set_value(value)
    }

    /// One accessor per built-in and custom property
    pub fn properties(&self) -> Result<Vec<Property>> {
        let mut names: Vec<String> = self.state().model.properties().into_keys().collect();
        names.extend(self.state().model.custom_properties().keys().cloned());
        names.iter().map(|name| self.get_property(name)).collect()
    }

    fn schema_kind(&self, name: &str) -> Result<PropertyKind> {
        let (graph, node_type, cached) = {
            let state = self.state();
            (
                state.graph.clone(),
                state.model.node_type().to_string(),
                state.property_attrs.as_ref().and_then(|s| s.get(name).cloned()),
            )
        };
        let kind = match graph {
            Some(handle) => handle.upgrade()?.schema_kind(&node_type, name),
            None => cached,
        };
        kind.ok_or_else(|| GraphError::UnknownProperty(name.to_string()))
    }

    // ---- model/view sync --------------------------------------------------

    /// Copy the view's current values into the model
    pub fn update_model(&self) -> Result<()> {
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        for (name, value) in state.view.properties() {
            if STRUCTURAL_FIELDS.contains(&name.as_str()) {
                continue;
            }
            if state.model.has_property(&name) {
                state.model.set_property(&name, value)?;
            }
        }
        for (name, value) in state.view.widgets() {
            if state.model.custom_properties().contains_key(&name) {
                state.model.set_property(&name, value)?;
            }
        }
        Ok(())
    }

    /// Push the whole model into the view in one bulk load
    pub fn update(&self) -> Result<()> {
        let mut state = self.0.borrow_mut();
        let settings = state.view_settings()?;
        state.view.from_dict(&settings);
        Ok(())
    }

    /// Serialized form keyed by node id
    pub fn serialize(&self) -> IndexMap<NodeId, NodeDict> {
        self.state().model.serialize()
    }

    /// Serialized form as JSON
    pub fn serial(&self) -> Result<String> {
        self.state().model.serial()
    }

    // ---- built-in accessors -----------------------------------------------

    /// Display name
    pub fn name(&self) -> String {
        self.state().model.name.clone()
    }

    /// Rename the node; attached nodes get a name unique in the graph
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set_property("name", name)
    }

    /// Fill color as (r, g, b)
    pub fn color(&self) -> [u8; 3] {
        let [r, g, b, _] = self.state().model.color;
        [r, g, b]
    }

    /// Set the fill color; alpha is opaque
    pub fn set_color(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.set_property("color", PropertyValue::Color([r, g, b, 255]))
    }

    /// Whether the node is disabled
    pub fn disabled(&self) -> bool {
        self.state().model.disabled
    }

    /// Disable or enable the node
    pub fn set_disabled(&self, disabled: bool) -> Result<()> {
        self.set_property("disabled", disabled)
    }

    /// Whether the node is selected
    pub fn selected(&self) -> bool {
        self.state().model.selected
    }

    /// Select or deselect the node
    pub fn set_selected(&self, selected: bool) -> Result<()> {
        self.set_property("selected", selected)
    }

    /// Icon path
    pub fn icon(&self) -> Option<String> {
        self.state().model.icon.clone()
    }

    /// Set the icon path; an empty path is ignored
    pub fn set_icon(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Ok(());
        }
        self.set_property("icon", path)
    }

    // ---- position and size ------------------------------------------------

    /// Position; the view's live position wins over the cached one
    pub fn pos(&self) -> [f64; 2] {
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        if let Some(view_pos) = state.view.pos() {
            if view_pos != state.model.pos {
                state.model.pos = view_pos;
            }
        }
        state.model.pos
    }

    /// Horizontal position
    pub fn x_pos(&self) -> f64 {
        self.pos()[0]
    }

    /// Vertical position
    pub fn y_pos(&self) -> f64 {
        self.pos()[1]
    }

    /// Move the node
    pub fn set_pos(&self, x: f64, y: f64) -> Result<()> {
        self.set_property("pos", [x, y])
    }

    /// Move the node horizontally
    pub fn set_x_pos(&self, x: f64) -> Result<()> {
        let [_, y] = self.pos();
        self.set_pos(x, y)
    }

    /// Move the node vertically
    pub fn set_y_pos(&self, y: f64) -> Result<()> {
        let [x, _] = self.pos();
        self.set_pos(x, y)
    }

    /// Size as (width, height), refreshed from the view
    pub fn size(&self) -> (f64, f64) {
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        let view = state.view.properties();
        if let Some(width) = view.get("width").and_then(PropertyValue::as_f64) {
            state.model.width = width;
        }
        if let Some(height) = view.get("height").and_then(PropertyValue::as_f64) {
            state.model.height = height;
        }
        (state.model.width, state.model.height)
    }

    /// Resize the node; in a graph, width and height change as one undo step
    pub fn set_size(&self, width: f64, height: f64) -> Result<()> {
        let Some(graph) = self.attached_graph()? else {
            self.set_property("width", width)?;
            return self.set_property("height", height);
        };
        graph.begin_undo("resize");
        let result = self
            .set_property("width", width)
            .and_then(|()| self.set_property("height", height));
        graph.end_undo()?;
        result
    }

    /// Backdrop note; fails on nodes without one
    pub fn text(&self) -> Result<String> {
        let value = self.property_value(BACKDROP_TEXT)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Set the backdrop note
    pub fn set_text(&self, text: &str) -> Result<()> {
        self.set_property(BACKDROP_TEXT, text)
    }

    // ---- ports ------------------------------------------------------------

    /// Add an input port
    pub fn add_input(&self, name: &str, multi_input: bool, display_name: bool) -> Result<Port> {
        self.add_port(PortModel::new(PortDirection::In, name, display_name, multi_input))
    }

    /// Add an output port
    pub fn add_output(&self, name: &str, multi_output: bool, display_name: bool) -> Result<Port> {
        self.add_port(PortModel::new(PortDirection::Out, name, display_name, multi_output))
    }

    fn add_port(&self, port: PortModel) -> Result<Port> {
        let (direction, name) = (port.direction, port.name.clone());
        let (multi, display) = (port.multi_connection, port.display_name);
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        if state.lifecycle == NodeLifecycle::Removed {
            return Err(GraphError::NodeDeleted(state.model.id()));
        }
        state.model.add_port(port)?;
        match direction {
            PortDirection::In => state.view.add_input(&name, multi, display),
            PortDirection::Out => state.view.add_output(&name, multi, display),
        }
        Ok(Port::new(self.downgrade(), direction, name))
    }

    pub(crate) fn port_model(&self, direction: PortDirection, name: &str) -> Option<PortModel> {
        self.state().model.port(direction, name).cloned()
    }

    pub(crate) fn with_port_mut<R>(
        &self,
        direction: PortDirection,
        name: &str,
        f: impl FnOnce(&mut PortModel) -> R,
    ) -> Result<R> {
        let mut state = self.0.borrow_mut();
        let port = state
            .model
            .port_mut(direction, name)
            .ok_or_else(|| ConnectionError::PortNotFound(name.to_string()))?;
        Ok(f(port))
    }

    /// Every link of every port, as (own port, linked port)
    pub(crate) fn links(&self) -> Vec<(PortKey, PortKey)> {
        let state = self.state();
        let id = state.model.id();
        state
            .model
            .inputs()
            .values()
            .chain(state.model.outputs().values())
            .flat_map(|port| {
                port.links().map(move |(node, name)| {
                    (
                        PortKey::new(id, port.direction, &port.name),
                        PortKey::new(node, port.direction.opposite(), name),
                    )
                })
            })
            .collect()
    }

    fn ports(&self, direction: PortDirection) -> IndexMap<String, Port> {
        let state = self.state();
        let models = match direction {
            PortDirection::In => state.model.inputs(),
            PortDirection::Out => state.model.outputs(),
        };
        models
            .keys()
            .map(|name| (name.clone(), Port::new(self.downgrade(), direction, name)))
            .collect()
    }

    /// Input ports by name, in order
    pub fn inputs(&self) -> IndexMap<String, Port> {
        self.ports(PortDirection::In)
    }

    /// Output ports by name, in order
    pub fn outputs(&self) -> IndexMap<String, Port> {
        self.ports(PortDirection::Out)
    }

    /// Input port by index
    pub fn input(&self, index: usize) -> Option<Port> {
        self.inputs().swap_remove_index(index).map(|(_, port)| port)
    }

    /// Output port by index
    pub fn output(&self, index: usize) -> Option<Port> {
        self.outputs().swap_remove_index(index).map(|(_, port)| port)
    }

    /// Connect the input at `index` to `port`
    pub fn set_input(&self, index: usize, port: &Port) -> Result<()> {
        self.input(index)
            .ok_or_else(|| ConnectionError::PortNotFound(format!("input #{index}")))?
            .connect_to(port)
    }

    /// Connect the output at `index` to `port`
    pub fn set_output(&self, index: usize, port: &Port) -> Result<()> {
        self.output(index)
            .ok_or_else(|| ConnectionError::PortNotFound(format!("output #{index}")))?
            .connect_to(port)
    }

    // ---- embedded widgets -------------------------------------------------

    /// Embed a combo box backed by a list property
    pub fn add_combo_menu(&self, name: &str, label: &str, items: &[String]) -> Result<()> {
        let selected = items.first().cloned().unwrap_or_default();
        let options = PropertyOptions::of_type(PropertyType::List)
            .with_items(items.iter().map(|item| item.as_str().into()).collect());
        self.create_property(name, selected, options)?;
        self.0.borrow_mut().view.add_combo_menu(name, label, items);
        Ok(())
    }

    /// Embed a line edit backed by a text property
    pub fn add_text_input(&self, name: &str, label: &str, text: &str) -> Result<()> {
        self.create_property(name, text, PropertyOptions::of_type(PropertyType::Text))?;
        self.0.borrow_mut().view.add_text_input(name, label, text);
        Ok(())
    }

    /// Embed a checkbox backed by a checkbox property
    pub fn add_checkbox(&self, name: &str, label: &str, text: &str, state: bool) -> Result<()> {
        self.create_property(name, state, PropertyOptions::of_type(PropertyType::Checkbox))?;
        self.0
            .borrow_mut()
            .view
            .add_checkbox(name, label, text, state);
        Ok(())
    }

    /// Embedded widget values
    pub fn widgets(&self) -> IndexMap<String, PropertyValue> {
        self.state().view.widgets()
    }

    /// Receive a widget's change signal; writes the model directly
    pub fn on_widget_changed(&self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let mut state = self.0.try_borrow_mut().map_err(|_| StateError::Busy)?;
        state.model.set_property(name, value.into())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.id() == other.id()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(state) => f
                .debug_struct("Node")
                .field("id", &state.model.id())
                .field("type", &state.model.node_type())
                .field("name", &state.model.name)
                .field("lifecycle", &state.lifecycle)
                .finish(),
            Err(_) => f.debug_struct("Node").finish_non_exhaustive(),
        }
    }
}
