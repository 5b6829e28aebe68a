// SPDX-License-Identifier: MIT OR Apache-2.0
//! View contract between nodes and whatever draws them.
//!
//! The graph model never renders anything. A node owns a boxed
//! [`NodeView`] and pushes values into it; the view reports user edits back
//! through [`Node::on_widget_changed`](crate::Node::on_widget_changed) and
//! [`Node::update_model`](crate::Node::update_model).

use crate::node::NodeId;
use crate::value::PropertyValue;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Settings map handed to [`NodeView::from_dict`]
pub type ViewSettings = serde_json::Map<String, serde_json::Value>;

/// Rendering side of a node
pub trait NodeView {
    /// Bind the view to a node id
    fn set_id(&mut self, id: NodeId);

    /// Current values of the view's own fields
    fn properties(&self) -> IndexMap<String, PropertyValue>;

    /// Whether the view has a field called `name`
    fn has_property(&self, name: &str) -> bool {
        self.properties().contains_key(name)
    }

    /// Set one view field
    fn set_property(&mut self, name: &str, value: &PropertyValue);

    /// Current values of the embedded widgets
    fn widgets(&self) -> IndexMap<String, PropertyValue>;

    /// Whether an embedded widget called `name` exists
    fn has_widget(&self, name: &str) -> bool {
        self.widgets().contains_key(name)
    }

    /// Set an embedded widget's value, optionally without emitting its change signal.
    ///
    /// Called while the node is borrowed for the write. Change signals must
    /// be queued and delivered to
    /// [`Node::on_widget_changed`](crate::Node::on_widget_changed) after this
    /// returns; a synchronous delivery is refused with
    /// [`StateError::Busy`](crate::StateError::Busy).
    fn set_widget_value(&mut self, name: &str, value: &PropertyValue, block_signal: bool);

    /// Live position, if the view is placed
    fn pos(&self) -> Option<[f64; 2]>;

    /// Bulk load from serialized settings without emitting change signals
    fn from_dict(&mut self, settings: &ViewSettings);

    /// Create the view element for an input port
    fn add_input(&mut self, name: &str, multi_connection: bool, display_name: bool);

    /// Create the view element for an output port
    fn add_output(&mut self, name: &str, multi_connection: bool, display_name: bool);

    /// Embed a combo box
    fn add_combo_menu(&mut self, name: &str, label: &str, items: &[String]);

    /// Embed a line edit
    fn add_text_input(&mut self, name: &str, label: &str, text: &str);

    /// Embed a checkbox
    fn add_checkbox(&mut self, name: &str, label: &str, text: &str, state: bool);
}

/// Kind of embedded widget
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    /// Combo box with its items
    ComboMenu(Vec<String>),
    /// Line edit
    TextInput,
    /// Checkbox with its text
    Checkbox(String),
}

/// Embedded widget record
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    /// Widget kind
    pub kind: WidgetKind,
    /// Label shown next to the widget
    pub label: String,
    /// Current value
    pub value: PropertyValue,
}

#[derive(Debug, Default)]
struct HeadlessState {
    id: Option<NodeId>,
    properties: IndexMap<String, PropertyValue>,
    widgets: IndexMap<String, Widget>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    signals: Vec<(String, PropertyValue)>,
    loads: usize,
}

/// In-memory view.
///
/// Clones share state, so a caller can keep a clone to inspect or drive the
/// view after handing it to a node.
#[derive(Debug, Clone, Default)]
pub struct HeadlessView {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessView {
    /// Create an empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound node id
    pub fn id(&self) -> Option<NodeId> {
        self.state.borrow().id
    }

    /// Value of one view field
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.state.borrow().properties.get(name).cloned()
    }

    /// Embedded widget by name
    pub fn widget(&self, name: &str) -> Option<Widget> {
        self.state.borrow().widgets.get(name).cloned()
    }

    /// Input port names in creation order
    pub fn input_names(&self) -> Vec<String> {
        self.state.borrow().inputs.clone()
    }

    /// Output port names in creation order
    pub fn output_names(&self) -> Vec<String> {
        self.state.borrow().outputs.clone()
    }

    /// Widget change signals emitted so far
    pub fn emitted_signals(&self) -> Vec<(String, PropertyValue)> {
        self.state.borrow().signals.clone()
    }

    /// Number of bulk loads through [`NodeView::from_dict`]
    pub fn load_count(&self) -> usize {
        self.state.borrow().loads
    }

    /// Simulate the user dragging the node
    pub fn move_to(&self, x: f64, y: f64) {
        self.edit_property("pos", [x, y].into());
    }

    /// Simulate a user edit of a view field
    pub fn edit_property(&self, name: &str, value: PropertyValue) {
        self.state
            .borrow_mut()
            .properties
            .insert(name.to_string(), value);
    }

    /// Simulate a user edit of an embedded widget; emits its change signal
    pub fn edit_widget(&self, name: &str, value: PropertyValue) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(widget) = state.widgets.get_mut(name) else {
            return false;
        };
        widget.value = value.clone();
        state.signals.push((name.to_string(), value));
        true
    }

    fn add_widget(&mut self, name: &str, label: &str, kind: WidgetKind, value: PropertyValue) {
        self.state.borrow_mut().widgets.insert(
            name.to_string(),
            Widget {
                kind,
                label: label.to_string(),
                value,
            },
        );
    }
}

impl NodeView for HeadlessView {
    fn set_id(&mut self, id: NodeId) {
        self.state.borrow_mut().id = Some(id);
    }

    fn properties(&self) -> IndexMap<String, PropertyValue> {
        self.state.borrow().properties.clone()
    }

    fn has_property(&self, name: &str) -> bool {
        self.state.borrow().properties.contains_key(name)
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) {
        self.edit_property(name, value.clone());
    }

    fn widgets(&self) -> IndexMap<String, PropertyValue> {
        self.state
            .borrow()
            .widgets
            .iter()
            .map(|(name, widget)| (name.clone(), widget.value.clone()))
            .collect()
    }

    fn has_widget(&self, name: &str) -> bool {
        self.state.borrow().widgets.contains_key(name)
    }

    fn set_widget_value(&mut self, name: &str, value: &PropertyValue, block_signal: bool) {
        let mut state = self.state.borrow_mut();
        let Some(widget) = state.widgets.get_mut(name) else {
            return;
        };
        widget.value = value.clone();
        if !block_signal {
            state.signals.push((name.to_string(), value.clone()));
        }
    }

    fn pos(&self) -> Option<[f64; 2]> {
        self.state
            .borrow()
            .properties
            .get("pos")
            .and_then(PropertyValue::as_vec2)
    }

    fn from_dict(&mut self, settings: &ViewSettings) {
        let mut state = self.state.borrow_mut();
        state.loads += 1;
        for (key, json) in settings {
            match key.as_str() {
                "id" | "type" | "inputs" | "outputs" => {}
                "widgets" => {
                    let Some(values) = json.as_object() else {
                        continue;
                    };
                    for (name, json) in values {
                        let value = serde_json::from_value::<PropertyValue>(json.clone());
                        if let (Some(widget), Ok(value)) = (state.widgets.get_mut(name), value) {
                            widget.value = value;
                        }
                    }
                }
                _ => match serde_json::from_value::<PropertyValue>(json.clone()) {
                    Ok(value) => {
                        state.properties.insert(key.clone(), value);
                    }
                    Err(e) => tracing::warn!("Ignoring view setting {key:?}: {e}"),
                },
            }
        }
    }

    fn add_input(&mut self, name: &str, _multi_connection: bool, _display_name: bool) {
        self.state.borrow_mut().inputs.push(name.to_string());
    }

    fn add_output(&mut self, name: &str, _multi_connection: bool, _display_name: bool) {
        self.state.borrow_mut().outputs.push(name.to_string());
    }

    fn add_combo_menu(&mut self, name: &str, label: &str, items: &[String]) {
        let value = items.first().map_or(PropertyValue::from(""), |i| i.as_str().into());
        self.add_widget(name, label, WidgetKind::ComboMenu(items.to_vec()), value);
    }

    fn add_text_input(&mut self, name: &str, label: &str, text: &str) {
        self.add_widget(name, label, WidgetKind::TextInput, text.into());
    }

    fn add_checkbox(&mut self, name: &str, label: &str, text: &str, state: bool) {
        self.add_widget(name, label, WidgetKind::Checkbox(text.to_string()), state.into());
    }
}
