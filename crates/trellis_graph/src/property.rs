// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node properties.
//!
//! A [`Property`] is a thin accessor for one named attribute of a node. It
//! never owns the node: attached properties hold a weak graph handle plus the
//! node id and resolve the node again on every access, detached properties
//! keep their value locally.
//!
//! The set of property variants is closed. [`PropertyFactory`] maps the
//! string tags used in schemas and config to a [`PropertyType`], and
//! [`PropertyKind::new`] is the single place that builds the default
//! variant state for a type.

use crate::commands::PropertyChangedCmd;
use crate::error::{GraphError, Result};
use crate::graph::GraphHandle;
use crate::node::{Node, NodeId, NodeState};
use crate::value::{to_hex, PropertyValue};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

/// Property type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// Not shown in property editors
    Hidden,
    /// Read-only label
    Label,
    /// Editable text
    Text,
    /// Choice from a list of items
    List,
    /// Boolean toggle
    Checkbox,
    /// RGBA color
    Color,
    /// Integer slider
    Slider,
    /// Float slider
    FloatSlider,
}

impl PropertyType {
    /// Every property type
    pub const ALL: [PropertyType; 8] = [
        Self::Hidden,
        Self::Label,
        Self::Text,
        Self::List,
        Self::Checkbox,
        Self::Color,
        Self::Slider,
        Self::FloatSlider,
    ];

    /// The string tag of this type
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Label => "label",
            Self::Text => "text",
            Self::List => "list",
            Self::Checkbox => "checkbox",
            Self::Color => "color",
            Self::Slider => "slider",
            Self::FloatSlider => "float_slider",
        }
    }

    /// Look up a type by its string tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Infer the type from the shape of a value.
    ///
    /// Null has no natural editor and yields `None`.
    pub fn infer(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Str(_) => Some(Self::Label),
            PropertyValue::Bool(_) => Some(Self::Checkbox),
            PropertyValue::Int(_) => Some(Self::Slider),
            PropertyValue::Float(_) => Some(Self::FloatSlider),
            PropertyValue::List(_) | PropertyValue::Vec2(_) => Some(Self::List),
            PropertyValue::Color(_) => Some(Self::Color),
            PropertyValue::Null => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Schema entry for a property: its type plus variant-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyKind {
    /// Hidden property
    Hidden,
    /// Label property
    Label,
    /// Text property
    Text,
    /// List property
    List {
        /// Selectable items
        items: Vec<PropertyValue>,
    },
    /// Checkbox property
    Checkbox,
    /// Color property
    Color,
    /// Integer slider
    Slider {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Float slider
    FloatSlider {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}

impl PropertyKind {
    /// Default variant state for a type
    pub fn new(property_type: PropertyType) -> Self {
        match property_type {
            PropertyType::Hidden => Self::Hidden,
            PropertyType::Label => Self::Label,
            PropertyType::Text => Self::Text,
            PropertyType::List => Self::List { items: Vec::new() },
            PropertyType::Checkbox => Self::Checkbox,
            PropertyType::Color => Self::Color,
            PropertyType::Slider => Self::Slider { min: 0.0, max: 1.0 },
            PropertyType::FloatSlider => Self::FloatSlider { min: 0.0, max: 1.0 },
        }
    }

    /// The type tag of this kind
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Hidden => PropertyType::Hidden,
            Self::Label => PropertyType::Label,
            Self::Text => PropertyType::Text,
            Self::List { .. } => PropertyType::List,
            Self::Checkbox => PropertyType::Checkbox,
            Self::Color => PropertyType::Color,
            Self::Slider { .. } => PropertyType::Slider,
            Self::FloatSlider { .. } => PropertyType::FloatSlider,
        }
    }

    /// Normalize a value for this kind
    fn coerce(&self, name: &str, value: PropertyValue) -> Result<PropertyValue> {
        match self {
            Self::Color => value
                .as_color()
                .map(PropertyValue::Color)
                .ok_or_else(|| GraphError::invalid_value(name, "#rrggbb or RGB(A) color")),
            Self::FloatSlider { .. } => match value {
                PropertyValue::Int(i) => Ok(PropertyValue::Float(i as f64)),
                other => Ok(other),
            },
            _ => Ok(value),
        }
    }
}

/// Options for [`Node::create_property`](crate::Node::create_property)
#[derive(Debug, Clone, Default)]
pub struct PropertyOptions {
    /// Explicit type; inferred from the value when `None`
    pub property_type: Option<PropertyType>,
    /// Items for list properties
    pub items: Option<Vec<PropertyValue>>,
    /// Lower bound for sliders
    pub min: Option<f64>,
    /// Upper bound for sliders
    pub max: Option<f64>,
}

impl PropertyOptions {
    /// Options with an explicit type
    pub fn of_type(property_type: PropertyType) -> Self {
        Self {
            property_type: Some(property_type),
            ..Default::default()
        }
    }

    /// Set the list items
    pub fn with_items(mut self, items: Vec<PropertyValue>) -> Self {
        self.items = Some(items);
        self
    }

    /// Set the slider range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Build the schema entry for a new property holding `value`.
    ///
    /// Slider bounds are widened so they never exclude the initial value.
    pub(crate) fn resolve_kind(&self, value: &PropertyValue) -> Result<PropertyKind> {
        let property_type = self
            .property_type
            .or_else(|| PropertyType::infer(value))
            .ok_or_else(|| GraphError::Construction(value.kind_name().to_string()))?;

        let mut kind = PropertyKind::new(property_type);
        match &mut kind {
            PropertyKind::List { items } => {
                *items = self.items.clone().unwrap_or_default();
            }
            PropertyKind::Slider { min, max } | PropertyKind::FloatSlider { min, max } => {
                *min = self.min.unwrap_or(*min);
                *max = self.max.unwrap_or(*max);
                if let Some(current) = value.as_f64() {
                    *min = min.min(current);
                    *max = max.max(current);
                }
            }
            _ => {}
        }
        Ok(kind)
    }
}

/// Lookup table from property type tags to property variants
pub struct PropertyFactory;

impl PropertyFactory {
    /// The property type registered for a tag, if any
    pub fn get_instance(tag: &str) -> Option<PropertyType> {
        PropertyType::from_tag(tag)
    }

    /// Create a detached property from a tag
    pub fn create(tag: &str, name: impl Into<String>) -> Result<Property> {
        let property_type =
            Self::get_instance(tag).ok_or_else(|| GraphError::Construction(tag.to_string()))?;
        Ok(Property::new(name, PropertyKind::new(property_type)))
    }
}

#[derive(Debug, Clone)]
enum Binding {
    /// Value lives in the property; optionally writes through to a detached node
    Detached {
        value: PropertyValue,
        node: Option<Weak<RefCell<NodeState>>>,
    },
    /// Value lives in the node model; every access goes through the undo stack
    Attached { graph: GraphHandle, node: NodeId },
}

/// Accessor for one named node attribute
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    binding: Binding,
}

impl Property {
    /// Create a free-standing detached property
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            binding: Binding::Detached {
                value: PropertyValue::Null,
                node: None,
            },
        }
    }

    pub(crate) fn detached_for(
        node: Weak<RefCell<NodeState>>,
        name: &str,
        kind: PropertyKind,
        value: PropertyValue,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            binding: Binding::Detached {
                value,
                node: Some(node),
            },
        }
    }

    pub(crate) fn attached(graph: GraphHandle, node: NodeId, name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            binding: Binding::Attached { graph, node },
        }
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property type tag
    pub fn property_type(&self) -> PropertyType {
        self.kind.property_type()
    }

    /// Schema entry of this property
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Whether the property resolves its node through a graph.
    ///
    /// A property taken from a detached node reports true once that node
    /// has been added to a graph.
    pub fn is_attached(&self) -> bool {
        self.owner().is_some()
    }

    /// The node this property belongs to, if it still exists
    pub fn node(&self) -> Option<Node> {
        match &self.binding {
            Binding::Detached { node, .. } => node.as_ref().and_then(Weak::upgrade).map(Node::from_state),
            Binding::Attached { graph, node } => graph.upgrade().ok()?.get_node_by_id(node),
        }
    }

    /// Graph and node id that edits must go through, if any
    fn owner(&self) -> Option<(GraphHandle, NodeId)> {
        match &self.binding {
            Binding::Attached { graph, node } => Some((graph.clone(), *node)),
            Binding::Detached { node, .. } => {
                let state = node.as_ref()?.upgrade()?;
                let state = state.borrow();
                let graph = state.graph.clone()?;
                Some((graph, state.model.id()))
            }
        }
    }

    /// Current value
    pub fn value(&self) -> Result<PropertyValue> {
        match &self.binding {
            Binding::Detached { value, node } => match node.as_ref().and_then(Weak::upgrade) {
                Some(state) => Node::from_state(state).property_value(&self.name),
                None => Ok(value.clone()),
            },
            Binding::Attached { graph, node } => {
                let graph = graph.upgrade()?;
                let target = graph
                    .get_node_by_id(node)
                    .ok_or(GraphError::NodeDeleted(*node))?;
                target.property_value(&self.name)
            }
        }
    }

    /// Set the value.
    ///
    /// Properties of a node in a graph push a [`PropertyChangedCmd`] onto
    /// the graph's undo stack; setting `name` picks a name unique within the
    /// graph. Otherwise the value is stored locally and written straight
    /// into the node it came from, if any.
    pub fn set_value(&mut self, value: impl Into<PropertyValue>) -> Result<()> {
        let value = self.kind.coerce(&self.name, value.into())?;
        if let Some((graph, node)) = self.owner() {
            return self.push_change(&graph, node, value);
        }
        if let Binding::Detached { value: local, node } = &mut self.binding {
            if let Some(state) = node.as_ref().and_then(Weak::upgrade) {
                let target = Node::from_state(state);
                if !target.has_property(&self.name) {
                    return Err(GraphError::UnknownProperty(self.name.clone()));
                }
                target.apply_property(&self.name, value.clone(), false)?;
            }
            *local = value;
        }
        Ok(())
    }

    fn push_change(&self, graph: &GraphHandle, node: NodeId, value: PropertyValue) -> Result<()> {
        let graph = graph.upgrade()?;
        let target = graph
            .get_node_by_id(&node)
            .ok_or(GraphError::NodeDeleted(node))?;
        if !target.has_property(&self.name) {
            return Err(GraphError::UnknownProperty(self.name.clone()));
        }

        let value = match (self.name.as_str(), value) {
            ("name", PropertyValue::Str(requested)) => {
                PropertyValue::Str(graph.unique_name_for(&requested, Some(node)))
            }
            (_, value) => value,
        };

        let old_value = target.property_value(&self.name)?;
        let command = PropertyChangedCmd::new(
            &target,
            &self.name,
            old_value,
            value,
            target.block_widget_signal(),
        );
        graph.push_command(Box::new(command))
    }

    /// Items of a list property
    pub fn items(&self) -> Option<&[PropertyValue]> {
        match &self.kind {
            PropertyKind::List { items } => Some(items),
            _ => None,
        }
    }

    /// Replace the items of a list property; other kinds ignore this
    pub fn set_items(&mut self, new_items: Vec<PropertyValue>) {
        if let PropertyKind::List { items } = &mut self.kind {
            *items = new_items;
        }
    }

    /// Lower bound of a slider
    pub fn min(&self) -> Option<f64> {
        match self.kind {
            PropertyKind::Slider { min, .. } | PropertyKind::FloatSlider { min, .. } => Some(min),
            _ => None,
        }
    }

    /// Set the lower bound of a slider; other kinds ignore this
    pub fn set_min(&mut self, value: f64) {
        if let PropertyKind::Slider { min, .. } | PropertyKind::FloatSlider { min, .. } =
            &mut self.kind
        {
            *min = value;
        }
    }

    /// Upper bound of a slider
    pub fn max(&self) -> Option<f64> {
        match self.kind {
            PropertyKind::Slider { max, .. } | PropertyKind::FloatSlider { max, .. } => Some(max),
            _ => None,
        }
    }

    /// Set the upper bound of a slider; other kinds ignore this
    pub fn set_max(&mut self, value: f64) {
        if let PropertyKind::Slider { max, .. } | PropertyKind::FloatSlider { max, .. } =
            &mut self.kind
        {
            *max = value;
        }
    }

    /// Color as `#rrggbb`
    pub fn color(&self) -> Result<String> {
        self.ensure_color()?;
        self.value()?
            .as_color()
            .map(to_hex)
            .ok_or_else(|| GraphError::invalid_value(&self.name, "RGBA color"))
    }

    /// Set a color from a hex string or an RGB(A) sequence
    pub fn set_color(&mut self, color: impl Into<PropertyValue>) -> Result<()> {
        self.ensure_color()?;
        self.set_value(color)
    }

    fn ensure_color(&self) -> Result<()> {
        match self.kind {
            PropertyKind::Color => Ok(()),
            _ => Err(GraphError::invalid_value(&self.name, "color property")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_lookup() {
        for property_type in PropertyType::ALL {
            assert_eq!(PropertyFactory::get_instance(property_type.tag()), Some(property_type));
        }
        assert_eq!(PropertyFactory::get_instance("dial"), None);
        assert!(matches!(
            PropertyFactory::create("dial", "gain"),
            Err(GraphError::Construction(tag)) if tag == "dial"
        ));
    }

    #[test]
    fn test_type_inference() {
        assert_eq!(PropertyType::infer(&"a".into()), Some(PropertyType::Label));
        assert_eq!(PropertyType::infer(&true.into()), Some(PropertyType::Checkbox));
        assert_eq!(PropertyType::infer(&3.into()), Some(PropertyType::Slider));
        assert_eq!(PropertyType::infer(&0.5.into()), Some(PropertyType::FloatSlider));
        assert_eq!(PropertyType::infer(&vec![1, 2, 3].into()), Some(PropertyType::List));
        assert_eq!(PropertyType::infer(&PropertyValue::Null), None);
    }

    #[test]
    fn test_slider_bounds_include_value() {
        let kind = PropertyOptions::default()
            .with_range(0.0, 5.0)
            .resolve_kind(&PropertyValue::Int(10))
            .unwrap();
        assert_eq!(kind, PropertyKind::Slider { min: 0.0, max: 10.0 });

        let kind = PropertyOptions::of_type(PropertyType::FloatSlider)
            .with_range(1.0, 2.0)
            .resolve_kind(&PropertyValue::Float(-0.5))
            .unwrap();
        assert_eq!(kind, PropertyKind::FloatSlider { min: -0.5, max: 2.0 });
    }

    #[test]
    fn test_unresolved_type_fails() {
        let result = PropertyOptions::default().resolve_kind(&PropertyValue::Null);
        assert!(matches!(result, Err(GraphError::Construction(_))));
    }

    #[test]
    fn test_detached_color_property() {
        let mut property = PropertyFactory::create("color", "tint").unwrap();
        property.set_color("#ff0000").unwrap();
        assert_eq!(property.value().unwrap(), PropertyValue::Color([255, 0, 0, 255]));
        assert_eq!(property.color().unwrap(), "#ff0000");

        property.set_color([10u8, 20, 30]).unwrap();
        assert_eq!(property.value().unwrap(), PropertyValue::Color([10, 20, 30, 255]));

        assert!(property.set_color("red").is_err());
        assert_eq!(property.value().unwrap(), PropertyValue::Color([10, 20, 30, 255]));
    }

    #[test]
    fn test_variant_accessors() {
        let mut list = PropertyFactory::create("list", "mode").unwrap();
        assert_eq!(list.items(), Some(&[][..]));
        list.set_items(vec!["a".into(), "b".into()]);
        assert_eq!(list.items().map(<[PropertyValue]>::len), Some(2));
        assert_eq!(list.min(), None);

        let mut slider = PropertyFactory::create("slider", "count").unwrap();
        slider.set_min(-3.0);
        slider.set_max(7.0);
        assert_eq!((slider.min(), slider.max()), (Some(-3.0), Some(7.0)));
        assert!(slider.color().is_err());
    }
}
