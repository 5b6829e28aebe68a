// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node data model and its serialized form.

use crate::error::{GraphError, Result};
use crate::node::NodeId;
use crate::port::{PortDirection, PortModel};
use crate::value::{PropertyValue, Rgba};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Names of the built-in node properties
pub const BUILTIN_PROPERTIES: [&str; 10] = [
    "icon",
    "name",
    "color",
    "border_color",
    "text_color",
    "disabled",
    "selected",
    "width",
    "height",
    "pos",
];

/// Fields synchronized through port operations rather than value copies
pub const STRUCTURAL_FIELDS: [&str; 2] = ["inputs", "outputs"];

/// Default node color
pub const DEFAULT_COLOR: Rgba = [48, 58, 69, 255];
/// Default node border color
pub const DEFAULT_BORDER_COLOR: Rgba = [85, 100, 100, 255];
/// Default node text color
pub const DEFAULT_TEXT_COLOR: Rgba = [255, 255, 255, 180];

/// Connections of every port in one direction: port name to linked ports
pub type PortConnections = IndexMap<String, IndexMap<NodeId, Vec<String>>>;

/// Authoritative data record of one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeModel {
    id: NodeId,
    node_type: String,
    /// Icon path
    pub icon: Option<String>,
    /// Display name
    pub name: String,
    /// Fill color
    pub color: Rgba,
    /// Border color
    pub border_color: Rgba,
    /// Text color
    pub text_color: Rgba,
    /// Whether the node is disabled
    pub disabled: bool,
    /// Whether the node is selected
    pub selected: bool,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Cached position; the view is authoritative
    pub pos: [f64; 2],
    /// Suppress embedded widget signals while commands write into the view
    pub block_widget_signal: bool,
    inputs: IndexMap<String, PortModel>,
    outputs: IndexMap<String, PortModel>,
    custom_properties: IndexMap<String, PropertyValue>,
}

impl NodeModel {
    /// Create a model with default built-in values
    pub fn new(node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            icon: None,
            name: name.into(),
            color: DEFAULT_COLOR,
            border_color: DEFAULT_BORDER_COLOR,
            text_color: DEFAULT_TEXT_COLOR,
            disabled: false,
            selected: false,
            width: 100.0,
            height: 80.0,
            pos: [0.0, 0.0],
            block_widget_signal: true,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            custom_properties: IndexMap::new(),
        }
    }

    /// Unique node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn reassign_id(&mut self) -> NodeId {
        self.id = NodeId::new();
        self.id
    }

    /// Fully-qualified node type
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Whether `name` is a built-in property
    pub fn is_builtin(name: &str) -> bool {
        BUILTIN_PROPERTIES.contains(&name)
    }

    /// Whether `name` exists in either namespace
    pub fn has_property(&self, name: &str) -> bool {
        Self::is_builtin(name) || self.custom_properties.contains_key(name)
    }

    /// Value of a built-in or custom property
    pub fn get_property(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "icon" => self.icon.clone().into(),
            "name" => self.name.as_str().into(),
            "color" => self.color.into(),
            "border_color" => self.border_color.into(),
            "text_color" => self.text_color.into(),
            "disabled" => self.disabled.into(),
            "selected" => self.selected.into(),
            "width" => self.width.into(),
            "height" => self.height.into(),
            "pos" => self.pos.into(),
            _ => return self.custom_properties.get(name).cloned(),
        };
        Some(value)
    }

    /// Set a built-in or custom property.
    ///
    /// Built-in values are type checked; custom values are stored as given.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        match name {
            "icon" => {
                self.icon = match value {
                    PropertyValue::Null => None,
                    PropertyValue::Str(path) => Some(path),
                    _ => return Err(GraphError::invalid_value(name, "path or null")),
                };
            }
            "name" => {
                let PropertyValue::Str(text) = value else {
                    return Err(GraphError::invalid_value(name, "string"));
                };
                self.name = text;
            }
            "color" | "border_color" | "text_color" => {
                let rgba = value
                    .as_color()
                    .ok_or_else(|| GraphError::invalid_value(name, "RGBA color"))?;
                match name {
                    "color" => self.color = rgba,
                    "border_color" => self.border_color = rgba,
                    _ => self.text_color = rgba,
                }
            }
            "disabled" | "selected" => {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| GraphError::invalid_value(name, "bool"))?;
                if name == "disabled" {
                    self.disabled = flag;
                } else {
                    self.selected = flag;
                }
            }
            "width" | "height" => {
                let size = value
                    .as_f64()
                    .ok_or_else(|| GraphError::invalid_value(name, "number"))?;
                if name == "width" {
                    self.width = size;
                } else {
                    self.height = size;
                }
            }
            "pos" => {
                self.pos = value
                    .as_vec2()
                    .ok_or_else(|| GraphError::invalid_value(name, "(x, y)"))?;
            }
            _ => {
                let slot = self
                    .custom_properties
                    .get_mut(name)
                    .ok_or_else(|| GraphError::UnknownProperty(name.to_string()))?;
                *slot = value;
            }
        }
        Ok(())
    }

    /// Built-in property values
    pub fn properties(&self) -> IndexMap<String, PropertyValue> {
        BUILTIN_PROPERTIES
            .iter()
            .filter_map(|name| Some((name.to_string(), self.get_property(name)?)))
            .collect()
    }

    /// User-defined property values
    pub fn custom_properties(&self) -> &IndexMap<String, PropertyValue> {
        &self.custom_properties
    }

    /// Add a user-defined property; the name must be free in both namespaces
    pub fn add_custom_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        if self.has_property(name) {
            return Err(GraphError::DuplicateProperty(name.to_string()));
        }
        self.custom_properties.insert(name.to_string(), value);
        Ok(())
    }

    /// Input port records in visual order
    pub fn inputs(&self) -> &IndexMap<String, PortModel> {
        &self.inputs
    }

    /// Output port records in visual order
    pub fn outputs(&self) -> &IndexMap<String, PortModel> {
        &self.outputs
    }

    /// Port record by direction and name
    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&PortModel> {
        match direction {
            PortDirection::In => self.inputs.get(name),
            PortDirection::Out => self.outputs.get(name),
        }
    }

    pub(crate) fn port_mut(&mut self, direction: PortDirection, name: &str) -> Option<&mut PortModel> {
        match direction {
            PortDirection::In => self.inputs.get_mut(name),
            PortDirection::Out => self.outputs.get_mut(name),
        }
    }

    /// Append a port record; names are unique per direction
    pub fn add_port(&mut self, port: PortModel) -> Result<()> {
        let ports = match port.direction {
            PortDirection::In => &mut self.inputs,
            PortDirection::Out => &mut self.outputs,
        };
        if ports.contains_key(&port.name) {
            return Err(GraphError::DuplicatePort(port.name));
        }
        ports.insert(port.name.clone(), port);
        Ok(())
    }

    /// Drop every port record
    pub(crate) fn clear_ports(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }

    /// Drop every link, keeping the ports
    pub(crate) fn clear_links(&mut self) {
        for port in self.inputs.values_mut().chain(self.outputs.values_mut()) {
            port.connected_ports.clear();
        }
    }

    /// Serialize to the node dictionary form
    pub fn to_dict(&self) -> NodeDict {
        NodeDict {
            node_type: self.node_type.clone(),
            icon: self.icon.clone(),
            name: self.name.clone(),
            color: self.color,
            border_color: self.border_color,
            text_color: self.text_color,
            disabled: self.disabled,
            selected: self.selected,
            width: self.width,
            height: self.height,
            pos: self.pos,
            inputs: connections(&self.inputs),
            outputs: connections(&self.outputs),
            custom: self.custom_properties.clone(),
        }
    }

    /// Serialize keyed by node id
    pub fn serialize(&self) -> IndexMap<NodeId, NodeDict> {
        IndexMap::from([(self.id, self.to_dict())])
    }

    /// Serialize to a JSON string
    pub fn serial(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize())?)
    }
}

fn connections(ports: &IndexMap<String, PortModel>) -> PortConnections {
    ports
        .iter()
        .filter(|(_, port)| !port.connected_ports.is_empty())
        .map(|(name, port)| (name.clone(), port.connected_ports.clone()))
        .collect()
}

/// Serialized form of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDict {
    /// Node type
    #[serde(rename = "type")]
    pub node_type: String,
    /// Icon path
    pub icon: Option<String>,
    /// Display name
    pub name: String,
    /// Fill color
    pub color: Rgba,
    /// Border color
    pub border_color: Rgba,
    /// Text color
    pub text_color: Rgba,
    /// Disabled flag
    pub disabled: bool,
    /// Selected flag
    pub selected: bool,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Position
    pub pos: [f64; 2],
    /// Connected input ports
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: PortConnections,
    /// Connected output ports
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: PortConnections,
    /// Custom property values
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom: IndexMap<String, PropertyValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_values() {
        let model = NodeModel::new("demo.Foo", "foo");
        assert_eq!(model.get_property("name"), Some("foo".into()));
        assert_eq!(model.get_property("color"), Some(PropertyValue::Color(DEFAULT_COLOR)));
        assert_eq!(model.get_property("icon"), Some(PropertyValue::Null));
        assert_eq!(model.get_property("missing"), None);
        assert_eq!(model.properties().len(), BUILTIN_PROPERTIES.len());
    }

    #[test]
    fn test_builtin_type_checks() {
        let mut model = NodeModel::new("demo.Foo", "foo");
        model.set_property("width", 12.into()).unwrap();
        assert_eq!(model.width, 12.0);
        model.set_property("color", "#0a141e".into()).unwrap();
        assert_eq!(model.color, [10, 20, 30, 255]);
        model.set_property("pos", vec![1.5, 2.5].into()).unwrap();
        assert_eq!(model.pos, [1.5, 2.5]);

        assert!(matches!(
            model.set_property("disabled", "yes".into()),
            Err(GraphError::InvalidValue { .. })
        ));
        assert!(matches!(
            model.set_property("count", 1.into()),
            Err(GraphError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_namespaces_stay_disjoint() {
        let mut model = NodeModel::new("demo.Foo", "foo");
        model.add_custom_property("count", 1.into()).unwrap();
        assert!(matches!(
            model.add_custom_property("count", 2.into()),
            Err(GraphError::DuplicateProperty(_))
        ));
        assert!(matches!(
            model.add_custom_property("color", 2.into()),
            Err(GraphError::DuplicateProperty(_))
        ));
        assert_eq!(model.custom_properties().get("count"), Some(&PropertyValue::Int(1)));
        for name in model.custom_properties().keys() {
            assert!(!model.properties().contains_key(name));
        }
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut model = NodeModel::new("demo.Foo", "foo");
        model
            .add_port(PortModel::new(PortDirection::In, "in", true, false))
            .unwrap();
        model
            .add_port(PortModel::new(PortDirection::Out, "in", true, true))
            .unwrap();
        assert!(matches!(
            model.add_port(PortModel::new(PortDirection::In, "in", true, true)),
            Err(GraphError::DuplicatePort(_))
        ));
        assert_eq!(model.inputs().len(), 1);
    }

    #[test]
    fn test_dict_omits_empty_sections() {
        let mut model = NodeModel::new("demo.Foo", "foo");
        let json = serde_json::to_value(model.to_dict()).unwrap();
        assert!(json.get("custom").is_none());
        assert!(json.get("inputs").is_none());
        assert_eq!(json["type"], "demo.Foo");

        model.add_custom_property("count", 3.into()).unwrap();
        let json = serde_json::to_value(model.to_dict()).unwrap();
        assert_eq!(json["custom"]["count"], 3);

        let serialized = model.serialize();
        assert!(serialized.contains_key(&model.id()));
        assert!(model.serial().unwrap().contains(&model.id().to_string()));
    }
}
