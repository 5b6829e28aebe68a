// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::commands::{PortConnectedCmd, PortDisconnectedCmd};
use crate::error::{ConnectionError, GraphError, Result, StateError};
use crate::graph::{NodeGraph, NodeMap};
use crate::node::{Node, NodeId, NodeLifecycle, NodeState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    #[serde(rename = "in")]
    In,
    /// Output port
    #[serde(rename = "out")]
    Out,
}

impl PortDirection {
    /// Serialized name of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// The direction a port on the other end of a connection has
    pub fn opposite(&self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data record of a port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortModel {
    /// Port direction
    #[serde(rename = "type")]
    pub direction: PortDirection,
    /// Port name, unique per node and direction
    pub name: String,
    /// Whether the name is drawn next to the port
    pub display_name: bool,
    /// Whether more than one connection is allowed
    pub multi_connection: bool,
    /// Connected node id to connected port names
    pub connected_ports: IndexMap<NodeId, Vec<String>>,
}

impl PortModel {
    /// Create an unconnected port record
    pub fn new(
        direction: PortDirection,
        name: impl Into<String>,
        display_name: bool,
        multi_connection: bool,
    ) -> Self {
        Self {
            direction,
            name: name.into(),
            display_name,
            multi_connection,
            connected_ports: IndexMap::new(),
        }
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connected_ports.values().map(Vec::len).sum()
    }

    /// Whether the port is linked to `port` on `node`
    pub fn is_connected_to(&self, node: NodeId, port: &str) -> bool {
        self.connected_ports
            .get(&node)
            .is_some_and(|names| names.iter().any(|n| n == port))
    }

    pub(crate) fn add_link(&mut self, node: NodeId, port: &str) {
        let names = self.connected_ports.entry(node).or_default();
        if !names.iter().any(|n| n == port) {
            names.push(port.to_string());
        }
    }

    pub(crate) fn remove_link(&mut self, node: NodeId, port: &str) {
        if let Some(names) = self.connected_ports.get_mut(&node) {
            names.retain(|n| n != port);
            if names.is_empty() {
                self.connected_ports.shift_remove(&node);
            }
        }
    }

    /// Every (node, port) this port is linked to
    pub fn links(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.connected_ports
            .iter()
            .flat_map(|(node, names)| names.iter().map(move |n| (*node, n.as_str())))
    }
}

/// Stable address of a port: node id, direction and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortKey {
    /// Owning node
    pub node: NodeId,
    /// Port direction
    pub direction: PortDirection,
    /// Port name
    pub name: String,
}

impl PortKey {
    /// Create a port key
    pub fn new(node: NodeId, direction: PortDirection, name: impl Into<String>) -> Self {
        Self {
            node,
            direction,
            name: name.into(),
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.node, self.direction, self.name)
    }
}

/// A connection endpoint on a node.
///
/// Holds a weak reference to the node; the port record itself lives in the
/// node model and is looked up on every access.
#[derive(Debug, Clone)]
pub struct Port {
    node: Weak<RefCell<NodeState>>,
    direction: PortDirection,
    name: String,
}

impl Port {
    pub(crate) fn new(
        node: Weak<RefCell<NodeState>>,
        direction: PortDirection,
        name: impl Into<String>,
    ) -> Self {
        Self {
            node,
            direction,
            name: name.into(),
        }
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port direction
    pub fn port_type(&self) -> PortDirection {
        self.direction
    }

    /// The node this port belongs to, if it still exists
    pub fn node(&self) -> Option<Node> {
        self.node.upgrade().map(Node::from_state)
    }

    /// Snapshot of the port record
    pub fn model(&self) -> Result<PortModel> {
        self.resolve().map(|(_, model)| model)
    }

    /// Whether the port accepts more than one connection
    pub fn multi_connection(&self) -> Result<bool> {
        Ok(self.model()?.multi_connection)
    }

    /// Whether the port name is displayed
    pub fn display_name(&self) -> Result<bool> {
        Ok(self.model()?.display_name)
    }

    /// Stable address of this port
    pub fn key(&self) -> Result<PortKey> {
        let (node, _) = self.resolve()?;
        Ok(PortKey::new(node.id(), self.direction, &self.name))
    }

    /// Ports connected to this one
    pub fn connected_ports(&self) -> Result<Vec<Port>> {
        let (node, model) = self.resolve()?;
        let graph = node.attached_graph()?;
        let mut ports = Vec::new();
        for (node_id, name) in model.links() {
            if let Some(other) = graph.as_ref().and_then(|g| g.get_node_by_id(&node_id)) {
                ports.push(Port::new(other.downgrade(), self.direction.opposite(), name));
            }
        }
        Ok(ports)
    }

    /// Connect this port to another port.
    ///
    /// Single-connection ports drop their existing link first; the drop
    /// and the new link form one undo step.
    pub fn connect_to(&self, other: &Port) -> Result<()> {
        let (node, model) = self.resolve()?;
        let (other_node, other_model) = other.resolve()?;
        if node == other_node {
            return Err(ConnectionError::SameNode.into());
        }
        if self.direction == other.direction {
            return Err(ConnectionError::IncompatibleDirection(self.direction.as_str()).into());
        }
        let graph = shared_graph(&node, &other_node)?;

        if model.is_connected_to(other_node.id(), &other.name) {
            return Ok(());
        }

        let (upstream, downstream) = match self.direction {
            PortDirection::Out => (node.id(), other_node.id()),
            PortDirection::In => (other_node.id(), node.id()),
        };
        if graph.is_acyclic() && graph.reaches(downstream, upstream) {
            return Err(ConnectionError::Cycle.into());
        }

        let source = PortKey::new(node.id(), self.direction, &self.name);
        let target = PortKey::new(other_node.id(), other.direction, &other.name);

        graph.begin_undo(format!("connect {} > {}", source.name, target.name));
        let result = (|| {
            for (key, port) in [(&source, &model), (&target, &other_model)] {
                if port.multi_connection {
                    continue;
                }
                for (node_id, name) in port.links() {
                    let linked = PortKey::new(node_id, key.direction.opposite(), name);
                    graph.push_command(Box::new(PortDisconnectedCmd::new(key.clone(), linked)))?;
                }
            }
            graph.push_command(Box::new(PortConnectedCmd::new(source.clone(), target.clone())))
        })();
        graph.end_undo()?;

        if result.is_ok() {
            tracing::debug!("Connected {} > {}", source, target);
        }
        result
    }

    /// Remove the link between this port and another port
    pub fn disconnect_from(&self, other: &Port) -> Result<()> {
        let (node, model) = self.resolve()?;
        let (other_node, _) = other.resolve()?;
        let graph = shared_graph(&node, &other_node)?;
        if !model.is_connected_to(other_node.id(), &other.name) {
            return Ok(());
        }

        let source = PortKey::new(node.id(), self.direction, &self.name);
        let target = PortKey::new(other_node.id(), other.direction, &other.name);
        tracing::debug!("Disconnecting {} > {}", source, target);
        graph.push_command(Box::new(PortDisconnectedCmd::new(source, target)))
    }

    fn resolve(&self) -> Result<(Node, PortModel)> {
        let node = self
            .node()
            .ok_or_else(|| ConnectionError::PortNotFound(self.name.clone()))?;
        if node.lifecycle() == NodeLifecycle::Removed {
            return Err(GraphError::NodeDeleted(node.id()));
        }
        let model = node
            .port_model(self.direction, &self.name)
            .ok_or_else(|| ConnectionError::PortNotFound(self.name.clone()))?;
        Ok((node, model))
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.node.ptr_eq(&other.node) && self.direction == other.direction && self.name == other.name
    }
}

fn shared_graph(node: &Node, other: &Node) -> Result<NodeGraph> {
    let graph = node
        .attached_graph()?
        .ok_or(StateError::Detached(node.id()))?;
    let other_graph = other
        .attached_graph()?
        .ok_or(StateError::Detached(other.id()))?;
    if !graph.ptr_eq(&other_graph) {
        return Err(StateError::ForeignGraph.into());
    }
    Ok(graph)
}

fn lookup<'a>(nodes: &'a NodeMap, key: &PortKey) -> Result<&'a Node> {
    let node = nodes.get(&key.node).ok_or(GraphError::NodeDeleted(key.node))?;
    if node.port_model(key.direction, &key.name).is_none() {
        return Err(ConnectionError::PortNotFound(key.name.clone()).into());
    }
    Ok(node)
}

/// Record a link on both port models
pub(crate) fn link(nodes: &NodeMap, a: &PortKey, b: &PortKey) -> Result<()> {
    let node_a = lookup(nodes, a)?;
    let node_b = lookup(nodes, b)?;
    node_a.with_port_mut(a.direction, &a.name, |port| port.add_link(b.node, &b.name))?;
    node_b.with_port_mut(b.direction, &b.name, |port| port.add_link(a.node, &a.name))?;
    Ok(())
}

/// Remove a link from both port models
pub(crate) fn unlink(nodes: &NodeMap, a: &PortKey, b: &PortKey) -> Result<()> {
    let node_a = lookup(nodes, a)?;
    let node_b = lookup(nodes, b)?;
    node_a.with_port_mut(a.direction, &a.name, |port| port.remove_link(b.node, &b.name))?;
    node_b.with_port_mut(b.direction, &b.name, |port| port.remove_link(a.node, &a.name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_model_links() {
        let node = NodeId::new();
        let mut port = PortModel::new(PortDirection::In, "in", true, false);
        port.add_link(node, "out");
        port.add_link(node, "out");
        assert_eq!(port.connection_count(), 1);
        assert!(port.is_connected_to(node, "out"));

        port.remove_link(node, "out");
        assert_eq!(port.connection_count(), 0);
        assert!(port.connected_ports.is_empty());
    }

    #[test]
    fn test_direction_serialization() {
        let port = PortModel::new(PortDirection::Out, "result", true, true);
        let json = serde_json::to_value(&port).unwrap();
        assert_eq!(json["type"], "out");
        assert_eq!(PortDirection::In.opposite(), PortDirection::Out);
    }
}
