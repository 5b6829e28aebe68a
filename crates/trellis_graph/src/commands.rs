// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undoable graph commands.
//!
//! Commands capture the ids and values they need up front and resolve
//! nodes through the graph's node map each time they are applied, so a
//! command never keeps a node alive.

use crate::error::{GraphError, Result};
use crate::graph::NodeMap;
use crate::node::{Node, NodeId};
use crate::port::{self, PortKey};
use crate::value::PropertyValue;
use std::fmt;

/// A mutation that can be undone and redone
pub trait UndoCommand: fmt::Debug {
    /// Text shown for this command in undo menus
    fn text(&self) -> &str;

    /// Nodes the command touches; all of them must exist to replay it
    fn targets(&self) -> Vec<NodeId>;

    /// Apply the command
    fn redo(&self, nodes: &NodeMap) -> Result<()>;

    /// Revert the command
    fn undo(&self, nodes: &NodeMap) -> Result<()>;
}

fn resolve(nodes: &NodeMap, id: NodeId) -> Result<&Node> {
    nodes.get(&id).ok_or(GraphError::NodeDeleted(id))
}

/// Property value change on one node
#[derive(Debug, Clone)]
pub struct PropertyChangedCmd {
    text: String,
    node: NodeId,
    name: String,
    old_value: PropertyValue,
    new_value: PropertyValue,
    block_widget_signal: bool,
}

impl PropertyChangedCmd {
    /// Create the command; nothing is applied until it is pushed
    pub fn new(
        node: &Node,
        name: &str,
        old_value: PropertyValue,
        new_value: PropertyValue,
        block_widget_signal: bool,
    ) -> Self {
        Self {
            text: format!("set {} ({})", name, node.name()),
            node: node.id(),
            name: name.to_string(),
            old_value,
            new_value,
            block_widget_signal,
        }
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, nodes: &NodeMap, value: &PropertyValue) -> Result<()> {
        let node = resolve(nodes, self.node)?;
        if node.property_value(&self.name)? == *value {
            return Ok(());
        }
        node.apply_property(&self.name, value.clone(), self.block_widget_signal)
    }
}

impl UndoCommand for PropertyChangedCmd {
    fn text(&self) -> &str {
        &self.text
    }

    fn targets(&self) -> Vec<NodeId> {
        vec![self.node]
    }

    fn redo(&self, nodes: &NodeMap) -> Result<()> {
        self.set(nodes, &self.new_value)
    }

    fn undo(&self, nodes: &NodeMap) -> Result<()> {
        self.set(nodes, &self.old_value)
    }
}

/// New link between two ports
#[derive(Debug, Clone)]
pub struct PortConnectedCmd {
    text: String,
    source: PortKey,
    target: PortKey,
}

impl PortConnectedCmd {
    /// Create the command
    pub fn new(source: PortKey, target: PortKey) -> Self {
        Self {
            text: format!("connect {} > {}", source.name, target.name),
            source,
            target,
        }
    }
}

impl UndoCommand for PortConnectedCmd {
    fn text(&self) -> &str {
        &self.text
    }

    fn targets(&self) -> Vec<NodeId> {
        vec![self.source.node, self.target.node]
    }

    fn redo(&self, nodes: &NodeMap) -> Result<()> {
        port::link(nodes, &self.source, &self.target)
    }

    fn undo(&self, nodes: &NodeMap) -> Result<()> {
        port::unlink(nodes, &self.source, &self.target)
    }
}

/// Removed link between two ports
#[derive(Debug, Clone)]
pub struct PortDisconnectedCmd {
    text: String,
    source: PortKey,
    target: PortKey,
}

impl PortDisconnectedCmd {
    /// Create the command
    pub fn new(source: PortKey, target: PortKey) -> Self {
        Self {
            text: format!("disconnect {} > {}", source.name, target.name),
            source,
            target,
        }
    }
}

impl UndoCommand for PortDisconnectedCmd {
    fn text(&self) -> &str {
        &self.text
    }

    fn targets(&self) -> Vec<NodeId> {
        vec![self.source.node, self.target.node]
    }

    fn redo(&self, nodes: &NodeMap) -> Result<()> {
        port::unlink(nodes, &self.source, &self.target)
    }

    fn undo(&self, nodes: &NodeMap) -> Result<()> {
        port::link(nodes, &self.source, &self.target)
    }
}
