// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types shared across the graph model.

use crate::history::HistoryError;
use crate::node::NodeId;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by nodes, properties, ports and the graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No property variant is registered for the tag
    #[error("Can't find property type {0:?}")]
    Construction(String),

    /// The name already exists in the built-in or custom namespace
    #[error("Property already exists: {0:?}")]
    DuplicateProperty(String),

    /// The name exists in neither namespace
    #[error("No property {0:?}")]
    UnknownProperty(String),

    /// An attached accessor points at a node that is no longer in the graph
    #[error("Node deleted: {0}")]
    NodeDeleted(NodeId),

    /// Illegal lifecycle transition
    #[error(transparent)]
    State(#[from] StateError),

    /// Illegal port connection
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A port with the same name and direction already exists on the node
    #[error("Port already exists: {0:?}")]
    DuplicatePort(String),

    /// The value does not fit the property
    #[error("Invalid value for {name:?}: expected {expected}")]
    InvalidValue {
        /// Property name
        name: String,
        /// Expected shape
        expected: &'static str,
    },

    /// Undo stack misuse
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub(crate) fn invalid_value(name: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            expected,
        }
    }
}

/// Node lifecycle violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Node is already part of a graph
    #[error("Node {0} is already attached to a graph")]
    AlreadyAttached(NodeId),

    /// Node was removed from a graph and has not been reset
    #[error("Node {0} was removed and must be reset before it is added again")]
    NotReset(NodeId),

    /// Operation requires the node to be in a graph
    #[error("Node {0} is not attached to a graph")]
    Detached(NodeId),

    /// The graph the node was attached to no longer exists
    #[error("Graph was dropped")]
    GraphDropped,

    /// The two nodes live in different graphs
    #[error("Nodes belong to different graphs")]
    ForeignGraph,

    /// The node is in the middle of a write
    #[error("Node is busy with another update")]
    Busy,
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Port does not exist on the node
    #[error("Port not found: {0:?}")]
    PortNotFound(String),

    /// Both ends live on the same node
    #[error("Can't connect a port to a port on the same node")]
    SameNode,

    /// Both ends have the same direction
    #[error("Can't connect two {0} ports")]
    IncompatibleDirection(&'static str),

    /// The connection would close a cycle in an acyclic graph
    #[error("Connection would create a cycle")]
    Cycle,
}
