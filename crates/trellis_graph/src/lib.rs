// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph model for Trellis.
//!
//! This crate holds everything below the canvas of a node editor:
//! - Nodes with built-in and custom properties
//! - A closed set of property types with per-type schemas
//! - Named input/output ports and their links
//! - An undo stack that every attached edit goes through
//!
//! ## Architecture
//!
//! A [`NodeGraph`] owns its nodes, the per-type [`SchemaRegistry`] and the
//! [`UndoStack`]. Nodes, ports and properties point back at the graph
//! through weak handles and revalidate on every access, so holding one
//! across a node removal is safe. Rendering lives behind the [`NodeView`]
//! trait; [`HeadlessView`] is an in-memory implementation.
//!
//! ```
//! use trellis_graph::{HeadlessView, Node, NodeGraph, NodeType, PropertyOptions};
//!
//! let graph = NodeGraph::new();
//! let node = Node::new(&NodeType::new("demo.nodes", "Counter"), HeadlessView::new());
//! node.create_property("count", 10, PropertyOptions::default()).unwrap();
//! graph.add_node(&node).unwrap();
//!
//! node.set_property("count", 20).unwrap();
//! graph.undo().unwrap();
//! assert_eq!(node.property_value("count").unwrap(), 10.into());
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod history;
pub mod model;
pub mod node;
pub mod port;
pub mod property;
pub mod schema;
pub mod value;
pub mod view;

pub use commands::{PortConnectedCmd, PortDisconnectedCmd, PropertyChangedCmd, UndoCommand};
pub use config::{ConfigError, GraphConfig};
pub use error::{ConnectionError, GraphError, Result, StateError};
pub use graph::{GraphHandle, NodeGraph, NodeMap};
pub use history::{CommandGroup, HistoryError, HistoryStats, UndoStack};
pub use model::{NodeDict, NodeModel};
pub use node::{Node, NodeId, NodeLifecycle, NodeType};
pub use port::{Port, PortDirection, PortKey, PortModel};
pub use property::{Property, PropertyFactory, PropertyKind, PropertyOptions, PropertyType};
pub use schema::{PropertySchema, SchemaRegistry};
pub use value::{PropertyValue, Rgba};
pub use view::{HeadlessView, NodeView, ViewSettings, Widget, WidgetKind};
