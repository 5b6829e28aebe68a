// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history for a graph.
//!
//! Every entry on the stack is a [`CommandGroup`]. A plain push becomes a
//! group of one; `begin`/`end` brackets collect several pushes into a
//! single entry.

use crate::commands::UndoCommand;
use crate::error::{GraphError, Result};
use crate::graph::NodeMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Default maximum undo history depth
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// History errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Undo or redo requested inside a `begin_undo`/`end_undo` bracket
    #[error("Can't undo or redo while an undo group is open")]
    GroupOpen,

    /// `end_undo` without a matching `begin_undo`
    #[error("No undo group is open")]
    NoOpenGroup,
}

/// Commands that are undone/redone together
#[derive(Debug)]
pub struct CommandGroup {
    text: String,
    commands: Vec<Box<dyn UndoCommand>>,
}

impl CommandGroup {
    /// Create an empty group
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            commands: Vec::new(),
        }
    }

    /// Text shown in undo menus
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the group has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn push(&mut self, command: Box<dyn UndoCommand>) {
        self.commands.push(command);
    }

    fn validate(&self, nodes: &NodeMap) -> Result<()> {
        for id in self.commands.iter().flat_map(|c| c.targets()) {
            if !nodes.contains_key(&id) {
                tracing::warn!("Can't replay {:?}: node {} was deleted", self.text, id);
                return Err(GraphError::NodeDeleted(id));
            }
        }
        Ok(())
    }

    fn redo(&self, nodes: &NodeMap) -> Result<()> {
        self.validate(nodes)?;
        self.commands.iter().try_for_each(|c| c.redo(nodes))
    }

    fn undo(&self, nodes: &NodeMap) -> Result<()> {
        self.validate(nodes)?;
        self.commands.iter().rev().try_for_each(|c| c.undo(nodes))
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Entries in the undo stack
    pub undo_count: usize,
    /// Entries in the redo stack
    pub redo_count: usize,
    /// Maximum history depth, 0 for unbounded
    pub max_depth: usize,
    /// Nesting depth of open groups
    pub open_groups: usize,
}

/// Undo/redo stack owned by a graph
#[derive(Debug)]
pub struct UndoStack {
    undo_stack: VecDeque<CommandGroup>,
    redo_stack: VecDeque<CommandGroup>,
    max_depth: usize,
    open: Option<CommandGroup>,
    group_depth: usize,
}

impl UndoStack {
    /// Create a stack with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_UNDO_LIMIT)
    }

    /// Create with custom maximum depth; 0 keeps every entry
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
            open: None,
            group_depth: 0,
        }
    }

    /// Apply a command and record it.
    ///
    /// A command that fails to apply is not recorded.
    pub fn push(&mut self, command: Box<dyn UndoCommand>, nodes: &NodeMap) -> Result<()> {
        command.redo(nodes)?;
        tracing::trace!("Pushed {:?}", command.text());
        match &mut self.open {
            Some(group) => group.push(command),
            None => {
                let mut group = CommandGroup::new(command.text());
                group.push(command);
                self.commit(group);
            }
        }
        Ok(())
    }

    /// Open an undo group; nested calls fold into the outermost group
    pub fn begin(&mut self, text: impl Into<String>) {
        if self.group_depth == 0 {
            self.open = Some(CommandGroup::new(text));
        }
        self.group_depth += 1;
    }

    /// Close the innermost undo group; closing the outermost one commits it
    pub fn end(&mut self) -> std::result::Result<(), HistoryError> {
        if self.group_depth == 0 {
            return Err(HistoryError::NoOpenGroup);
        }
        self.group_depth -= 1;
        if self.group_depth == 0 {
            if let Some(group) = self.open.take() {
                if !group.is_empty() {
                    self.commit(group);
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, group: CommandGroup) {
        self.redo_stack.clear();
        self.undo_stack.push_back(group);

        // Enforce history limit
        if self.max_depth > 0 {
            while self.undo_stack.len() > self.max_depth {
                self.undo_stack.pop_front();
            }
        }
    }

    /// Undo the last entry and return its text.
    ///
    /// The entry stays in place if any node it touches was deleted.
    pub fn undo(&mut self, nodes: &NodeMap) -> Result<String> {
        if self.group_depth > 0 {
            return Err(HistoryError::GroupOpen.into());
        }
        let group = self.undo_stack.back().ok_or(HistoryError::NothingToUndo)?;
        group.undo(nodes)?;
        let text = group.text.clone();
        if let Some(group) = self.undo_stack.pop_back() {
            self.redo_stack.push_back(group);
        }
        tracing::debug!("Undo {:?}", text);
        Ok(text)
    }

    /// Redo the last undone entry and return its text
    pub fn redo(&mut self, nodes: &NodeMap) -> Result<String> {
        if self.group_depth > 0 {
            return Err(HistoryError::GroupOpen.into());
        }
        let group = self.redo_stack.back().ok_or(HistoryError::NothingToRedo)?;
        group.redo(nodes)?;
        let text = group.text.clone();
        if let Some(group) = self.redo_stack.pop_back() {
            self.undo_stack.push_back(group);
        }
        tracing::debug!("Redo {:?}", text);
        Ok(text)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether a `begin`/`end` bracket is open
    pub fn is_grouping(&self) -> bool {
        self.group_depth > 0
    }

    /// Maximum history depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Text of the next undo entry
    pub fn undo_text(&self) -> Option<&str> {
        self.undo_stack.back().map(CommandGroup::text)
    }

    /// Text of the next redo entry
    pub fn redo_text(&self) -> Option<&str> {
        self.redo_stack.back().map(CommandGroup::text)
    }

    /// Clear all history; an open group is kept
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            max_depth: self.max_depth,
            open_groups: self.group_depth,
        }
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Adds `delta` to a shared counter
    #[derive(Debug)]
    struct AddCmd {
        text: String,
        counter: Rc<Cell<i64>>,
        delta: i64,
        targets: Vec<NodeId>,
    }

    impl AddCmd {
        fn boxed(counter: &Rc<Cell<i64>>, delta: i64) -> Box<dyn UndoCommand> {
            Box::new(Self {
                text: format!("add {delta}"),
                counter: counter.clone(),
                delta,
                targets: Vec::new(),
            })
        }
    }

    impl UndoCommand for AddCmd {
        fn text(&self) -> &str {
            &self.text
        }

        fn targets(&self) -> Vec<NodeId> {
            self.targets.clone()
        }

        fn redo(&self, _nodes: &NodeMap) -> Result<()> {
            self.counter.set(self.counter.get() + self.delta);
            Ok(())
        }

        fn undo(&self, _nodes: &NodeMap) -> Result<()> {
            self.counter.set(self.counter.get() - self.delta);
            Ok(())
        }
    }

    #[test]
    fn test_push_undo_redo() {
        let nodes = NodeMap::new();
        let counter = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.push(AddCmd::boxed(&counter, 2), &nodes).unwrap();
        stack.push(AddCmd::boxed(&counter, 3), &nodes).unwrap();
        assert_eq!(counter.get(), 5);
        assert_eq!(stack.undo_text(), Some("add 3"));

        assert_eq!(stack.undo(&nodes).unwrap(), "add 3");
        assert_eq!(counter.get(), 2);
        assert_eq!(stack.redo(&nodes).unwrap(), "add 3");
        assert_eq!(counter.get(), 5);

        stack.undo(&nodes).unwrap();
        stack.push(AddCmd::boxed(&counter, 10), &nodes).unwrap();
        assert!(!stack.can_redo());
        assert!(matches!(
            stack.redo(&nodes),
            Err(GraphError::History(HistoryError::NothingToRedo))
        ));
    }

    #[test]
    fn test_groups_nest_and_commit_once() {
        let nodes = NodeMap::new();
        let counter = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.begin("resize");
        stack.push(AddCmd::boxed(&counter, 1), &nodes).unwrap();
        stack.begin("inner");
        stack.push(AddCmd::boxed(&counter, 2), &nodes).unwrap();
        stack.end().unwrap();
        assert_eq!(stack.undo_depth(), 0);
        assert!(matches!(
            stack.undo(&nodes),
            Err(GraphError::History(HistoryError::GroupOpen))
        ));
        stack.end().unwrap();

        assert_eq!(stack.undo_depth(), 1);
        assert_eq!(stack.undo_text(), Some("resize"));
        stack.undo(&nodes).unwrap();
        assert_eq!(counter.get(), 0);
        assert_eq!(stack.end(), Err(HistoryError::NoOpenGroup));
    }

    #[test]
    fn test_empty_group_is_discarded() {
        let mut stack = UndoStack::new();
        stack.begin("nothing");
        stack.end().unwrap();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_depth_limit_drops_oldest() {
        let nodes = NodeMap::new();
        let counter = Rc::new(Cell::new(0));
        let mut stack = UndoStack::with_max_depth(2);
        for delta in 1..=3 {
            stack.push(AddCmd::boxed(&counter, delta), &nodes).unwrap();
        }
        assert_eq!(stack.stats().undo_count, 2);
        stack.undo(&nodes).unwrap();
        stack.undo(&nodes).unwrap();
        assert_eq!(counter.get(), 1);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_deleted_target_keeps_entry() {
        let nodes = NodeMap::new();
        let counter = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();
        let missing = NodeId::new();
        let command = Box::new(AddCmd {
            text: "add 1".to_string(),
            counter: counter.clone(),
            delta: 1,
            targets: vec![missing],
        });
        stack.push(command, &nodes).unwrap();

        assert!(matches!(
            stack.undo(&nodes),
            Err(GraphError::NodeDeleted(id)) if id == missing
        ));
        assert_eq!(counter.get(), 1);
        assert_eq!(stack.undo_depth(), 1);
        assert_eq!(stack.redo_depth(), 0);
    }
}
