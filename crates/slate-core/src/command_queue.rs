//! Queue of externally submitted graph edits.
//!
//! The UI can edit the slate directly between ticks, or queue [`Command`]s
//! that the engine applies at the next tick boundary, before any behavior
//! runs. Applied commands can be kept in a bounded history for debugging.

use crate::graph::Slate;
use crate::id::{LinkId, NodeId};
use crate::link::{Endpoint, LinkError};
use crate::node::Node;
use std::collections::VecDeque;
use tracing::debug;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single edit to the slate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddNode { node: Box<Node>, x: i32, y: i32 },
    /// Remove a node and every link touching it.
    RemoveNode { node: NodeId },
    MoveNode { node: NodeId, x: i32, y: i32 },
    AddLink { source: Endpoint, target: Endpoint },
    RemoveLink { link: LinkId },
    ToggleLocked { node: NodeId },
    ToggleFlipped { node: NodeId },
    ToggleReversed { node: NodeId },
    /// Clear a node's sticky fault.
    ClearError { node: NodeId },
}

/// Result of applying one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    NodeAdded(NodeId),
    NodeRemoved(bool),
    NodeMoved(bool),
    LinkAdded(Result<LinkId, LinkError>),
    LinkRemoved(bool),
    /// New flag value, or `None` if the node is missing.
    Toggled(Option<bool>),
    ErrorCleared(bool),
}

impl CommandOutcome {
    /// True if the command changed something.
    pub fn is_applied(&self) -> bool {
        match self {
            CommandOutcome::NodeAdded(_) => true,
            CommandOutcome::LinkAdded(result) => result.is_ok(),
            CommandOutcome::Toggled(value) => value.is_some(),
            CommandOutcome::NodeRemoved(done)
            | CommandOutcome::NodeMoved(done)
            | CommandOutcome::LinkRemoved(done)
            | CommandOutcome::ErrorCleared(done) => *done,
        }
    }
}

impl Command {
    /// Apply this edit to `slate` right away.
    pub fn apply(self, slate: &mut Slate) -> CommandOutcome {
        match self {
            Command::AddNode { node, x, y } => CommandOutcome::NodeAdded(slate.add_node(*node, x, y)),
            Command::RemoveNode { node } => CommandOutcome::NodeRemoved(slate.remove_node(node)),
            Command::MoveNode { node, x, y } => CommandOutcome::NodeMoved(slate.move_node(node, x, y)),
            Command::AddLink { source, target } => CommandOutcome::LinkAdded(slate.add_link(
                source.node,
                source.port,
                target.node,
                target.port,
            )),
            Command::RemoveLink { link } => CommandOutcome::LinkRemoved(slate.remove_link(link)),
            Command::ToggleLocked { node } => {
                CommandOutcome::Toggled(slate.node_mut(node).map(Node::toggle_locked))
            }
            Command::ToggleFlipped { node } => {
                CommandOutcome::Toggled(slate.node_mut(node).map(Node::toggle_flipped))
            }
            Command::ToggleReversed { node } => {
                CommandOutcome::Toggled(slate.node_mut(node).map(Node::toggle_reversed))
            }
            Command::ClearError { node } => {
                CommandOutcome::ErrorCleared(slate.node_mut(node).is_some_and(|n| {
                    let had = n.has_error();
                    n.clear_error();
                    had
                }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// A command that went through the queue, with what it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCommand {
    /// Tick whose boundary applied it.
    pub tick: u64,
    pub command: Command,
    pub outcome: CommandOutcome,
}

/// Commands waiting for the next tick boundary.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
    history: VecDeque<AppliedCommand>,
    /// 0 keeps no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that remembers the last `max_history` applied commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Apply every pending command to `slate` in submission order.
    ///
    /// A command that fails (missing node, bad port) does not stop the ones
    /// after it; its outcome says what happened.
    pub fn apply_pending(&mut self, tick: u64, slate: &mut Slate) -> Vec<CommandOutcome> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        debug!(count = self.pending.len(), tick, "applying queued commands");
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while let Some(command) = self.pending.pop_front() {
            let kept = (self.max_history > 0).then(|| command.clone());
            let outcome = command.apply(slate);
            if !outcome.is_applied() {
                debug!(tick, ?outcome, "queued command had no effect");
            }
            if let Some(command) = kept {
                self.remember(AppliedCommand {
                    tick,
                    command,
                    outcome: outcome.clone(),
                });
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    fn remember(&mut self, entry: AppliedCommand) {
        if self.history.len() == self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remembered commands, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &AppliedCommand> {
        self.history.iter()
    }

    /// Remembered commands that changed nothing.
    pub fn rejected(&self) -> impl Iterator<Item = &AppliedCommand> {
        self.history.iter().filter(|entry| !entry.outcome.is_applied())
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
