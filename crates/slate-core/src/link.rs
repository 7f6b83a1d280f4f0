//! Links: FIFO queues of agents running from one node's output port to
//! another node's input port.
//!
//! A link owns the agents queued on it. Links have no capacity of their own;
//! `push` always succeeds and back-pressure, if any, comes from node
//! behaviors refusing to pull.

use crate::agent::Agent;
use crate::id::{AgentId, NodeId, PortSide};
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reasons a link cannot be created. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("a link cannot start and end on the same node")]
    SelfLoop,
    #[error("link endpoint node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("{side} port {index} out of range (node has {count})")]
    InvalidPort {
        side: PortSide,
        index: usize,
        count: usize,
    },
    #[error("{side} port {index} is already connected")]
    PortInUse { side: PortSide, index: usize },
}

/// One end of a link: a node and a port index on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: usize,
}

impl Endpoint {
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// A FIFO connection from an output port to an input port.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    source: Endpoint,
    target: Endpoint,
    queue: VecDeque<Agent>,
}

impl Link {
    /// Validate the endpoints and mark both ports connected.
    ///
    /// Nothing is modified unless every check passes.
    pub fn connect(
        source: Endpoint,
        source_node: &mut Node,
        target: Endpoint,
        target_node: &mut Node,
    ) -> Result<Self, LinkError> {
        if source.node == target.node {
            return Err(LinkError::SelfLoop);
        }
        check_index(source_node, PortSide::Output, source.port)?;
        check_index(target_node, PortSide::Input, target.port)?;
        check_free(source_node, PortSide::Output, source.port)?;
        check_free(target_node, PortSide::Input, target.port)?;

        source_node.connect_port(PortSide::Output, source.port);
        target_node.connect_port(PortSide::Input, target.port);

        Ok(Self {
            source,
            target,
            queue: VecDeque::new(),
        })
    }

    /// Unmark both ports and drop every queued agent. Returns how many agents
    /// were dropped.
    pub fn disconnect(&mut self, source_node: &mut Node, target_node: &mut Node) -> usize {
        source_node.disconnect_port(PortSide::Output, self.source.port);
        target_node.disconnect_port(PortSide::Input, self.target.port);
        self.drain()
    }

    /// Drop every queued agent. Returns how many were dropped.
    pub(crate) fn drain(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    /// Append an agent to the tail.
    pub fn push(&mut self, agent: Agent) {
        self.queue.push_back(agent);
    }

    /// Take the agent at the head, if any.
    pub fn pull(&mut self) -> Option<Agent> {
        self.queue.pop_front()
    }

    /// Look at the agent at the head without taking it.
    pub fn peek(&self) -> Option<&Agent> {
        self.queue.front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued agent ids, head first.
    pub fn queued_ids(&self) -> Vec<AgentId> {
        self.queue.iter().map(Agent::id).collect()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Agent> {
        self.queue.iter()
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    pub fn source(&self) -> Endpoint {
        self.source
    }

    pub fn target(&self) -> Endpoint {
        self.target
    }

    /// True if either end of this link is on `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source.node == node || self.target.node == node
    }
}

fn check_index(node: &Node, side: PortSide, index: usize) -> Result<(), LinkError> {
    let count = node.port_count(side);
    if index >= count {
        return Err(LinkError::InvalidPort { side, index, count });
    }
    Ok(())
}

fn check_free(node: &Node, side: PortSide, index: usize) -> Result<(), LinkError> {
    if node.port(side, index).is_some_and(|p| p.is_connected()) {
        return Err(LinkError::PortInUse { side, index });
    }
    Ok(())
}
