//! Read-only views of slate state for the UI.
//!
//! All types are owned copies with no references into the slate, so they
//! can be handed to rendering code while the simulation keeps ticking.

use crate::graph::{GridPosition, Slate};
use crate::id::{AgentId, LinkId, NodeId, PortSide};
use crate::link::Endpoint;
use crate::node::Fault;
use crate::slot::Slot;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Node view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortView {
    pub label: String,
    pub icon: String,
    pub connected: bool,
}

/// A copy of one node and its surroundings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub title: String,
    pub icon: String,
    pub behavior: String,
    pub position: GridPosition,
    pub locked: bool,
    pub flipped: bool,
    pub reversed: bool,
    pub inputs: Vec<PortView>,
    pub outputs: Vec<PortView>,
    pub inventory: Vec<(String, Slot)>,
    pub error: Option<Fault>,
    /// Links ending at this node, in creation order.
    pub input_links: Vec<LinkId>,
    /// Links starting at this node, in creation order.
    pub output_links: Vec<LinkId>,
}

impl NodeView {
    pub fn capture(slate: &Slate, id: NodeId) -> Option<Self> {
        let node = slate.node(id)?;
        let position = slate.position(id)?;
        let ports = |side: PortSide| -> Vec<PortView> {
            node.ports(side)
                .iter()
                .map(|p| PortView {
                    label: p.label.clone(),
                    icon: p.icon.clone(),
                    connected: p.is_connected(),
                })
                .collect()
        };
        Some(Self {
            id,
            title: node.title.clone(),
            icon: node.icon.clone(),
            behavior: node.behavior().to_string(),
            position,
            locked: node.is_locked(),
            flipped: node.is_flipped(),
            reversed: node.is_reversed(),
            inputs: ports(PortSide::Input),
            outputs: ports(PortSide::Output),
            inventory: node
                .inventory()
                .iter()
                .map(|(k, s)| (k.to_string(), *s))
                .collect(),
            error: node.error().cloned(),
            input_links: slate.input_links(id),
            output_links: slate.output_links(id),
        })
    }
}

// ---------------------------------------------------------------------------
// Link view
// ---------------------------------------------------------------------------

/// A copy of one link's endpoints and queue contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkView {
    pub id: LinkId,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Queued agents, head first.
    pub queued: Vec<AgentId>,
}

impl LinkView {
    pub fn capture(slate: &Slate, id: LinkId) -> Option<Self> {
        let link = slate.link(id)?;
        Some(Self {
            id,
            source: link.source(),
            target: link.target(),
            queued: link.queued_ids(),
        })
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ResourcePool;
    use crate::test_utils::*;

    #[test]
    fn node_view_copies_ports_and_links() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(2), 40, 0);
        let dst = slate.add_node(sink_node(1), 96, 0);
        let lid = wire(&mut slate, src, 1, dst, 0);

        let view = NodeView::capture(&slate, src).unwrap();
        assert_eq!(view.behavior, "emit");
        assert_eq!(view.position, GridPosition { x: 32, y: 0 });
        assert_eq!(view.outputs.len(), 2);
        assert!(!view.outputs[0].connected);
        assert!(view.outputs[1].connected);
        assert_eq!(view.output_links, vec![lid]);
        assert!(view.input_links.is_empty());
        assert!(view.error.is_none());
    }

    #[test]
    fn link_view_lists_queue_head_first() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(1), 0, 0);
        let dst = slate.add_node(sink_node(1), 0, 0);
        let lid = wire(&mut slate, src, 0, dst, 0);
        let mut pool = ResourcePool::new(2, 2);
        let first = pool.spawn_agent().unwrap();
        let second = pool.spawn_agent().unwrap();
        let ids = vec![first.id(), second.id()];
        slate.link_mut(lid).unwrap().push(first);
        slate.link_mut(lid).unwrap().push(second);

        let view = LinkView::capture(&slate, lid).unwrap();
        assert_eq!(view.queued, ids);
        assert_eq!(view.len(), 2);
        assert_eq!(view.source.node, src);
        assert_eq!(view.target.node, dst);
    }

    #[test]
    fn missing_ids_yield_none() {
        let mut slate = Slate::default();
        let id = slate.add_node(source_node(1), 0, 0);
        slate.remove_node(id);
        assert!(NodeView::capture(&slate, id).is_none());
    }
}
