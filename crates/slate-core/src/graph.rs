use crate::id::*;
use crate::link::{Endpoint, Link, LinkError};
use crate::node::Node;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Default grid cell size, in layout units.
pub const DEFAULT_CELL_SIZE: u32 = 32;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A node position snapped to the layout grid. The engine never routes by
/// position; it is stored for the layout collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    /// Snap raw coordinates to the nearest multiple of `cell_size`.
    pub fn snapped(x: i32, y: i32, cell_size: u32) -> Self {
        Self {
            x: snap(x, cell_size),
            y: snap(y, cell_size),
        }
    }
}

fn snap(v: i32, cell_size: u32) -> i32 {
    let cell = i64::from(cell_size.max(1));
    let v = i64::from(v);
    let snapped = (v + cell / 2).div_euclid(cell) * cell;
    snapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A node together with where it sits on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub node: Node,
    pub position: GridPosition,
}

// ---------------------------------------------------------------------------
// Slate
// ---------------------------------------------------------------------------

/// The slate: every node on the board and the links between their ports.
///
/// Invariant: both endpoints of every link exist in `nodes`, and a port is
/// marked connected exactly when a link occupies it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Slate {
    nodes: SlotMap<NodeId, PlacedNode>,
    links: SlotMap<LinkId, Link>,
    /// Links in creation order.
    link_order: Vec<LinkId>,
    cell_size: u32,
}

impl Default for Slate {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl Slate {
    /// Create an empty slate whose positions snap to `cell_size`.
    pub fn new(cell_size: u32) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            links: SlotMap::with_key(),
            link_order: Vec::new(),
            cell_size: cell_size.max(1),
        }
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Place a node. Returns its new identity.
    pub fn add_node(&mut self, node: Node, x: i32, y: i32) -> NodeId {
        let position = GridPosition::snapped(x, y, self.cell_size);
        let id = self.nodes.insert(PlacedNode { node, position });
        debug!(?id, ?position, "node added");
        id
    }

    /// Remove a node and every link touching it. Returns false if the node
    /// does not exist.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        let incident: Vec<LinkId> = self
            .link_order
            .iter()
            .copied()
            .filter(|&lid| self.links.get(lid).is_some_and(|l| l.touches(id)))
            .collect();
        for lid in incident {
            self.remove_link(lid);
        }
        self.nodes.remove(id);
        debug!(?id, "node removed");
        true
    }

    /// Move a node. Returns false if it is missing or locked.
    pub fn move_node(&mut self, id: NodeId, x: i32, y: i32) -> bool {
        let cell_size = self.cell_size;
        match self.nodes.get_mut(id) {
            Some(placed) if !placed.node.is_locked() => {
                placed.position = GridPosition::snapped(x, y, cell_size);
                true
            }
            _ => false,
        }
    }

    /// Link `source`'s output port to `target`'s input port.
    ///
    /// On error nothing changes: no ports are marked and no link is stored.
    pub fn add_link(
        &mut self,
        source: NodeId,
        source_port: usize,
        target: NodeId,
        target_port: usize,
    ) -> Result<LinkId, LinkError> {
        if source == target {
            return Err(LinkError::SelfLoop);
        }
        for id in [source, target] {
            if !self.nodes.contains_key(id) {
                return Err(LinkError::NodeNotFound(id));
            }
        }
        let [src, dst] = self
            .nodes
            .get_disjoint_mut([source, target])
            .ok_or(LinkError::NodeNotFound(source))?;
        let link = Link::connect(
            Endpoint::new(source, source_port),
            &mut src.node,
            Endpoint::new(target, target_port),
            &mut dst.node,
        )?;
        let lid = self.links.insert(link);
        self.link_order.push(lid);
        debug!(?lid, ?source, source_port, ?target, target_port, "link added");
        Ok(lid)
    }

    /// Remove a link, freeing both ports and dropping its queued agents.
    /// Returns false if the link does not exist.
    pub fn remove_link(&mut self, id: LinkId) -> bool {
        let Some(mut link) = self.links.remove(id) else {
            return false;
        };
        self.link_order.retain(|&lid| lid != id);
        let (source, target) = (link.source().node, link.target().node);
        let dropped = match self.nodes.get_disjoint_mut([source, target]) {
            Some([src, dst]) => link.disconnect(&mut src.node, &mut dst.node),
            None => link.drain(),
        };
        debug!(?id, dropped, "link removed");
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|p| &p.node)
    }

    /// Mutable access for external commands (toggles, clearing errors,
    /// inventory setup). Ports stay owned by links.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).map(|p| &mut p.node)
    }

    pub fn position(&self, id: NodeId) -> Option<GridPosition> {
        self.nodes.get(id).map(|p| p.position)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_link(&self, id: LinkId) -> bool {
        self.links.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Iterate over all nodes with their positions.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PlacedNode)> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    /// Iterate over links in creation order.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.link_order
            .iter()
            .filter_map(|&lid| self.links.get(lid).map(|l| (lid, l)))
    }

    /// Links whose target is `node`, in creation order.
    pub fn input_links(&self, node: NodeId) -> Vec<LinkId> {
        self.links()
            .filter(|(_, l)| l.target().node == node)
            .map(|(lid, _)| lid)
            .collect()
    }

    /// Links whose source is `node`, in creation order.
    pub fn output_links(&self, node: NodeId) -> Vec<LinkId> {
        self.links()
            .filter(|(_, l)| l.source().node == node)
            .map(|(lid, _)| lid)
            .collect()
    }

    /// Borrow a node together with its input and output links, each list in
    /// creation order. Scans the full link list.
    pub(crate) fn node_context(
        &mut self,
        id: NodeId,
    ) -> Option<(&mut Node, Vec<&mut Link>, Vec<&mut Link>)> {
        let placed = self.nodes.get_mut(id)?;
        let mut incident: HashMap<LinkId, &mut Link> = self
            .links
            .iter_mut()
            .filter(|(_, l)| l.touches(id))
            .collect();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for lid in &self.link_order {
            if let Some(link) = incident.remove(lid) {
                if link.target().node == id {
                    inputs.push(link);
                } else {
                    outputs.push(link);
                }
            }
        }
        Some((&mut placed.node, inputs, outputs))
    }

    // -----------------------------------------------------------------------
    // Execution order
    // -----------------------------------------------------------------------

    /// Breadth-first order starting from every node with no input links.
    ///
    /// A node is queued the first time it is reached and never again, so
    /// each node appears exactly once even with diamonds and cycles. Nodes
    /// no entry point reaches (isolated cycles) follow in container order.
    pub fn execution_order(&self) -> Vec<NodeId> {
        let mut has_input: SecondaryMap<NodeId, bool> = SecondaryMap::new();
        let mut downstream: SecondaryMap<NodeId, Vec<NodeId>> = SecondaryMap::new();
        for (_, link) in self.links() {
            has_input.insert(link.target().node, true);
            match downstream.get_mut(link.source().node) {
                Some(targets) => targets.push(link.target().node),
                None => {
                    downstream.insert(link.source().node, vec![link.target().node]);
                }
            }
        }

        let mut visited: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for id in self.nodes.keys() {
            if !has_input.contains_key(id) {
                visited.insert(id, ());
                queue.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            if let Some(targets) = downstream.get(id) {
                for &next in targets {
                    if !visited.contains_key(next) {
                        visited.insert(next, ());
                        queue.push_back(next);
                    }
                }
            }
        }

        for id in self.nodes.keys() {
            if !visited.contains_key(id) {
                order.push(id);
            }
        }
        order
    }
}
