//! Node behaviors and the registry that maps behavior tags to handlers.
//!
//! A behavior runs once per tick for every node carrying its tag. It gets a
//! [`BehaviorContext`] holding the node, the shared pool, the node's input
//! and output links and the node's rotation state, and reports a
//! [`BehaviorResult`].
//!
//! # Outcomes
//!
//! - **Soft failure**: nothing to do (no links, empty queues, no agent in
//!   the pool). Returned as `Ok` with `success == false`; the node's error
//!   field is left alone.
//! - **Hard fault**: an invariant broke. Returned as `Err(Fault)`; the
//!   scheduler records it on the node and moves on to the next node.
//!
//! # Standard behaviors
//!
//! | tag           | effect per tick                                              |
//! |---------------|--------------------------------------------------------------|
//! | `emit`        | spawn one agent from the pool onto the next output link       |
//! | `collect`     | pull one agent, drain its inventory into the pool, return it  |
//! | `print`       | pass one agent from the next input to the next output, log it |
//! | `split`       | drain every queued input agent, fan out across outputs        |
//! | `merge`       | pull at most one agent per input, push to outputs             |
//! | `smart_split` | route one agent to the output whose label it carries          |

use crate::agent::Agent;
use crate::id::{NodeId, PortSide};
use crate::link::Link;
use crate::node::{Fault, Node};
use crate::pool::ResourcePool;
use crate::slot::SlotKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Tags of the standard behaviors.
pub mod tags {
    pub const EMIT: &str = "emit";
    pub const COLLECT: &str = "collect";
    pub const PRINT: &str = "print";
    pub const SPLIT: &str = "split";
    pub const MERGE: &str = "merge";
    pub const SMART_SPLIT: &str = "smart_split";
}

/// Output port labels that accept any agent in `smart_split`.
const CATCH_ALL_LABEL: &str = "*";

// ---------------------------------------------------------------------------
// Rotation state
// ---------------------------------------------------------------------------

/// Round-robin cursors for one node, persisted across ticks by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub next_input: usize,
    pub next_output: usize,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Expected "nothing to do" conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SoftFailure {
    #[error("no input links")]
    NoInputLinks,
    #[error("no output links")]
    NoOutputLinks,
    #[error("no agent available in pool")]
    NoAgentAvailable,
    #[error("all input links are empty")]
    InputsEmpty,
    #[error("pool is at agent cap; agent retained on its link")]
    AgentCapReached,
    #[error("no output accepts the agent")]
    NoRoute,
}

/// What a behavior reports for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorResult {
    pub success: bool,
    pub error: Option<String>,
    pub agents_processed: u32,
    pub metadata: Map<String, Value>,
}

impl BehaviorResult {
    /// A successful tick that moved `agents` agents.
    pub fn processed(agents: u32) -> Self {
        Self {
            success: true,
            error: None,
            agents_processed: agents,
            metadata: Map::new(),
        }
    }

    /// An expected no-op.
    pub fn soft(reason: SoftFailure) -> Self {
        Self {
            success: false,
            error: Some(reason.to_string()),
            agents_processed: 0,
            metadata: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Result type returned by every behavior handler.
pub type BehaviorOutcome = Result<BehaviorResult, Fault>;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a behavior may touch while it runs.
pub struct BehaviorContext<'a> {
    pub node_id: NodeId,
    pub node: &'a mut Node,
    pub pool: &'a mut ResourcePool,
    /// Links ending at this node, in creation order.
    pub inputs: Vec<&'a mut Link>,
    /// Links starting at this node, in creation order.
    pub outputs: Vec<&'a mut Link>,
    pub rotation: &'a mut Rotation,
    /// Time since the scheduler was created.
    pub current_time: Duration,
    /// Time since the previous tick.
    pub delta_time: Duration,
    pub tick: u64,
}

impl BehaviorContext<'_> {
    /// Pull from the inputs in rotation, trying each link once. The cursor
    /// only advances past a link that yielded an agent. Returns the index of
    /// that link with the agent.
    pub fn pull_round_robin(&mut self) -> Option<(usize, Agent)> {
        let count = self.inputs.len();
        if count == 0 {
            return None;
        }
        let start = self.rotation.next_input % count;
        for offset in 0..count {
            let index = (start + offset) % count;
            if let Some(agent) = self.inputs.get_mut(index).and_then(|l| l.pull()) {
                self.rotation.next_input = (index + 1) % count;
                return Some((index, agent));
            }
        }
        None
    }

    /// Push onto the next output in rotation. Hands the agent back if the
    /// node has no output links.
    pub fn push_round_robin(&mut self, agent: Agent) -> Result<usize, Agent> {
        let count = self.outputs.len();
        if count == 0 {
            return Err(agent);
        }
        let index = self.rotation.next_output % count;
        self.push_to(index, agent)?;
        Ok(index)
    }

    /// Push onto a specific output and move the cursor past it.
    pub fn push_to(&mut self, index: usize, agent: Agent) -> Result<(), Agent> {
        let count = self.outputs.len();
        match self.outputs.get_mut(index) {
            Some(link) => {
                link.push(agent);
                self.rotation.next_output = (index + 1) % count;
                Ok(())
            }
            None => Err(agent),
        }
    }

    /// Put an agent back at the tail of input link `index`.
    pub fn requeue(&mut self, index: usize, agent: Agent) -> Result<(), Agent> {
        match self.inputs.get_mut(index) {
            Some(link) => {
                link.push(agent);
                Ok(())
            }
            None => Err(agent),
        }
    }

    /// Label of the output port that output link `index` leaves from.
    pub fn output_label(&self, index: usize) -> Option<&str> {
        let port = self.outputs.get(index)?.source().port;
        self.node
            .port(PortSide::Output, port)
            .map(|p| p.label.as_str())
    }

    /// Return an agent that could not be placed anywhere to the pool, or
    /// report it as a fault if even that fails.
    fn strand(&mut self, agent: Agent, what: &str) -> Fault {
        let id = agent.id();
        let fault = Fault::new(format!("{what}: agent {id} could not be placed"));
        match self.pool.return_agent(agent) {
            Ok(()) => fault,
            Err(lost) => fault.with_details(format!("pool full, dropped {lost}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A behavior handler.
pub type BehaviorFn = Box<dyn FnMut(&mut BehaviorContext<'_>) -> BehaviorOutcome>;

/// Maps behavior tags to handlers. Hosts may register their own tags or
/// replace the standard ones.
pub struct BehaviorRegistry {
    handlers: HashMap<String, BehaviorFn>,
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BehaviorRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with every standard behavior installed.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(tags::EMIT, emit);
        registry.register(tags::COLLECT, collect);
        registry.register(tags::PRINT, print);
        registry.register(tags::SPLIT, split);
        registry.register(tags::MERGE, merge);
        registry.register(tags::SMART_SPLIT, smart_split);
        registry
    }

    /// Install a handler for `tag`, replacing any previous one. Returns true
    /// if a handler was replaced.
    pub fn register<F>(&mut self, tag: impl Into<String>, handler: F) -> bool
    where
        F: FnMut(&mut BehaviorContext<'_>) -> BehaviorOutcome + 'static,
    {
        self.handlers.insert(tag.into(), Box::new(handler)).is_some()
    }

    pub fn unregister(&mut self, tag: &str) -> bool {
        self.handlers.remove(tag).is_some()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut BehaviorFn> {
        self.handlers.get_mut(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

// ---------------------------------------------------------------------------
// Standard behaviors
// ---------------------------------------------------------------------------

/// Spawn one agent and send it down the next output link.
pub fn emit(ctx: &mut BehaviorContext<'_>) -> BehaviorOutcome {
    if ctx.outputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoOutputLinks));
    }
    let Some(agent) = ctx.pool.spawn_agent() else {
        return Ok(BehaviorResult::soft(SoftFailure::NoAgentAvailable));
    };
    let (id, name) = (agent.id(), agent.name().to_string());
    let output = ctx
        .push_round_robin(agent)
        .map_err(|agent| ctx.strand(agent, "emit"))?;
    Ok(BehaviorResult::processed(1)
        .with("agent_id", id.0)
        .with("agent_name", name)
        .with("output", output))
}

/// Pull one agent, move its whole inventory into the pool and return the
/// agent to the pool.
///
/// Inventory is drained even when the pool cannot absorb all of it; the
/// excess is reported under `lost`. If the pool is at its agent cap the
/// agent goes back to the tail of the link it came from and the result is a
/// failure, with the transfer still reported.
pub fn collect(ctx: &mut BehaviorContext<'_>) -> BehaviorOutcome {
    if ctx.inputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoInputLinks));
    }
    let Some((input, mut agent)) = ctx.pull_round_robin() else {
        return Ok(BehaviorResult::soft(SoftFailure::InputsEmpty));
    };

    let mut transferred = Map::new();
    let mut lost = Map::new();
    for (kind, label) in [(SlotKind::Resource, "resources"), (SlotKind::Item, "items")] {
        let mut moved = Map::new();
        for (key, requested) in agent.inventory().collection(kind).stocked() {
            let absorbed = ctx.pool.absorb(kind, &key, requested);
            let _ = agent.remove(kind, &key, requested);
            if absorbed < requested {
                lost.insert(key.clone(), json!(requested - absorbed));
            }
            moved.insert(key, json!(absorbed));
        }
        transferred.insert(label.to_string(), Value::Object(moved));
    }

    let id = agent.id();
    let base = |result: BehaviorResult| {
        result
            .with("agent_id", id.0)
            .with("transferred", Value::Object(transferred.clone()))
            .with("lost", Value::Object(lost.clone()))
    };

    match ctx.pool.return_agent(agent) {
        Ok(()) => Ok(base(BehaviorResult::processed(1)).with("returned", true)),
        Err(agent) => {
            warn!(node = ?ctx.node_id, agent = %id, "pool at agent cap, agent retained");
            ctx.requeue(input, agent)
                .map_err(|agent| ctx.strand(agent, "collect"))?;
            Ok(base(BehaviorResult::soft(SoftFailure::AgentCapReached))
                .with("returned", false))
        }
    }
}

/// Pass one agent through unchanged and log it.
pub fn print(ctx: &mut BehaviorContext<'_>) -> BehaviorOutcome {
    if ctx.inputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoInputLinks));
    }
    if ctx.outputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoOutputLinks));
    }
    let Some((input, agent)) = ctx.pull_round_robin() else {
        return Ok(BehaviorResult::soft(SoftFailure::InputsEmpty));
    };
    info!(
        node = ?ctx.node_id,
        title = %ctx.node.title,
        tick = ctx.tick,
        agent = %agent,
        resources = ?agent.inventory().resources.stocked(),
        items = ?agent.inventory().items.stocked(),
        tooltip = agent.tooltip(),
        "bosun passing through"
    );
    let id = agent.id();
    let output = ctx
        .push_round_robin(agent)
        .map_err(|agent| ctx.strand(agent, "print"))?;
    Ok(BehaviorResult::processed(1)
        .with("agent_id", id.0)
        .with("input", input)
        .with("output", output))
}

/// Drain every queued agent on every input and fan them out across the
/// outputs in rotation.
pub fn split(ctx: &mut BehaviorContext<'_>) -> BehaviorOutcome {
    if ctx.inputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoInputLinks));
    }
    if ctx.outputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoOutputLinks));
    }
    let count = ctx.inputs.len();
    let start = ctx.rotation.next_input % count;
    let mut moved = 0u32;
    for offset in 0..count {
        let index = (start + offset) % count;
        while let Some(agent) = ctx.inputs.get_mut(index).and_then(|l| l.pull()) {
            ctx.push_round_robin(agent)
                .map_err(|agent| ctx.strand(agent, "split"))?;
            moved += 1;
        }
    }
    ctx.rotation.next_input = (start + 1) % count;
    if moved == 0 {
        return Ok(BehaviorResult::soft(SoftFailure::InputsEmpty));
    }
    Ok(BehaviorResult::processed(moved))
}

/// Pull at most one agent from each input and push them onto the outputs in
/// rotation.
pub fn merge(ctx: &mut BehaviorContext<'_>) -> BehaviorOutcome {
    if ctx.inputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoInputLinks));
    }
    if ctx.outputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoOutputLinks));
    }
    let count = ctx.inputs.len();
    let start = ctx.rotation.next_input % count;
    let mut moved = 0u32;
    for offset in 0..count {
        let index = (start + offset) % count;
        if let Some(agent) = ctx.inputs.get_mut(index).and_then(|l| l.pull()) {
            ctx.push_round_robin(agent)
                .map_err(|agent| ctx.strand(agent, "merge"))?;
            moved += 1;
        }
    }
    ctx.rotation.next_input = (start + 1) % count;
    if moved == 0 {
        return Ok(BehaviorResult::soft(SoftFailure::InputsEmpty));
    }
    Ok(BehaviorResult::processed(moved))
}

/// Route one agent to the first output (in rotation) whose port label names
/// something the agent carries. Outputs labelled `*` or left blank take
/// agents nothing else matched. Unroutable agents go back to the tail of
/// their input link.
pub fn smart_split(ctx: &mut BehaviorContext<'_>) -> BehaviorOutcome {
    if ctx.inputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoInputLinks));
    }
    if ctx.outputs.is_empty() {
        return Ok(BehaviorResult::soft(SoftFailure::NoOutputLinks));
    }
    let Some((input, agent)) = ctx.pull_round_robin() else {
        return Ok(BehaviorResult::soft(SoftFailure::InputsEmpty));
    };

    let count = ctx.outputs.len();
    let start = ctx.rotation.next_output % count;
    let rotation: Vec<usize> = (0..count).map(|offset| (start + offset) % count).collect();
    let is_catch_all = |label: &str| label.is_empty() || label == CATCH_ALL_LABEL;

    let matched = rotation.iter().copied().find(|&i| {
        ctx.output_label(i)
            .is_some_and(|label| !is_catch_all(label) && agent.carries(label))
    });
    let target = matched.or_else(|| {
        rotation
            .iter()
            .copied()
            .find(|&i| ctx.output_label(i).is_some_and(is_catch_all))
    });

    let id = agent.id();
    match target {
        Some(output) => {
            let label = ctx.output_label(output).unwrap_or_default().to_string();
            ctx.push_to(output, agent)
                .map_err(|agent| ctx.strand(agent, "smart_split"))?;
            Ok(BehaviorResult::processed(1)
                .with("agent_id", id.0)
                .with("output", output)
                .with("filter", label)
                .with("matched", matched.is_some()))
        }
        None => {
            ctx.requeue(input, agent)
                .map_err(|agent| ctx.strand(agent, "smart_split"))?;
            Ok(BehaviorResult::soft(SoftFailure::NoRoute).with("agent_id", id.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Slate;
    use crate::test_utils::*;

    /// Run `behavior` once for `node` on `slate`.
    fn run(
        slate: &mut Slate,
        pool: &mut ResourcePool,
        rotation: &mut Rotation,
        node: NodeId,
        behavior: fn(&mut BehaviorContext<'_>) -> BehaviorOutcome,
    ) -> BehaviorOutcome {
        let (n, inputs, outputs) = slate.node_context(node).unwrap();
        let mut ctx = BehaviorContext {
            node_id: node,
            node: n,
            pool,
            inputs,
            outputs,
            rotation,
            current_time: Duration::ZERO,
            delta_time: Duration::ZERO,
            tick: 0,
        };
        behavior(&mut ctx)
    }

    fn queue_len(slate: &Slate, from: NodeId, to: NodeId) -> usize {
        slate
            .links()
            .find(|(_, l)| l.source().node == from && l.target().node == to)
            .map(|(_, l)| l.len())
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // emit
    // -----------------------------------------------------------------------

    #[test]
    fn emit_without_outputs_is_soft() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(1), 0, 0);
        let mut pool = ResourcePool::new(1, 1);
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), src, emit).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no output links"));
        assert_eq!(pool.agent_quantity(), 1);
    }

    #[test]
    fn emit_with_empty_pool_is_soft() {
        let mut slate = Slate::default();
        let (src, dst) = (slate.add_node(source_node(1), 0, 0), slate.add_node(sink_node(1), 0, 0));
        wire(&mut slate, src, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 0);
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), src, emit).unwrap();
        assert_eq!(result.error.as_deref(), Some("no agent available in pool"));
        assert_eq!(queue_len(&slate, src, dst), 0);
    }

    #[test]
    fn emit_rotates_across_outputs() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(2), 0, 0);
        let a = slate.add_node(sink_node(1), 0, 0);
        let b = slate.add_node(sink_node(1), 0, 0);
        wire(&mut slate, src, 0, a, 0);
        wire(&mut slate, src, 1, b, 0);
        let mut pool = ResourcePool::new(3, 3);
        let mut rotation = Rotation::default();
        for _ in 0..3 {
            let result = run(&mut slate, &mut pool, &mut rotation, src, emit).unwrap();
            assert!(result.success);
            assert_eq!(result.agents_processed, 1);
        }
        assert_eq!(queue_len(&slate, src, a), 2);
        assert_eq!(queue_len(&slate, src, b), 1);
        assert_eq!(pool.agent_quantity(), 0);
    }

    // -----------------------------------------------------------------------
    // collect
    // -----------------------------------------------------------------------

    #[test]
    fn collect_without_inputs_is_soft() {
        let mut slate = Slate::default();
        let dst = slate.add_node(sink_node(1), 0, 0);
        let mut pool = ResourcePool::new(1, 1);
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), dst, collect).unwrap();
        assert_eq!(result.error.as_deref(), Some("no input links"));
    }

    #[test]
    fn collect_on_empty_links_is_soft() {
        let mut slate = Slate::default();
        let (src, dst) = (slate.add_node(source_node(1), 0, 0), slate.add_node(sink_node(1), 0, 0));
        wire(&mut slate, src, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 1);
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), dst, collect).unwrap();
        assert_eq!(result.error.as_deref(), Some("all input links are empty"));
        assert!(!slate.node(dst).unwrap().has_error());
    }

    #[test]
    fn collect_drains_inventory_into_pool() {
        let mut slate = Slate::default();
        let (src, dst) = (slate.add_node(source_node(1), 0, 0), slate.add_node(sink_node(1), 0, 0));
        let lid = wire(&mut slate, src, 0, dst, 0);
        let mut pool = ResourcePool::new(2, 2);
        let agent = agent_with(&mut pool, &[(SlotKind::Resource, "Gold", 50, 50), (SlotKind::Item, "Rope", 5, 2)]);
        slate.link_mut(lid).unwrap().push(agent);

        let result = run(&mut slate, &mut pool, &mut Rotation::default(), dst, collect).unwrap();
        assert!(result.success);
        assert_eq!(result.agents_processed, 1);
        assert_eq!(pool.quantity(SlotKind::Resource, "Gold"), 50);
        assert_eq!(pool.cap(SlotKind::Resource, "Gold"), 10_000);
        assert_eq!(pool.quantity(SlotKind::Item, "Rope"), 2);
        assert_eq!(pool.cap(SlotKind::Item, "Rope"), 1_000);
        assert_eq!(pool.agent_quantity(), 2);
        assert_eq!(result.metadata["transferred"]["resources"]["Gold"], json!(50));
    }

    #[test]
    fn collect_loses_excess_beyond_pool_cap() {
        let mut slate = Slate::default();
        let (src, dst) = (slate.add_node(source_node(1), 0, 0), slate.add_node(sink_node(1), 0, 0));
        let lid = wire(&mut slate, src, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 1);
        pool.create_slot(SlotKind::Resource, "Gold", 20, 0).unwrap();
        let agent = agent_with(&mut pool, &[(SlotKind::Resource, "Gold", 50, 50)]);
        slate.link_mut(lid).unwrap().push(agent);

        let result = run(&mut slate, &mut pool, &mut Rotation::default(), dst, collect).unwrap();
        assert!(result.success);
        assert_eq!(pool.quantity(SlotKind::Resource, "Gold"), 20);
        assert_eq!(result.metadata["lost"]["Gold"], json!(30));
    }

    #[test]
    fn collect_at_agent_cap_requeues_drained_agent() {
        let mut slate = Slate::default();
        let (src, dst) = (slate.add_node(source_node(1), 0, 0), slate.add_node(sink_node(1), 0, 0));
        let lid = wire(&mut slate, src, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 1);
        let agent = agent_with(&mut pool, &[(SlotKind::Resource, "Gold", 50, 50)]);
        let id = agent.id();
        pool.add_agents(1);
        slate.link_mut(lid).unwrap().push(agent);

        let result = run(&mut slate, &mut pool, &mut Rotation::default(), dst, collect).unwrap();
        assert!(!result.success);
        assert_eq!(result.metadata["transferred"]["resources"]["Gold"], json!(50));
        assert_eq!(result.metadata["returned"], json!(false));
        let mut keys: Vec<&str> = result.metadata.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["agent_id", "lost", "returned", "transferred"]);
        assert_eq!(pool.quantity(SlotKind::Resource, "Gold"), 50);
        let link = slate.link(lid).unwrap();
        let retained = link.peek().unwrap();
        assert_eq!(retained.id(), id);
        assert!(retained.inventory().is_drained());
        assert!(!slate.node(dst).unwrap().has_error());
    }

    #[test]
    fn collect_round_robin_skips_empty_links() {
        let mut slate = Slate::default();
        let dst = slate.add_node(sink_node(2), 0, 0);
        let a = slate.add_node(source_node(1), 0, 0);
        let b = slate.add_node(source_node(1), 0, 0);
        let la = wire(&mut slate, a, 0, dst, 0);
        let lb = wire(&mut slate, b, 0, dst, 1);
        let mut pool = ResourcePool::new(4, 4);
        for _ in 0..2 {
            let agent = pool.spawn_agent().unwrap();
            slate.link_mut(lb).unwrap().push(agent);
        }
        let mut rotation = Rotation::default();
        // Link a is empty: the first pull falls through to b.
        assert!(run(&mut slate, &mut pool, &mut rotation, dst, collect).unwrap().success);
        assert_eq!(rotation.next_input, 0);
        let agent = pool.spawn_agent().unwrap();
        slate.link_mut(la).unwrap().push(agent);
        assert!(run(&mut slate, &mut pool, &mut rotation, dst, collect).unwrap().success);
        assert!(slate.link(la).unwrap().is_empty());
        assert_eq!(slate.link(lb).unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // print
    // -----------------------------------------------------------------------

    #[test]
    fn print_passes_agent_untouched() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(1), 0, 0);
        let mid = slate.add_node(relay_node("print", 1, 1), 0, 0);
        let dst = slate.add_node(sink_node(1), 0, 0);
        let l_in = wire(&mut slate, src, 0, mid, 0);
        let l_out = wire(&mut slate, mid, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 1);
        let agent = agent_with(&mut pool, &[(SlotKind::Resource, "Gold", 9, 4)]);
        let id = agent.id();
        slate.link_mut(l_in).unwrap().push(agent);

        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, print).unwrap();
        assert!(result.success);
        let passed = slate.link(l_out).unwrap().peek().unwrap();
        assert_eq!(passed.id(), id);
        assert_eq!(passed.quantity(SlotKind::Resource, "Gold"), 4);
        assert!(slate.link(l_in).unwrap().is_empty());
    }

    #[test]
    fn print_requires_both_sides() {
        let mut slate = Slate::default();
        let mid = slate.add_node(relay_node("print", 1, 1), 0, 0);
        let dst = slate.add_node(sink_node(1), 0, 0);
        wire(&mut slate, mid, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 1);
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, print).unwrap();
        assert_eq!(result.error.as_deref(), Some("no input links"));
    }

    // -----------------------------------------------------------------------
    // split / merge
    // -----------------------------------------------------------------------

    #[test]
    fn split_fans_out_everything_queued() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(1), 0, 0);
        let mid = slate.add_node(relay_node("split", 1, 2), 0, 0);
        let a = slate.add_node(sink_node(1), 0, 0);
        let b = slate.add_node(sink_node(1), 0, 0);
        let l_in = wire(&mut slate, src, 0, mid, 0);
        wire(&mut slate, mid, 0, a, 0);
        wire(&mut slate, mid, 1, b, 0);
        let mut pool = ResourcePool::new(5, 5);
        for _ in 0..5 {
            let agent = pool.spawn_agent().unwrap();
            slate.link_mut(l_in).unwrap().push(agent);
        }
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, split).unwrap();
        assert_eq!(result.agents_processed, 5);
        assert_eq!(queue_len(&slate, mid, a), 3);
        assert_eq!(queue_len(&slate, mid, b), 2);
    }

    #[test]
    fn merge_takes_one_per_input() {
        let mut slate = Slate::default();
        let s1 = slate.add_node(source_node(1), 0, 0);
        let s2 = slate.add_node(source_node(1), 0, 0);
        let mid = slate.add_node(relay_node("merge", 2, 1), 0, 0);
        let dst = slate.add_node(sink_node(1), 0, 0);
        let l1 = wire(&mut slate, s1, 0, mid, 0);
        let l2 = wire(&mut slate, s2, 0, mid, 1);
        wire(&mut slate, mid, 0, dst, 0);
        let mut pool = ResourcePool::new(4, 4);
        for lid in [l1, l1, l2] {
            let agent = pool.spawn_agent().unwrap();
            slate.link_mut(lid).unwrap().push(agent);
        }
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, merge).unwrap();
        assert_eq!(result.agents_processed, 2);
        assert_eq!(slate.link(l1).unwrap().len(), 1);
        assert!(slate.link(l2).unwrap().is_empty());
        assert_eq!(queue_len(&slate, mid, dst), 2);

        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, merge).unwrap();
        assert_eq!(result.agents_processed, 1);
        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, merge).unwrap();
        assert_eq!(result.error.as_deref(), Some("all input links are empty"));
    }

    // -----------------------------------------------------------------------
    // smart_split
    // -----------------------------------------------------------------------

    fn sorter_slate() -> (Slate, NodeId, [NodeId; 3], crate::id::LinkId) {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(1), 0, 0);
        let mut sorter = relay_node("smart_split", 1, 3);
        sorter.set_port_label(PortSide::Output, 0, "Gold").unwrap();
        sorter.set_port_label(PortSide::Output, 1, "Wood").unwrap();
        sorter.set_port_label(PortSide::Output, 2, "*").unwrap();
        let mid = slate.add_node(sorter, 0, 0);
        let outs = [
            slate.add_node(sink_node(1), 0, 0),
            slate.add_node(sink_node(1), 0, 0),
            slate.add_node(sink_node(1), 0, 0),
        ];
        let l_in = wire(&mut slate, src, 0, mid, 0);
        for (port, &out) in outs.iter().enumerate() {
            wire(&mut slate, mid, port, out, 0);
        }
        (slate, mid, outs, l_in)
    }

    #[test]
    fn smart_split_routes_by_label() {
        let (mut slate, mid, outs, l_in) = sorter_slate();
        let mut pool = ResourcePool::new(3, 3);
        let wood = agent_with(&mut pool, &[(SlotKind::Item, "Wood", 5, 1)]);
        let plain = pool.spawn_agent().unwrap();
        slate.link_mut(l_in).unwrap().push(wood);
        slate.link_mut(l_in).unwrap().push(plain);
        let mut rotation = Rotation::default();

        let first = run(&mut slate, &mut pool, &mut rotation, mid, smart_split).unwrap();
        assert_eq!(first.metadata["filter"], json!("Wood"));
        assert_eq!(queue_len(&slate, mid, outs[1]), 1);

        let second = run(&mut slate, &mut pool, &mut rotation, mid, smart_split).unwrap();
        assert_eq!(second.metadata["matched"], json!(false));
        assert_eq!(queue_len(&slate, mid, outs[2]), 1);
        assert_eq!(queue_len(&slate, mid, outs[0]), 0);
    }

    #[test]
    fn smart_split_requeues_unroutable_agent() {
        let mut slate = Slate::default();
        let src = slate.add_node(source_node(1), 0, 0);
        let mut sorter = relay_node("smart_split", 1, 1);
        sorter.set_port_label(PortSide::Output, 0, "Gold").unwrap();
        let mid = slate.add_node(sorter, 0, 0);
        let dst = slate.add_node(sink_node(1), 0, 0);
        let l_in = wire(&mut slate, src, 0, mid, 0);
        wire(&mut slate, mid, 0, dst, 0);
        let mut pool = ResourcePool::new(1, 1);
        let agent = pool.spawn_agent().unwrap();
        let id = agent.id();
        slate.link_mut(l_in).unwrap().push(agent);

        let result = run(&mut slate, &mut pool, &mut Rotation::default(), mid, smart_split).unwrap();
        assert_eq!(result.error.as_deref(), Some("no output accepts the agent"));
        assert_eq!(slate.link(l_in).unwrap().peek().map(Agent::id), Some(id));
        assert_eq!(queue_len(&slate, mid, dst), 0);
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn standard_registry_has_all_tags() {
        let registry = BehaviorRegistry::standard();
        assert_eq!(
            registry.tags(),
            vec!["collect", "emit", "merge", "print", "smart_split", "split"]
        );
    }

    #[test]
    fn register_replaces_and_unregister_removes() {
        let mut registry = BehaviorRegistry::empty();
        assert!(!registry.register("noop", |_ctx| Ok(BehaviorResult::processed(0))));
        assert!(registry.register("noop", |_ctx| Ok(BehaviorResult::processed(1))));
        assert!(registry.contains("noop"));
        assert!(registry.get_mut("noop").is_some());
        assert!(registry.unregister("noop"));
        assert!(!registry.contains("noop"));
    }

    #[test]
    fn result_builders() {
        let ok = BehaviorResult::processed(2).with("k", 1);
        assert!(ok.success);
        assert_eq!(ok.metadata["k"], json!(1));
        let soft = BehaviorResult::soft(SoftFailure::NoRoute);
        assert!(!soft.success);
        assert_eq!(soft.agents_processed, 0);
    }
}
