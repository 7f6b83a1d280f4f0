//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::agent::Agent;
use crate::behavior::tags;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::graph::Slate;
use crate::id::{LinkId, NodeId};
use crate::node::Node;
use crate::pool::ResourcePool;
use crate::slot::SlotKind;

// ===========================================================================
// Node constructors
// ===========================================================================

/// An `emit` node with `outputs` output ports, titled like "Source x1".
pub fn source_node(outputs: usize) -> Node {
    Node::with_ports(format!("Source x{outputs}"), tags::EMIT, 0, outputs)
        .expect("port count within limit")
}

/// A `collect` node with `inputs` input ports, titled like "Sink x1".
pub fn sink_node(inputs: usize) -> Node {
    Node::with_ports(format!("Sink x{inputs}"), tags::COLLECT, inputs, 0)
        .expect("port count within limit")
}

/// A node running `behavior` with the given port counts.
pub fn relay_node(behavior: &str, inputs: usize, outputs: usize) -> Node {
    Node::with_ports(behavior.to_string(), behavior, inputs, outputs)
        .expect("port count within limit")
}

// ===========================================================================
// Wiring
// ===========================================================================

/// Link `source`'s output `source_port` to `target`'s input `target_port`.
pub fn wire(
    slate: &mut Slate,
    source: NodeId,
    source_port: usize,
    target: NodeId,
    target_port: usize,
) -> LinkId {
    slate
        .add_link(source, source_port, target, target_port)
        .expect("valid link")
}

// ===========================================================================
// Pool and agents
// ===========================================================================

/// A pool full of `agents` agents.
pub fn pool_with_agents(agents: u32) -> ResourcePool {
    ResourcePool::new(agents, agents)
}

/// Spawn an agent from `pool` and give it slots as `(kind, key, cap, initial)`.
pub fn agent_with(pool: &mut ResourcePool, slots: &[(SlotKind, &str, u32, u32)]) -> Agent {
    let mut agent = pool.spawn_agent().expect("pool has an agent to spawn");
    for &(kind, key, cap, initial) in slots {
        agent
            .create_slot(kind, key, cap, initial)
            .expect("unique slot key");
    }
    agent
}

// ===========================================================================
// Slate builders (for benchmarks, stress tests, and proptests)
// ===========================================================================

fn engine_with_agents(agents: u32) -> Engine {
    let config = EngineConfig {
        agent_cap: agents,
        initial_agents: agents,
        ..EngineConfig::default()
    };
    Engine::new(config).expect("valid config")
}

/// Source -> print -> ... -> print -> Sink, with `relays` print nodes.
pub fn build_chain(relays: usize, agents: u32) -> Engine {
    let mut engine = engine_with_agents(agents);
    let mut prev = engine.add_node(source_node(1), 0, 0);
    for i in 0..relays {
        let relay = engine.add_node(relay_node(tags::PRINT, 1, 1), 32 * (i as i32 + 1), 0);
        wire(engine.slate_mut(), prev, 0, relay, 0);
        prev = relay;
    }
    let sink = engine.add_node(sink_node(1), 32 * (relays as i32 + 1), 0);
    wire(engine.slate_mut(), prev, 0, sink, 0);
    engine
}

/// `pairs` independent Source -> Sink pairs sharing one pool.
pub fn build_pairs(pairs: usize, agents: u32) -> Engine {
    let mut engine = engine_with_agents(agents);
    for row in 0..pairs {
        let y = 32 * row as i32;
        let src = engine.add_node(source_node(1), 0, y);
        let dst = engine.add_node(sink_node(1), 64, y);
        wire(engine.slate_mut(), src, 0, dst, 0);
    }
    engine
}

/// A ring of `len` print nodes with no entry point. `len` must be at least 2.
pub fn build_ring(len: usize) -> (Slate, Vec<NodeId>) {
    let mut slate = Slate::default();
    let ids: Vec<NodeId> = (0..len)
        .map(|i| slate.add_node(relay_node(tags::PRINT, 1, 1), 32 * i as i32, 0))
        .collect();
    for i in 0..len {
        wire(&mut slate, ids[i], 0, ids[(i + 1) % len], 0);
    }
    (slate, ids)
}
