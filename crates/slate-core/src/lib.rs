//! Slate Core -- the production-graph simulation for the crafting game.
//!
//! Agents ("bosuns") leave a shared pool, travel along FIFO links between
//! node ports, and come back carrying resources and items. Each node runs a
//! tag-dispatched behavior once per tick.
//!
//! # Tick
//!
//! Each call to [`engine::Engine::tick`]:
//!
//! 1. Applies queued [`command_queue::Command`]s (graph edits).
//! 2. Orders the nodes breadth-first from every node with no input links.
//!    Nodes no entry reaches (isolated cycles) go last. Every node runs at
//!    most once per tick.
//! 3. Runs each node's behavior. Soft failures (nothing to do) are reported
//!    and ignored; hard faults are recorded on the node and the tick carries
//!    on with the next node.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- owns the slate, the pool and the scheduler.
//! - [`graph::Slate`] -- nodes, links and execution order.
//! - [`pool::ResourcePool`] -- agent slot plus resource and item slots.
//! - [`agent::Agent`] -- a bosun with its own capped inventory.
//! - [`link::Link`] -- FIFO queue of agents between two ports.
//! - [`behavior::BehaviorRegistry`] -- tag to handler map with the standard
//!   `emit`, `collect`, `print`, `split`, `merge` and `smart_split`.
//! - [`scheduler::Scheduler`] -- run state, tick interval and tick reports.
//! - [`config::EngineConfig`] -- TOML-loadable tunables.
//! - [`serialize`] -- versioned binary snapshots via bitcode.

pub mod agent;
pub mod behavior;
pub mod command_queue;
pub mod config;
pub mod engine;
pub mod fixed;
pub mod graph;
pub mod id;
pub mod link;
pub mod node;
pub mod pool;
pub mod query;
pub mod rng;
pub mod scheduler;
pub mod serialize;
pub mod slot;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
