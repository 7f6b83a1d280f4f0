//! The tick engine.
//!
//! A [`Scheduler`] runs every node of a [`Slate`] once per tick, in
//! breadth-first order from the graph's entry nodes. It owns the behavior
//! registry and the per-node rotation state that round-robin behaviors keep
//! across ticks.
//!
//! Ticks can be driven two ways:
//!
//! - [`Scheduler::tick`] steps once, regardless of run state.
//! - [`Scheduler::advance`] feeds elapsed host time; while running, every
//!   whole tick interval becomes one tick and the remainder carries forward.

use crate::behavior::{BehaviorContext, BehaviorRegistry, BehaviorResult, Rotation};
use crate::config::{EngineConfig, MIN_TICK_INTERVAL_MS};
use crate::graph::Slate;
use crate::id::NodeId;
use crate::node::Fault;
use crate::pool::ResourcePool;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// Errors from scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("tick interval {requested_ms}ms is below the {MIN_TICK_INTERVAL_MS}ms minimum")]
    IntervalTooShort { requested_ms: u64 },
}

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Stopped,
    Running,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one node during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRun {
    /// The behavior returned a result, successful or soft-failed.
    Completed(BehaviorResult),
    /// The behavior raised a hard fault, now recorded on the node.
    Faulted(Fault),
    /// No handler is registered for the node's tag. The node was skipped.
    UnknownBehavior,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: NodeId,
    pub tag: String,
    pub run: NodeRun,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Order the nodes were visited in.
    pub order: Vec<NodeId>,
    pub runs: Vec<NodeReport>,
}

impl TickReport {
    pub fn run_for(&self, node: NodeId) -> Option<&NodeRun> {
        self.runs.iter().find(|r| r.node == node).map(|r| &r.run)
    }

    /// The behavior result for `node`, if its behavior completed.
    pub fn result_for(&self, node: NodeId) -> Option<&BehaviorResult> {
        match self.run_for(node)? {
            NodeRun::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Agents processed across all nodes.
    pub fn agents_processed(&self) -> u32 {
        self.runs
            .iter()
            .filter_map(|r| match &r.run {
                NodeRun::Completed(result) => Some(result.agents_processed),
                _ => None,
            })
            .sum()
    }

    pub fn fault_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| matches!(r.run, NodeRun::Faulted(_)))
            .count()
    }
}

/// Read-only scheduler status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub running: bool,
    pub tick_count: u64,
    pub tick_interval_ms: u64,
    pub last_delta: Duration,
}

/// Persisted part of a scheduler. Handlers and timing are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SchedulerSnapshot {
    pub tick_count: u64,
    pub tick_interval_ms: u64,
    pub rotations: SecondaryMap<NodeId, Rotation>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Scheduler {
    registry: BehaviorRegistry,
    /// Round-robin cursors keyed by node. Entries for removed nodes are
    /// dropped at the start of each tick.
    rotations: SecondaryMap<NodeId, Rotation>,
    state: RunState,
    tick_count: u64,
    tick_interval: Duration,
    /// Elapsed time not yet converted into a tick.
    accumulator: Duration,
    last_tick_at: Option<Duration>,
    last_delta: Duration,
    epoch: Instant,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::with_registry(BehaviorRegistry::standard())
    }
}

impl Scheduler {
    /// A stopped scheduler with the default interval.
    pub fn with_registry(registry: BehaviorRegistry) -> Self {
        Self {
            registry,
            rotations: SecondaryMap::new(),
            state: RunState::Stopped,
            tick_count: 0,
            tick_interval: Duration::from_millis(EngineConfig::default().tick_interval_ms),
            accumulator: Duration::ZERO,
            last_tick_at: None,
            last_delta: Duration::ZERO,
            epoch: Instant::now(),
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        registry: BehaviorRegistry,
    ) -> Result<Self, SchedulerError> {
        let mut scheduler = Self::with_registry(registry);
        scheduler.set_tick_interval(config.tick_interval_ms)?;
        Ok(scheduler)
    }

    pub(crate) fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            tick_count: self.tick_count,
            tick_interval_ms: self.tick_interval_ms(),
            rotations: self.rotations.clone(),
        }
    }

    /// Rebuild a stopped scheduler from a snapshot.
    pub(crate) fn restore(
        snapshot: SchedulerSnapshot,
        registry: BehaviorRegistry,
    ) -> Result<Self, SchedulerError> {
        let mut scheduler = Self::with_registry(registry);
        scheduler.set_tick_interval(snapshot.tick_interval_ms)?;
        scheduler.tick_count = snapshot.tick_count;
        scheduler.rotations = snapshot.rotations;
        Ok(scheduler)
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BehaviorRegistry {
        &mut self.registry
    }

    /// Rotation state of `node`, if it has run yet.
    pub fn rotation(&self, node: NodeId) -> Option<Rotation> {
        self.rotations.get(node).copied()
    }

    // -----------------------------------------------------------------------
    // Run state
    // -----------------------------------------------------------------------

    pub fn start(&mut self) {
        if self.state == RunState::Running {
            return;
        }
        self.state = RunState::Running;
        info!(interval_ms = self.tick_interval_ms(), "scheduler started");
    }

    /// Stop running. Any partially elapsed interval is discarded.
    pub fn stop(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        self.state = RunState::Stopped;
        self.accumulator = Duration::ZERO;
        info!(ticks = self.tick_count, "scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Stop and zero the tick counter and timing. Rotation state is cleared.
    pub fn reset(&mut self) {
        self.stop();
        self.tick_count = 0;
        self.accumulator = Duration::ZERO;
        self.last_tick_at = None;
        self.last_delta = Duration::ZERO;
        self.rotations.clear();
        self.epoch = Instant::now();
        info!("scheduler reset");
    }

    pub fn tick_interval_ms(&self) -> u64 {
        u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX)
    }

    /// Change the tick interval. Intervals below [`MIN_TICK_INTERVAL_MS`]
    /// are rejected and leave the scheduler untouched. While running, the
    /// change stops and restarts the scheduler.
    pub fn set_tick_interval(&mut self, ms: u64) -> Result<(), SchedulerError> {
        if ms < MIN_TICK_INTERVAL_MS {
            return Err(SchedulerError::IntervalTooShort { requested_ms: ms });
        }
        let was_running = self.is_running();
        if was_running {
            self.stop();
        }
        self.tick_interval = Duration::from_millis(ms);
        info!(interval_ms = ms, "tick interval changed");
        if was_running {
            self.start();
        }
        Ok(())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn last_delta(&self) -> Duration {
        self.last_delta
    }

    pub fn summary(&self) -> SchedulerSummary {
        SchedulerSummary {
            running: self.is_running(),
            tick_count: self.tick_count,
            tick_interval_ms: self.tick_interval_ms(),
            last_delta: self.last_delta,
        }
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Feed elapsed host time. While running, runs one tick per whole
    /// interval accumulated. Does nothing while stopped.
    pub fn advance(
        &mut self,
        elapsed: Duration,
        slate: &mut Slate,
        pool: &mut ResourcePool,
    ) -> Vec<TickReport> {
        let due = self.due_ticks(elapsed);
        (0..due).map(|_| self.tick(slate, pool)).collect()
    }

    /// Accumulate elapsed host time and return how many whole intervals are
    /// now due. Always 0 while stopped. The caller runs the ticks.
    pub fn due_ticks(&mut self, elapsed: Duration) -> u32 {
        if !self.is_running() {
            return 0;
        }
        self.accumulator += elapsed;
        let mut due = 0;
        while self.accumulator >= self.tick_interval {
            self.accumulator -= self.tick_interval;
            due += 1;
        }
        due
    }

    /// Run one tick now, measured against the wall clock.
    pub fn tick(&mut self, slate: &mut Slate, pool: &mut ResourcePool) -> TickReport {
        let now = self.epoch.elapsed();
        self.tick_at(now, slate, pool)
    }

    /// Run one tick as if `now` had elapsed since the scheduler was created.
    pub fn tick_at(
        &mut self,
        now: Duration,
        slate: &mut Slate,
        pool: &mut ResourcePool,
    ) -> TickReport {
        let delta = self
            .last_tick_at
            .map_or(Duration::ZERO, |prev| now.saturating_sub(prev));
        self.last_tick_at = Some(now);
        self.last_delta = delta;
        self.tick_count += 1;
        let tick = self.tick_count;

        self.rotations.retain(|id, _| slate.contains_node(id));
        let order = slate.execution_order();
        trace!(tick, nodes = order.len(), "tick start");

        let mut runs = Vec::with_capacity(order.len());
        for &id in &order {
            let Some((node, inputs, outputs)) = slate.node_context(id) else {
                continue;
            };
            let tag = node.behavior().to_string();
            let Some(handler) = self.registry.get_mut(&tag) else {
                warn!(node = ?id, tag = %tag, "no behavior registered, skipping node");
                runs.push(NodeReport {
                    node: id,
                    tag,
                    run: NodeRun::UnknownBehavior,
                });
                continue;
            };
            let Some(rotation) = self.rotations.entry(id).map(|e| e.or_default()) else {
                continue;
            };

            let mut ctx = BehaviorContext {
                node_id: id,
                node,
                pool: &mut *pool,
                inputs,
                outputs,
                rotation,
                current_time: now,
                delta_time: delta,
                tick,
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut ctx)))
                .unwrap_or_else(|payload| {
                    Err(Fault::new("behavior panicked").with_details(panic_message(&*payload)))
                });
            let run = match outcome {
                Ok(result) => {
                    if !result.success {
                        trace!(node = ?id, tag = %tag, reason = ?result.error, "soft failure");
                    }
                    NodeRun::Completed(result)
                }
                Err(fault) => {
                    warn!(node = ?id, tag = %tag, error = %fault, details = ?fault.details, "behavior fault");
                    ctx.node.set_error(fault.clone());
                    NodeRun::Faulted(fault)
                }
            };
            runs.push(NodeReport { node: id, tag, run });
        }

        TickReport { tick, order, runs }
    }
}

/// Text of a panic payload, for the fault details.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
