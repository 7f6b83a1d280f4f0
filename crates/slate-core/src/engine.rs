//! The engine: owns one slate, its pool and its scheduler.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`Slate`] (nodes and the links between their ports)
//! - A [`ResourcePool`] (agents, resources, items)
//! - A [`Scheduler`] (behavior registry, rotation state, run state)
//! - A [`CommandQueue`] of edits waiting for the next tick boundary
//!
//! # Tick
//!
//! Each [`Engine::tick`]:
//! 1. applies queued commands in submission order
//! 2. runs every node once, breadth-first from the entry nodes
//!
//! Edits can also be made immediately through the graph methods, which is
//! what the UI does between ticks.

use crate::behavior::BehaviorRegistry;
use crate::command_queue::{AppliedCommand, Command, CommandOutcome, CommandQueue};
use crate::config::{ConfigError, EngineConfig};
use crate::graph::{GridPosition, Slate};
use crate::id::{LinkId, NodeId};
use crate::link::LinkError;
use crate::node::Node;
use crate::pool::{PoolSummary, ResourcePool};
use crate::query::{LinkView, NodeView};
use crate::scheduler::{Scheduler, SchedulerError, SchedulerSummary, TickReport};
use std::time::Duration;

/// Result of one engine tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Outcomes of the queued commands applied before the tick, in order.
    pub commands: Vec<CommandOutcome>,
    pub tick: TickReport,
}

#[derive(Debug)]
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) slate: Slate,
    pub(crate) pool: ResourcePool,
    pub(crate) scheduler: Scheduler,
    pub(crate) commands: CommandQueue,
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            slate: Slate::new(config.cell_size),
            pool: ResourcePool::from_config(&config),
            scheduler: Scheduler::default(),
            commands: CommandQueue::new(),
            config,
        }
    }
}

impl Engine {
    /// Create an engine with the standard behaviors.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_registry(config, BehaviorRegistry::standard())
    }

    /// Create an engine with a custom behavior registry.
    pub fn with_registry(
        config: EngineConfig,
        registry: BehaviorRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = Scheduler::from_config(&config, registry)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            slate: Slate::new(config.cell_size),
            pool: ResourcePool::from_config(&config),
            scheduler,
            commands: CommandQueue::new(),
            config,
        })
    }

    /// Keep up to `max_history` applied commands.
    pub fn with_command_history(mut self, max_history: usize) -> Self {
        self.commands = CommandQueue::with_max_history(max_history);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn slate(&self) -> &Slate {
        &self.slate
    }

    pub fn slate_mut(&mut self) -> &mut Slate {
        &mut self.slate
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ResourcePool {
        &mut self.pool
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn registry_mut(&mut self) -> &mut BehaviorRegistry {
        self.scheduler.registry_mut()
    }

    // -----------------------------------------------------------------------
    // Graph edits (immediate)
    // -----------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node, x: i32, y: i32) -> NodeId {
        self.slate.add_node(node, x, y)
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        self.slate.remove_node(id)
    }

    /// False if the node is locked or missing.
    pub fn move_node(&mut self, id: NodeId, x: i32, y: i32) -> bool {
        self.slate.move_node(id, x, y)
    }

    pub fn add_link(
        &mut self,
        source: NodeId,
        source_port: usize,
        target: NodeId,
        target_port: usize,
    ) -> Result<LinkId, LinkError> {
        self.slate.add_link(source, source_port, target, target_port)
    }

    pub fn remove_link(&mut self, id: LinkId) -> bool {
        self.slate.remove_link(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slate.node(id)
    }

    pub fn position(&self, id: NodeId) -> Option<GridPosition> {
        self.slate.position(id)
    }

    pub fn node_count(&self) -> usize {
        self.slate.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.slate.link_count()
    }

    // -----------------------------------------------------------------------
    // Queued commands
    // -----------------------------------------------------------------------

    /// Queue an edit for the next tick boundary.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn submit_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.push_batch(commands);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    /// Queued commands already applied, oldest first. Empty unless built
    /// with [`Engine::with_command_history`].
    pub fn command_history(&self) -> impl ExactSizeIterator<Item = &AppliedCommand> {
        self.commands.history()
    }

    /// Apply one edit now.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        command.apply(&mut self.slate)
    }

    fn apply_pending(&mut self) -> Vec<CommandOutcome> {
        let tick = self.scheduler.tick_count() + 1;
        self.commands.apply_pending(tick, &mut self.slate)
    }

    // -----------------------------------------------------------------------
    // Scheduler
    // -----------------------------------------------------------------------

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Run one tick now, whether or not the scheduler is running.
    pub fn tick(&mut self) -> StepReport {
        let commands = self.apply_pending();
        let tick = self.scheduler.tick(&mut self.slate, &mut self.pool);
        StepReport { commands, tick }
    }

    /// Feed elapsed host time; runs one tick per whole interval while
    /// running.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<StepReport> {
        let due = self.scheduler.due_ticks(elapsed);
        (0..due).map(|_| self.tick()).collect()
    }

    /// Fails, leaving the interval unchanged, below the 100 ms minimum.
    pub fn set_tick_interval(&mut self, ms: u64) -> Result<(), SchedulerError> {
        self.scheduler.set_tick_interval(ms)?;
        self.config.tick_interval_ms = ms;
        Ok(())
    }

    /// Stop and zero the tick counter.
    pub fn reset(&mut self) {
        self.scheduler.reset();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn scheduler_summary(&self) -> SchedulerSummary {
        self.scheduler.summary()
    }

    pub fn pool_summary(&self) -> PoolSummary {
        self.pool.summary()
    }

    pub fn node_view(&self, id: NodeId) -> Option<NodeView> {
        NodeView::capture(&self.slate, id)
    }

    /// Views of every node, in container order.
    pub fn node_views(&self) -> Vec<NodeView> {
        self.slate
            .node_ids()
            .into_iter()
            .filter_map(|id| self.node_view(id))
            .collect()
    }

    pub fn link_view(&self, id: LinkId) -> Option<LinkView> {
        LinkView::capture(&self.slate, id)
    }

    /// Views of every link, in creation order.
    pub fn link_views(&self) -> Vec<LinkView> {
        self.slate
            .links()
            .filter_map(|(id, _)| self.link_view(id))
            .collect()
    }
}
