//! The shared reservoir (the "infinity well"): an agent-count slot plus keyed
//! resource and item slots.
//!
//! The pool is the only place agents are minted and absorbed. Spawning takes
//! one unit from the agent slot; returning puts one back, and fails without
//! side effects when the slot is already at its cap.

use crate::agent::Agent;
use crate::config::EngineConfig;
use crate::id::AgentId;
use crate::rng::SimRng;
use crate::slot::{Inventory, Slot, SlotCollection, SlotError, SlotKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default cap for resource slots auto-created while collecting from agents.
pub const DEFAULT_RESOURCE_CAP: u32 = 10_000;

/// Default cap for item slots auto-created while collecting from agents.
pub const DEFAULT_ITEM_CAP: u32 = 1_000;

const NAME_HEADS: &[&str] = &[
    "Bar", "Cor", "Dun", "Fen", "Gal", "Har", "Jol", "Kes", "Lom", "Mar", "Nol", "Pell", "Quin",
    "Ros", "Sal", "Tam", "Vik", "Wen",
];

const NAME_TAILS: &[&str] = &[
    "wick", "ley", "ton", "by", "rick", "well", "mond", "ford", "ling", "wyn", "stead", "hart",
    "combe", "den",
];

/// Read-only view of the whole pool, for UI and save collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub agent_slot: Slot,
    pub resource_slots: Vec<(String, Slot)>,
    pub item_slots: Vec<(String, Slot)>,
}

/// Shared reservoir of agents, resources and items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    agents: Slot,
    inventory: Inventory,
    next_agent_id: u64,
    rng: SimRng,
    resource_default_cap: u32,
    item_default_cap: u32,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ResourcePool {
    /// Create a pool holding `initial_agents` of `agent_cap` agents.
    pub fn new(agent_cap: u32, initial_agents: u32) -> Self {
        Self {
            agents: Slot::new(agent_cap, initial_agents),
            inventory: Inventory::new(),
            next_agent_id: 1,
            rng: SimRng::new(EngineConfig::default().name_seed),
            resource_default_cap: DEFAULT_RESOURCE_CAP,
            item_default_cap: DEFAULT_ITEM_CAP,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            agents: Slot::new(config.agent_cap, config.initial_agents),
            inventory: Inventory::new(),
            next_agent_id: 1,
            rng: SimRng::new(config.name_seed),
            resource_default_cap: config.resource_default_cap,
            item_default_cap: config.item_default_cap,
        }
    }

    // -----------------------------------------------------------------------
    // Slot CRUD
    // -----------------------------------------------------------------------

    pub fn create_slot(
        &mut self,
        kind: SlotKind,
        key: &str,
        cap: u32,
        initial: u32,
    ) -> Result<(), SlotError> {
        self.inventory.collection_mut(kind).create(key, cap, initial)
    }

    pub fn quantity(&self, kind: SlotKind, key: &str) -> u32 {
        self.inventory.collection(kind).quantity(key)
    }

    pub fn cap(&self, kind: SlotKind, key: &str) -> u32 {
        self.inventory.collection(kind).cap(key)
    }

    pub fn set_cap(&mut self, kind: SlotKind, key: &str, cap: u32) {
        self.inventory.collection_mut(kind).set_cap(key, cap);
    }

    /// Add to an existing slot. Returns the amount that fit.
    pub fn add(&mut self, kind: SlotKind, key: &str, amount: u32) -> Result<u32, SlotError> {
        self.inventory.collection_mut(kind).add(key, amount)
    }

    /// Remove from a slot. Returns the amount removed (0 for missing keys).
    pub fn remove(&mut self, kind: SlotKind, key: &str, amount: u32) -> u32 {
        self.inventory.collection_mut(kind).remove(key, amount)
    }

    pub fn has_enough(&self, kind: SlotKind, key: &str, amount: u32) -> bool {
        self.inventory.collection(kind).has_enough(key, amount)
    }

    /// Collecting path: create the slot with the default cap for `kind` if it
    /// is missing, then add. Returns the amount that fit.
    pub fn absorb(&mut self, kind: SlotKind, key: &str, amount: u32) -> u32 {
        let default_cap = self.default_cap(kind);
        self.inventory
            .collection_mut(kind)
            .ensure(key, default_cap)
            .add(amount)
    }

    /// Cap given to slots auto-created by [`ResourcePool::absorb`].
    pub fn default_cap(&self, kind: SlotKind) -> u32 {
        match kind {
            SlotKind::Resource => self.resource_default_cap,
            SlotKind::Item => self.item_default_cap,
        }
    }

    pub fn resources(&self) -> &SlotCollection {
        &self.inventory.resources
    }

    pub fn items(&self) -> &SlotCollection {
        &self.inventory.items
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Agents currently resting in the pool.
    pub fn agent_quantity(&self) -> u32 {
        self.agents.quantity()
    }

    pub fn agent_cap(&self) -> u32 {
        self.agents.cap()
    }

    pub fn set_agent_cap(&mut self, cap: u32) {
        self.agents.set_cap(cap);
    }

    /// Add agents to the pool (e.g. an upgrade). Returns how many fit.
    pub fn add_agents(&mut self, amount: u32) -> u32 {
        self.agents.add(amount)
    }

    /// Take one agent out of the pool. Returns `None` when none are available.
    pub fn spawn_agent(&mut self) -> Option<Agent> {
        if self.agents.remove(1) == 0 {
            return None;
        }
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        let name = self.generate_name();
        debug!(agent = %id, %name, remaining = self.agents.quantity(), "agent spawned");
        Some(Agent::new(id, name))
    }

    /// Put an agent back into the pool.
    ///
    /// Returns the agent unchanged in `Err` when the pool is at its agent cap;
    /// the caller keeps ownership.
    pub fn return_agent(&mut self, agent: Agent) -> Result<(), Agent> {
        if self.agents.add(1) == 0 {
            debug!(agent = %agent.id(), "pool at agent cap, return refused");
            return Err(agent);
        }
        debug!(agent = %agent.id(), pooled = self.agents.quantity(), "agent returned");
        Ok(())
    }

    fn generate_name(&mut self) -> String {
        let head = self.rng.pick(NAME_HEADS).copied().unwrap_or("Bos");
        let tail = self.rng.pick(NAME_TAILS).copied().unwrap_or("un");
        format!("{head}{tail}")
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn summary(&self) -> PoolSummary {
        PoolSummary {
            agent_slot: self.agents,
            resource_slots: self
                .inventory
                .resources
                .iter()
                .map(|(k, s)| (k.to_string(), *s))
                .collect(),
            item_slots: self
                .inventory
                .items
                .iter()
                .map(|(k, s)| (k.to_string(), *s))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn spawn_until_empty() {
        let mut pool = ResourcePool::new(5, 5);
        let mut ids = HashSet::new();
        for _ in 0..5 {
            let agent = pool.spawn_agent().unwrap();
            ids.insert(agent.id());
        }
        assert_eq!(ids.len(), 5);
        assert_eq!(pool.agent_quantity(), 0);
        assert!(pool.spawn_agent().is_none());
    }

    #[test]
    fn spawned_ids_increase() {
        let mut pool = ResourcePool::new(3, 3);
        let a = pool.spawn_agent().unwrap();
        let b = pool.spawn_agent().unwrap();
        assert!(a.id() < b.id());
        assert_eq!(a.id(), AgentId(1));
    }

    #[test]
    fn ids_not_reused_after_return() {
        let mut pool = ResourcePool::new(1, 1);
        let a = pool.spawn_agent().unwrap();
        let first = a.id();
        pool.return_agent(a).unwrap();
        let b = pool.spawn_agent().unwrap();
        assert!(b.id() > first);
    }

    #[test]
    fn names_are_two_syllable_combinations() {
        let mut pool = ResourcePool::new(10, 10);
        for _ in 0..10 {
            let agent = pool.spawn_agent().unwrap();
            let name = agent.name();
            assert!(NAME_HEADS.iter().any(|h| name.starts_with(h)));
            assert!(NAME_TAILS.iter().any(|t| name.ends_with(t)));
        }
    }

    #[test]
    fn same_seed_same_names() {
        let mut a = ResourcePool::new(4, 4);
        let mut b = ResourcePool::new(4, 4);
        for _ in 0..4 {
            assert_eq!(
                a.spawn_agent().unwrap().name(),
                b.spawn_agent().unwrap().name()
            );
        }
    }

    #[test]
    fn return_at_cap_hands_agent_back() {
        let mut pool = ResourcePool::new(2, 1);
        let agent = pool.spawn_agent().unwrap();
        pool.add_agents(5);
        assert_eq!(pool.agent_quantity(), 2);
        let rejected = pool.return_agent(agent).unwrap_err();
        assert_eq!(rejected.id(), AgentId(1));
        assert_eq!(pool.agent_quantity(), 2);
    }

    #[test]
    fn return_below_cap_increments() {
        let mut pool = ResourcePool::new(2, 2);
        let agent = pool.spawn_agent().unwrap();
        assert_eq!(pool.agent_quantity(), 1);
        assert!(pool.return_agent(agent).is_ok());
        assert_eq!(pool.agent_quantity(), 2);
    }

    #[test]
    fn absorb_auto_creates_with_default_caps() {
        let mut pool = ResourcePool::new(1, 1);
        assert_eq!(pool.absorb(SlotKind::Resource, "Gold", 50), 50);
        assert_eq!(pool.cap(SlotKind::Resource, "Gold"), DEFAULT_RESOURCE_CAP);
        assert_eq!(pool.absorb(SlotKind::Item, "Rope", 2), 2);
        assert_eq!(pool.cap(SlotKind::Item, "Rope"), DEFAULT_ITEM_CAP);
    }

    #[test]
    fn absorb_respects_existing_cap() {
        let mut pool = ResourcePool::new(1, 1);
        pool.create_slot(SlotKind::Resource, "Gold", 10, 8).unwrap();
        assert_eq!(pool.absorb(SlotKind::Resource, "Gold", 50), 2);
        assert_eq!(pool.quantity(SlotKind::Resource, "Gold"), 10);
    }

    #[test]
    fn slot_crud_matches_collection_contract() {
        let mut pool = ResourcePool::new(1, 1);
        pool.create_slot(SlotKind::Item, "Rope", 3, 0).unwrap();
        assert!(pool.create_slot(SlotKind::Item, "Rope", 3, 0).is_err());
        assert!(pool.add(SlotKind::Item, "Chain", 1).is_err());
        assert_eq!(pool.add(SlotKind::Item, "Rope", 5).unwrap(), 3);
        assert_eq!(pool.remove(SlotKind::Item, "Chain", 1), 0);
        assert!(pool.has_enough(SlotKind::Item, "Rope", 3));
        pool.set_cap(SlotKind::Item, "Rope", 1);
        assert_eq!(pool.quantity(SlotKind::Item, "Rope"), 1);
    }

    #[test]
    fn summary_lists_all_slots() {
        let mut pool = ResourcePool::new(5, 3);
        pool.create_slot(SlotKind::Resource, "Gold", 10, 1).unwrap();
        pool.create_slot(SlotKind::Item, "Rope", 10, 2).unwrap();
        let summary = pool.summary();
        assert_eq!(summary.agent_slot, Slot::new(5, 3));
        assert_eq!(summary.resource_slots, vec![("Gold".to_string(), Slot::new(10, 1))]);
        assert_eq!(summary.item_slots, vec![("Rope".to_string(), Slot::new(10, 2))]);
    }

    #[test]
    fn from_config_applies_caps() {
        let config = EngineConfig {
            agent_cap: 9,
            initial_agents: 4,
            resource_default_cap: 77,
            ..EngineConfig::default()
        };
        let mut pool = ResourcePool::from_config(&config);
        assert_eq!(pool.agent_cap(), 9);
        assert_eq!(pool.agent_quantity(), 4);
        pool.absorb(SlotKind::Resource, "Gold", 1);
        assert_eq!(pool.cap(SlotKind::Resource, "Gold"), 77);
    }
}
