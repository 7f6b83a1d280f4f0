//! Bosuns: the mobile agents that flow through links carrying inventory.
//!
//! Agents are minted only by [`ResourcePool::spawn_agent`] and absorbed only
//! by [`ResourcePool::return_agent`]. In between they are moved (never
//! cloned into a second identity) between link queues and behaviors.
//!
//! [`ResourcePool::spawn_agent`]: crate::pool::ResourcePool::spawn_agent
//! [`ResourcePool::return_agent`]: crate::pool::ResourcePool::return_agent

use crate::fixed::{Fixed64, fixed64_to_f64, non_negative};
use crate::id::AgentId;
use crate::slot::{Inventory, SlotError, SlotKind};
use serde::{Deserialize, Serialize};

/// A mobile unit with its own capped inventory.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    name: String,
    /// Cells per second. Never negative.
    speed: Fixed64,
    inventory: Inventory,
    #[serde(default)]
    tooltip: String,
}

impl Agent {
    pub(crate) fn new(id: AgentId, name: String) -> Self {
        Self {
            id,
            name,
            speed: Fixed64::from_num(1),
            inventory: Inventory::new(),
            tooltip: String::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Speed / tooltip
    // -----------------------------------------------------------------------

    pub fn speed(&self) -> Fixed64 {
        self.speed
    }

    /// Set the speed, flooring negative values at zero.
    pub fn set_speed(&mut self, speed: Fixed64) {
        self.speed = non_negative(speed);
    }

    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) {
        self.tooltip = tooltip.into();
    }

    pub fn clear_tooltip(&mut self) {
        self.tooltip.clear();
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

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

    /// Add to an existing slot. Returns the amount that fit.
    pub fn add(&mut self, kind: SlotKind, key: &str, amount: u32) -> Result<u32, SlotError> {
        self.inventory.collection_mut(kind).add(key, amount)
    }

    /// Remove from a slot. Returns the amount actually removed.
    pub fn remove(&mut self, kind: SlotKind, key: &str, amount: u32) -> u32 {
        self.inventory.collection_mut(kind).remove(key, amount)
    }

    pub fn has_enough(&self, kind: SlotKind, key: &str, amount: u32) -> bool {
        self.inventory.collection(kind).has_enough(key, amount)
    }

    /// True if the agent carries a positive quantity of `key` in either
    /// collection.
    pub fn carries(&self, key: &str) -> bool {
        self.inventory.resources.quantity(key) > 0 || self.inventory.items.quantity(key) > 0
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serialize this agent to JSON.
    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore an agent from JSON produced by [`Agent::serialize`].
    pub fn deserialize(json: &str) -> Result<Self, serde_json::Error> {
        let mut agent: Agent = serde_json::from_str(json)?;
        agent.speed = non_negative(agent.speed);
        Ok(agent)
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} (speed {}, {} resources, {} items)",
            self.name,
            self.id,
            fixed64_to_f64(self.speed),
            self.inventory.resources.len(),
            self.inventory.items.len()
        )
    }
}
