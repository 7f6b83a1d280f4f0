//! Processing nodes: ports, a keyed inventory, a sticky error field and the
//! tag of the behavior that runs on them each tick.

use crate::id::PortSide;
use crate::slot::{SlotCollection, SlotError};
use serde::{Deserialize, Serialize};

/// Maximum number of ports on each side of a node.
pub const MAX_PORTS: usize = 4;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structural errors when building a node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("a node has at most {MAX_PORTS} {side} ports")]
    TooManyPorts { side: PortSide },
    #[error("no {side} port at index {index}")]
    NoSuchPort { side: PortSide, index: usize },
}

/// A fault recorded on a node: either a hard fault raised by its behavior or
/// an inventory error. Sticky until cleared by an external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
    pub details: Option<String>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A connection point on one side of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub label: String,
    pub icon: String,
    connected: bool,
}

impl Port {
    pub fn new(label: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: icon.into(),
            connected: false,
        }
    }

    /// Mirrors whether a link currently occupies this port.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A processing unit on the slate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub title: String,
    pub icon: String,
    pub description: String,
    pub tooltip: String,
    flipped: bool,
    reversed: bool,
    locked: bool,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    inventory: SlotCollection,
    error: Option<Fault>,
    behavior: String,
}

impl Node {
    /// Create a node with no ports that runs the behavior tagged `behavior`.
    pub fn new(title: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: String::new(),
            description: String::new(),
            tooltip: String::new(),
            flipped: false,
            reversed: false,
            locked: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            inventory: SlotCollection::new(),
            error: None,
            behavior: behavior.into(),
        }
    }

    /// Create a node with `inputs` and `outputs` unlabeled ports.
    pub fn with_ports(
        title: impl Into<String>,
        behavior: impl Into<String>,
        inputs: usize,
        outputs: usize,
    ) -> Result<Self, NodeError> {
        let mut node = Self::new(title, behavior);
        for _ in 0..inputs {
            node.add_port(PortSide::Input, Port::default())?;
        }
        for _ in 0..outputs {
            node.add_port(PortSide::Output, Port::default())?;
        }
        Ok(node)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    pub fn behavior(&self) -> &str {
        &self.behavior
    }

    // -----------------------------------------------------------------------
    // Ports
    // -----------------------------------------------------------------------

    /// Append a port. Returns its index.
    pub fn add_port(&mut self, side: PortSide, port: Port) -> Result<usize, NodeError> {
        let ports = self.ports_mut(side);
        if ports.len() >= MAX_PORTS {
            return Err(NodeError::TooManyPorts { side });
        }
        ports.push(Port {
            connected: false,
            ..port
        });
        Ok(ports.len() - 1)
    }

    /// Relabel a port. Labels on output ports double as routing filters for
    /// `smart_split`.
    pub fn set_port_label(
        &mut self,
        side: PortSide,
        index: usize,
        label: impl Into<String>,
    ) -> Result<(), NodeError> {
        let port = self
            .ports_mut(side)
            .get_mut(index)
            .ok_or(NodeError::NoSuchPort { side, index })?;
        port.label = label.into();
        Ok(())
    }

    pub fn ports(&self, side: PortSide) -> &[Port] {
        match side {
            PortSide::Input => &self.inputs,
            PortSide::Output => &self.outputs,
        }
    }

    fn ports_mut(&mut self, side: PortSide) -> &mut Vec<Port> {
        match side {
            PortSide::Input => &mut self.inputs,
            PortSide::Output => &mut self.outputs,
        }
    }

    pub fn port(&self, side: PortSide, index: usize) -> Option<&Port> {
        self.ports(side).get(index)
    }

    pub fn port_count(&self, side: PortSide) -> usize {
        self.ports(side).len()
    }

    /// Mark a port as occupied. Only links call this.
    pub(crate) fn connect_port(&mut self, side: PortSide, index: usize) {
        if let Some(port) = self.ports_mut(side).get_mut(index) {
            port.connected = true;
        }
    }

    /// Mark a port as free. Only links call this.
    pub(crate) fn disconnect_port(&mut self, side: PortSide, index: usize) {
        if let Some(port) = self.ports_mut(side).get_mut(index) {
            port.connected = false;
        }
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Toggle the position lock. Returns the new value.
    pub fn toggle_locked(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }

    /// Toggle the stacking order of the port rows. Returns the new value.
    pub fn toggle_flipped(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }

    /// Toggle which side the inputs are drawn on. Returns the new value.
    pub fn toggle_reversed(&mut self) -> bool {
        self.reversed = !self.reversed;
        self.reversed
    }

    // -----------------------------------------------------------------------
    // Error state
    // -----------------------------------------------------------------------

    pub fn error(&self) -> Option<&Fault> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn set_error(&mut self, fault: Fault) {
        self.error = Some(fault);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    pub fn inventory(&self) -> &SlotCollection {
        &self.inventory
    }

    pub fn create_inventory_slot(
        &mut self,
        key: &str,
        cap: u32,
        initial: u32,
    ) -> Result<(), SlotError> {
        self.inventory.create(key, cap, initial)
    }

    /// Add what fits. A missing slot or a truncated add is recorded in the
    /// node's error field. Returns the amount added.
    pub fn add_to_inventory(&mut self, key: &str, amount: u32) -> u32 {
        match self.inventory.add(key, amount) {
            Ok(added) => {
                if added < amount {
                    self.set_error(
                        Fault::new("inventory full")
                            .with_details(format!("{key}: stored {added} of {amount}")),
                    );
                }
                added
            }
            Err(err) => {
                self.set_error(Fault::new("missing inventory slot").with_details(err.to_string()));
                0
            }
        }
    }

    /// Remove exactly `amount` or nothing. A shortfall is recorded in the
    /// node's error field. Returns the amount removed.
    pub fn remove_from_inventory(&mut self, key: &str, amount: u32) -> u32 {
        if !self.inventory.has_enough(key, amount) {
            self.set_error(Fault::new(format!("insufficient {key}")).with_details(format!(
                "needed {amount}, have {}",
                self.inventory.quantity(key)
            )));
            return 0;
        }
        self.inventory.remove(key, amount)
    }
}
