//! Binary snapshots of a whole engine via `bitcode`, with a versioned header.
//!
//! Behavior handlers are closures and are not saved. Loading installs the
//! standard registry (or one supplied by the caller) and always returns a
//! stopped scheduler; the tick count and rotation state are kept.

use crate::behavior::BehaviorRegistry;
use crate::command_queue::CommandQueue;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::graph::Slate;
use crate::pool::ResourcePool;
use crate::scheduler::{Scheduler, SchedulerSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a slate snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5147_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot holds invalid state: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header stored at the front of every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count when the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Decode a snapshot and return only its header.
///
/// bitcode has no partial decoding, so this decodes the whole payload.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Snapshot layout
// ---------------------------------------------------------------------------

/// Borrowed form written by [`Engine::serialize`]. Field order must match
/// [`EngineSnapshot`].
#[derive(Serialize)]
struct EngineSnapshotRef<'a> {
    header: SnapshotHeader,
    config: &'a EngineConfig,
    slate: &'a Slate,
    pool: &'a ResourcePool,
    scheduler: SchedulerSnapshot,
}

#[derive(Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    config: EngineConfig,
    slate: Slate,
    pool: ResourcePool,
    scheduler: SchedulerSnapshot,
}

// ---------------------------------------------------------------------------
// Engine serialization methods
// ---------------------------------------------------------------------------

impl Engine {
    /// Serialize the engine to a binary blob. Pending commands and command
    /// history are not included.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = EngineSnapshotRef {
            header: SnapshotHeader::new(self.scheduler.tick_count()),
            config: &self.config,
            slate: &self.slate,
            pool: &self.pool,
            scheduler: self.scheduler.snapshot(),
        };
        let bytes =
            bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))?;
        debug!(bytes = bytes.len(), tick = snapshot.header.tick, "engine serialized");
        Ok(bytes)
    }

    /// Restore an engine with the standard behaviors installed.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        Self::deserialize_with_registry(data, BehaviorRegistry::standard())
    }

    /// Restore an engine with a caller-supplied registry. The header is
    /// validated before anything else is used.
    pub fn deserialize_with_registry(
        data: &[u8],
        registry: BehaviorRegistry,
    ) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        snapshot
            .config
            .validate()
            .map_err(|e| DeserializeError::Invalid(e.to_string()))?;
        let scheduler = Scheduler::restore(snapshot.scheduler, registry)
            .map_err(|e| DeserializeError::Invalid(e.to_string()))?;

        Ok(Engine {
            config: snapshot.config,
            slate: snapshot.slate,
            pool: snapshot.pool,
            scheduler,
            commands: CommandQueue::new(),
        })
    }
}
