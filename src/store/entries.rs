//! Persisted entity records
//!
//! One record type per store namespace. Records are JSON-serialized and keyed
//! by their hex id; cross-references are held as id lists on the owning side.

use serde::{Deserialize, Serialize};

/// Cluster record: a named pool of nodes and the volumes placed on them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub id: String,
    pub nodes: Vec<String>,
    pub volumes: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ClusterEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: Vec::new(),
            volumes: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Storage node record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: String,
    pub cluster_id: String,
    pub hostname: String,
    /// Failure zone used to spread replicas
    pub zone: u32,
    pub devices: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Raw block device registered on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub node_id: String,
    /// Device path on the node (e.g. /dev/sdb)
    pub name: String,
    pub total_kb: u64,
    pub used_kb: u64,
    pub bricks: Vec<String>,
}

impl DeviceEntry {
    pub fn free_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.used_kb)
    }
}

/// Logical volume assembled from bricks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeEntry {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    pub size_kb: u64,
    pub replicas: u32,
    pub bricks: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Single brick: the unit of placement on a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickEntry {
    pub id: String,
    pub volume_id: String,
    pub device_id: String,
    pub node_id: String,
    pub size_kb: u64,
    /// Filesystem path of the brick directory on the node
    pub path: String,
}
