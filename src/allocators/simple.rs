//! Store-backed allocator
//!
//! First-fit placement over the devices registered in the metadata store,
//! spreading bricks across nodes where possible. The richer bin-packing
//! heuristic lives outside this core; this variant only guarantees capacity
//! and best-effort node spread.

use super::{AllocationRequest, Allocator, BrickPlacement, Placement};
use crate::error::{Error, Result};
use crate::store::{DeviceEntry, MetaStore, DEVICE_TABLE};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Allocator that places bricks on registered devices
pub struct SimpleAllocator {
    store: Arc<MetaStore>,
}

impl SimpleAllocator {
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Allocator for SimpleAllocator {
    async fn allocate(&self, request: &AllocationRequest) -> Result<Placement> {
        let devices: Vec<DeviceEntry> = self.store.list(DEVICE_TABLE)?;

        let mut candidates: Vec<&DeviceEntry> = devices
            .iter()
            .filter(|d| d.free_kb() >= request.brick_size_kb)
            .collect();
        // Emptiest devices first
        candidates.sort_by_key(|d| std::cmp::Reverse(d.free_kb()));

        let mut bricks = Vec::with_capacity(request.brick_count as usize);
        let mut used_nodes: HashSet<String> = HashSet::new();
        let mut used_devices: HashSet<String> = HashSet::new();

        // First pass prefers devices on nodes not yet holding a brick
        for pass_requires_new_node in [true, false] {
            for device in &candidates {
                if bricks.len() == request.brick_count as usize {
                    break;
                }
                if used_devices.contains(&device.id) {
                    continue;
                }
                if pass_requires_new_node && used_nodes.contains(&device.node_id) {
                    continue;
                }
                debug!(
                    "Placing {} KB brick for volume {} on device {}",
                    request.brick_size_kb, request.volume_id, device.id
                );
                used_devices.insert(device.id.clone());
                used_nodes.insert(device.node_id.clone());
                bricks.push(BrickPlacement {
                    device_id: device.id.clone(),
                    node_id: device.node_id.clone(),
                    size_kb: request.brick_size_kb,
                });
            }
        }

        if bricks.len() < request.brick_count as usize {
            let available: u64 = devices.iter().map(|d| d.free_kb()).sum();
            return Err(Error::InsufficientCapacity {
                requested_kb: request.brick_size_kb * u64::from(request.brick_count),
                available_kb: available,
            });
        }

        Ok(Placement { bricks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_device(store: &MetaStore, id: &str, node: &str, total_kb: u64, used_kb: u64) {
        let device = DeviceEntry {
            id: id.into(),
            node_id: node.into(),
            name: format!("/dev/{}", id),
            total_kb,
            used_kb,
            bricks: vec![],
        };
        store.put(DEVICE_TABLE, id, &device).unwrap();
    }

    fn temp_store() -> (tempfile::TempDir, Arc<MetaStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MetaStore::open(dir.path().join("meta.db")).unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn test_spreads_across_nodes() {
        let (_dir, store) = temp_store();
        seed_device(&store, "d1", "n1", 10_000_000, 0);
        seed_device(&store, "d2", "n1", 10_000_000, 0);
        seed_device(&store, "d3", "n2", 10_000_000, 0);

        let allocator = SimpleAllocator::new(store);
        let placement = allocator
            .allocate(&AllocationRequest {
                volume_id: "v1".into(),
                brick_size_kb: 1024,
                brick_count: 2,
            })
            .await
            .unwrap();

        let nodes: HashSet<_> = placement.bricks.iter().map(|b| b.node_id.clone()).collect();
        assert_eq!(nodes.len(), 2, "bricks should land on distinct nodes");
    }

    #[tokio::test]
    async fn test_skips_full_devices() {
        let (_dir, store) = temp_store();
        seed_device(&store, "d1", "n1", 2048, 2048);
        seed_device(&store, "d2", "n2", 10_000_000, 0);

        let allocator = SimpleAllocator::new(store);
        let placement = allocator
            .allocate(&AllocationRequest {
                volume_id: "v1".into(),
                brick_size_kb: 1024,
                brick_count: 1,
            })
            .await
            .unwrap();

        assert_eq!(placement.bricks[0].device_id, "d2");
    }

    #[tokio::test]
    async fn test_insufficient_capacity() {
        let (_dir, store) = temp_store();
        seed_device(&store, "d1", "n1", 2048, 1024);

        let allocator = SimpleAllocator::new(store);
        let err = allocator
            .allocate(&AllocationRequest {
                volume_id: "v1".into(),
                brick_size_kb: 4096,
                brick_count: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientCapacity { .. }));
    }

    #[tokio::test]
    async fn test_reuses_node_when_unavoidable() {
        let (_dir, store) = temp_store();
        seed_device(&store, "d1", "n1", 10_000_000, 0);
        seed_device(&store, "d2", "n1", 10_000_000, 0);

        let allocator = SimpleAllocator::new(store);
        let placement = allocator
            .allocate(&AllocationRequest {
                volume_id: "v1".into(),
                brick_size_kb: 1024,
                brick_count: 2,
            })
            .await
            .unwrap();

        assert_eq!(placement.bricks.len(), 2);
        let devices: HashSet<_> = placement.bricks.iter().map(|b| b.device_id.clone()).collect();
        assert_eq!(devices.len(), 2, "same device must not be reused");
    }
}
