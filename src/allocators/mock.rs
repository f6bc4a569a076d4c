//! In-memory allocator
//!
//! Deterministic placement for tests and simulated deployments: bricks land
//! on synthetic devices without consulting the store.

use super::{AllocationRequest, Allocator, BrickPlacement, Placement};
use crate::error::Result;
use async_trait::async_trait;

/// Allocator that fabricates placements deterministically
#[derive(Debug, Default)]
pub struct MockAllocator;

impl MockAllocator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Allocator for MockAllocator {
    async fn allocate(&self, request: &AllocationRequest) -> Result<Placement> {
        let bricks = (0..request.brick_count)
            .map(|i| BrickPlacement {
                device_id: format!("mockdev{:04x}", i),
                node_id: format!("mocknode{:04x}", i),
                size_kb: request.brick_size_kb,
            })
            .collect();

        Ok(Placement { bricks })
    }
}
