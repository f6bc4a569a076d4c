//! Allocation backends
//!
//! An allocator decides physical placement of bricks across the devices
//! currently registered in the metadata store. Like the executor, the kind is
//! resolved once at startup into an owned instance.

pub mod mock;
pub mod simple;

pub use mock::MockAllocator;
pub use simple::SimpleAllocator;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::MetaStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Allocation Types
// =============================================================================

/// Request for brick placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Volume the bricks belong to
    pub volume_id: String,
    /// Size of each brick
    pub brick_size_kb: u64,
    /// Number of bricks to place
    pub brick_count: u32,
}

/// One placed brick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickPlacement {
    pub device_id: String,
    pub node_id: String,
    pub size_kb: u64,
}

/// Result of an allocation: one placement per requested brick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub bricks: Vec<BrickPlacement>,
}

// =============================================================================
// Port & Selector
// =============================================================================

/// Port for brick placement decisions
#[async_trait]
pub trait Allocator: Send + Sync + std::fmt::Debug {
    /// Choose placement for the requested bricks given current store state
    async fn allocate(&self, request: &AllocationRequest) -> Result<Placement>;
}

pub type AllocatorRef = Arc<dyn Allocator>;

/// Resolve the allocation backend from the configured kind.
///
/// The resolved default is written back into the configuration record, so
/// later introspection reflects the effective choice. The store must already
/// be open: the store-backed variant holds a handle to it.
pub fn create(config: &mut Config, store: Arc<MetaStore>) -> Result<AllocatorRef> {
    let allocator: AllocatorRef = match config.allocator.as_str() {
        "mock" => Arc::new(MockAllocator::new()),
        "simple" | "" => {
            config.allocator = "simple".to_string();
            Arc::new(SimpleAllocator::new(store))
        }
        other => {
            return Err(Error::UnknownAllocator {
                kind: other.to_string(),
            })
        }
    };

    info!("Loaded {} allocator", config.allocator);
    Ok(allocator)
}
