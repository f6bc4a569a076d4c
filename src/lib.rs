//! Brickyard - Storage Cluster Management Service
//!
//! A REST control plane that provisions logical volumes out of bricks placed
//! on devices across the nodes of a storage cluster.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Application Context                     │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌───────────────────┐  ┌─────────────────┐  │
//! │  │  REST API    │  │  Authorization    │  │  Async Op       │  │
//! │  │  (axum)      │──│  Gate             │  │  Tracker        │  │
//! │  └──────┬───────┘  └───────────────────┘  └────────┬────────┘  │
//! │         │                                          │           │
//! │  ┌──────┴──────────────────────────────────────────┴────────┐  │
//! │  │                    Metadata Store (redb)                 │  │
//! │  │        CLUSTER / NODE / VOLUME / DEVICE / BRICK          │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! ├────────────────────────────────────────────────────────────────┤
//! │   Executor (mock | ssh)         Allocator (mock | simple)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: application context lifecycle and wiring
//! - [`api`]: REST surface, authorization gate, server
//! - [`store`]: persistent metadata store and entity records
//! - [`executors`]: remote execution backends
//! - [`allocators`]: brick placement backends
//! - [`ops`]: asynchronous operation tracker
//! - [`config`]: configuration and brick limits
//! - [`error`]: error types and handling

pub mod allocators;
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod executors;
pub mod ops;
pub mod store;

// Re-export commonly used types
pub use allocators::{
    AllocationRequest, Allocator, AllocatorRef, BrickPlacement, MockAllocator, Placement,
    SimpleAllocator,
};
pub use api::{ApiServer, ApiServerConfig, ApiState, Claims};
pub use app::App;
pub use config::{BrickLimits, Config, SshConfig};
pub use error::{Error, Result};
pub use executors::{Executor, ExecutorRef, MockExecutor, SshExecutor};
pub use ops::{OpStatus, OpTracker};
pub use store::{
    BrickEntry, ClusterEntry, DeviceEntry, MetaStore, NodeEntry, VolumeEntry, BRICK_TABLE,
    CLUSTER_TABLE, DEVICE_TABLE, NODE_TABLE, VOLUME_TABLE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
