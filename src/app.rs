//! Application context
//!
//! The long-lived object wiring together store, backends, limits, and the
//! async tracker. Construction is all-or-nothing: any failing step aborts
//! with an error and no partially-initialized context ever escapes. Once
//! built, the context is immutable and shared by every request handler.

use crate::allocators::{self, AllocatorRef};
use crate::api::rest::{self, ApiState};
use crate::config::{BrickLimits, Config};
use crate::error::Result;
use crate::executors::{self, ExecutorRef};
use crate::ops::OpTracker;
use crate::store::MetaStore;
use axum::Router;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

/// Fully-initialized service context
pub struct App {
    config: Config,
    limits: BrickLimits,
    store: Arc<MetaStore>,
    executor: ExecutorRef,
    allocator: AllocatorRef,
    ops: Arc<OpTracker>,
}

impl App {
    /// Construct the context from a configuration source.
    pub fn from_reader(reader: impl Read) -> Result<Arc<Self>> {
        Self::from_config(Config::from_reader(reader)?)
    }

    /// Construct the context from an already-parsed configuration.
    ///
    /// Initialization order matters: the executor is resolved first, the
    /// store is opened and its namespaces guaranteed, then the allocator is
    /// resolved because the store-backed variant holds the store handle.
    pub fn from_config(mut config: Config) -> Result<Arc<Self>> {
        let limits = BrickLimits::from_config(&config);
        let ops = OpTracker::new();

        let executor = executors::create(&config)?;
        let store = Arc::new(MetaStore::open(config.db_path())?);
        let allocator = allocators::create(&mut config, store.clone())?;

        info!("Brickyard application loaded");

        Ok(Arc::new(Self {
            config,
            limits,
            store,
            executor,
            allocator,
            ops,
        }))
    }

    /// Build the route table for this context. Pure mapping; can be called
    /// any number of times.
    pub fn router(&self) -> Router {
        rest::router(ApiState {
            store: self.store.clone(),
            executor: self.executor.clone(),
            allocator: self.allocator.clone(),
            ops: self.ops.clone(),
            limits: self.limits,
        })
    }

    /// Effective configuration, including resolved backend defaults
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bounds consulted when sizing bricks
    pub fn limits(&self) -> BrickLimits {
        self.limits
    }

    /// Async operation tracker
    pub fn ops(&self) -> &Arc<OpTracker> {
        &self.ops
    }

    /// Release the context. The store file handle is freed once the last
    /// clone of the context (and of any router built from it) is gone.
    pub fn close(self: Arc<Self>) {
        drop(self);
        info!("Closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn base_config(dir: &tempfile::TempDir) -> Config {
        Config {
            executor: "mock".into(),
            db: dir.path().join("app.db").to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_construction_records_effective_allocator() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::from_config(base_config(&dir)).unwrap();
        // Empty kind resolved and written back
        assert_eq!(app.config().allocator, "simple");
    }

    #[tokio::test]
    async fn test_construction_from_json_reader() {
        let dir = tempfile::tempdir().unwrap();
        let raw = format!(
            r#"{{"executor": "mock", "db": "{}", "brick_max_size_gb": 2}}"#,
            dir.path().join("app.db").display()
        );

        let app = App::from_reader(raw.as_bytes()).unwrap();
        assert_eq!(app.limits().max_brick_size_kb, 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_unknown_executor_fails_before_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(&dir);
        config.executor = "telnet".into();
        let db_path = config.db.clone();

        let err = App::from_config(config).unwrap_err();
        assert!(matches!(err, Error::UnknownExecutor { .. }));
        assert!(!std::path::Path::new(&db_path).exists());
    }

    #[tokio::test]
    async fn test_failed_construction_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(&dir);
        config.allocator = "greedy".into();

        // Fails after the store step, leaving a store file behind
        let err = App::from_config(config).unwrap_err();
        assert!(matches!(err, Error::UnknownAllocator { .. }));

        // A subsequent valid construction recovers the same store file
        let app = App::from_config(base_config(&dir)).unwrap();
        assert_eq!(app.config().allocator, "simple");
    }

    #[tokio::test]
    async fn test_router_serves_from_ready_context() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::from_config(base_config(&dir)).unwrap();

        let response = app
            .router()
            .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        app.close();
    }
}
