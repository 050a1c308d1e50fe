//! Shared setup for namespace integration tests

use std::sync::Arc;

use ::common::prelude::Namespace;
use ::common::store::MemoryStore;

/// A store holding a small config tree, and a namespace over it
///
/// ```text
/// /cfg/port      = "8080"
/// /cfg/tls/cert  = "PEM"
/// /empty         = ""
/// ```
#[allow(dead_code)]
pub fn setup_test_env() -> (Namespace<MemoryStore>, MemoryStore) {
    // Initialize tracing for test visibility
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let store = MemoryStore::new();
    store.set("/cfg/port", "8080").unwrap();
    store.set("/cfg/tls/cert", "PEM").unwrap();
    store.set("/empty", "").unwrap();

    let ns = Namespace::new(Arc::new(store.clone()));
    (ns, store)
}
