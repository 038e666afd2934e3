use parking_lot::RwLock;
use std::sync::Arc;

/// One reader-writer lock per entity: a single writer (ingestion) and any
/// number of readers (presentation, plotting).
pub type Shared<T> = Arc<RwLock<T>>;

pub fn new_shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}
