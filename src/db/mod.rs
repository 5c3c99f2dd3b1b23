// src/db/mod.rs
// SQLite persistence layer: pool, schema, and synchronous fault operations

pub mod faults;
pub mod pool;
pub mod schema;

pub use faults::RecordedFault;
pub use pool::DatabasePool;
