pub mod error;
pub mod memory;
pub mod rest;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use memory::MemoryTaskStore;
pub use rest::RestTaskStore;
pub use sqlite::SqliteTaskStore;
pub use store::TaskStore;
pub use types::*;
