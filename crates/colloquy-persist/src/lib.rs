pub mod builder;
pub mod dbs;
pub mod error;
pub mod memory;
pub mod models;
pub mod noop;
pub mod trait_client;

pub use builder::{PersistClientBuilder, DEFAULT_DATABASE};
pub use error::{PersistError, Result};
pub use memory::MemoryPersistenceClient;
pub use models::{MessagePatch, ThreadPatch};
pub use noop::NoopPersistenceClient;
pub use trait_client::PersistenceClient;

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoPersistenceClient;
