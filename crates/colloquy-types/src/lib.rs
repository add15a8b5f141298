pub mod message;
pub mod thread;

pub use message::{Message, Role};
pub use thread::{Thread, DEFAULT_THREAD_TITLE};

/// Generate an opaque, globally unique identifier for threads and messages.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
