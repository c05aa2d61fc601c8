pub mod batch;
pub mod event;

pub use batch::Batch;
pub use event::{Event, EventLog};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("malformed batch identifier '{full_id}': {reason}")]
    MalformedIdentifier { full_id: String, reason: String },
}
