pub mod handlers;
pub mod repo;
pub mod service;

pub use handlers::router;
pub use service::{Archiver, RolloverError, RolloverEvent, RolloverOutcome};
