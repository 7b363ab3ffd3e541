//! The three subcommands. Each is a plain function returning a serializable
//! result; rendering lives in [`crate::output`].

pub mod echo;
pub mod health;
pub mod status;

pub use echo::{echo, EchoResult};
pub use health::health;
pub use status::{status, DatabaseStatus, PersistOutcome, StatusReport};
