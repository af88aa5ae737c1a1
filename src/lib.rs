pub mod cli;
pub mod comments;
pub mod config;
pub mod error;
pub mod feed;
pub mod likes;
pub mod listings;
pub mod models;
pub mod platform;
pub mod profile;
pub mod realtime;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
pub(crate) mod support;

pub use error::{ClientError, ClientResult};
pub use platform::Platform;
pub use store::Store;
