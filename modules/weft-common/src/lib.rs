pub mod config;
pub mod error;
pub mod session;
pub mod types;

pub use config::Config;
pub use error::WeftError;
pub use session::Session;
pub use types::*;
