//! Record Store database setup and shared queries

pub mod init;
pub mod settings;

pub use init::*;
pub use settings::*;
