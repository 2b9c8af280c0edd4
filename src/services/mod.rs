// revcheck Core Services

pub mod config_store;
pub mod corpus;
pub mod detection;
pub mod providers;

pub use config_store::*;
pub use corpus::*;
pub use providers::*;
