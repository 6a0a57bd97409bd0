pub mod cli;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod store;
pub mod utils;

pub use error::{Result, StoreError};
