#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod data_processor;
pub mod error;
pub mod tokenize;
pub mod traits;
pub mod types;

pub use error::{Error, IndexUnavailableError, IngestionError, InvalidQueryError, Result};
