//! Configuration parsing for tapshow
//!
//! This crate handles parsing KDL configuration files and rendering
//! commented default configurations.

mod error;
mod model;
mod parser;
mod generator;

pub use error::ConfigError;
pub use model::*;
pub use parser::{load_config, parse_config, parse_config_str};
pub use generator::{generate_config, generate_default_config, write_config};
