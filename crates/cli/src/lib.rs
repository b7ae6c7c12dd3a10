//! Geowatch CLI library
//!
//! The `geowatch` binary is a thin clap front end over these modules; they
//! are exposed as a library so integration tests can drive commands and
//! configuration directly.

pub mod cmd;
pub mod locks;
pub mod logging;
pub mod system_config;
pub mod util;
