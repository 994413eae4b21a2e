//! Configuration
//!
//! * `compile_time` - limits generated by `build.rs` from `config/<profile>.toml`
//! * [`runtime`] - user preferences read from `JINJA_*` environment variables
//! * [`delimiters`] - the delimiter settings consumed by the tokenizer

// Generated by build.rs
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod delimiters;
pub mod runtime;

pub use delimiters::{DelimiterConfig, DelimiterError};
pub use runtime::RuntimeConfig;

/// Build information and configuration metadata
pub mod build_info {
    /// Configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("JINJA_BUILD_PROFILE").unwrap_or("development")
    }

    /// Configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("JINJA_CONFIG_DIR").unwrap_or("config")
    }

    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}
