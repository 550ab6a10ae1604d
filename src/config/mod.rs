//! Configuration
//!
//! Layered merge, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config (`$SPARKHOOK_CONFIG` or `~/.config/sparkhook/config.toml`)
//! 3. CLI flags
//!
//! The merged value is deserialized into a typed [`HookConfig`].

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{
    ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, HookConfig, ProcessConfig,
    ScannerConfig, CONFIG_ENV_VAR,
};
pub use merge::{deep_merge, merge_layers};
