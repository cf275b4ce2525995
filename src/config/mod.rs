//! Server configuration.
//!
//! Layers are merged in order, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (`--config`, `$LFT_CONFIG`, or `~/.config/lft/config.toml`)
//! 3. CLI flags

mod defaults;
mod merge;
mod server;

pub use defaults::BuiltinDefaults;
pub use merge::{deep_merge, merge_layers};
pub use server::{
    resolve_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, LocateSection,
    PreferredTools, ServerConfig, CONFIG_ENV,
};
