//! Layered TOML configuration (§10.3): file → env overrides → defaults.

mod loader;
mod schema;

pub use loader::{default_config_path, load_config, load_default_config, save_config};
pub use schema::{AgentsConfig, ApprovalConfig, CleanupConfig, ConversationConfig, EngineConfig};
