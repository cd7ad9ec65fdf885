//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MediatorConfig (validated)
//!     → Router holds it behind ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Router.reload_config swaps the snapshot (offline flag takes effect
//!       for the next dispatch)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Authorisers are built once at startup; reloads never reorder them

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthoriserConfig, MediatorConfig, ObservabilityConfig, RequestDefaults, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
