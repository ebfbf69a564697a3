//! Reversible rewriting of `TAG(token, ...): text` annotations.
//!
//! Provides:
//! - [`scanner::TagScanner`] : finds tag occurrences and splits their token lists
//! - [`mode::ReplaceMode`] / [`mode::decide`] : the per-token rewrite policy
//! - [`engine::ReplaceEngine`] : validated configuration, tree transform and `reverse()`
//! - [`config::ReplaceConfig`] : TOML configuration surface
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use carryover_core::replace::{ReplaceEngine, ReplaceMode};
//!
//! let engine = ReplaceEngine::builder()
//!     .mode(ReplaceMode::MapOrFail)
//!     .mapping([("alice", "ext-alice")])
//!     .build()?;
//! engine.transform(checkout_dir)?;
//! engine.reverse()?.transform(checkout_dir)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod mode;
pub mod scanner;

pub use config::{PathsConfig, ReplaceConfig};
pub use engine::{ReplaceEngine, ReplaceEngineBuilder, Rewrite, TransformReport, DEFAULT_TAG};
pub use error::{ReplaceError, ReplaceResult};
pub use mode::{decide, Decision, ReplaceMode};
pub use scanner::{TagOccurrence, TagScanner, Token};
