//! Filesystem rule loader with hot-reload via `notify` watcher.
//!
//! Reads every JSON / YAML rule file under the rules directory, validates it,
//! and returns the full rule set or every failure at once. The watcher only
//! signals that the directory changed; callers reload the whole set so a
//! broken edit never leaves a partially-updated rule set behind.

mod core;
mod error;
mod watcher;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
pub use self::watcher::is_rule_file;
