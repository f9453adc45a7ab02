//! Core [`RuleLoader`] struct: filesystem-backed rule loading with optional hot-reload.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::schema::{Rule, RuleFile};

use super::error::{LoadResult, LoadStatus, Result, RuleError};
use super::watcher::{is_reload_event, is_rule_file};

/// Filesystem-backed rule loader with optional hot-reload.
///
/// Scans a directory (recursively) for `*.json` / `*.yml` / `*.yaml` files,
/// each holding one rule, and compiles them into [`Rule`]s.
pub struct RuleLoader {
    /// Root directory containing rule files.
    rules_dir: PathBuf,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RuleLoader {
    pub fn new(rules_dir: PathBuf) -> Self {
        Self {
            rules_dir,
            _watcher: None,
        }
    }

    /// Load and validate the complete rule set.
    ///
    /// Fails with [`RuleError::Invalid`] listing every broken file, every
    /// duplicated rule name, or the absence of any rule.
    pub fn load_all(&self) -> Result<Vec<Rule>> {
        if !self.rules_dir.is_dir() {
            return Err(RuleError::Invalid(vec![format!(
                "rules directory '{}' does not exist",
                self.rules_dir.display()
            )]));
        }

        let mut results = Vec::new();
        let mut rules = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut results, &mut rules)?;

        let mut problems: Vec<String> = results
            .iter()
            .filter_map(|r| match &r.status {
                LoadStatus::Failed { error } => Some(format!("{}: {}", r.path.display(), error)),
                _ => None,
            })
            .collect();

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                problems.push(format!("duplicate rule name '{}'", rule.name));
            }
        }

        if problems.is_empty() && rules.is_empty() {
            problems.push(format!(
                "no rules found in '{}'",
                self.rules_dir.display()
            ));
        }

        if !problems.is_empty() {
            return Err(RuleError::Invalid(problems));
        }

        info!(count = rules.len(), path = %self.rules_dir.display(), "loaded rule set");
        Ok(rules)
    }

    /// Scan the rules directory and report the per-file outcome without
    /// failing on broken files.
    pub fn scan(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        let mut rules = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut results, &mut rules)?;
        Ok(results)
    }

    /// Recursively scan a directory for rule files.
    fn scan_dir_recursive(
        &self,
        dir: &Path,
        results: &mut Vec<LoadResult>,
        rules: &mut Vec<Rule>,
    ) -> Result<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        // Deterministic order for logs and duplicate reporting.
        entries.sort();

        for path in entries {
            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results, rules)?;
                continue;
            }

            if !is_rule_file(&path) {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a JSON or YAML file".to_string(),
                    },
                });
                continue;
            }

            match self.load_file(&path) {
                Ok(rule) => {
                    debug!(rule = %rule.name, path = %path.display(), "loaded rule");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded {
                            rule_name: rule.name.clone(),
                        },
                    });
                    rules.push(rule);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a single rule file.
    pub fn load_file(&self, path: &Path) -> Result<Rule> {
        let contents = fs::read_to_string(path)?;
        let file: RuleFile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        file.compile().map_err(RuleError::Validation)
    }

    /// Start a filesystem watcher that calls `on_change` whenever a rule file
    /// is created, modified, renamed or deleted.
    ///
    /// Events come from the watcher's own thread; `on_change` should only
    /// signal (e.g. send on a channel) and let the caller reload.
    pub fn watch<F>(&mut self, on_change: F) -> Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) if is_reload_event(&event) => {
                    debug!(paths = ?event.paths, "rule files changed");
                    on_change();
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;

        // Watch recursively to pick up changes in subdirectories.
        watcher.watch(&self.rules_dir, RecursiveMode::Recursive)?;

        // Only polling backends honour the interval.
        if let Err(e) = watcher.configure(
            notify::Config::default().with_poll_interval(Duration::from_millis(500)),
        ) {
            debug!(error = %e, "watcher does not accept a poll interval");
        }

        info!(path = %self.rules_dir.display(), "watching rules directory for changes (recursive)");
        self._watcher = Some(watcher);
        Ok(())
    }
}
