//! Filesystem event filtering for the notify watcher (hot-reload).

use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};

/// Extensions recognized as rule files.
pub(super) const RULE_EXTENSIONS: &[&str] = &["json", "yml", "yaml"];

/// Whether `path` names a rule file: a supported extension and not a dotfile.
pub fn is_rule_file(path: &Path) -> bool {
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| RULE_EXTENSIONS.contains(&e))
        .unwrap_or(false);
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    supported && !hidden
}

/// Whether a filesystem event should trigger a rule reload.
pub(super) fn is_reload_event(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Remove(RemoveKind::File)
            | EventKind::Remove(RemoveKind::Any)
    );
    relevant_kind && event.paths.iter().any(|p| is_rule_file(p))
}
