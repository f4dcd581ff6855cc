//! Path semantics shared by the engine: identity comparison, disabled-path
//! derivation, and the drive-relative projection used by backup mirroring.
//!
//! The upstream advisor runs against Windows volumes, so path identity is
//! case-insensitive throughout. Items keep the exact casing they arrived
//! with; only comparisons fold case.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// `fs::canonicalize` is used when the path exists (resolving symlinks);
/// otherwise the path is made absolute against CWD and `..`/`.` components
/// are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Case-insensitive path identity.
///
/// This is the canonical item-lookup comparison for the whole engine; two
/// spellings of the same entry must always resolve to the same item.
#[must_use]
pub fn same_path(a: &Path, b: &Path) -> bool {
    fold_case(a) == fold_case(b)
}

/// Case-folded key for map/lookup use.
#[must_use]
pub fn fold_case(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Derive the disabled (renamed-away) sibling path for an original path.
///
/// The suffix is appended to the final component verbatim, so the result
/// stays in the same parent directory and survives a plain rename back.
#[must_use]
pub fn disabled_path(original: &Path, suffix: &str) -> PathBuf {
    let mut name = original
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    name.push_str(suffix);
    original.with_file_name(name)
}

/// Project a path to its drive-relative form: every `Prefix` and root
/// component is stripped, leaving the component chain below the volume.
///
/// Backup trees mirror this projection under `<root>/<job_id>/`, so items
/// from any volume land in non-colliding, recognizable locations.
#[must_use]
pub fn drive_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}
