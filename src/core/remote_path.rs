//! Mapping of local filesystem paths onto repository paths
//!
//! Repository paths are root-relative and always use `/` as separator,
//! whatever the host convention is.

use std::path::{Component, Path};

/// Normalize a remote prefix: `\` becomes `/`, empty segments and
/// surrounding slashes are dropped.
pub fn normalize_prefix(prefix: &str) -> String {
    prefix
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join `relative` under `prefix`
pub fn join_remote(prefix: &str, relative: &str) -> String {
    let prefix = normalize_prefix(prefix);
    let relative = normalize_prefix(relative);
    match (prefix.is_empty(), relative.is_empty()) {
        (true, _) => relative,
        (false, true) => prefix,
        (false, false) => format!("{}/{}", prefix, relative),
    }
}

/// Remote path for `local`, taken relative to `root` and placed under `prefix`
///
/// Returns `None` when `local` is not inside `root`, when it climbs out with
/// `..`, or when a component is not valid UTF-8.
pub fn to_remote_path(local: &Path, root: &Path, prefix: &str) -> Option<String> {
    let relative = local.strip_prefix(root).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if segments.is_empty() {
        return None;
    }

    Some(join_remote(prefix, &segments.join("/")))
}

/// Remote path of the entry document: its own file name at the repository root
pub fn entry_remote_path(html_file: &Path) -> Option<String> {
    html_file
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Default remote prefix for an asset directory: its base name
pub fn asset_prefix(assets_dir: &Path) -> String {
    assets_dir
        .file_name()
        .and_then(|name| name.to_str())
        .map(normalize_prefix)
        .unwrap_or_default()
}
