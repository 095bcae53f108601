use tracing::{debug, info};

use crate::remote::{ChildFilter, RemoteError, RemoteStore};

/// Splits `name` at its last `.` into base and extension (with the dot).
/// Leading dots do not start an extension, so `.bashrc` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if !name[..dot].chars().all(|c| c == '.') => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    }
}

/// Picks the name to upload under, given the names of existing siblings
/// that contain the leaf's base name.
///
/// A sibling named exactly `base` (any extension) counts as copy 1 and
/// `base (N)` as copy N; the result is `base (max + 1)ext`. When siblings
/// exist but none of them follows that pattern the suffix is ` (1)`.
pub fn next_free_name(leaf: &str, existing: &[String]) -> String {
    if existing.is_empty() {
        return leaf.to_string();
    }
    let (base, extension) = split_extension(leaf);
    let number = existing
        .iter()
        .filter_map(|name| copy_number(base, split_extension(name).0))
        .max()
        .map_or(1, |max| max.saturating_add(1));
    format!("{base} ({number}){extension}")
}

fn copy_number(base: &str, stem: &str) -> Option<u64> {
    if stem == base {
        return Some(1);
    }
    stem.strip_prefix(base)?
        .strip_prefix(" (")?
        .strip_suffix(')')?
        .parse()
        .ok()
}

/// Queries the parent for siblings whose name contains the leaf's base and
/// returns a collision-free name. Not safe against concurrent uploads into
/// the same folder.
pub async fn resolve_collision<S>(
    store: &S,
    parent_id: &str,
    leaf: &str,
) -> Result<String, RemoteError>
where
    S: RemoteStore + ?Sized,
{
    let (base, _) = split_extension(leaf);
    let existing: Vec<String> = store
        .list_children(parent_id, ChildFilter::name_containing(base))
        .await?
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    debug!(parent_id, base, matches = existing.len(), "checked for name collisions");

    let name = next_free_name(leaf, &existing);
    if name != leaf {
        info!(original = leaf, renamed = %name, "destination name is taken, uploading under a new name");
    }
    Ok(name)
}
