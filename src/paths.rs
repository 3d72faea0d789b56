use std::path::{Path, PathBuf};

/// Expands a leading `~` to the current user's home directory.
///
/// Paths without a leading tilde, or when no home directory is known, are
/// returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Expands `path` and checks that it exists on the invoking machine.
pub fn resolve_existing(path: &str) -> Option<PathBuf> {
    let expanded = expand_home(path);
    Path::new(&expanded).exists().then_some(expanded)
}
