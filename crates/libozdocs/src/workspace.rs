use std::{
    env,
    path::{Path, PathBuf},
};

use sha1::{Digest, Sha1};

/// Directory name, under the system temp dir, holding all cached docs environments.
pub const CACHE_DIR_NAME: &str = "openzeppelin-docs-preview";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "OZ_DOCS_DIR";

/// Default cache root: a tool-specific directory under the system temp dir.
pub fn default_cache_root() -> PathBuf {
    env::temp_dir().join(CACHE_DIR_NAME)
}

/// Expand a leading `~` in a filesystem path using the `HOME` environment variable.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~")
        && let Ok(home) = env::var("HOME")
    {
        return PathBuf::from(path.replacen("~", &home, 1));
    }
    PathBuf::from(path)
}

/// Resolve the cache root, preferring an explicit override, then `OZ_DOCS_DIR`.
pub fn resolve_cache_root(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        expand_tilde(dir)
    } else if let Ok(env_dir) = env::var(CACHE_DIR_ENV) {
        expand_tilde(&env_dir)
    } else {
        default_cache_root()
    }
}

/// Path of the cached docs environment for the project invoked from `cwd`.
///
/// The final component is the hex SHA-1 of the working directory string, so
/// the same directory always maps to the same clone.
pub fn workspace_path(cache_root: &Path, cwd: &Path) -> PathBuf {
    let mut hasher = Sha1::new();
    hasher.update(cwd.to_string_lossy().as_bytes());
    cache_root.join(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_path_is_deterministic() {
        let root = Path::new("/cache");
        let a = workspace_path(root, Path::new("/home/user/project"));
        let b = workspace_path(root, Path::new("/home/user/project"));
        assert_eq!(a, b);
        assert!(a.starts_with(root));
    }

    #[test]
    fn test_workspace_path_differs_per_directory() {
        let root = Path::new("/cache");
        let a = workspace_path(root, Path::new("/home/user/project"));
        let b = workspace_path(root, Path::new("/home/user/project2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_workspace_path_is_sha1_hex() {
        let path = workspace_path(Path::new("/cache"), Path::new("abc"));
        // sha1("abc")
        assert_eq!(
            path,
            Path::new("/cache").join("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
    }

    #[test]
    fn test_explicit_cache_root_wins() {
        assert_eq!(
            resolve_cache_root(Some("/tmp/explicit")),
            PathBuf::from("/tmp/explicit")
        );
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
