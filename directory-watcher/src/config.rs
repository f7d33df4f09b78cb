//! Configuration types for directory watching.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use wildmatch::WildMatch;

/// Name of the repository metadata directory. Nothing beneath it is ever
/// reported, otherwise every commit the agent makes would retrigger it.
pub const METADATA_DIR: &str = ".git";

/// Configuration for a watched repository tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root of the working tree.
    pub root: PathBuf,

    /// Additional wildcard patterns to ignore (`*` and `?`).
    ///
    /// A pattern is matched against the path relative to the root and
    /// against the bare file name, so `*.swp` ignores swap files at any depth.
    pub exclude_patterns: Vec<String>,
}

impl WatchConfig {
    /// Create a new watch config with no extra excludes.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Add several exclude patterns.
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Compile the exclude patterns into a matcher.
    pub fn matcher(&self) -> ExcludeMatcher {
        ExcludeMatcher {
            root: self.root.clone(),
            patterns: self
                .exclude_patterns
                .iter()
                .map(|p| WildMatch::new(p))
                .collect(),
        }
    }
}

/// Compiled exclusion rules for one watch root.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    root: PathBuf,
    patterns: Vec<WildMatch>,
}

impl ExcludeMatcher {
    /// Check if a path should be excluded.
    pub fn should_exclude(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        if relative
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == METADATA_DIR))
        {
            return true;
        }

        if self.patterns.is_empty() {
            return false;
        }

        let relative_str = relative.to_string_lossy();
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.patterns
            .iter()
            .any(|p| p.matches(&relative_str) || p.matches(&file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_watch_config_creation() {
        let config = WatchConfig::new("/home/user/notes")
            .exclude("*.swp")
            .with_excludes(["*~", "build/*"]);

        assert_eq!(config.root, Path::new("/home/user/notes"));
        assert_eq!(config.exclude_patterns, vec!["*.swp", "*~", "build/*"]);
    }

    #[test]
    fn test_metadata_dir_always_excluded() {
        let matcher = WatchConfig::new("/repo").matcher();

        assert!(matcher.should_exclude(Path::new("/repo/.git/index")));
        assert!(matcher.should_exclude(Path::new("/repo/.git/refs/heads/main")));
        assert!(matcher.should_exclude(Path::new("/repo/vendor/lib/.git/HEAD")));
        assert!(!matcher.should_exclude(Path::new("/repo/src/main.rs")));
        assert!(!matcher.should_exclude(Path::new("/repo/.gitignore")));
    }

    #[test]
    fn test_exclude_patterns() {
        let matcher = WatchConfig::new("/repo")
            .with_excludes(["*.swp", "tmp/*"])
            .matcher();

        assert!(matcher.should_exclude(Path::new("/repo/notes/.todo.md.swp")));
        assert!(matcher.should_exclude(Path::new("/repo/tmp/scratch.txt")));
        assert!(!matcher.should_exclude(Path::new("/repo/notes/todo.md")));
    }
}
