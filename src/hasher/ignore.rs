use glob::Pattern;
use std::path::Path;

/// Parsed ignore rules for input hashing
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Load the rules for a project directory, respecting precedence:
    /// .monoshipignore > .gitignore > empty
    pub fn for_context(context_dir: &Path) -> Self {
        let monoshipignore = context_dir.join(".monoshipignore");
        let gitignore = context_dir.join(".gitignore");

        if monoshipignore.exists() {
            Self::from_file(&monoshipignore)
        } else if gitignore.exists() {
            Self::from_file(&gitignore)
        } else {
            Self::empty()
        }
    }

    /// Load rules from a file; unreadable files behave as empty rule sets
    pub fn from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        Self::parse(&content)
    }

    /// Parse rules from a string, one glob pattern per line
    pub fn parse(content: &str) -> Self {
        let patterns = content
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| Pattern::new(l).ok())
            .collect();
        Self { patterns }
    }

    /// Returns true if the given path (relative to the project root) should
    /// be excluded from hashing. Matches the path and all its parents, so
    /// ignoring a directory ignores everything under it.
    pub fn is_ignored(&self, path: &Path) -> bool {
        for ancestor in path.ancestors() {
            let path_str = ancestor.to_string_lossy();
            if path_str.is_empty() || path_str == "." {
                continue;
            }
            for pattern in &self.patterns {
                if pattern.matches(&path_str) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_exact_match() {
        let rules = IgnoreRules::parse("node_modules\n.git");
        assert!(rules.is_ignored(Path::new("node_modules")));
        assert!(rules.is_ignored(Path::new(".git")));
        assert!(!rules.is_ignored(Path::new("src")));
    }

    #[test]
    fn test_wildcard() {
        let rules = IgnoreRules::parse("*.log");
        assert!(rules.is_ignored(Path::new("build.log")));
        assert!(!rules.is_ignored(Path::new("main.rs")));
    }

    #[test]
    fn test_nested_paths_inherit_parent_rules() {
        let rules = IgnoreRules::parse("dist");
        assert!(rules.is_ignored(Path::new("dist/bundle.js")));
        assert!(!rules.is_ignored(Path::new("src/bundle.js")));
    }

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        let rules = IgnoreRules::parse("# build output\n\ntarget\n");
        assert!(rules.is_ignored(Path::new("target")));
        assert!(!rules.is_ignored(Path::new("# build output")));
    }

    #[test]
    fn test_context_precedence() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "from_git").unwrap();

        let rules = IgnoreRules::for_context(dir.path());
        assert!(rules.is_ignored(Path::new("from_git")));

        // .monoshipignore wins once present
        fs::write(dir.path().join(".monoshipignore"), "from_monoship").unwrap();
        let rules = IgnoreRules::for_context(dir.path());
        assert!(rules.is_ignored(Path::new("from_monoship")));
        assert!(!rules.is_ignored(Path::new("from_git")));
    }
}
