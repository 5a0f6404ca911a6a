//! Sandbox module for path validation and security
//!
//! Every caller-supplied path is resolved against a single root and then
//! checked against a list of deny rules. All checks run on the resolved form
//! (symlinks and `..` expanded), never on the raw string.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{FsError, FsResult};

/// A rule that forbids a path regardless of root containment
///
/// Rules only look at the part of the resolved path below the root.
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyRule {
    /// Matches a path component equal to the value, or one that starts with
    /// the value followed by a dot (`secrets` covers `secrets.json`, `.env`
    /// covers `.env.local`)
    Segment(String),
    /// Matches when the value occurs anywhere in the path string
    Substring(String),
}

/// Names denied by default
const DEFAULT_DENIED_NAMES: &[&str] = &[
    "..",
    "__pycache__",
    ".git",
    ".env",
    "node_modules",
    ".ssh",
    ".aws",
    ".docker",
    "passwords",
    "secrets",
];

impl DenyRule {
    /// Default policy: every name in the deny table as an exact segment
    pub fn defaults() -> Vec<Self> {
        DEFAULT_DENIED_NAMES
            .iter()
            .map(|name| DenyRule::Segment((*name).to_string()))
            .collect()
    }

    /// The same table as raw substrings
    ///
    /// Stricter and coarser than [`DenyRule::defaults`]: `.gitignore` and
    /// `my_secrets.txt` are rejected too.
    pub fn legacy_substrings() -> Vec<Self> {
        DEFAULT_DENIED_NAMES
            .iter()
            .map(|name| DenyRule::Substring((*name).to_string()))
            .collect()
    }

    /// Check the rule against a path relative to the root
    pub fn matches(&self, relative: &Path) -> bool {
        match self {
            DenyRule::Segment(segment) => {
                let segment = segment.to_lowercase();
                relative.components().any(|c| {
                    let name = c.as_os_str().to_string_lossy().to_lowercase();
                    match name.strip_prefix(segment.as_str()) {
                        Some(rest) => rest.is_empty() || rest.starts_with('.'),
                        None => false,
                    }
                })
            }
            DenyRule::Substring(needle) => relative
                .to_string_lossy()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

/// Why a path was refused
///
/// Callers report every variant with the same generic message so that the
/// filesystem layout is not disclosed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("path escapes the sandbox root")]
    EscapesRoot,

    #[error("path matches deny rule {0:?}")]
    Denied(DenyRule),

    #[error("path could not be resolved")]
    Unresolvable,
}

/// Sandbox rooted at a single directory
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Canonical root directory
    root: PathBuf,
    rules: Vec<DenyRule>,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`
    ///
    /// The root is canonicalized once here and never changes afterwards.
    pub fn new(root: impl AsRef<Path>, rules: Vec<DenyRule>) -> FsResult<Self> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| {
            FsError::Config(format!("Cannot resolve root {}: {}", root.display(), e))
        })?;

        if !canonical.is_dir() {
            return Err(FsError::Config(format!(
                "Root {} is not a directory",
                canonical.display()
            )));
        }

        Ok(Self {
            root: canonical,
            rules,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rules(&self) -> &[DenyRule] {
        &self.rules
    }

    /// Resolve a caller-supplied path string
    ///
    /// Relative paths are taken relative to the root. An empty string is the
    /// root itself.
    pub fn resolve(&self, candidate: &str) -> Result<PathBuf, Rejection> {
        // Paths with NUL bytes cannot name a file
        if candidate.contains('\0') {
            return Err(Rejection::Unresolvable);
        }
        self.resolve_path(Path::new(candidate))
    }

    /// Resolve a path and check it against the root and the deny rules
    pub fn resolve_path(&self, candidate: &Path) -> Result<PathBuf, Rejection> {
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = canonicalize_lenient(&joined).ok_or(Rejection::Unresolvable)?;
        self.check(&resolved)?;
        Ok(resolved)
    }

    /// Check an already-resolved path
    pub fn check(&self, resolved: &Path) -> Result<(), Rejection> {
        // Component-wise: `/srv/root2` does not start with `/srv/root`
        let relative = resolved
            .strip_prefix(&self.root)
            .map_err(|_| Rejection::EscapesRoot)?;

        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(relative)) {
            return Err(Rejection::Denied(rule.clone()));
        }

        Ok(())
    }

    /// Path of `path` relative to the root, `"."` for the root itself
    pub fn relative_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Canonicalize a path that may not exist yet
///
/// The longest existing ancestor is canonicalized and the missing tail is
/// appended. The tail may only hold plain names: a `..` after a missing
/// directory, or a dangling or looping symlink, cannot be resolved safely.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    match path.canonicalize() {
        Ok(canonical) => return Some(canonical),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(_) => return None,
    }

    let components: Vec<Component<'_>> = path.components().collect();

    for split in (1..components.len()).rev() {
        let base: PathBuf = components[..split].iter().collect();
        match base.canonicalize() {
            Ok(canonical) => {
                let tail = &components[split..];
                if !tail.iter().all(|c| matches!(c, Component::Normal(_))) {
                    return None;
                }
                // Something exists here that canonicalize could not follow.
                if fs::symlink_metadata(canonical.join(tail[0])).is_ok() {
                    return None;
                }
                return Some(tail.iter().fold(canonical, |acc, c| acc.join(c)));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(_) => return None,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox_with(rules: Vec<DenyRule>) -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
        fs::write(dir.path().join("docs/readme.md"), "hello").unwrap();
        let sandbox = Sandbox::new(dir.path(), rules).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_segment_rule_matches_whole_component_only() {
        let rule = DenyRule::Segment("secrets".into());
        assert!(rule.matches(Path::new("app/secrets/key.txt")));
        assert!(rule.matches(Path::new("app/SECRETS")));
        assert!(!rule.matches(Path::new("app/my_secrets.txt")));
    }

    #[test]
    fn test_segment_rule_covers_dotted_variants() {
        let secrets = DenyRule::Segment("secrets".into());
        assert!(secrets.matches(Path::new("secrets.json")));
        assert!(secrets.matches(Path::new("config/Secrets.tar.gz")));
        assert!(!secrets.matches(Path::new("secretsauce.md")));

        let env = DenyRule::Segment(".env".into());
        assert!(env.matches(Path::new(".env.local")));
        assert!(env.matches(Path::new("app/.ENV.production")));
        assert!(!env.matches(Path::new(".envrc")));

        let git = DenyRule::Segment(".git".into());
        assert!(!git.matches(Path::new(".gitignore")));
        assert!(!git.matches(Path::new(".github/workflows/ci.yml")));
    }

    #[test]
    fn test_substring_rule_is_coarse() {
        let rule = DenyRule::Substring(".git".into());
        assert!(rule.matches(Path::new("repo/.git/config")));
        assert!(rule.matches(Path::new("repo/.GitIgnore")));
        assert!(rule.matches(Path::new("repo/.github/workflows")));
    }

    #[test]
    fn test_default_and_legacy_rules_diverge() {
        let path = Path::new("notes/my_secrets.txt");
        assert!(!DenyRule::defaults().iter().any(|r| r.matches(path)));
        assert!(DenyRule::legacy_substrings().iter().any(|r| r.matches(path)));

        let path = Path::new(".gitignore");
        assert!(!DenyRule::defaults().iter().any(|r| r.matches(path)));
        assert!(DenyRule::legacy_substrings().iter().any(|r| r.matches(path)));
    }

    #[test]
    fn test_relative_path_resolves_under_root() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        let resolved = sandbox.resolve("docs/readme.md").unwrap();
        assert_eq!(resolved, sandbox.root().join("docs/readme.md"));
        assert_eq!(sandbox.relative_path(&resolved), "docs/readme.md");
    }

    #[test]
    fn test_empty_and_dot_are_the_root() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        assert_eq!(sandbox.resolve("").unwrap(), sandbox.root());
        assert_eq!(sandbox.resolve(".").unwrap(), sandbox.root());
        assert_eq!(sandbox.relative_path(sandbox.root()), ".");
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        assert!(sandbox.resolve("../etc/passwd").is_err());
        assert_eq!(sandbox.resolve(".."), Err(Rejection::EscapesRoot));
        assert!(sandbox.resolve("docs/../../").is_err());
    }

    #[test]
    fn test_dot_dot_inside_root_is_fine_after_resolution() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        let resolved = sandbox.resolve("docs/nested/../readme.md").unwrap();
        assert_eq!(resolved, sandbox.root().join("docs/readme.md"));
    }

    #[test]
    fn test_absolute_path_outside_root_is_rejected() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        let outside = TempDir::new().unwrap();
        let candidate = outside.path().to_string_lossy().to_string();
        assert_eq!(sandbox.resolve(&candidate), Err(Rejection::EscapesRoot));
    }

    #[test]
    fn test_absolute_path_inside_root_is_accepted() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        let candidate = sandbox.root().join("docs").display().to_string();
        assert_eq!(sandbox.resolve(&candidate).unwrap(), sandbox.root().join("docs"));
    }

    #[test]
    fn test_sibling_sharing_string_prefix_is_rejected() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("root");
        let sibling = parent.path().join("root2");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("data.txt"), "x").unwrap();

        let sandbox = Sandbox::new(&root, DenyRule::defaults()).unwrap();
        let candidate = sibling.join("data.txt").display().to_string();
        assert_eq!(sandbox.resolve(&candidate), Err(Rejection::EscapesRoot));
    }

    #[test]
    fn test_denied_segments_are_rejected_case_insensitively() {
        let (dir, sandbox) = sandbox_with(DenyRule::defaults());
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "[core]").unwrap();

        assert!(matches!(
            sandbox.resolve(".git/config"),
            Err(Rejection::Denied(_))
        ));
        assert!(matches!(
            sandbox.resolve("Node_Modules/pkg/index.js"),
            Err(Rejection::Denied(_))
        ));
        assert!(matches!(sandbox.resolve(".env"), Err(Rejection::Denied(_))));
    }

    #[test]
    fn test_credential_files_are_rejected_by_default() {
        let (dir, sandbox) = sandbox_with(DenyRule::defaults());
        for name in ["secrets.json", "passwords.txt", ".env.local", ".env.production"] {
            fs::write(dir.path().join(name), "hunter2").unwrap();
            assert!(
                matches!(sandbox.resolve(name), Err(Rejection::Denied(_))),
                "{} should be denied",
                name
            );
        }
        assert!(matches!(
            sandbox.resolve("docs/SECRETS.yaml"),
            Err(Rejection::Denied(_))
        ));
    }

    #[test]
    fn test_missing_path_resolves_for_later_not_found() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        let resolved = sandbox.resolve("docs/missing/file.txt").unwrap();
        assert_eq!(resolved, sandbox.root().join("docs/missing/file.txt"));
    }

    #[test]
    fn test_dot_dot_after_missing_component_is_unresolvable() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        assert_eq!(
            sandbox.resolve("missing/../docs"),
            Err(Rejection::Unresolvable)
        );
    }

    #[test]
    fn test_null_byte_is_unresolvable() {
        let (_dir, sandbox) = sandbox_with(DenyRule::defaults());
        assert_eq!(sandbox.resolve("docs\0/x"), Err(Rejection::Unresolvable));
    }

    #[test]
    fn test_rules_ignore_the_root_itself() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("secrets");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let sandbox = Sandbox::new(&root, DenyRule::defaults()).unwrap();
        assert!(sandbox.resolve("a.txt").is_ok());
    }

    #[test]
    fn test_root_must_exist() {
        let parent = TempDir::new().unwrap();
        let err = Sandbox::new(parent.path().join("nope"), DenyRule::defaults()).unwrap_err();
        assert!(matches!(err, FsError::Config(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_root_is_rejected() {
        let (dir, sandbox) = sandbox_with(DenyRule::defaults());
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("passwd.txt"), "root:x:0:0").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        assert_eq!(
            sandbox.resolve("escape/passwd.txt"),
            Err(Rejection::EscapesRoot)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_unresolvable() {
        let (dir, sandbox) = sandbox_with(DenyRule::defaults());
        std::os::unix::fs::symlink("/definitely/not/here", dir.path().join("dangling")).unwrap();
        assert_eq!(sandbox.resolve("dangling"), Err(Rejection::Unresolvable));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_root_is_followed() {
        let (dir, sandbox) = sandbox_with(DenyRule::defaults());
        std::os::unix::fs::symlink(dir.path().join("docs"), dir.path().join("alias")).unwrap();
        let resolved = sandbox.resolve("alias/readme.md").unwrap();
        assert_eq!(resolved, sandbox.root().join("docs/readme.md"));
    }
}
