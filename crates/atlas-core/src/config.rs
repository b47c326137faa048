//! Runtime settings sourced from the environment.

/// Patterns excluded from every scan, in gitignore syntax.
pub const BUILTIN_EXCLUDES: &[&str] = &[
    ".atlas/",
    ".git/",
    ".hg/",
    ".svn/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "node_modules/",
    ".mypy_cache/",
    ".pytest_cache/",
    ".tox/",
    "*.pyc",
    ".DS_Store",
];

pub const ENV_RESPECT_GITIGNORE: &str = "ATLAS_RESPECT_GITIGNORE";
pub const ENV_EXCLUDE: &str = "ATLAS_EXCLUDE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Honour `<root>/.gitignore` when scanning.
    pub respect_gitignore: bool,
    /// Extra gitignore-style patterns layered on top of the built-ins.
    pub extra_excludes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            extra_excludes: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let respect_gitignore = match lookup(ENV_RESPECT_GITIGNORE) {
            Some(val) => {
                let v = val.trim().to_lowercase();
                !matches!(v.as_str(), "0" | "false" | "no" | "off")
            }
            None => true,
        };
        let extra_excludes = lookup(ENV_EXCLUDE)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            respect_gitignore,
            extra_excludes,
        }
    }
}
