use crate::download::http::RetryPolicy;
use crate::platform::Platform;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Ambient configuration shared by every grab
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the download cache; one subdirectory per repository
    pub cache_root: PathBuf,
    pub api_base_url: String,
    /// Token used when the caller does not pass one
    pub token: Option<String>,
    /// Prefer cached archives over GitHub for every grab
    pub force_cache: bool,
    pub platform: Platform,
    /// Where files land without a target directory; `None` is the process working directory
    pub working_directory: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Settings from the environment with defaults for everything unset
    ///
    /// - `GRABGHR_CACHE_DIR` overrides `~/.cache/grabghr`
    /// - `GITHUB_API_URL` overrides `https://api.github.com`
    /// - `GITHUB_TOKEN`, then `GH_TOKEN`, supply the token
    /// - `GRABGHR_FORCE_CACHE` forces cache lookups
    pub fn from_env() -> Self {
        let cache_root = env_value("GRABGHR_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_root);
        let api_base_url =
            env_value("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let token = env_value("GITHUB_TOKEN").or_else(|| env_value("GH_TOKEN"));
        let force_cache = env_value("GRABGHR_FORCE_CACHE").is_some_and(|value| is_truthy(&value));

        Self {
            cache_root,
            api_base_url,
            token,
            force_cache,
            platform: Platform::current(),
            working_directory: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

/// `~/.cache/grabghr`, or the same path under the temp directory without a home
pub fn default_cache_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".cache")
        .join("grabghr")
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "" | "0" | "false" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_root() {
        let root = default_cache_root();
        assert!(root.ends_with(".cache/grabghr"));
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("False"));
        assert!(!is_truthy(""));
    }
}
