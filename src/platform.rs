use crate::models::GitHubAsset;
use std::collections::HashMap;

/// Aliases used in archive names, keyed by the raw platform or architecture identifier
pub type SuffixTable = HashMap<String, Vec<String>>;

const ARCHIVE_EXTENSION: &str = ".zip";

/// Platform and architecture in the identifiers release archives are usually named by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The running platform, e.g. `linux`/`x64` or `darwin`/`arm64`
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            "windows" => "win32",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "x86" => "ia32",
            "powerpc64" => "ppc64",
            "loongarch64" => "loong64",
            other => other,
        };
        Self::new(os, arch)
    }
}

/// Default platform aliases: darwin → macos, win32 → windows
pub fn default_platform_suffixes() -> SuffixTable {
    HashMap::from([
        ("darwin".to_string(), vec!["macos".to_string()]),
        ("linux".to_string(), vec![]),
        ("win32".to_string(), vec!["windows".to_string()]),
    ])
}

/// Default architecture aliases: arm64 → aarch64, x64 → amd64, x86_64, x86
pub fn default_arch_suffixes() -> SuffixTable {
    HashMap::from([
        ("arm64".to_string(), vec!["aarch64".to_string()]),
        (
            "x64".to_string(),
            vec!["amd64".to_string(), "x86_64".to_string(), "x86".to_string()],
        ),
    ])
}

/// Candidate archive suffixes (`-<platform>-<arch>.zip`) in match-priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixSet {
    suffixes: Vec<String>,
}

impl SuffixSet {
    /// Build the suffixes for `platform`, platform-major and architecture-minor.
    ///
    /// A caller table replaces the default one; the raw identifiers are always
    /// appended when the alias list does not already contain them.
    pub fn new(
        platform: &Platform,
        platform_suffixes: Option<&SuffixTable>,
        arch_suffixes: Option<&SuffixTable>,
    ) -> Self {
        let plats = aliases(&platform.os, platform_suffixes, default_platform_suffixes());
        let archs = aliases(&platform.arch, arch_suffixes, default_arch_suffixes());

        let suffixes = plats
            .iter()
            .flat_map(|plat| {
                archs
                    .iter()
                    .map(move |arch| format!("-{plat}-{arch}{ARCHIVE_EXTENSION}"))
            })
            .collect();
        Self { suffixes }
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Suffixes without the archive extension
    pub fn infixes(&self) -> impl Iterator<Item = &str> {
        self.suffixes
            .iter()
            .map(|suffix| &suffix[..suffix.len() - ARCHIVE_EXTENSION.len()])
    }

    /// Priority of `file` among the suffixes and the archive name it implies.
    ///
    /// With a known `name` only `name + suffix` qualifies; otherwise any file
    /// ending with a suffix does and the name is what precedes the suffix.
    pub fn match_file(&self, name: Option<&str>, file: &str) -> Option<(usize, String)> {
        self.suffixes
            .iter()
            .enumerate()
            .find_map(|(priority, suffix)| {
                match_suffix(name, file, suffix).map(|name| (priority, name))
            })
    }

    /// Pick the release asset for this platform, trying suffixes in priority order
    pub fn select_asset<'a>(
        &self,
        name: Option<&str>,
        assets: &'a [GitHubAsset],
    ) -> Option<(String, &'a GitHubAsset)> {
        self.suffixes.iter().find_map(|suffix| {
            assets.iter().find_map(|asset| {
                match_suffix(name, &asset.name, suffix).map(|name| (name, asset))
            })
        })
    }
}

fn aliases(raw: &str, custom: Option<&SuffixTable>, defaults: SuffixTable) -> Vec<String> {
    let mut names = custom
        .and_then(|table| table.get(raw))
        .or_else(|| defaults.get(raw))
        .cloned()
        .unwrap_or_default();
    if !names.iter().any(|name| name == raw) {
        names.push(raw.to_string());
    }
    names
}

fn match_suffix(name: Option<&str>, file: &str, suffix: &str) -> Option<String> {
    match name {
        Some(name) => {
            let matches = file.len() == name.len() + suffix.len()
                && file.starts_with(name)
                && file.ends_with(suffix);
            matches.then(|| name.to_string())
        }
        None => file
            .strip_suffix(suffix)
            .filter(|stem| !stem.is_empty())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> GitHubAsset {
        GitHubAsset {
            name: name.to_string(),
            browser_download_url: format!("https://example.com/{name}"),
        }
    }

    fn table(entries: &[(&str, &[&str])]) -> SuffixTable {
        entries
            .iter()
            .map(|(key, values)| {
                (
                    key.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_default_suffixes_for_linux_x64() {
        let set = SuffixSet::new(&Platform::new("linux", "x64"), None, None);
        assert_eq!(
            set.suffixes(),
            [
                "-linux-amd64.zip",
                "-linux-x86_64.zip",
                "-linux-x86.zip",
                "-linux-x64.zip"
            ]
        );
    }

    #[test]
    fn test_suffixes_are_platform_major() {
        let plats = table(&[("darwin", &["macos", "osx"])]);
        let archs = table(&[("arm64", &["aarch64"])]);
        let set = SuffixSet::new(&Platform::new("darwin", "arm64"), Some(&plats), Some(&archs));
        assert_eq!(
            set.suffixes(),
            [
                "-macos-aarch64.zip",
                "-macos-arm64.zip",
                "-osx-aarch64.zip",
                "-osx-arm64.zip",
                "-darwin-aarch64.zip",
                "-darwin-arm64.zip"
            ]
        );
    }

    #[test]
    fn test_raw_identifier_is_not_duplicated() {
        let plats = table(&[("linux", &["linux", "gnu"])]);
        let set = SuffixSet::new(&Platform::new("linux", "riscv64"), Some(&plats), None);
        assert_eq!(set.suffixes(), ["-linux-riscv64.zip", "-gnu-riscv64.zip"]);
    }

    #[test]
    fn test_infixes_drop_extension() {
        let set = SuffixSet::new(&Platform::new("win32", "arm64"), None, None);
        let infixes: Vec<_> = set.infixes().collect();
        assert_eq!(
            infixes,
            [
                "-windows-aarch64",
                "-windows-arm64",
                "-win32-aarch64",
                "-win32-arm64"
            ]
        );
    }

    #[test]
    fn test_select_asset_with_known_name() {
        let set = SuffixSet::new(&Platform::new("linux", "x64"), None, None);
        let assets = [
            asset("jsonlint-linux-x64.zip"),
            asset("other-linux-amd64.zip"),
            asset("jsonlint-linux-amd64.zip"),
        ];
        let (name, found) = set.select_asset(Some("jsonlint"), &assets).unwrap();
        assert_eq!(name, "jsonlint");
        // amd64 has a higher priority than the raw x64
        assert_eq!(found.name, "jsonlint-linux-amd64.zip");
    }

    #[test]
    fn test_select_asset_infers_name() {
        let set = SuffixSet::new(&Platform::new("darwin", "x64"), None, None);
        let assets = [
            asset("jsonlint-linux-x64.zip"),
            asset("jsonlint-darwin-x64.zip"),
            asset("jsonlint-macos-x64.zip"),
        ];
        let (name, found) = set.select_asset(None, &assets).unwrap();
        assert_eq!(name, "jsonlint");
        assert_eq!(found.name, "jsonlint-macos-x64.zip");
    }

    #[test]
    fn test_select_asset_without_match() {
        let set = SuffixSet::new(&Platform::new("linux", "x64"), None, None);
        let assets = [asset("jsonlint-windows-x64.zip"), asset("-linux-x64.zip")];
        assert!(set.select_asset(None, &assets).is_none());
        assert!(set.select_asset(Some("jsonlint"), &assets).is_none());
    }

    #[test]
    fn test_match_file_reports_priority() {
        let set = SuffixSet::new(&Platform::new("linux", "x64"), None, None);
        assert_eq!(
            set.match_file(None, "tool-linux-x64.zip"),
            Some((3, "tool".to_string()))
        );
        assert_eq!(set.match_file(Some("other"), "tool-linux-x64.zip"), None);
    }
}
