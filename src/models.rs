use crate::platform::SuffixTable;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download the release archive for the current platform, optionally unpacking the executable
    Grab {
        /// GitHub repository in format "owner/name"
        #[arg(short, long)]
        repository: String,
        /// Semantic version specifier or "latest"
        #[arg(short = 'i', long = "version-spec", default_value = "latest")]
        version_spec: String,
        /// Archive name without the platform suffix (inferred from the first matching asset if not specified)
        #[arg(short, long)]
        name: Option<String>,
        /// Platform aliases used in archive names (format: platform=alias), can be specified multiple times
        #[arg(short, long = "platform-suffixes", value_name = "PLATFORM=ALIAS[,...]")]
        platform_suffixes: Vec<String>,
        /// Architecture aliases used in archive names (format: arch=alias), can be specified multiple times
        #[arg(short, long = "arch-suffixes", value_name = "ARCH=ALIAS[,...]")]
        arch_suffixes: Vec<String>,
        /// Directory to write the archive or executable to (defaults to the current directory)
        #[arg(short, long = "target-dir")]
        target_dir: Option<PathBuf>,
        /// Unpack the executable and remove the archive
        #[arg(short = 'e', long = "unpack-exe")]
        unpack_exe: bool,
        /// Do not read or write the download cache
        #[arg(long)]
        no_cache: bool,
        /// Take the newest satisfying archive from the cache without contacting GitHub
        #[arg(long)]
        force_cache: bool,
        /// GitHub token (overrides GITHUB_TOKEN and GH_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Print extra information while working
        #[arg(short, long)]
        verbose: bool,
    },
    /// Remove cached archives of one repository or the whole cache
    ClearCache {
        /// GitHub repository in format "owner/name" (clears everything if not specified)
        #[arg(short, long)]
        repository: Option<String>,
        /// Print extra information while working
        #[arg(short, long)]
        verbose: bool,
    },
}

/// GitHub release information
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// GitHub release asset information
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// The archive picked for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArchive {
    /// Archive name without the platform suffix
    pub name: String,
    pub version: String,
    /// Asset file name, e.g. `jsonlint-linux-x64.zip`
    pub file_name: String,
    /// Download URL; absent when the archive was resolved from the cache alone
    pub source_url: Option<String>,
}

/// Options for a single grab
#[derive(Debug, Clone, Default)]
pub struct GrabOptions {
    /// GitHub repository formatted "owner/name"
    pub repository: String,
    /// Semantic version specifier or "latest" (the default)
    pub version: Option<String>,
    /// Archive name without the platform and architecture suffix
    pub name: Option<String>,
    pub platform_suffixes: Option<SuffixTable>,
    pub arch_suffixes: Option<SuffixTable>,
    /// Directory to write the archive or executable to
    pub target_directory: Option<PathBuf>,
    pub unpack_executable: bool,
    /// Use the download cache; `None` means enabled
    pub cache: Option<bool>,
    pub force_cache: bool,
    pub token: Option<String>,
    pub verbose: bool,
}

impl GrabOptions {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.unwrap_or(true)
    }
}

/// What a grab left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Archive(PathBuf),
    Executable(PathBuf),
}

/// Outcome of a successful grab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabResult {
    /// Version number as specified or picked from the releases
    pub version: String,
    pub artifact: Artifact,
}

impl GrabResult {
    /// The downloaded archive, unless the executable was unpacked
    pub fn archive(&self) -> Option<&Path> {
        match &self.artifact {
            Artifact::Archive(path) => Some(path),
            Artifact::Executable(_) => None,
        }
    }

    /// The unpacked executable, if unpacking was requested
    pub fn executable(&self) -> Option<&Path> {
        match &self.artifact {
            Artifact::Executable(path) => Some(path),
            Artifact::Archive(_) => None,
        }
    }
}

/// Options for clearing the cache
#[derive(Debug, Clone, Default)]
pub struct ClearCacheOptions {
    /// Repository to clear; the whole cache when absent
    pub repository: Option<String>,
    pub verbose: bool,
}
