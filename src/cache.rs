use crate::logging::Diagnostics;
use crate::models::ResolvedArchive;
use crate::platform::SuffixSet;
use crate::version::VersionSpec;
use anyhow::{Context, Result};
use rand::Rng;
use regex::Regex;
use semver::Version;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static CACHE_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.+)-([^-]+)-([^-]+)_((?:0|[1-9]\d*)\.(?:0|[1-9]\d*)\.(?:0|[1-9]\d*)(?:-[.0-9A-Za-z-]+)?)\.zip$",
    )
    .expect("cache file name pattern is valid")
});

/// A hidden sibling of `dest` unique to this call, for writes renamed into place
pub(crate) fn temp_sibling(dest: &Path) -> PathBuf {
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("archive");
    let nonce: u32 = rand::rng().random();
    dest.with_file_name(format!(
        ".{file_name}.{}.{nonce:08x}.tmp",
        std::process::id()
    ))
}

/// Name of a cached archive: `<name>-<platform>-<arch>_<version>.zip`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFileName {
    pub name: String,
    pub platform: String,
    pub arch: String,
    pub version: Version,
}

impl CacheFileName {
    /// Insert the version between the archive stem and its extension
    pub fn encode(file_name: &str, version: &str) -> String {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{stem}_{version}.{ext}"),
            None => format!("{stem}_{version}"),
        }
    }

    pub fn decode(file: &str) -> Option<Self> {
        let captures = CACHE_FILE_NAME.captures(file)?;
        let version = Version::parse(&captures[4]).ok()?;
        Some(Self {
            name: captures[1].to_string(),
            platform: captures[2].to_string(),
            arch: captures[3].to_string(),
            version,
        })
    }

    /// The release asset name this cache file was stored for
    pub fn archive(&self) -> String {
        format!("{}-{}-{}.zip", self.name, self.platform, self.arch)
    }
}

/// Result of looking up one archive in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub has_cache: bool,
    pub path: PathBuf,
}

/// Per-repository store of downloaded release archives
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
    log: Diagnostics,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>, log: Diagnostics) -> Self {
        Self {
            root: root.into(),
            log,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `owner/repo` is kept in `<root>/owner_repo`
    pub fn repository_dir(&self, repository: &str) -> PathBuf {
        self.root.join(repository.replace('/', "_"))
    }

    pub fn locate(&self, repository: &str, version: &str, file_name: &str) -> PathBuf {
        self.repository_dir(repository)
            .join(CacheFileName::encode(file_name, version))
    }

    /// Find the cache path of an archive and whether it is present and readable
    pub fn check(&self, repository: &str, version: &str, file_name: &str) -> Result<CacheLookup> {
        let path = self.locate(repository, version, file_name);
        self.log.emit(format_args!("check \"{}\"", path.display()));
        let has_cache = match fs::File::open(&path) {
            Ok(_) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read cached file: {}", path.display()));
            }
        };
        Ok(CacheLookup { has_cache, path })
    }

    /// Put `source` into the cache at `dest`.
    ///
    /// With `prefer_copy` the source stays where it is. Otherwise it is renamed,
    /// falling back to copy and delete when renaming across volumes fails.
    pub fn store(&self, source: &Path, dest: &Path, prefer_copy: bool) -> Result<()> {
        if let Some(parent) = dest.parent() {
            self.log.emit(format_args!("ensure \"{}\"", parent.display()));
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
        }

        if prefer_copy {
            return self.copy(source, dest);
        }

        self.log.emit(format_args!(
            "rename \"{}\" to \"{}\"",
            source.display(),
            dest.display()
        ));
        if fs::rename(source, dest).is_err() {
            self.copy(source, dest)?;
            self.log.emit(format_args!("remove \"{}\"", source.display()));
            fs::remove_file(source)
                .with_context(|| format!("Failed to remove file: {}", source.display()))?;
        }
        Ok(())
    }

    /// Copy through a temporary sibling so readers never see a partial `dest`
    pub fn copy(&self, source: &Path, dest: &Path) -> Result<()> {
        self.log.emit(format_args!(
            "copy \"{}\" to \"{}\"",
            source.display(),
            dest.display()
        ));
        let temp_path = temp_sibling(dest);

        fs::copy(source, &temp_path).with_context(|| {
            let _ = fs::remove_file(&temp_path);
            format!("Failed to copy {} to {}", source.display(), dest.display())
        })?;
        fs::rename(&temp_path, dest).with_context(|| {
            let _ = fs::remove_file(&temp_path);
            format!("Failed to move copied file into place: {}", dest.display())
        })?;
        Ok(())
    }

    /// The newest cached archive of `repository` that satisfies `spec` on this platform
    pub fn find_satisfying(
        &self,
        repository: &str,
        name: Option<&str>,
        spec: &VersionSpec,
        suffixes: &SuffixSet,
    ) -> Result<Option<ResolvedArchive>> {
        let dir = self.repository_dir(repository);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.log.emit(format_args!("no cache in \"{}\"", dir.display()));
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read cache directory: {}", dir.display()));
            }
        };

        // (version, suffix priority, inferred name, archive)
        let mut best: Option<(Version, usize, String, String)> = None;
        for entry in entries {
            let entry = entry.with_context(|| "Failed to read cache directory entry")?;
            let Some(file) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !suffixes.infixes().any(|infix| file.contains(infix)) {
                self.log.emit(format_args!("skip \"{file}\""));
                continue;
            }
            let Some(decoded) = CacheFileName::decode(&file) else {
                self.log.emit(format_args!("match \"{file}\", invalid"));
                continue;
            };
            let archive = decoded.archive();
            let Some((priority, inferred)) = suffixes.match_file(name, &archive) else {
                self.log.emit(format_args!("skip \"{file}\""));
                continue;
            };
            if !spec.matches(&decoded.version) {
                self.log.emit(format_args!("match \"{file}\", unsatisfactory"));
                continue;
            }
            self.log.emit(format_args!("match \"{file}\", satisfactory"));

            let better = match &best {
                None => true,
                Some((version, best_priority, _, _)) => {
                    decoded.version > *version
                        || (decoded.version == *version && priority < *best_priority)
                }
            };
            if better {
                best = Some((decoded.version, priority, inferred, archive));
            }
        }

        match best {
            Some((version, _, name, file_name)) => {
                self.log.emit(format_args!("pick \"{file_name}\" ({version})"));
                Ok(Some(ResolvedArchive {
                    name,
                    version: version.to_string(),
                    file_name,
                    source_url: None,
                }))
            }
            None => {
                self.log.emit(format_args!("nothing picked"));
                Ok(None)
            }
        }
    }

    /// Remove one repository's archives, or the whole cache without a repository
    pub fn clear(&self, repository: Option<&str>) -> Result<()> {
        let dir = match repository {
            Some(repository) => self.repository_dir(repository),
            None => self.root.clone(),
        };
        self.log.emit(format_args!("remove \"{}\"", dir.display()));
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to remove cache: {}", dir.display()))
            }
        }
    }
}
