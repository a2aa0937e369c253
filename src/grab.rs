use crate::archive::zip::unpack_single_file;
use crate::cache::Cache;
use crate::config::Settings;
use crate::download::github::fetch_github_release;
use crate::download::http::GitHubClient;
use crate::error::GrabError;
use crate::install::executable::make_executable;
use crate::logging::Diagnostics;
use crate::models::{Artifact, ClearCacheOptions, GrabOptions, GrabResult, ResolvedArchive};
use crate::platform::SuffixSet;
use crate::version::VersionSpec;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Download a release archive with settings taken from the environment
pub fn grab(options: &GrabOptions) -> Result<GrabResult> {
    Grabber::new(Settings::from_env()).grab(options)
}

/// Clear the download cache with settings taken from the environment
pub fn clear_cache(options: &ClearCacheOptions) -> Result<()> {
    Grabber::new(Settings::from_env()).clear_cache(options)
}

/// Where the archive ended up and whether it is the cache's own copy
struct Materialized {
    path: PathBuf,
    from_cache: bool,
}

/// Resolves, retrieves and optionally unpacks release archives
#[derive(Debug, Clone)]
pub struct Grabber {
    settings: Settings,
}

impl Grabber {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn grab(&self, options: &GrabOptions) -> Result<GrabResult> {
        let log = Diagnostics::new(options.verbose);
        let repository = options.repository.as_str();
        validate_repository(repository)?;

        let spec = VersionSpec::parse(options.version.as_deref())?;
        let suffixes = SuffixSet::new(
            &self.settings.platform,
            options.platform_suffixes.as_ref(),
            options.arch_suffixes.as_ref(),
        );
        let cache = Cache::new(&self.settings.cache_root, log);
        let client = GitHubClient::new(
            &self.settings.api_base_url,
            options.token.clone().or_else(|| self.settings.token.clone()),
            self.settings.retry,
            log,
        );

        // Without a cache there is nothing to force and no URL to fall back on
        let force_cache =
            options.cache_enabled() && (options.force_cache || self.settings.force_cache);
        let cached = if force_cache {
            cache.find_satisfying(repository, options.name.as_deref(), &spec, &suffixes)?
        } else {
            None
        };
        let resolved = match cached {
            Some(resolved) => resolved,
            None => fetch_github_release(
                &client,
                repository,
                options.name.as_deref(),
                &spec,
                &suffixes,
                &log,
            )?,
        };

        let archive = self.materialize(options, &resolved, &cache, &client, &log)?;

        if !options.unpack_executable {
            return Ok(GrabResult {
                version: resolved.version,
                artifact: Artifact::Archive(archive.path),
            });
        }

        let unpack_dir = self.output_dir(options.target_directory.as_deref());
        let executable = unpack_single_file(&archive.path, unpack_dir, &log)?;
        make_executable(&executable, &log)?;
        if !archive.from_cache {
            log.emit(format_args!("remove \"{}\"", archive.path.display()));
            fs::remove_file(&archive.path)
                .with_context(|| format!("Failed to remove archive: {}", archive.path.display()))?;
        }

        Ok(GrabResult {
            version: resolved.version,
            artifact: Artifact::Executable(executable),
        })
    }

    pub fn clear_cache(&self, options: &ClearCacheOptions) -> Result<()> {
        let log = Diagnostics::new(options.verbose);
        if let Some(repository) = options.repository.as_deref() {
            validate_repository(repository)?;
        }
        Cache::new(&self.settings.cache_root, log).clear(options.repository.as_deref())
    }

    /// Put the resolved archive where the caller can use it.
    ///
    /// A cached copy is reused without downloading. It is only handed out in
    /// place when the caller just unpacks it and asked for no target directory.
    fn materialize(
        &self,
        options: &GrabOptions,
        resolved: &ResolvedArchive,
        cache: &Cache,
        client: &GitHubClient,
        log: &Diagnostics,
    ) -> Result<Materialized> {
        let target_dir = options.target_directory.as_deref();
        if let Some(dir) = self.output_dir(target_dir) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let archive_path = self.output_path(target_dir, &resolved.file_name);
        let temporary = options.unpack_executable;

        if !options.cache_enabled() {
            download(client, resolved, &archive_path, log)?;
            return Ok(Materialized {
                path: archive_path,
                from_cache: false,
            });
        }

        let lookup = cache.check(&options.repository, &resolved.version, &resolved.file_name)?;

        if !lookup.has_cache {
            download(client, resolved, &archive_path, log)?;
            let copy = !temporary || target_dir.is_some();
            cache.store(&archive_path, &lookup.path, copy)?;
            return Ok(if copy {
                Materialized {
                    path: archive_path,
                    from_cache: false,
                }
            } else {
                Materialized {
                    path: lookup.path,
                    from_cache: true,
                }
            });
        }

        if target_dir.is_some() || !temporary {
            cache.copy(&lookup.path, &archive_path)?;
            return Ok(Materialized {
                path: archive_path,
                from_cache: false,
            });
        }

        log.emit(format_args!("use \"{}\"", lookup.path.display()));
        Ok(Materialized {
            path: lookup.path,
            from_cache: true,
        })
    }

    fn output_dir<'a>(&'a self, target_dir: Option<&'a Path>) -> Option<&'a Path> {
        target_dir.or(self.settings.working_directory.as_deref())
    }

    fn output_path(&self, target_dir: Option<&Path>, file_name: &str) -> PathBuf {
        match self.output_dir(target_dir) {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

fn download(
    client: &GitHubClient,
    resolved: &ResolvedArchive,
    path: &Path,
    log: &Diagnostics,
) -> Result<()> {
    let url = resolved
        .source_url
        .as_deref()
        .ok_or_else(|| GrabError::MissingDownloadUrl {
            file: resolved.file_name.clone(),
        })?;
    log.emit(format_args!("download \"{url}\" to \"{}\"", path.display()));
    client.download(url, path)
}

fn validate_repository(repository: &str) -> Result<()> {
    let valid = repository
        .split_once('/')
        .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
    if valid {
        Ok(())
    } else {
        Err(GrabError::InvalidRepository {
            repository: repository.to_string(),
        }
        .into())
    }
}
