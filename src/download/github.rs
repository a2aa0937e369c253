use crate::download::http::GitHubClient;
use crate::error::GrabError;
use crate::logging::Diagnostics;
use crate::models::{GitHubRelease, ResolvedArchive};
use crate::platform::SuffixSet;
use crate::version::VersionSpec;
use anyhow::Result;

/// Resolve the archive to download from the live release list
pub fn fetch_github_release(
    client: &GitHubClient,
    repository: &str,
    name: Option<&str>,
    spec: &VersionSpec,
    suffixes: &SuffixSet,
    log: &Diagnostics,
) -> Result<ResolvedArchive> {
    let releases = client.list_releases(repository)?;
    pick_release(&releases, name, spec, suffixes, log)
}

/// Pick the first release satisfying `spec` and its asset for this platform.
///
/// Releases come newest first. Once a release satisfies the specifier its
/// assets must contain a match; older releases are not searched.
pub fn pick_release(
    releases: &[GitHubRelease],
    name: Option<&str>,
    spec: &VersionSpec,
    suffixes: &SuffixSet,
    log: &Diagnostics,
) -> Result<ResolvedArchive> {
    for release in releases {
        let Some(version) = spec.matches_tag(&release.tag_name) else {
            log.emit(format_args!("skip \"{}\"", release.tag_name));
            continue;
        };
        let version = version.to_string();
        log.emit(format_args!("match \"{version}\" ({})", release.tag_name));

        let (name, asset) = suffixes
            .select_asset(name, &release.assets)
            .ok_or_else(|| GrabError::NoSuitableArchive {
                version: version.clone(),
            })?;
        log.emit(format_args!("match \"{}\"", asset.name));

        return Ok(ResolvedArchive {
            name,
            version,
            file_name: asset.name.clone(),
            source_url: Some(asset.browser_download_url.clone()),
        });
    }

    Err(GrabError::VersionNotFound {
        spec: spec.to_string(),
    }
    .into())
}
