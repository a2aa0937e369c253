use crate::cache::temp_sibling;
use crate::error::GrabError;
use crate::logging::Diagnostics;
use crate::models::GitHubRelease;
use anyhow::{Context, Result};
use rand::Rng;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const USER_AGENT: &str = concat!("grabghr/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// How often and how patiently a failed request is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of the random extra delay added to `base_delay`
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            jitter: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Same attempts, no waiting between them
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Randomized delay before the next attempt
    pub fn backoff(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base_delay;
        }
        let extra = rand::rng().random_range(0..jitter_ms);
        self.base_delay + Duration::from_millis(extra)
    }
}

/// Rate-limit hints GitHub sends with 403 and 429 responses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Seconds to wait before retrying
    pub retry_after: Option<u64>,
    pub limit: Option<String>,
    pub remaining: Option<String>,
    pub used: Option<String>,
    /// When the current window resets, in UTC epoch seconds
    pub reset: Option<u64>,
    pub resource: Option<String>,
}

impl RateLimit {
    fn from_response(response: &ureq::Response) -> Self {
        let header = |name: &str| response.header(name).map(str::to_string);
        let number = |name: &str| response.header(name).and_then(|v| v.trim().parse().ok());
        Self {
            retry_after: number("retry-after"),
            limit: header("x-ratelimit-limit"),
            remaining: header("x-ratelimit-remaining"),
            used: header("x-ratelimit-used"),
            reset: number("x-ratelimit-reset"),
            resource: header("x-ratelimit-resource"),
        }
    }

    /// The later of `retry-after` and the window reset.
    ///
    /// `None` when neither hint asks for a wait, e.g. a reset already in the past.
    pub fn wait(&self, now: SystemTime) -> Option<Duration> {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let after = self.retry_after;
        let until_reset = self.reset.map(|reset| reset.saturating_sub(now_secs));
        after
            .max(until_reset)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn log(&self, log: &Diagnostics) {
        let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        log.emit(format_args!("retry first after: {}", show(self.retry_after.map(|v| v.to_string()))));
        log.emit(format_args!("requests allowed per hour: {}", show(self.limit.clone())));
        log.emit(format_args!("requests remaining in the window: {}", show(self.remaining.clone())));
        log.emit(format_args!("requests made in the window: {}", show(self.used.clone())));
        log.emit(format_args!("window resets at (epoch seconds): {}", show(self.reset.map(|v| v.to_string()))));
        log.emit(format_args!("rate limit resource: {}", show(self.resource.clone())));
    }
}

/// One failed attempt and how long to hold off before the next one
struct Failure {
    error: anyhow::Error,
    wait: Option<Duration>,
}

/// Authenticated, retrying access to the GitHub REST API and release downloads
#[derive(Debug, Clone)]
pub struct GitHubClient {
    agent: ureq::Agent,
    api_base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
    log: Diagnostics,
}

impl GitHubClient {
    pub fn new(
        api_base_url: &str,
        token: Option<String>,
        retry: RetryPolicy,
        log: Diagnostics,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        Self {
            agent,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token,
            retry,
            log,
        }
    }

    /// List the first page of releases, newest first
    pub fn list_releases(&self, repository: &str) -> Result<Vec<GitHubRelease>> {
        let url = format!("{}/repos/{repository}/releases", self.api_base_url);
        let response = self.get(&url)?;
        let releases: Vec<GitHubRelease> = response
            .into_json()
            .with_context(|| format!("Failed to parse GitHub releases JSON from {url}"))?;
        self.log.emit(format_args!("{} releases", releases.len()));
        Ok(releases)
    }

    /// GET `url`, retrying failures according to the retry policy
    pub fn get(&self, url: &str) -> Result<ureq::Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.request(url) {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };
            if attempt >= self.retry.max_attempts {
                return Err(failure.error);
            }
            self.log
                .emit(format_args!("attempt failed: {:#}", failure.error));
            let wait = failure.wait.unwrap_or_else(|| self.retry.backoff());
            self.log
                .emit(format_args!("wait {} ms before trying again", wait.as_millis()));
            thread::sleep(wait);
        }
    }

    fn request(&self, url: &str) -> std::result::Result<ureq::Response, Failure> {
        let mut request = self
            .agent
            .get(url)
            .set("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        let authorized = if self.token.is_some() { " (authorized)" } else { "" };
        self.log.emit(format_args!("fetch \"{url}\"{authorized}"));

        match request.call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let reason = response.status_text().to_string();
                let wait = if status == 403 || status == 429 {
                    let rate_limit = RateLimit::from_response(&response);
                    rate_limit.log(&self.log);
                    rate_limit.wait(SystemTime::now())
                } else {
                    None
                };
                // The body only helps diagnostics; failing to read it changes nothing
                if let Ok(body) = response.into_string() {
                    self.log.emit(format_args!("{body}"));
                }
                Err(Failure {
                    error: GrabError::HttpStatus {
                        url: url.to_string(),
                        status,
                        reason,
                    }
                    .into(),
                    wait,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(Failure {
                error: anyhow::Error::new(transport)
                    .context(format!("GET \"{url}\" failed")),
                wait: None,
            }),
        }
    }

    /// Stream the file at `url` to `path`
    ///
    /// The body goes to a temporary sibling first and is renamed into place
    /// once complete, so a failed download never leaves a truncated `path`.
    pub fn download(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.get(url)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = temp_sibling(path);

        let mut temp_file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temporary file: {}", temp_path.display()))?;

        std::io::copy(&mut response.into_reader(), &mut temp_file).with_context(|| {
            let _ = fs::remove_file(&temp_path);
            format!("Failed to write to temporary file: {}", temp_path.display())
        })?;

        temp_file.sync_all().with_context(|| {
            let _ = fs::remove_file(&temp_path);
            format!("Failed to sync temporary file: {}", temp_path.display())
        })?;

        let file_size = temp_file.metadata()?.len();
        drop(temp_file);

        fs::rename(&temp_path, path).with_context(|| {
            let _ = fs::remove_file(&temp_path);
            format!(
                "Failed to move temporary file to final location: {} -> {}",
                temp_path.display(),
                path.display()
            )
        })?;

        self.log
            .emit(format_args!("downloaded \"{}\" ({file_size} bytes)", path.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn client(server: &mockito::Server, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(
            &server.url(),
            token.map(str::to_string),
            RetryPolicy::immediate(),
            Diagnostics::new(true),
        )
    }

    #[test]
    fn test_rate_limit_wait_takes_the_later_hint() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let rate_limit = RateLimit {
            retry_after: Some(30),
            reset: Some(1_060),
            ..Default::default()
        };
        assert_eq!(rate_limit.wait(now), Some(Duration::from_secs(60)));

        let rate_limit = RateLimit {
            retry_after: Some(30),
            reset: Some(900),
            ..Default::default()
        };
        assert_eq!(rate_limit.wait(now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_rate_limit_without_hints() {
        assert_eq!(RateLimit::default().wait(SystemTime::now()), None);
    }

    #[test]
    fn test_rate_limit_elapsed_reset_falls_back_to_backoff() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let rate_limit = RateLimit {
            reset: Some(900),
            ..Default::default()
        };
        assert_eq!(rate_limit.wait(now), None);

        let rate_limit = RateLimit {
            retry_after: Some(0),
            reset: Some(1_000),
            ..Default::default()
        };
        assert_eq!(rate_limit.wait(now), None);
    }

    #[test]
    fn test_backoff_stays_within_jitter() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            jitter: Duration::from_millis(10),
        };
        for _ in 0..20 {
            let delay = policy.backoff();
            assert!(delay >= Duration::from_millis(50));
            assert!(delay < Duration::from_millis(60));
        }
        assert_eq!(RetryPolicy::immediate().backoff(), Duration::ZERO);
    }

    #[test]
    fn test_list_releases_sends_token() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/owner/repo/releases")
            .match_header("authorization", "Bearer secret")
            .match_header("x-github-api-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"tag_name": "v1.0.0", "assets": []}]"#)
            .create();

        let releases = client(&server, Some("secret"))
            .list_releases("owner/repo")
            .unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].tag_name, "v1.0.0");
        mock.assert();
    }

    #[test]
    fn test_rate_limited_request_gives_up_after_three_attempts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/owner/repo/releases")
            .with_status(403)
            .with_header("retry-after", "0")
            .with_header("x-ratelimit-remaining", "0")
            .with_body("API rate limit exceeded")
            .expect(3)
            .create();

        let err = client(&server, None)
            .list_releases("owner/repo")
            .unwrap_err();
        match err.downcast_ref::<GrabError>() {
            Some(GrabError::HttpStatus { status, .. }) => assert_eq!(*status, 403),
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert();
    }

    #[test]
    fn test_server_error_is_retried() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/file.zip")
            .with_status(500)
            .expect(3)
            .create();

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("file.zip");
        let err = client(&server, None)
            .download(&format!("{}/file.zip", server.url()), &dest)
            .unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(!dest.exists());
        mock.assert();
    }

    #[test]
    fn test_download_writes_file_without_leftovers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/download/tool-linux-x64.zip")
            .with_status(200)
            .with_body(b"archive bytes")
            .create();

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested").join("tool-linux-x64.zip");
        client(&server, None)
            .download(&format!("{}/download/tool-linux-x64.zip", server.url()), &dest)
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"archive bytes");
        let entries: Vec<_> = fs::read_dir(dest.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        mock.assert();
    }
}
