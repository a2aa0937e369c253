use anyhow::{Context, Result};
use semver::{Version, VersionReq};
use std::fmt;

const RANGE_OPERATORS: &[&str] = &[">=", "<=", ">", "<", "=", "~", "^"];

/// What a version specifier asks for
#[derive(Debug, Clone, PartialEq)]
pub enum VersionSpec {
    /// The newest release with a parseable version
    Latest,
    /// Exactly this version, whatever the tag prefix
    Exact(Version),
    /// Anything inside a range expression such as `>=0.0.6` or `^1.2 || 2.x`
    Range {
        expr: String,
        alternatives: Vec<VersionReq>,
    },
}

impl VersionSpec {
    /// Classify a specifier. Absent, empty and "latest" select the newest release.
    pub fn parse(spec: Option<&str>) -> Result<Self> {
        let spec = match spec.map(str::trim) {
            None | Some("") | Some("latest") => return Ok(VersionSpec::Latest),
            Some(spec) => spec,
        };

        if let Some(version) = clean_version(spec) {
            return Ok(VersionSpec::Exact(version));
        }

        let alternatives = parse_range(spec)
            .with_context(|| format!("Invalid version specifier: {spec}"))?;
        Ok(VersionSpec::Range {
            expr: spec.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Latest => true,
            VersionSpec::Exact(expected) => same_release(expected, version),
            VersionSpec::Range { alternatives, .. } => {
                alternatives.iter().any(|req| req.matches(version))
            }
        }
    }

    /// Normalize a release tag and test it; tags that are not versions never match.
    pub fn matches_tag(&self, tag: &str) -> Option<Version> {
        clean_version(tag).filter(|version| self.matches(version))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => f.write_str("latest"),
            VersionSpec::Exact(version) => write!(f, "{version}"),
            VersionSpec::Range { expr, .. } => f.write_str(expr),
        }
    }
}

/// Equality that ignores build metadata, which carries no precedence
fn same_release(a: &Version, b: &Version) -> bool {
    (a.major, a.minor, a.patch, &a.pre) == (b.major, b.minor, b.patch, &b.pre)
}

/// Parse a tag like `v1.2.3` or `=1.2.3` into a version
pub fn clean_version(tag: &str) -> Option<Version> {
    let trimmed = tag
        .trim()
        .trim_start_matches('=')
        .trim_start_matches(['v', 'V'])
        .trim();
    Version::parse(trimmed).ok()
}

/// Translate a range expression in the usual release-tooling syntax
/// (space-separated comparators, `||`, hyphen ranges, bare partial versions)
/// into requirements the `semver` crate understands.
fn parse_range(expr: &str) -> Result<Vec<VersionReq>> {
    expr.split("||")
        .map(|alternative| {
            let comparators = split_comparators(alternative.trim());
            let joined = if comparators.is_empty() {
                "*".to_string()
            } else {
                comparators.join(", ")
            };
            VersionReq::parse(&joined).with_context(|| format!("Invalid range: {joined}"))
        })
        .collect()
}

fn split_comparators(alternative: &str) -> Vec<String> {
    if let Some((low, high)) = alternative.split_once(" - ") {
        return vec![
            format!(">={}", strip_prefix_v(low.trim())),
            format!("<={}", strip_prefix_v(high.trim())),
        ];
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in alternative.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        if RANGE_OPERATORS.contains(&token) {
            pending_op = Some(token);
            continue;
        }
        let token = match pending_op.take() {
            Some(op) => format!("{op}{token}"),
            None => token.to_string(),
        };
        comparators.push(normalize_comparator(&token));
    }
    comparators
}

fn normalize_comparator(token: &str) -> String {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (op, rest) = token.split_at(split);
    let rest = strip_prefix_v(rest);
    let is_wildcard = rest.split('.').any(|part| matches!(part, "x" | "X" | "*"));

    // A bare partial version means "anything with this prefix"
    if op.is_empty() && !is_wildcard {
        format!("={rest}")
    } else {
        format!("{op}{rest}")
    }
}

fn strip_prefix_v(version: &str) -> &str {
    version.trim_start_matches(['v', 'V'])
}
