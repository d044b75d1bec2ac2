//! Pull request URL parsing and platform detection

use crate::error::{Error, Result};
use crate::types::{Platform, PlatformConfig, PullRequestRef};
use std::env;
use url::Url;

/// Detect the platform serving a URL from its host
///
/// `github.com` and `gitlab.com` are recognized directly. Self-hosted
/// instances are recognized through the `GH_HOST` and `GITLAB_HOST`
/// environment variables.
pub fn detect_platform(url: &str) -> Option<Platform> {
    let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
    let gh_host = env::var("GH_HOST").ok();
    let gitlab_host = env::var("GITLAB_HOST").ok();
    platform_for_host(&host, gh_host.as_deref(), gitlab_host.as_deref())
}

fn platform_for_host(
    host: &str,
    gh_host: Option<&str>,
    gitlab_host: Option<&str>,
) -> Option<Platform> {
    let matches = |configured: Option<&str>| {
        configured.is_some_and(|h| h.trim().eq_ignore_ascii_case(host))
    };

    if host == "github.com" || host == "www.github.com" || matches(gh_host) {
        Some(Platform::GitHub)
    } else if host == "gitlab.com" || matches(gitlab_host) {
        Some(Platform::GitLab)
    } else {
        None
    }
}

/// Parse a full PR/MR web URL into a platform config and PR reference
///
/// Accepts:
/// - `https://github.com/<owner>/<repo>/pull/<n>`
/// - `https://<gitlab-host>/<group>/.../<project>/-/merge_requests/<n>`
///
/// Chat clients wrap links in angle brackets (`<url>` or `<url|label>`);
/// those wrappers are stripped. Trailing slashes are ignored.
pub fn parse_pr_url(input: &str) -> Result<(PlatformConfig, PullRequestRef)> {
    let trimmed = input.trim().trim_start_matches('<').trim_end_matches('>');
    let raw = trimmed.split('|').next().unwrap_or(trimmed);

    let url = Url::parse(raw)
        .map_err(|e| Error::InvalidArgument(format!("'{raw}' is not a valid URL: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidArgument(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidArgument(format!("'{raw}' has no host")))?
        .to_ascii_lowercase();

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let shape = PathShape::of(&segments).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "'{raw}' doesn't look like a pull request URL; \
             expected .../<owner>/<repo>/pull/<number> or .../-/merge_requests/<number>"
        ))
    })?;

    let platform = detect_platform(raw).unwrap_or(match shape {
        PathShape::GitHub { .. } => Platform::GitHub,
        PathShape::GitLab { .. } => Platform::GitLab,
    });

    let (owner, repo, number) = match (platform, shape) {
        (Platform::GitHub, PathShape::GitHub { owner, repo, number })
        | (Platform::GitLab, PathShape::GitLab { owner, repo, number }) => (owner, repo, number),
        (platform, _) => {
            return Err(Error::InvalidArgument(format!(
                "'{raw}' is a {platform} host but the path is not a {platform} pull request"
            )));
        }
    };

    let host_with_port = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.clone(),
    };
    let host = match (platform, host.as_str()) {
        (Platform::GitHub, "github.com" | "www.github.com") | (Platform::GitLab, "gitlab.com") => {
            None
        }
        _ => Some(host_with_port),
    };

    let config = PlatformConfig {
        platform,
        owner: owner.clone(),
        repo: repo.clone(),
        host,
    };
    Ok((config, PullRequestRef::new(owner, repo, number)))
}

enum PathShape {
    GitHub {
        owner: String,
        repo: String,
        number: u64,
    },
    GitLab {
        owner: String,
        repo: String,
        number: u64,
    },
}

impl PathShape {
    fn of(segments: &[&str]) -> Option<Self> {
        if let Some(dash) = segments.iter().position(|s| *s == "-") {
            let [kind, number] = segments.get(dash + 1..)? else {
                return None;
            };
            let project = &segments[..dash];
            if *kind != "merge_requests" || project.len() < 2 {
                return None;
            }
            let (repo, group) = project.split_last()?;
            return Some(Self::GitLab {
                owner: group.join("/"),
                repo: (*repo).to_string(),
                number: parse_number(number)?,
            });
        }

        match segments {
            [owner, repo, "pull" | "pulls", number] => Some(Self::GitHub {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
                number: parse_number(number)?,
            }),
            _ => None,
        }
    }
}

fn parse_number(s: &str) -> Option<u64> {
    s.parse::<u64>().ok().filter(|n| *n > 0)
}
