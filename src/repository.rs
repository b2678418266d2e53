use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::ParseError;

static HTTPS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://([^/]+)/([^/]+)/([^/]+)").expect("HTTPS URL pattern is valid")
});

static SSH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"git@([^:]+):([^/]+)/([^/]+)").expect("SSH URL pattern is valid")
});

/// Normalized identity of a hosted Git repository.
///
/// Two identities are the same repository iff host, organization and name
/// are equal (case-sensitive), whatever URL style they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryIdentity {
    host: String,
    organization: String,
    name: String,
}

impl RepositoryIdentity {
    /// Parses an HTTPS URL (`https://host/org/repo[...]`) or an SSH connection
    /// string (`git@host:org/repo[...]`). Anything after the repository segment
    /// is ignored, as is a trailing `.git`.
    pub fn parse(url: &str) -> Result<Self, ParseError> {
        let captures = HTTPS_URL
            .captures(url)
            .or_else(|| SSH_URL.captures(url))
            .ok_or_else(|| ParseError {
                input: url.to_string(),
            })?;

        let name = &captures[3];
        Ok(Self {
            host: captures[1].to_string(),
            organization: captures[2].to_string(),
            name: name.strip_suffix(".git").unwrap_or(name).to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTPS URL to clone this repository.
    pub fn https_url(&self) -> String {
        format!(
            "https://{}/{}/{}.git",
            self.host, self.organization, self.name
        )
    }

    /// SSH endpoint to clone this repository.
    pub fn ssh_url(&self) -> String {
        format!("git@{}:{}/{}.git", self.host, self.organization, self.name)
    }
}

impl FromStr for RepositoryIdentity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.organization, self.name)
    }
}
