use chrono::NaiveDate;
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid version format: {0}")]
    Format(String),
    #[error("invalid semver: {0}")]
    Semver(String),
    #[error("invalid nightly build date: {0}")]
    Date(String),
}

/// A released compiler build, e.g. `v0.8.24+commit.e11b9ed9`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    pub version: semver::Version,
    pub commit_hash: String,
}

/// A nightly compiler build, e.g. `v0.8.10-nightly.2021.9.11+commit.e5eed63a`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NightlyVersion {
    pub version: semver::Version,
    pub date: NaiveDate,
    pub commit_hash: String,
}

/// An exact compiler build pin. Requests never fall back to a different
/// build; an unknown pin is an error at fetch time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Version {
    Release(ReleaseVersion),
    Nightly(NightlyVersion),
}

impl Version {
    pub fn version(&self) -> &semver::Version {
        match self {
            Version::Release(release) => &release.version,
            Version::Nightly(nightly) => &nightly.version,
        }
    }

    pub fn commit_hash(&self) -> &str {
        match self {
            Version::Release(release) => &release.commit_hash,
            Version::Nightly(nightly) => &nightly.commit_hash,
        }
    }
}

impl FromStr for ReleaseVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the `v` prefix is optional: list.json files omit it
        let stripped = s.strip_prefix('v').unwrap_or(s);
        let (version, commit_hash) = sscanf::sscanf!(stripped, "{String}+commit.{String}")
            .map_err(|_| ParseError::Format(s.to_string()))?;
        let version = semver::Version::from_str(&version)
            .map_err(|err| ParseError::Semver(err.to_string()))?;
        Ok(Self {
            version,
            commit_hash,
        })
    }
}

impl FromStr for NightlyVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix('v').unwrap_or(s);
        let (version, date, commit_hash) =
            sscanf::sscanf!(stripped, "{String}-nightly.{String}+commit.{String}")
                .map_err(|_| ParseError::Format(s.to_string()))?;
        let version = semver::Version::from_str(&version)
            .map_err(|err| ParseError::Semver(err.to_string()))?;
        let date = NaiveDate::parse_from_str(&date, "%Y.%m.%d")
            .map_err(|_| ParseError::Date(date.clone()))?;
        Ok(Self {
            version,
            date,
            commit_hash,
        })
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains("nightly") {
            Ok(Self::Nightly(NightlyVersion::from_str(s)?))
        } else {
            Ok(Self::Release(ReleaseVersion::from_str(s)?))
        }
    }
}

impl Display for ReleaseVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}+commit.{}", self.version, self.commit_hash)
    }
}

impl Display for NightlyVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "v{}-nightly.{}+commit.{}",
            self.version,
            self.date.format("%Y.%-m.%-d"),
            self.commit_hash
        )
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Release(release) => release.fmt(f),
            Version::Nightly(nightly) => nightly.fmt(f),
        }
    }
}
