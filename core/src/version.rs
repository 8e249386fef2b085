// core/src/version.rs
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Daemon version, e.g. `9.3.0` or `10.0.0-rc2`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Ordinal of a pre-release build; `None` for a release.
    pub pre_release: Option<u32>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid version string '{input}': {problem}")]
pub struct VersionParseError {
    pub input: String,
    pub problem: &'static str,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    pub const fn pre_release(major: u32, minor: u32, patch: u32, ordinal: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: Some(ordinal),
        }
    }

    pub fn is_release(&self) -> bool {
        self.pre_release.is_none()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre_release, other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |problem| VersionParseError {
            input: input.to_string(),
            problem,
        };

        let trimmed = input.trim();
        let (numbers, suffix) = match trimmed.split_once('-') {
            Some((numbers, suffix)) => (numbers, Some(suffix)),
            None => (trimmed, None),
        };

        let mut parts = numbers.split('.');
        let mut component = |name| -> Result<u32, VersionParseError> {
            parts
                .next()
                .ok_or_else(|| fail(name))?
                .parse()
                .map_err(|_| fail(name))
        };
        let major = component("bad major component")?;
        let minor = component("bad minor component")?;
        let patch = component("bad patch component")?;
        if parts.next().is_some() {
            return Err(fail("too many components"));
        }

        let pre_release = match suffix {
            None => None,
            Some(tag) => {
                // Tags look like `rc1`, `beta2` or a bare ordinal.
                let digits = tag.trim_start_matches(|c: char| c.is_ascii_alphabetic());
                if digits.is_empty() {
                    return Err(fail("pre-release tag has no ordinal"));
                }
                Some(digits.parse().map_err(|_| fail("bad pre-release ordinal"))?)
            }
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre_release,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ordinal) = self.pre_release {
            write!(f, "-rc{}", ordinal)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        text.parse().unwrap()
    }

    #[test]
    fn release_outranks_pre_release() {
        assert!(!(v("1.2.0") < v("1.2.0-rc1")));
        assert!(v("1.2.0-rc1") < v("1.2.0"));
    }

    #[test]
    fn pre_releases_compare_by_ordinal() {
        assert!(v("1.2.0-rc1") < v("1.2.0-rc2"));
        assert!(v("1.2.0-rc10") > v("1.2.0-rc9"));
    }

    #[test]
    fn numbers_compare_lexicographically() {
        assert!(v("9.3.0") > v("9.2.99"));
        assert!(v("10.0.0-rc1") > v("9.3.0"));
        assert!(v("1.10.0") > v("1.9.0"));
        assert_eq!(v("9.3.0"), Version::new(9, 3, 0));
    }

    #[test]
    fn parses_pre_release_tags() {
        assert_eq!(v("2.0.1-rc3"), Version::pre_release(2, 0, 1, 3));
        assert_eq!(v("2.0.1-beta7").pre_release, Some(7));
        assert_eq!(v(" 2.0.1-4 ").pre_release, Some(4));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "1", "1.2", "1.2.x", "1.2.3.4", "1.2.3-rc", "a.b.c"] {
            assert!(bad.parse::<Version>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Version::pre_release(1, 2, 0, 1).to_string(), "1.2.0-rc1");
        assert_eq!(v("9.3.0").to_string(), "9.3.0");
    }
}
