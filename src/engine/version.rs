use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize, verify},
    error::{ContextError, FromExternalError, ParseError},
    multi::separated_list1,
    sequence::preceded,
    IResult, Parser,
};
use std::num::ParseIntError;

/// The `(major, minor, patch)` triple. Gates compare on this alone.
pub type Release = (u64, u64, u64);

/// A parsed image tag such as `v23.1.2`, `v23.2.1-rc3` or `v24.1.0+build.5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Does not match pattern 'v<major>.<minor>.<patch>[-<pre-release>][+<build>]': {0:?}")]
pub struct VersionParseError(String);

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    pub const fn release(&self) -> Release {
        (self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }

        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }

        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(version::<nom::error::Error<_>>)
            .parse(s)
            .map(|(_, version)| version)
            .map_err(|_| VersionParseError(s.to_string()))
    }
}

/// Numeric identifier without leading zeros.
fn number<'a, E>(s: &'a str) -> IResult<&'a str, u64, E>
where
    E: ParseError<&'a str> + ContextError<&'a str> + FromExternalError<&'a str, ParseIntError>,
{
    map_res(
        verify(digit1, |d: &str| d == "0" || !d.starts_with('0')),
        str::parse::<u64>,
    )
    .parse(s)
}

/// Dot separated alphanumeric identifiers, used by both pre-release and build suffixes.
fn identifiers<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    s: &'a str,
) -> IResult<&'a str, &'a str, E> {
    recognize(separated_list1(
        char('.'),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-'),
    ))
    .parse(s)
}

fn version<'a, E>(s: &'a str) -> IResult<&'a str, Version, E>
where
    E: ParseError<&'a str> + ContextError<&'a str> + FromExternalError<&'a str, ParseIntError>,
{
    let (remaining, (_, major, _, minor, _, patch)) = (
        opt(char('v')),
        number,
        char('.'),
        number,
        char('.'),
        number,
    )
        .parse(s)?;

    let (remaining, pre) = opt(preceded(char('-'), identifiers)).parse(remaining)?;
    let (remaining, build) = opt(preceded(char('+'), identifiers)).parse(remaining)?;

    Ok((
        remaining,
        Version {
            major,
            minor,
            patch,
            pre: pre.map(str::to_string),
            build: build.map(str::to_string),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("v22.1.0", (22, 1, 0))]
    #[case("v23.1.2", (23, 1, 2))]
    #[case("v22.3.14", (22, 3, 14))]
    #[case("24.1.0", (24, 1, 0))]
    #[case("v0.0.0", (0, 0, 0))]
    fn parse_release(#[case] tag: &str, #[case] expected: Release) {
        let actual: Version = tag.parse().unwrap();

        assert_eq!(actual.release(), expected);
        assert_eq!(actual.pre, None);
        assert_eq!(actual.build, None);
    }

    #[test]
    fn parse_pre_release_and_build() {
        let actual: Version = "v23.2.1-rc3.1+build-7".parse().unwrap();

        assert_eq!(
            actual,
            Version {
                major: 23,
                minor: 2,
                patch: 1,
                pre: Some("rc3.1".to_string()),
                build: Some("build-7".to_string()),
            }
        );
        assert_eq!(actual.to_string(), "v23.2.1-rc3.1+build-7");
    }

    #[test]
    fn pre_release_does_not_change_the_release_triple() {
        let rc: Version = "v23.1.2-rc1".parse().unwrap();
        let ga: Version = "v23.1.2".parse().unwrap();

        assert_eq!(rc.release(), ga.release());
    }

    #[rstest]
    #[case("")]
    #[case("latest")]
    #[case("v23.1")]
    #[case("v23.01.2")]
    #[case("v23.1.2-")]
    #[case("v23.1.2 ")]
    #[case("v23.1.2+")]
    fn parse_invalid(#[case] tag: &str) {
        assert_eq!(
            tag.parse::<Version>(),
            Err(VersionParseError(tag.to_string()))
        );
    }
}
