use std::fmt;

use serde::Serialize;

/// Single comparable integer for a `MAJOR.MINOR.PATCH[-suffix]` version.
///
/// Computed as `major * 10000 + minor * 100 + patch`. Components past the
/// third are ignored and a patch qualifier after `-` is dropped, so
/// `4.1.0-M2` and `4.1.0` share a code. Components of 100 or more bleed
/// into the next position; that loss of precision is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VersionCode(u64);

impl VersionCode {
    pub fn from_version(version: &str) -> Self {
        let mut parts = version.trim().split('.');
        let major = leading_number(parts.next());
        let minor = leading_number(parts.next());
        let patch = leading_number(
            parts
                .next()
                .map(|value| value.split_once('-').map_or(value, |(head, _)| head)),
        );

        Self(
            major
                .saturating_mul(10_000)
                .saturating_add(minor.saturating_mul(100))
                .saturating_add(patch),
        )
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn version_code(version: &str) -> u64 {
    VersionCode::from_version(version).value()
}

// Leading ASCII digits only; anything else (or nothing) counts as zero.
fn leading_number(token: Option<&str>) -> u64 {
    let Some(token) = token else {
        return 0;
    };
    token
        .trim()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_u64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(u64::from(digit - b'0'))
        })
}
