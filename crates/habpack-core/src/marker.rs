use std::sync::LazyLock;

use regex::Regex;

pub const DISTRO_VERSION_KEY: &str = "openhab-distro";

static DISTRO_VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)^{}[ \t]*:[ \t]*(.*)$",
        regex::escape(DISTRO_VERSION_KEY)
    ))
    .expect("distro version pattern is valid")
});

/// Extracts the distribution version from a `version.properties` body.
pub fn parse_distro_version(content: &str) -> Option<String> {
    let captures = DISTRO_VERSION_LINE.captures(content)?;
    let value = captures.get(1)?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}
