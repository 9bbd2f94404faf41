use once_cell::sync::Lazy;
use regex::Regex;

use super::DeclaredDependency;

const CONFIGURATIONS: &str = concat!(
    "implementation|api|compile|compileOnly|runtimeOnly|",
    "testImplementation|testRuntimeOnly|kapt|annotationProcessor"
);

/// `implementation 'group:artifact:version'`, with or without parentheses.
static SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?m)^\s*(?:{CONFIGURATIONS})\s*\(?\s*['"]([^'":\s]+):([^'":\s]+)(?::([^'"\s]+))?['"]"#
    ))
    .expect("valid gradle shorthand regex")
});

/// `implementation group: 'g', name: 'a', version: 'v'`
static MAP_NOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        concat!(
            r#"(?m)^\s*(?:{configurations})\s*\(?\s*"#,
            r#"group\s*[:=]\s*['"]([^'"]+)['"]\s*,\s*"#,
            r#"name\s*[:=]\s*['"]([^'"]+)['"]"#,
            r#"(?:\s*,\s*version\s*[:=]\s*['"]([^'"]+)['"])?"#,
        ),
        configurations = CONFIGURATIONS
    ))
    .expect("valid gradle map regex")
});

/// `group:artifact:version=configurations`
static LOCKFILE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:#\s]+):([^:\s]+):([^=\s]+)").expect("valid lockfile regex"));

/// Dependencies declared in `build.gradle` or `build.gradle.kts`.
pub fn parse_build_script(content: &str) -> Vec<DeclaredDependency> {
    SHORTHAND
        .captures_iter(content)
        .chain(MAP_NOTATION.captures_iter(content))
        .map(|caps| DeclaredDependency {
            group_id: caps[1].to_string(),
            artifact_id: caps[2].to_string(),
            version: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect()
}

pub fn parse_lockfile(content: &str) -> Vec<DeclaredDependency> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("empty="))
        .filter_map(|line| LOCKFILE_LINE.captures(line))
        .map(|caps| DeclaredDependency {
            group_id: caps[1].to_string(),
            artifact_id: caps[2].to_string(),
            version: caps[3].to_string(),
        })
        .collect()
}
