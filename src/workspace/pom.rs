//! Maven XML: project POMs and `maven-metadata.xml`.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use super::DeclaredDependency;

enum Visit<'a> {
    Open(&'a [String]),
    Text(&'a [String], &'a str),
    Close(&'a [String]),
}

/// Stream the document, reporting each event with the element path that encloses it.
fn walk(xml: &str, mut visit: impl FnMut(Visit<'_>)) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(local_name(e.name()));
                visit(Visit::Open(&path));
            }
            Event::Empty(e) => {
                path.push(local_name(e.name()));
                visit(Visit::Open(&path));
                visit(Visit::Close(&path));
                path.pop();
            }
            Event::End(_) => {
                visit(Visit::Close(&path));
                path.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                visit(Visit::Text(&path, &text));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                visit(Visit::Text(&path, &text));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn local_name(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.local_name().as_ref()).into_owned()
}

fn at(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

/// Direct `<dependencies>` of the project, with `${property}` versions resolved.
///
/// Entries under `<dependencyManagement>` or plugins are not installed and are skipped.
pub fn parse_dependencies(xml: &str) -> Result<Vec<DeclaredDependency>, quick_xml::Error> {
    const DEPENDENCY: &[&str] = &["project", "dependencies", "dependency"];

    let mut properties: HashMap<String, String> = HashMap::new();
    let mut declared = Vec::new();
    let mut current: Option<DeclaredDependency> = None;

    walk(xml, |visit| match visit {
        Visit::Open(path) if at(path, DEPENDENCY) => {
            current = Some(DeclaredDependency::default());
        }
        Visit::Text(path, text) => {
            if path.len() == 3 && path[0] == "project" && path[1] == "properties" {
                properties.insert(path[2].clone(), text.to_string());
            } else if at(path, &["project", "version"]) {
                properties.insert("project.version".to_string(), text.to_string());
            } else if at(path, &["project", "groupId"]) {
                properties.insert("project.groupId".to_string(), text.to_string());
            } else if let Some(dep) = current.as_mut().filter(|_| path.len() == 4) {
                match path[3].as_str() {
                    "groupId" => dep.group_id = text.to_string(),
                    "artifactId" => dep.artifact_id = text.to_string(),
                    "version" => dep.version = text.to_string(),
                    _ => {}
                }
            }
        }
        Visit::Close(path) if at(path, DEPENDENCY) => {
            if let Some(dep) = current.take().filter(|d| !d.artifact_id.is_empty()) {
                declared.push(dep);
            }
        }
        _ => {}
    })?;

    for dep in &mut declared {
        dep.group_id = substitute(&dep.group_id, &properties);
        dep.version = substitute(&dep.version, &properties);
    }
    Ok(declared)
}

/// Replace `${name}` with a known property; unknown references are left as written.
fn substitute(value: &str, properties: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let key = &rest[start + 2..start + len];
        out.push_str(&rest[..start]);
        match properties.get(key) {
            Some(v) => out.push_str(v),
            None => out.push_str(&rest[start..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Every `<licenses><license><name>` of a POM, in document order.
pub fn license_names(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut names = Vec::new();
    walk(xml, |visit| {
        if let Visit::Text(path, text) = visit {
            if at(path, &["project", "licenses", "license", "name"]) && !text.trim().is_empty() {
                names.push(text.trim().to_string());
            }
        }
    })?;
    Ok(names)
}

/// The version `maven-metadata.xml` advertises: `<release>`, else `<latest>`.
pub fn metadata_version(xml: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut release = None;
    let mut latest = None;
    walk(xml, |visit| {
        if let Visit::Text(path, text) = visit {
            if at(path, &["metadata", "versioning", "release"]) {
                release = Some(text.to_string());
            } else if at(path, &["metadata", "versioning", "latest"]) {
                latest = Some(text.to_string());
            }
        }
    })?;
    Ok(release.or(latest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dependencies() {
        let xml = r#"<?xml version="1.0"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <groupId>org.example</groupId>
  <version>2.1.0</version>
  <properties>
    <guava.version>33.0.0-jre</guava.version>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>managed</groupId>
        <artifactId>only-managed</artifactId>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>${guava.version}</version>
    </dependency>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>sibling</artifactId>
      <version>${project.version}</version>
      <exclusions>
        <exclusion>
          <groupId>ignored</groupId>
          <artifactId>ignored</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
  </dependencies>
</project>"#;

        let deps = parse_dependencies(xml).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].group_id, "com.google.guava");
        assert_eq!(deps[0].version, "33.0.0-jre");
        assert_eq!(deps[1].group_id, "org.example");
        assert_eq!(deps[1].artifact_id, "sibling");
        assert_eq!(deps[1].version, "2.1.0");
    }

    #[test]
    fn test_substitute_keeps_unknown_properties() {
        let props = HashMap::from([("a".to_string(), "1".to_string())]);
        assert_eq!(substitute("${a}.${b}", &props), "1.${b}");
        assert_eq!(substitute("plain", &props), "plain");
        assert_eq!(substitute("${unterminated", &props), "${unterminated");
    }

    #[test]
    fn test_license_names() {
        let pom = r#"<project>
  <licenses>
    <license>
      <name>Apache License, Version 2.0</name>
      <url>https://www.apache.org/licenses/LICENSE-2.0</url>
    </license>
    <license>
      <name><![CDATA[MIT]]></name>
    </license>
  </licenses>
  <developers><developer><name>Jane</name></developer></developers>
</project>"#;
        assert_eq!(
            license_names(pom).unwrap(),
            vec!["Apache License, Version 2.0".to_string(), "MIT".to_string()]
        );
    }

    #[test]
    fn test_metadata_version() {
        let xml = "<metadata><versioning>\
                   <latest>2.0-SNAPSHOT</latest><release>1.9</release>\
                   </versioning></metadata>";
        assert_eq!(metadata_version(xml).unwrap(), Some("1.9".to_string()));
        let xml = "<metadata><versioning><latest>2.0</latest></versioning></metadata>";
        assert_eq!(metadata_version(xml).unwrap(), Some("2.0".to_string()));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(license_names("<project><licenses></project>").is_err());
    }
}
