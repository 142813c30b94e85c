//! Artifact coordinates and dependencies
//!
//! Provides the immutable identity of an artifact (`group:name:version` plus
//! optional extension and classifier) and the scoped dependency that pairs a
//! coordinate with transitive-inclusion information.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Extension used when a coordinate does not name one
pub const DEFAULT_EXTENSION: &str = "jar";

/// Scope used when a dependency does not name one
pub const DEFAULT_SCOPE: &str = "compile";

/// `<group>:<name>[:<extension>[:<classifier>]]:<version>`
static COORDINATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^: ]+):([^: ]+)(:([^: ]*)(:([^: ]+))?)?:([^: ]+)$")
        .expect("coordinate pattern is valid")
});

/// Errors that can occur while parsing a coordinate string
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinateParseError {
    /// The string does not match the coordinate grammar
    #[error(
        "Bad artifact coordinates {0}, expected format is \
         <group>:<name>[:<extension>[:<classifier>]]:<version>"
    )]
    Malformed(String),

    /// A component would not map onto a single path segment
    #[error("Invalid {component} '{value}' in artifact coordinates {coordinate}")]
    InvalidComponent {
        coordinate: String,
        component: &'static str,
        value: String,
    },
}

/// Check one coordinate component for use as a path segment
///
/// Group ids are split on `.` into directories, so each of their segments is
/// checked on its own.
pub(crate) fn check_component(
    coordinate: &str,
    component: &'static str,
    value: &str,
) -> Result<(), CoordinateParseError> {
    let segments: Vec<&str> = if component == "groupId" {
        value.split('.').collect()
    } else {
        vec![value]
    };

    let bad = segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains(['/', '\\', '\0']));
    if bad {
        return Err(CoordinateParseError::InvalidComponent {
            coordinate: coordinate.to_string(),
            component,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Identity of a single artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
    classifier: Option<String>,
    extension: String,
}

impl ArtifactCoordinate {
    /// Create a `jar` coordinate without classifier
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Replace the extension; an empty extension falls back to `jar`
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = if extension.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            extension
        };
        self
    }

    /// Replace the classifier; an empty classifier clears it
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = (!classifier.is_empty()).then_some(classifier);
        self
    }

    /// Copy of this coordinate pointing at a different version
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// Parse a colon-delimited coordinate string
    ///
    /// Accepted forms:
    /// - `group:name:version`
    /// - `group:name:extension:version`
    /// - `group:name:extension:classifier:version`
    pub fn parse(coordinate: &str) -> Result<Self, CoordinateParseError> {
        let captures = COORDINATE_PATTERN
            .captures(coordinate)
            .ok_or_else(|| CoordinateParseError::Malformed(coordinate.to_string()))?;

        let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

        let parsed = Self::new(group(1), group(2), group(7))
            .with_extension(group(4))
            .with_classifier(group(6));
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check that every component maps onto a safe path segment
    ///
    /// Coordinates become directories and file names in repositories, so
    /// `/`, `\`, `.`, `..` and empty segments are rejected.
    pub fn validate(&self) -> Result<(), CoordinateParseError> {
        let coordinate = self.to_string();
        check_component(&coordinate, "groupId", &self.group_id)?;
        check_component(&coordinate, "artifactId", &self.artifact_id)?;
        check_component(&coordinate, "version", &self.version)?;
        check_component(&coordinate, "extension", &self.extension)?;
        if let Some(classifier) = &self.classifier {
            check_component(&coordinate, "classifier", classifier)?;
        }
        Ok(())
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Identity without the version, used to detect conflicting versions
    /// of the same artifact in one graph
    pub fn conflict_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id,
            self.artifact_id,
            self.extension,
            self.classifier.as_deref().unwrap_or("")
        )
    }

    /// File name of this artifact inside a maven2 layout version directory
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Coordinate of the `pom` descriptor describing this artifact
    pub fn descriptor(&self) -> Self {
        Self::new(&self.group_id, &self.artifact_id, &self.version).with_extension("pom")
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CoordinateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Excludes matching artifacts from a dependency's subtree
///
/// Either field may be `*` to match any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Check whether this exclusion applies to a coordinate
    pub fn matches(&self, coordinate: &ArtifactCoordinate) -> bool {
        let matches = |pattern: &str, value: &str| pattern == "*" || pattern == value;
        matches(&self.group_id, coordinate.group_id())
            && matches(&self.artifact_id, coordinate.artifact_id())
    }
}

/// A coordinate paired with the scope that governs its transitive inclusion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    coordinate: ArtifactCoordinate,
    scope: String,
    optional: bool,
    exclusions: Vec<Exclusion>,
}

impl Dependency {
    /// Create a dependency; the scope is passed through unvalidated
    pub fn new(coordinate: ArtifactCoordinate, scope: impl Into<String>) -> Self {
        Self {
            coordinate,
            scope: scope.into(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Same dependency with a different scope
    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self.clone()
        }
    }

    /// Same dependency pointing at a different version
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            coordinate: self.coordinate.with_version(version),
            ..self.clone()
        }
    }

    pub fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.coordinate, self.scope)?;
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_part() {
        let coord = ArtifactCoordinate::parse("org.example:leaf:1.0").unwrap();
        assert_eq!(coord.group_id(), "org.example");
        assert_eq!(coord.artifact_id(), "leaf");
        assert_eq!(coord.version(), "1.0");
        assert_eq!(coord.extension(), "jar");
        assert_eq!(coord.classifier(), None);
    }

    #[test]
    fn test_parse_with_extension_and_classifier() {
        let coord = ArtifactCoordinate::parse("org.example:leaf:zip:sources:2.1").unwrap();
        assert_eq!(coord.extension(), "zip");
        assert_eq!(coord.classifier(), Some("sources"));
        assert_eq!(coord.version(), "2.1");
        assert_eq!(coord.to_string(), "org.example:leaf:zip:sources:2.1");
    }

    #[test]
    fn test_parse_empty_extension_defaults_to_jar() {
        let coord = ArtifactCoordinate::parse("g:a::1").unwrap();
        assert_eq!(coord.extension(), "jar");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["bad::coordinate", "g:a", "", "g:a:b:c:d:e", "g a:b:1"] {
            assert!(
                matches!(
                    ArtifactCoordinate::parse(bad),
                    Err(CoordinateParseError::Malformed(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_path_segments() {
        for bad in [
            "g:..:1",
            "g:a:..",
            "g..x:a:1",
            ".g:a:1",
            "g:a\\b:1",
            "g:a:jar:x/y:1",
            "g:a:.:1",
        ] {
            assert!(
                matches!(
                    ArtifactCoordinate::parse(bad),
                    Err(CoordinateParseError::InvalidComponent { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_constructed_coordinate() {
        assert!(ArtifactCoordinate::new("org.example", "lib", "1.0-SNAPSHOT")
            .validate()
            .is_ok());
        let err = ArtifactCoordinate::new("evil", "..", "..").validate().unwrap_err();
        assert!(matches!(
            err,
            CoordinateParseError::InvalidComponent { component: "artifactId", .. }
        ));
    }

    #[test]
    fn test_file_name() {
        let coord = ArtifactCoordinate::new("g", "lib", "1.2");
        assert_eq!(coord.file_name(), "lib-1.2.jar");
        assert_eq!(
            coord.clone().with_classifier("tests").file_name(),
            "lib-1.2-tests.jar"
        );
        assert_eq!(coord.descriptor().file_name(), "lib-1.2.pom");
    }

    #[test]
    fn test_conflict_key_ignores_version() {
        let a = ArtifactCoordinate::new("g", "a", "1.0");
        let b = a.with_version("2.0");
        assert_ne!(a, b);
        assert_eq!(a.conflict_key(), b.conflict_key());
    }

    #[test]
    fn test_exclusion_wildcards() {
        let coord = ArtifactCoordinate::new("org.slf4j", "slf4j-api", "1.7");
        assert!(Exclusion::new("org.slf4j", "*").matches(&coord));
        assert!(Exclusion::new("*", "slf4j-api").matches(&coord));
        assert!(!Exclusion::new("org.slf4j", "slf4j-simple").matches(&coord));
    }
}
