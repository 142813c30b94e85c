//! Artifact descriptors (POM files)
//!
//! Reads the subset of the POM model needed to collect a dependency graph:
//! coordinates, parent inheritance, properties, dependency management
//! (including imported BOMs) and the declared dependencies.

use crate::coordinate::{
    check_component, ArtifactCoordinate, CoordinateParseError, Dependency, Exclusion,
    DEFAULT_SCOPE,
};
use crate::transport::TransportError;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::collections::HashMap;
use thiserror::Error;

/// Parent chains longer than this are treated as cycles
pub const MAX_PARENT_DEPTH: usize = 16;

/// Nested `import` scopes deeper than this are treated as cycles
pub const MAX_IMPORT_DEPTH: usize = 16;

/// Interpolation passes before giving up on nested `${...}` references
const MAX_INTERPOLATION_PASSES: usize = 8;

static PROPERTY_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("property pattern is valid"));

/// Errors that can occur while reading a descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The document is not well-formed XML
    #[error("Malformed descriptor {artifact}: {reason}")]
    Xml { artifact: String, reason: String },

    /// A required element is absent
    #[error("Descriptor {artifact} is missing <{element}>")]
    MissingElement {
        artifact: String,
        element: &'static str,
    },

    /// A parent descriptor could not be found
    #[error("Parent {parent} of {artifact} not found")]
    MissingParent { artifact: String, parent: String },

    /// The parent chain is too long or cyclic
    #[error("Parent chain of {0} is too deep")]
    ParentDepthExceeded(String),

    /// An imported BOM could not be found
    #[error("Imported descriptor {import} of {artifact} not found")]
    MissingImport { artifact: String, import: String },

    /// Imports nest too deeply or form a cycle
    #[error("Imports of {0} nest too deeply")]
    ImportDepthExceeded(String),

    /// A dependency has no version and none is managed
    #[error("Dependency {dependency} of {artifact} has no version")]
    MissingVersion { artifact: String, dependency: String },

    /// A declared coordinate cannot be used as a repository path
    #[error("Descriptor {artifact} declares an invalid coordinate: {source}")]
    InvalidCoordinate {
        artifact: String,
        #[source]
        source: CoordinateParseError,
    },

    /// Fetching a descriptor failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Supplies raw descriptor bytes for a `pom` coordinate
pub trait DescriptorSource {
    fn fetch_descriptor(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Option<Vec<u8>>, TransportError>;
}

/// A `dependencyManagement` entry
///
/// Applies to every dependency with the same group, name, extension and
/// classifier, whatever version it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDependency {
    key: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub exclusions: Vec<Exclusion>,
}

impl ManagedDependency {
    /// Entry pinning the version of `coordinate`
    pub fn pinning(coordinate: &ArtifactCoordinate) -> Self {
        Self {
            key: coordinate.conflict_key(),
            version: Some(coordinate.version().to_string()),
            scope: None,
            exclusions: Vec::new(),
        }
    }

    /// Same format as [`ArtifactCoordinate::conflict_key`]
    pub fn conflict_key(&self) -> &str {
        &self.key
    }

    pub fn applies_to(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.key == coordinate.conflict_key()
    }
}

/// Effective descriptor of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub coordinate: ArtifactCoordinate,
    /// Declared dependencies, inherited ones included
    pub dependencies: Vec<Dependency>,
    /// Effective dependency management, imports included
    pub managed: Vec<ManagedDependency>,
}

/// Read and fully interpolate the descriptor of `coordinate`
///
/// Returns `Ok(None)` if no source holds the descriptor.
pub fn read_descriptor(
    coordinate: &ArtifactCoordinate,
    source: &dyn DescriptorSource,
) -> Result<Option<ArtifactDescriptor>, DescriptorError> {
    read_nested(coordinate, source, 0)
}

fn read_nested(
    coordinate: &ArtifactCoordinate,
    source: &dyn DescriptorSource,
    import_depth: usize,
) -> Result<Option<ArtifactDescriptor>, DescriptorError> {
    let artifact = coordinate.to_string();

    let Some(bytes) = source.fetch_descriptor(&coordinate.descriptor())? else {
        return Ok(None);
    };
    let model = Model::parse(&artifact, &bytes)?;
    let lineage = load_lineage(&artifact, &model, source)?;

    Ok(Some(effective_descriptor(
        coordinate,
        model,
        &lineage,
        source,
        import_depth,
    )?))
}

/// Ancestors of `model`, nearest first
fn load_lineage(
    artifact: &str,
    model: &Model,
    source: &dyn DescriptorSource,
) -> Result<Vec<Model>, DescriptorError> {
    let mut lineage = Vec::new();
    let mut next = model.parent.clone();

    while let Some(parent) = next {
        if lineage.len() >= MAX_PARENT_DEPTH {
            return Err(DescriptorError::ParentDepthExceeded(artifact.to_string()));
        }
        let parent_coordinate =
            ArtifactCoordinate::new(&parent.group_id, &parent.artifact_id, &parent.version);
        parent_coordinate
            .validate()
            .map_err(|source| DescriptorError::InvalidCoordinate {
                artifact: artifact.to_string(),
                source,
            })?;

        let bytes = source
            .fetch_descriptor(&parent_coordinate.descriptor())?
            .ok_or_else(|| DescriptorError::MissingParent {
                artifact: artifact.to_string(),
                parent: parent_coordinate.to_string(),
            })?;
        let parent_model = Model::parse(&parent_coordinate.to_string(), &bytes)?;
        next = parent_model.parent.clone();
        lineage.push(parent_model);
    }

    Ok(lineage)
}

/// Management entries in precedence order, first insertion wins
#[derive(Default)]
struct Management {
    entries: Vec<ManagedDependency>,
    index: HashMap<String, usize>,
}

impl Management {
    fn insert(&mut self, entry: ManagedDependency) {
        if !self.index.contains_key(&entry.key) {
            self.index.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    fn get(&self, key: &str) -> Option<&ManagedDependency> {
        self.index.get(key).map(|&i| &self.entries[i])
    }
}

/// Merge a model with its ancestors and resolve its dependency list
fn effective_descriptor(
    coordinate: &ArtifactCoordinate,
    model: Model,
    lineage: &[Model],
    source: &dyn DescriptorSource,
    import_depth: usize,
) -> Result<ArtifactDescriptor, DescriptorError> {
    let artifact = coordinate.to_string();

    let group_id = model
        .group_id
        .clone()
        .or_else(|| model.parent.as_ref().map(|p| p.group_id.clone()))
        .ok_or_else(|| DescriptorError::MissingElement {
            artifact: artifact.clone(),
            element: "groupId",
        })?;
    let artifact_id = model
        .artifact_id
        .clone()
        .ok_or_else(|| DescriptorError::MissingElement {
            artifact: artifact.clone(),
            element: "artifactId",
        })?;
    let version = model
        .version
        .clone()
        .or_else(|| model.parent.as_ref().map(|p| p.version.clone()))
        .ok_or_else(|| DescriptorError::MissingElement {
            artifact: artifact.clone(),
            element: "version",
        })?;

    // Farthest ancestor first so nearer declarations override
    let mut properties = HashMap::new();
    for ancestor in lineage.iter().rev() {
        properties.extend(ancestor.properties.clone());
    }
    properties.extend(model.properties.clone());
    properties.insert("project.groupId".to_string(), group_id.clone());
    properties.insert("project.artifactId".to_string(), artifact_id.clone());
    properties.insert("project.version".to_string(), version.clone());
    properties.insert("pom.version".to_string(), version.clone());
    properties.insert("version".to_string(), version.clone());
    if let Some(parent) = &model.parent {
        properties.insert("project.parent.version".to_string(), parent.version.clone());
        properties.insert("project.parent.groupId".to_string(), parent.group_id.clone());
    }

    // Own and inherited entries take precedence over imported ones
    let mut management = Management::default();
    let mut imports = Vec::new();
    for declared in std::iter::once(&model).chain(lineage.iter()) {
        for entry in &declared.managed {
            let entry = entry.interpolated(&properties);
            if entry.is_import() {
                imports.push(entry);
            } else {
                management.insert(entry.into_managed(&artifact)?);
            }
        }
    }

    for import in imports {
        if import_depth >= MAX_IMPORT_DEPTH {
            return Err(DescriptorError::ImportDepthExceeded(artifact));
        }
        let bom = import.import_coordinate(&artifact)?;
        let imported = read_nested(&bom, source, import_depth + 1)?.ok_or_else(|| {
            DescriptorError::MissingImport {
                artifact: artifact.clone(),
                import: bom.to_string(),
            }
        })?;
        for entry in imported.managed {
            management.insert(entry);
        }
    }

    // Inherited dependencies come first; a nearer declaration of the same
    // artifact replaces the inherited one in place
    let mut declared: Vec<RawDependency> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for level in lineage.iter().rev().chain(std::iter::once(&model)) {
        for raw in &level.dependencies {
            let raw = raw.interpolated(&properties);
            let key = raw.management_key();
            match positions.get(&key) {
                Some(&i) => declared[i] = raw,
                None => {
                    positions.insert(key, declared.len());
                    declared.push(raw);
                }
            }
        }
    }

    let mut dependencies = Vec::new();
    for mut raw in declared {
        if let Some(managed) = management.get(&raw.management_key()) {
            raw.apply_management(managed);
        }
        dependencies.push(raw.into_dependency(&artifact)?);
    }

    Ok(ArtifactDescriptor {
        coordinate: coordinate.clone(),
        dependencies,
        managed: management.entries,
    })
}

/// Replace `${name}` references with property values
///
/// Unknown references are left in place.
pub fn interpolate(value: &str, properties: &HashMap<String, String>) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        if !current.contains("${") {
            break;
        }
        let replaced = PROPERTY_REFERENCE
            .replace_all(&current, |caps: &Captures| {
                properties
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if replaced == current {
            break;
        }
        current = replaced;
    }
    current
}

/// Map a dependency `type` onto an extension and implied classifier
fn type_mapping(dependency_type: &str) -> (&str, Option<&'static str>) {
    match dependency_type {
        "test-jar" => ("jar", Some("tests")),
        "java-source" => ("jar", Some("sources")),
        "javadoc" => ("jar", Some("javadoc")),
        "maven-plugin" | "ejb" | "ejb-client" | "bundle" => ("jar", None),
        other => (other, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParentRef {
    group_id: String,
    artifact_id: String,
    version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RawDependency {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    dependency_type: Option<String>,
    classifier: Option<String>,
    scope: Option<String>,
    optional: Option<String>,
    exclusions: Vec<Exclusion>,
}

impl RawDependency {
    fn from_element(element: &XmlElement) -> Self {
        let text = |name: &str| element.child_text(name).map(str::to_string);
        let exclusions = element
            .child("exclusions")
            .map(|e| {
                e.children_named("exclusion")
                    .map(|x| {
                        Exclusion::new(
                            x.child_text("groupId").unwrap_or("*"),
                            x.child_text("artifactId").unwrap_or("*"),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            group_id: text("groupId").unwrap_or_default(),
            artifact_id: text("artifactId").unwrap_or_default(),
            version: text("version"),
            dependency_type: text("type"),
            classifier: text("classifier"),
            scope: text("scope"),
            optional: text("optional"),
            exclusions,
        }
    }

    fn interpolated(&self, properties: &HashMap<String, String>) -> Self {
        let apply = |v: &Option<String>| v.as_deref().map(|s| interpolate(s, properties));
        Self {
            group_id: interpolate(&self.group_id, properties),
            artifact_id: interpolate(&self.artifact_id, properties),
            version: apply(&self.version),
            dependency_type: apply(&self.dependency_type),
            classifier: apply(&self.classifier),
            scope: apply(&self.scope),
            optional: apply(&self.optional),
            exclusions: self.exclusions.clone(),
        }
    }

    /// `import`-scoped `pom` entry naming a BOM
    fn is_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.dependency_type.as_deref() == Some("pom")
    }

    fn extension_and_classifier(&self) -> (String, String) {
        let (extension, implied) = type_mapping(self.dependency_type.as_deref().unwrap_or("jar"));
        let classifier = self
            .classifier
            .clone()
            .or_else(|| implied.map(str::to_string))
            .unwrap_or_default();
        (extension.to_string(), classifier)
    }

    /// Matches [`ArtifactCoordinate::conflict_key`] of the mapped coordinate
    fn management_key(&self) -> String {
        let (extension, classifier) = self.extension_and_classifier();
        format!(
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, extension, classifier
        )
    }

    fn apply_management(&mut self, managed: &ManagedDependency) {
        if self.version.is_none() {
            self.version = managed.version.clone();
        }
        if self.scope.is_none() {
            self.scope = managed.scope.clone();
        }
        if self.exclusions.is_empty() {
            self.exclusions = managed.exclusions.clone();
        }
    }

    fn invalid(artifact: &str, source: CoordinateParseError) -> DescriptorError {
        DescriptorError::InvalidCoordinate {
            artifact: artifact.to_string(),
            source,
        }
    }

    fn into_managed(self, artifact: &str) -> Result<ManagedDependency, DescriptorError> {
        let key = self.management_key();
        check_component(&key, "groupId", &self.group_id)
            .and_then(|_| check_component(&key, "artifactId", &self.artifact_id))
            .and_then(|_| match &self.version {
                Some(version) => check_component(&key, "version", version),
                None => Ok(()),
            })
            .map_err(|source| Self::invalid(artifact, source))?;

        Ok(ManagedDependency {
            key,
            version: self.version,
            scope: self.scope,
            exclusions: self.exclusions,
        })
    }

    fn import_coordinate(&self, artifact: &str) -> Result<ArtifactCoordinate, DescriptorError> {
        let version = self
            .version
            .clone()
            .ok_or_else(|| DescriptorError::MissingVersion {
                artifact: artifact.to_string(),
                dependency: format!("{}:{}", self.group_id, self.artifact_id),
            })?;
        let coordinate =
            ArtifactCoordinate::new(&self.group_id, &self.artifact_id, version).with_extension("pom");
        coordinate
            .validate()
            .map_err(|source| Self::invalid(artifact, source))?;
        Ok(coordinate)
    }

    fn into_dependency(self, artifact: &str) -> Result<Dependency, DescriptorError> {
        let (extension, classifier) = self.extension_and_classifier();
        let version = self.version.ok_or_else(|| DescriptorError::MissingVersion {
            artifact: artifact.to_string(),
            dependency: format!("{}:{}", self.group_id, self.artifact_id),
        })?;

        let coordinate = ArtifactCoordinate::new(self.group_id, self.artifact_id, version)
            .with_extension(extension)
            .with_classifier(classifier);
        coordinate
            .validate()
            .map_err(|source| Self::invalid(artifact, source))?;

        Ok(Dependency::new(coordinate, self.scope.as_deref().unwrap_or(DEFAULT_SCOPE))
            .with_optional(self.optional.as_deref() == Some("true"))
            .with_exclusions(self.exclusions))
    }
}

/// Uninterpolated POM content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Model {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    parent: Option<ParentRef>,
    properties: HashMap<String, String>,
    dependencies: Vec<RawDependency>,
    managed: Vec<RawDependency>,
}

impl Model {
    fn parse(artifact: &str, bytes: &[u8]) -> Result<Self, DescriptorError> {
        let text = String::from_utf8_lossy(bytes);
        let root = XmlElement::parse(&text).map_err(|reason| DescriptorError::Xml {
            artifact: artifact.to_string(),
            reason,
        })?;

        if root.name != "project" {
            return Err(DescriptorError::MissingElement {
                artifact: artifact.to_string(),
                element: "project",
            });
        }

        let parent = root.child("parent").and_then(|p| {
            Some(ParentRef {
                group_id: p.child_text("groupId")?.to_string(),
                artifact_id: p.child_text("artifactId")?.to_string(),
                version: p.child_text("version")?.to_string(),
            })
        });

        let properties = root
            .child("properties")
            .map(|p| {
                p.children
                    .iter()
                    .map(|e| (e.name.clone(), e.text.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let dependency_list = |container: Option<&XmlElement>| -> Vec<RawDependency> {
            container
                .and_then(|c| c.child("dependencies"))
                .map(|d| {
                    d.children_named("dependency")
                        .map(RawDependency::from_element)
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Self {
            group_id: root.child_text("groupId").map(str::to_string),
            artifact_id: root.child_text("artifactId").map(str::to_string),
            version: root.child_text("version").map(str::to_string),
            parent,
            properties,
            dependencies: dependency_list(Some(&root)),
            managed: dependency_list(root.child("dependencyManagement")),
        })
    }
}

/// Minimal element tree; namespaces and attributes are dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct XmlElement {
    name: String,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn parse(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    stack.push(XmlElement {
                        name: String::from_utf8_lossy(e.local_name().as_ref()).to_string(),
                        ..Default::default()
                    });
                }
                Ok(Event::Empty(ref e)) => {
                    let element = XmlElement {
                        name: String::from_utf8_lossy(e.local_name().as_ref()).to_string(),
                        ..Default::default()
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| e.to_string())?;
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref c)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Ok(Event::End(_)) => {
                    let finished = stack.pop().ok_or("unbalanced end tag")?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(finished),
                        None => root = Some(finished),
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    ))
                }
            }
        }

        if !stack.is_empty() {
            return Err("unexpected end of document".to_string());
        }
        root.ok_or_else(|| "empty document".to_string())
    }

    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }
}
