//! Stack configuration loading and validation
//!
//! The config file (`renderman.yaml` by default) declares apps, each with
//! ordered lists of chart releases, kustomizations and bundles. The order in
//! the file is the order outputs are rendered, listed and reported in.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, NotFoundError, Result};
use crate::unit::{UnitKind, UnitRef};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "renderman.yaml";

/// Helmfile used by releases that name neither a chart nor a helmfile
pub const DEFAULT_HELMFILE: &str = "helmfile.yaml";

/// Schema versions this build understands
pub const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["1"];

const MAX_SUGGESTION_DISTANCE: usize = 3;

#[derive(Debug, Deserialize)]
struct ConfigFile {
    renderman: StackConfig,
}

/// Root of the stack configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StackConfig {
    /// Config schema version
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Apps by name, in declared order
    #[serde(default, deserialize_with = "deserialize_apps")]
    pub apps: IndexMap<String, App>,

    /// Directory relative paths in the config resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_schema_version() -> String {
    "1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    "default".to_string()
}

/// An application: a named group of units sharing an output directory
#[derive(Debug, Clone, Deserialize)]
pub struct App {
    /// App name, taken from the mapping key
    #[serde(skip)]
    pub name: String,

    /// Disabled apps stay in the config but are never rendered
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, deserialize_with = "nullable_list")]
    pub releases: Vec<Release>,

    #[serde(default, deserialize_with = "nullable_list")]
    pub kustomizations: Vec<Kustomization>,

    #[serde(default, deserialize_with = "nullable_list")]
    pub bundles: Vec<Bundle>,
}

/// A chart release rendered with `helm template` (or `helmfile template`)
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Chart to template; without one the release goes through a helmfile
    #[serde(default)]
    pub chart: Option<ChartRef>,

    /// Value-override document passed to the chart
    #[serde(default)]
    pub values: Option<PathBuf>,

    /// Render through a helmfile, selecting this release by name
    #[serde(default)]
    pub helmfile: Option<PathBuf>,
}

impl Release {
    /// The helmfile this release renders through, if any.
    ///
    /// A release with no chart falls back to [`DEFAULT_HELMFILE`] next to the
    /// config file.
    pub fn helmfile_path(&self) -> Option<&Path> {
        match (&self.helmfile, &self.chart) {
            (Some(helmfile), _) => Some(helmfile),
            (None, None) => Some(Path::new(DEFAULT_HELMFILE)),
            (None, Some(_)) => None,
        }
    }
}

/// Chart reference
#[derive(Debug, Clone, Deserialize)]
pub struct ChartRef {
    pub name: String,

    /// Chart version; empty means unpinned
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,

    /// Chart repository URL, passed as `--repo`
    #[serde(default)]
    pub repository: Option<String>,
}

impl ChartRef {
    pub fn is_pinned(&self) -> bool {
        !self.version.trim().is_empty()
    }
}

/// A kustomize base or overlay, local or remote
#[derive(Debug, Clone, Deserialize)]
pub struct Kustomization {
    pub name: String,
    pub source: String,
}

/// A named collection of raw manifest sources, concatenated in order
#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    pub name: String,

    /// Values for `{placeholder}` substitution in sources
    #[serde(default)]
    pub data: IndexMap<String, serde_yaml::Value>,

    /// Local paths or URLs
    #[serde(default, deserialize_with = "nullable_list")]
    pub sources: Vec<String>,
}

impl StackConfig {
    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::from_yaml(&content, base_dir)
    }

    /// Parse and validate config text
    pub fn from_yaml(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let mut config = file.renderman;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    /// Check the shape invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_SCHEMA_VERSIONS.contains(&self.schema_version.as_str()) {
            return Err(ConfigError::UnsupportedSchemaVersion {
                found: self.schema_version.clone(),
                help: Some(format!(
                    "supported versions: {}",
                    SUPPORTED_SCHEMA_VERSIONS.join(", ")
                )),
            });
        }

        for (name, app) in &self.apps {
            validate_name("app", name)?;
            app.validate()?;
        }

        Ok(())
    }

    /// Enabled apps in declared order
    pub fn enabled_apps(&self) -> impl Iterator<Item = &App> {
        self.apps.values().filter(|app| app.enabled)
    }

    pub fn app(&self, name: &str) -> Option<&App> {
        self.apps.get(name)
    }

    /// Look up an app that must exist and be enabled
    pub fn enabled_app(&self, name: &str) -> std::result::Result<&App, NotFoundError> {
        match self.apps.get(name) {
            Some(app) if app.enabled => Ok(app),
            Some(_) => Err(NotFoundError::Disabled {
                name: name.to_string(),
            }),
            None => {
                let help = self
                    .enabled_apps()
                    .map(|app| (strsim::levenshtein(name, &app.name), app.name.as_str()))
                    .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
                    .min_by_key(|(distance, _)| *distance)
                    .map(|(_, candidate)| format!("did you mean `{}`?", candidate));
                Err(NotFoundError::App {
                    name: name.to_string(),
                    help,
                })
            }
        }
    }

    /// Resolve a config-relative path
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl App {
    /// Every unit of the app: releases, then kustomizations, then bundles
    pub fn units(&self) -> impl Iterator<Item = UnitRef<'_>> {
        self.releases
            .iter()
            .map(UnitRef::Release)
            .chain(self.kustomizations.iter().map(UnitRef::Kustomization))
            .chain(self.bundles.iter().map(UnitRef::Bundle))
    }

    fn validate(&self) -> Result<()> {
        let mut seen: HashSet<(UnitKind, &str)> = HashSet::new();
        for unit in self.units() {
            let kind = unit.kind();
            validate_name(kind.as_str(), unit.name())?;
            if !seen.insert((kind, unit.name())) {
                return Err(ConfigError::DuplicateUnit {
                    app: self.name.clone(),
                    kind: kind.to_string(),
                    name: unit.name().to_string(),
                });
            }
        }

        for release in &self.releases {
            let context = format!("release {}/{}", self.name, release.name);
            if let Some(chart) = &release.chart
                && chart.name.trim().is_empty()
            {
                return Err(ConfigError::MissingField {
                    field: "chart.name".to_string(),
                    context,
                });
            }
        }

        for kustomization in &self.kustomizations {
            if kustomization.source.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "source".to_string(),
                    context: format!("kustomization {}/{}", self.name, kustomization.name),
                });
            }
        }

        for bundle in &self.bundles {
            if bundle.sources.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "sources".to_string(),
                    context: format!("bundle {}/{}", self.name, bundle.name),
                });
            }
        }

        Ok(())
    }
}

/// Names become path segments of the output tree
fn validate_name(what: &str, name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("must not contain path separators")
    } else if name == "." || name == ".." {
        Some("must not be a relative path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidName {
            what: what.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn deserialize_apps<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, App>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AppsVisitor;

    impl<'de> Visitor<'de> for AppsVisitor {
        type Value = IndexMap<String, App>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of app names to apps")
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(IndexMap::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut apps = IndexMap::new();
            while let Some((name, mut app)) = map.next_entry::<String, App>()? {
                if apps.contains_key(&name) {
                    return Err(de::Error::custom(format!("duplicate app name {:?}", name)));
                }
                app.name = name.clone();
                apps.insert(name, app);
            }
            Ok(apps)
        }
    }

    deserializer.deserialize_map(AppsVisitor)
}

fn nullable_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `version: 1.2`, `version: "1.2"` and `version:` alike
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        _ => Err(de::Error::custom("expected a scalar version")),
    }
}
