//! Output layout and unit selection
//!
//! Every unit maps to exactly one file in the output tree:
//! `<output_dir>/<app>/<unit>.<kind>.manifest.yaml`. Names are validated as
//! single path segments at load time and units are unique per kind within an
//! app, so no two units share a path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::{App, StackConfig};
use crate::error::NotFoundError;
use crate::unit::{UnitId, UnitKind, UnitRef};

/// Suffix shared by every rendered manifest file
pub const MANIFEST_SUFFIX: &str = "manifest.yaml";

static MANIFEST_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<unit>.+)\.(?P<kind>release|kustomization|bundle)\.manifest\.yaml$")
        .expect("manifest file name pattern is valid")
});

/// Maps unit identities to files under an output root
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a unit's output file relative to the output root
    pub fn relative_path(app: &str, kind: UnitKind, unit: &str) -> PathBuf {
        Path::new(app).join(format!("{}.{}.{}", unit, kind, MANIFEST_SUFFIX))
    }

    /// Absolute (root-joined) path of a unit's output file
    pub fn path_for(&self, app: &str, kind: UnitKind, unit: &str) -> PathBuf {
        self.root.join(Self::relative_path(app, kind, unit))
    }

    pub fn path_for_unit(&self, id: &UnitId) -> PathBuf {
        self.path_for(&id.app, id.kind, &id.name)
    }

    /// Recover the unit identity from a relative output path.
    ///
    /// Returns `None` for anything that does not follow the naming convention.
    pub fn unit_for_path(relative: &Path) -> Option<UnitId> {
        let mut components = relative.components();
        let app = components.next()?.as_os_str().to_str()?;
        let file_name = components.next()?.as_os_str().to_str()?;
        if components.next().is_some() {
            return None;
        }

        let captures = MANIFEST_FILE_NAME.captures(file_name)?;
        let kind = captures["kind"].parse().ok()?;
        Some(UnitId::new(app, kind, &captures["unit"]))
    }
}

/// Restricts which units a command works on
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Only this app
    pub app: Option<String>,

    /// Only these kinds (all when empty)
    pub kinds: Vec<UnitKind>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn app(name: impl Into<String>) -> Self {
        Self {
            app: Some(name.into()),
            kinds: Vec::new(),
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = UnitKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    fn accepts_kind(&self, kind: UnitKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// The part of the output tree a render pass is responsible for.
///
/// Stale files are only looked for inside the scope, so filtering to one app
/// never reports the other apps' files as removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scope {
    pub app: Option<String>,
    pub kinds: Vec<UnitKind>,
    /// Configured but disabled apps, whose directories are left alone
    pub excluded_apps: BTreeSet<String>,
}

impl Scope {
    pub fn covers(&self, app: &str, kind: UnitKind) -> bool {
        let app_covered = match &self.app {
            Some(selected) => selected == app,
            None => !self.excluded_apps.contains(app),
        };
        app_covered && (self.kinds.is_empty() || self.kinds.contains(&kind))
    }
}

/// A unit picked for rendering, with its output path
#[derive(Debug, Clone)]
pub struct SelectedUnit<'a> {
    pub id: UnitId,
    /// Relative output path
    pub path: PathBuf,
    pub app: &'a App,
    pub unit: UnitRef<'a>,
}

/// Units selected by a filter, in declared order
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub units: Vec<SelectedUnit<'a>>,
    pub scope: Scope,
}

impl StackConfig {
    /// Select the units a filter applies to.
    ///
    /// Fails when the filter names an app that is missing or disabled.
    pub fn select(&self, filter: &Filter) -> Result<Selection<'_>, NotFoundError> {
        let apps: Vec<&App> = match &filter.app {
            Some(name) => vec![self.enabled_app(name)?],
            None => self.enabled_apps().collect(),
        };

        let units = apps
            .into_iter()
            .flat_map(|app| {
                app.units()
                    .filter(|unit| filter.accepts_kind(unit.kind()))
                    .map(move |unit| SelectedUnit {
                        id: UnitId::new(&app.name, unit.kind(), unit.name()),
                        path: OutputLayout::relative_path(&app.name, unit.kind(), unit.name()),
                        app,
                        unit,
                    })
            })
            .collect();

        let scope = Scope {
            app: filter.app.clone(),
            kinds: filter.kinds.clone(),
            excluded_apps: self
                .apps
                .values()
                .filter(|app| !app.enabled)
                .map(|app| app.name.clone())
                .collect(),
        };

        Ok(Selection { units, scope })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const STACK: &str = r#"
renderman:
  apps:
    cert-manager:
      releases:
        - name: cert-manager
          chart: { name: jetstack/cert-manager, version: v1.14.4 }
      bundles:
        - name: crds
          sources: [crds.yaml]
    legacy:
      enabled: false
      bundles:
        - name: crds
          sources: [crds.yaml]
    monitoring:
      releases:
        - name: crds
          chart: { name: prometheus/crds }
      kustomizations:
        - name: crds
          source: monitoring/crds
      bundles:
        - name: crds
          sources: [crds.yaml]
"#;

    #[test]
    fn test_path_for() {
        let layout = OutputLayout::new("/out");
        assert_eq!(
            layout.path_for("cert-manager", UnitKind::Bundle, "crds"),
            PathBuf::from("/out/cert-manager/crds.bundle.manifest.yaml")
        );
        assert_eq!(
            OutputLayout::relative_path("app", UnitKind::Kustomization, "overlay"),
            PathBuf::from("app/overlay.kustomization.manifest.yaml")
        );
    }

    #[test]
    fn test_unit_for_path() {
        let id = OutputLayout::unit_for_path(Path::new("app/my.unit.release.manifest.yaml"))
            .unwrap();
        assert_eq!(id, UnitId::new("app", UnitKind::Release, "my.unit"));

        assert!(OutputLayout::unit_for_path(Path::new("app/README.md")).is_none());
        assert!(OutputLayout::unit_for_path(Path::new("x.bundle.manifest.yaml")).is_none());
        assert!(
            OutputLayout::unit_for_path(Path::new("a/b/x.bundle.manifest.yaml")).is_none()
        );
        assert!(
            OutputLayout::unit_for_path(Path::new("app/x.kustomize.manifest.yaml")).is_none()
        );
    }

    #[test]
    fn test_select_all_in_declared_order() {
        let config = StackConfig::from_yaml(STACK, ".").unwrap();
        let selection = config.select(&Filter::all()).unwrap();

        let ids: Vec<String> = selection.units.iter().map(|u| u.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "cert-manager/release/cert-manager",
                "cert-manager/bundle/crds",
                "monitoring/release/crds",
                "monitoring/kustomization/crds",
                "monitoring/bundle/crds",
            ]
        );
        assert!(selection.scope.excluded_apps.contains("legacy"));
    }

    #[test]
    fn test_selected_paths_are_unique() {
        let config = StackConfig::from_yaml(STACK, ".").unwrap();
        let selection = config.select(&Filter::all()).unwrap();
        let paths: HashSet<&PathBuf> = selection.units.iter().map(|u| &u.path).collect();
        assert_eq!(paths.len(), selection.units.len());
    }

    #[test]
    fn test_select_app_and_kinds() {
        let config = StackConfig::from_yaml(STACK, ".").unwrap();
        let filter = Filter::app("monitoring").with_kinds([UnitKind::Bundle, UnitKind::Release]);
        let selection = config.select(&filter).unwrap();

        let ids: Vec<String> = selection.units.iter().map(|u| u.id.to_string()).collect();
        assert_eq!(ids, vec!["monitoring/release/crds", "monitoring/bundle/crds"]);
    }

    #[test]
    fn test_select_disabled_app_fails() {
        let config = StackConfig::from_yaml(STACK, ".").unwrap();
        assert!(matches!(
            config.select(&Filter::app("legacy")),
            Err(NotFoundError::Disabled { .. })
        ));
        assert!(matches!(
            config.select(&Filter::app("nope")),
            Err(NotFoundError::App { .. })
        ));
    }

    #[test]
    fn test_scope_covers() {
        let mut scope = Scope::default();
        scope.excluded_apps.insert("legacy".to_string());
        assert!(scope.covers("removed-app", UnitKind::Bundle));
        assert!(!scope.covers("legacy", UnitKind::Bundle));

        let scope = Scope {
            app: Some("monitoring".to_string()),
            kinds: vec![UnitKind::Release],
            excluded_apps: BTreeSet::new(),
        };
        assert!(scope.covers("monitoring", UnitKind::Release));
        assert!(!scope.covers("monitoring", UnitKind::Bundle));
        assert!(!scope.covers("cert-manager", UnitKind::Release));
    }
}
