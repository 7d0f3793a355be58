//! Unit identities
//!
//! A unit is one release, kustomization or bundle entry of an app. Units are
//! identified by `(app, kind, name)`, which is also what the output layout is
//! derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{Bundle, Kustomization, Release};

/// The kind of a renderable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Release,
    Kustomization,
    Bundle,
}

impl UnitKind {
    /// All kinds, in the order units of an app are rendered and listed
    pub const ALL: [UnitKind; 3] = [UnitKind::Release, UnitKind::Kustomization, UnitKind::Bundle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Kustomization => "kustomization",
            Self::Bundle => "bundle",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(Self::Release),
            "kustomization" => Ok(Self::Kustomization),
            "bundle" => Ok(Self::Bundle),
            other => Err(format!("unknown unit kind: {}", other)),
        }
    }
}

/// Identity of a unit across config, render results and reports
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    pub app: String,
    pub kind: UnitKind,
    pub name: String,
}

impl UnitId {
    pub fn new(app: impl Into<String>, kind: UnitKind, name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app, self.kind, self.name)
    }
}

/// A borrowed unit from the config, tagged by kind
#[derive(Debug, Clone, Copy)]
pub enum UnitRef<'a> {
    Release(&'a Release),
    Kustomization(&'a Kustomization),
    Bundle(&'a Bundle),
}

impl<'a> UnitRef<'a> {
    pub fn kind(&self) -> UnitKind {
        match self {
            Self::Release(_) => UnitKind::Release,
            Self::Kustomization(_) => UnitKind::Kustomization,
            Self::Bundle(_) => UnitKind::Bundle,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Release(r) => &r.name,
            Self::Kustomization(k) => &k.name,
            Self::Bundle(b) => &b.name,
        }
    }
}
