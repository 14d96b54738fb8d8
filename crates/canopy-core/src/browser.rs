//! Browser-level domain enums shared by the store and the app layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::payload::{FileBucketKind, NodeKind, Payload, TimePeriod};

/// Explorer type of one browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    Projects,
    Tags,
    Screens,
    Images,
    Files,
    Admin,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Projects => "projects",
            BrowserKind::Tags => "tags",
            BrowserKind::Screens => "screens",
            BrowserKind::Images => "images",
            BrowserKind::Files => "files",
            BrowserKind::Admin => "admin",
        }
    }

    /// Synthetic buckets scaffolded under each experimenter node, if any.
    pub fn scaffold_buckets(&self) -> Vec<Payload> {
        match self {
            BrowserKind::Images => TimePeriod::ALL
                .iter()
                .map(|period| Payload::TimeBucket { period: *period })
                .collect(),
            BrowserKind::Files => FileBucketKind::ALL
                .iter()
                .map(|bucket| Payload::FileBucket { bucket: *bucket })
                .collect(),
            BrowserKind::Projects
            | BrowserKind::Tags
            | BrowserKind::Screens
            | BrowserKind::Admin => Vec::new(),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" => Ok(BrowserKind::Projects),
            "tags" => Ok(BrowserKind::Tags),
            "screens" => Ok(BrowserKind::Screens),
            "images" => Ok(BrowserKind::Images),
            "files" => Ok(BrowserKind::Files),
            "admin" => Ok(BrowserKind::Admin),
            other => Err(Error::config(format!("unknown browser kind '{other}'"))),
        }
    }
}

/// Which administrative level the top of the tree is organised by. Also the
/// unit a refresh is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    ExperimenterDisplay,
    GroupDisplay,
}

impl DisplayMode {
    /// Node kind forming the refresh scopes in this mode.
    pub fn scope_kind(&self) -> NodeKind {
        match self {
            DisplayMode::ExperimenterDisplay => NodeKind::Experimenter,
            DisplayMode::GroupDisplay => NodeKind::Group,
        }
    }
}

impl FromStr for DisplayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "experimenter" | "experimenter_display" => Ok(DisplayMode::ExperimenterDisplay),
            "group" | "group_display" => Ok(DisplayMode::GroupDisplay),
            other => Err(Error::config(format!("unknown display mode '{other}'"))),
        }
    }
}
