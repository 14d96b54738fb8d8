//! # Node Payload Types
//!
//! The closed set of domain objects a browser tree can hold. Every tree node
//! carries exactly one [`Payload`]; behaviour that depends on the object kind
//! (ordering tier, countability, selection grouping) is dispatched with an
//! exhaustive `match` here rather than scattered type tests.
//!
//! ## Key Types
//!
//! - [`Payload`] - Tagged union over projects, datasets, images, tags, ...
//! - [`NodeKind`] - Fieldless discriminant of a payload
//! - [`Identity`] - Stable `(kind, id)` pair used to match nodes across reloads
//! - [`ContainerKey`] - Key of one item-count fetch
//! - [`SelectionKey`] - Grouping used to keep multi-selections homogeneous

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Namespace marking a tag annotation as a tag set.
pub const TAGSET_NAMESPACE: &str = "openmicroscopy.org/omero/insight/tagset";

// ============================================================================
// NodeKind
// ============================================================================

/// Discriminant of a [`Payload`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Project,
    Dataset,
    Image,
    Screen,
    Plate,
    PlateAcquisition,
    TagSet,
    Tag,
    File,
    Directory,
    MultiImage,
    Group,
    Experimenter,
    TimeBucket,
    FileBucket,
    Placeholder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Project => "project",
            NodeKind::Dataset => "dataset",
            NodeKind::Image => "image",
            NodeKind::Screen => "screen",
            NodeKind::Plate => "plate",
            NodeKind::PlateAcquisition => "plate_acquisition",
            NodeKind::TagSet => "tag_set",
            NodeKind::Tag => "tag",
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
            NodeKind::MultiImage => "multi_image",
            NodeKind::Group => "group",
            NodeKind::Experimenter => "experimenter",
            NodeKind::TimeBucket => "time_bucket",
            NodeKind::FileBucket => "file_bucket",
            NodeKind::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "root" => NodeKind::Root,
            "project" => NodeKind::Project,
            "dataset" => NodeKind::Dataset,
            "image" => NodeKind::Image,
            "screen" => NodeKind::Screen,
            "plate" => NodeKind::Plate,
            "plate_acquisition" => NodeKind::PlateAcquisition,
            "tag_set" => NodeKind::TagSet,
            "tag" => NodeKind::Tag,
            "file" => NodeKind::File,
            "directory" => NodeKind::Directory,
            "multi_image" => NodeKind::MultiImage,
            "group" => NodeKind::Group,
            "experimenter" => NodeKind::Experimenter,
            "time_bucket" => NodeKind::TimeBucket,
            "file_bucket" => NodeKind::FileBucket,
            "placeholder" => NodeKind::Placeholder,
            other => return Err(Error::not_found(format!("node kind '{other}'"))),
        };
        Ok(kind)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Stable `(kind, id)` pair used to match nodes across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub kind: NodeKind,
    pub id: i64,
}

impl Identity {
    pub fn new(kind: NodeKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for Identity {
    type Err = Error;

    /// Parse the `kind:id` form produced by [`Display`](fmt::Display).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::not_found(format!("identity '{s}'")))?;
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::not_found(format!("identity '{s}'")))?;
        Ok(Self::new(kind.trim().parse()?, id))
    }
}

// ============================================================================
// Synthetic buckets
// ============================================================================

/// Acquisition-time bucket scaffolded under an experimenter in image browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Today,
    Week,
    TwoWeeks,
    Year,
    Older,
    /// Images not linked to any dataset. Always present.
    Orphaned,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 6] = [
        TimePeriod::Today,
        TimePeriod::Week,
        TimePeriod::TwoWeeks,
        TimePeriod::Year,
        TimePeriod::Older,
        TimePeriod::Orphaned,
    ];

    /// Positional index, used as the symbolic count key.
    pub fn index(&self) -> u32 {
        match self {
            TimePeriod::Today => 0,
            TimePeriod::Week => 1,
            TimePeriod::TwoWeeks => 2,
            TimePeriod::Year => 3,
            TimePeriod::Older => 4,
            TimePeriod::Orphaned => 5,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimePeriod::Today => "Today",
            TimePeriod::Week => "Past week",
            TimePeriod::TwoWeeks => "Past 2 weeks",
            TimePeriod::Year => "Past year",
            TimePeriod::Older => "Older",
            TimePeriod::Orphaned => "Orphaned images",
        }
    }
}

/// File-type bucket scaffolded under an experimenter in file browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileBucketKind {
    Images,
    Movies,
    Tables,
    Other,
}

impl FileBucketKind {
    pub const ALL: [FileBucketKind; 4] = [
        FileBucketKind::Images,
        FileBucketKind::Movies,
        FileBucketKind::Tables,
        FileBucketKind::Other,
    ];

    pub fn index(&self) -> u32 {
        match self {
            FileBucketKind::Images => 0,
            FileBucketKind::Movies => 1,
            FileBucketKind::Tables => 2,
            FileBucketKind::Other => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileBucketKind::Images => "Images",
            FileBucketKind::Movies => "Movies",
            FileBucketKind::Tables => "Tables",
            FileBucketKind::Other => "Other files",
        }
    }
}

/// Marker shown under a node whose children have not been materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Loading,
    Empty,
}

impl PlaceholderKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlaceholderKind::Loading => "Loading…",
            PlaceholderKind::Empty => "Empty",
        }
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Ordering tier used by [`crate::ordering::order_children`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Container,
    Leaf,
    Trailing,
}

/// The domain object held by a tree node.
///
/// Serialized with an internal `kind` tag so fixture files read naturally:
/// `{"kind": "dataset", "id": 42, "name": "Mitosis"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Root {
        label: String,
    },
    Project {
        id: i64,
        name: String,
    },
    Dataset {
        id: i64,
        name: String,
    },
    Image {
        id: i64,
        name: String,
        #[serde(default)]
        acquired: Option<DateTime<Utc>>,
    },
    Screen {
        id: i64,
        name: String,
    },
    Plate {
        id: i64,
        name: String,
    },
    PlateAcquisition {
        id: i64,
        name: String,
    },
    TagSet {
        id: i64,
        name: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    Tag {
        id: i64,
        name: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    File {
        id: i64,
        name: String,
    },
    Directory {
        id: i64,
        name: String,
        #[serde(default)]
        top_level: bool,
    },
    MultiImage {
        id: i64,
        name: String,
    },
    Group {
        id: i64,
        name: String,
    },
    Experimenter {
        id: i64,
        name: String,
    },
    TimeBucket {
        period: TimePeriod,
    },
    FileBucket {
        bucket: FileBucketKind,
    },
    Placeholder {
        marker: PlaceholderKind,
    },
}

impl Payload {
    pub fn kind(&self) -> NodeKind {
        match self {
            Payload::Root { .. } => NodeKind::Root,
            Payload::Project { .. } => NodeKind::Project,
            Payload::Dataset { .. } => NodeKind::Dataset,
            Payload::Image { .. } => NodeKind::Image,
            Payload::Screen { .. } => NodeKind::Screen,
            Payload::Plate { .. } => NodeKind::Plate,
            Payload::PlateAcquisition { .. } => NodeKind::PlateAcquisition,
            Payload::TagSet { .. } => NodeKind::TagSet,
            Payload::Tag { .. } => NodeKind::Tag,
            Payload::File { .. } => NodeKind::File,
            Payload::Directory { .. } => NodeKind::Directory,
            Payload::MultiImage { .. } => NodeKind::MultiImage,
            Payload::Group { .. } => NodeKind::Group,
            Payload::Experimenter { .. } => NodeKind::Experimenter,
            Payload::TimeBucket { .. } => NodeKind::TimeBucket,
            Payload::FileBucket { .. } => NodeKind::FileBucket,
            Payload::Placeholder { .. } => NodeKind::Placeholder,
        }
    }

    /// Numeric id of the object. Buckets use their positional index, the
    /// root uses 0, placeholders have none.
    pub fn id(&self) -> Option<i64> {
        match self {
            Payload::Root { .. } => Some(0),
            Payload::Project { id, .. }
            | Payload::Dataset { id, .. }
            | Payload::Image { id, .. }
            | Payload::Screen { id, .. }
            | Payload::Plate { id, .. }
            | Payload::PlateAcquisition { id, .. }
            | Payload::TagSet { id, .. }
            | Payload::Tag { id, .. }
            | Payload::File { id, .. }
            | Payload::Directory { id, .. }
            | Payload::MultiImage { id, .. }
            | Payload::Group { id, .. }
            | Payload::Experimenter { id, .. } => Some(*id),
            Payload::TimeBucket { period } => Some(i64::from(period.index())),
            Payload::FileBucket { bucket } => Some(i64::from(bucket.index())),
            Payload::Placeholder { .. } => None,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.id().map(|id| Identity::new(self.kind(), id))
    }

    pub fn name(&self) -> &str {
        match self {
            Payload::Root { label } => label,
            Payload::Project { name, .. }
            | Payload::Dataset { name, .. }
            | Payload::Image { name, .. }
            | Payload::Screen { name, .. }
            | Payload::Plate { name, .. }
            | Payload::PlateAcquisition { name, .. }
            | Payload::TagSet { name, .. }
            | Payload::Tag { name, .. }
            | Payload::File { name, .. }
            | Payload::Directory { name, .. }
            | Payload::MultiImage { name, .. }
            | Payload::Group { name, .. }
            | Payload::Experimenter { name, .. } => name,
            Payload::TimeBucket { period } => period.label(),
            Payload::FileBucket { bucket } => bucket.label(),
            Payload::Placeholder { marker } => marker.label(),
        }
    }

    /// Acquisition date, when the object has one.
    pub fn acquired(&self) -> Option<DateTime<Utc>> {
        match self {
            Payload::Image { acquired, .. } => *acquired,
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Payload::Placeholder { .. })
    }

    /// Ordering tier. `None` for placeholders, which never take part in
    /// ordering.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Payload::Root { .. }
            | Payload::Project { .. }
            | Payload::Group { .. }
            | Payload::TagSet { .. }
            | Payload::Experimenter { .. }
            | Payload::Directory {
                top_level: true, ..
            } => Some(Tier::Container),
            Payload::Tag { .. } if self.is_tagset_namespace() => Some(Tier::Container),
            Payload::Dataset { .. }
            | Payload::Tag { .. }
            | Payload::Image { .. }
            | Payload::File { .. }
            | Payload::MultiImage { .. }
            | Payload::Directory {
                top_level: false, ..
            } => Some(Tier::Leaf),
            Payload::Screen { .. }
            | Payload::Plate { .. }
            | Payload::PlateAcquisition { .. }
            | Payload::TimeBucket { .. }
            | Payload::FileBucket { .. } => Some(Tier::Trailing),
            Payload::Placeholder { .. } => None,
        }
    }

    /// Whether the object can semantically hold items.
    pub fn is_container(&self) -> bool {
        match self {
            Payload::Project { .. }
            | Payload::Dataset { .. }
            | Payload::Screen { .. }
            | Payload::Plate { .. }
            | Payload::PlateAcquisition { .. }
            | Payload::TagSet { .. }
            | Payload::Directory { .. }
            | Payload::Group { .. }
            | Payload::Experimenter { .. }
            | Payload::TimeBucket { .. }
            | Payload::FileBucket { .. } => true,
            Payload::Root { .. }
            | Payload::Image { .. }
            | Payload::Tag { .. }
            | Payload::File { .. }
            | Payload::MultiImage { .. }
            | Payload::Placeholder { .. } => false,
        }
    }

    /// Whether expanding the node can reveal children.
    pub fn can_have_children(&self) -> bool {
        !matches!(
            self,
            Payload::Image { .. } | Payload::File { .. } | Payload::Placeholder { .. }
        )
    }

    /// Key under which this node's item count is fetched. Administrative
    /// nodes (groups, experimenters) are containers but carry no count.
    pub fn count_key(&self) -> Option<ContainerKey> {
        match self {
            Payload::TimeBucket { period } => Some(ContainerKey::Index {
                kind: NodeKind::TimeBucket,
                index: period.index(),
                owner: None,
            }),
            Payload::FileBucket { bucket } => Some(ContainerKey::Index {
                kind: NodeKind::FileBucket,
                index: bucket.index(),
                owner: None,
            }),
            Payload::Group { .. } | Payload::Experimenter { .. } => None,
            other if other.is_container() => other.identity().map(ContainerKey::Object),
            _ => None,
        }
    }

    /// Grouping used by the selection tracker: tags and tag sets are also
    /// split by namespace.
    pub fn selection_key(&self) -> SelectionKey {
        let namespace = match self {
            Payload::Tag { namespace, .. } | Payload::TagSet { namespace, .. } => namespace.clone(),
            _ => None,
        };
        SelectionKey {
            kind: self.kind(),
            namespace,
        }
    }

    /// Whether a tag-like payload is flagged as a tag set by its namespace.
    pub fn is_tagset_namespace(&self) -> bool {
        match self {
            Payload::Tag { namespace, .. } | Payload::TagSet { namespace, .. } => {
                namespace.as_deref() == Some(TAGSET_NAMESPACE)
            }
            _ => false,
        }
    }
}

// ============================================================================
// ContainerKey / SelectionKey
// ============================================================================

/// Key of one item-count fetch: either an object identity or the symbolic
/// index of a positional bucket.
///
/// Buckets are per experimenter, so an index key also carries the owner.
/// Two "Orphaned" buckets under different experimenters are different
/// containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKey {
    Object(Identity),
    Index {
        kind: NodeKind,
        index: u32,
        owner: Option<Identity>,
    },
}

impl ContainerKey {
    /// Scope a bucket key to `owner`. Object keys are returned unchanged.
    pub fn owned_by(self, owner: Option<Identity>) -> Self {
        match self {
            ContainerKey::Index { kind, index, .. } => ContainerKey::Index { kind, index, owner },
            object => object,
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKey::Object(identity) => write!(f, "{identity}"),
            ContainerKey::Index {
                kind,
                index,
                owner: Some(owner),
            } => write!(f, "{kind}#{index}@{owner}"),
            ContainerKey::Index { kind, index, .. } => write!(f, "{kind}#{index}"),
        }
    }
}

/// Selection homogeneity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub kind: NodeKind,
    pub namespace: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
