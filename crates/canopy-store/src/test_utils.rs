//! Test utilities for store-backed tests
//!
//! Provides payload builders and a small repository fixture covering every
//! browser kind.

use canopy_core::{BrowserKind, FileBucketKind, Payload, TimePeriod};

use super::{Fixture, FixtureNode, FixtureStore};

pub fn project(id: i64, name: &str) -> Payload {
    Payload::Project {
        id,
        name: name.to_string(),
    }
}

pub fn dataset(id: i64, name: &str) -> Payload {
    Payload::Dataset {
        id,
        name: name.to_string(),
    }
}

pub fn image(id: i64, name: &str) -> Payload {
    Payload::Image {
        id,
        name: name.to_string(),
        acquired: None,
    }
}

pub fn tag(id: i64, name: &str) -> Payload {
    Payload::Tag {
        id,
        name: name.to_string(),
        namespace: None,
    }
}

pub fn group(id: i64, name: &str) -> Payload {
    Payload::Group {
        id,
        name: name.to_string(),
    }
}

pub fn experimenter(id: i64, name: &str) -> Payload {
    Payload::Experimenter {
        id,
        name: name.to_string(),
    }
}

fn leaves(payloads: Vec<Payload>) -> Vec<FixtureNode> {
    payloads.into_iter().map(FixtureNode::new).collect()
}

/// The shared sample repository.
///
/// - projects: project 1 "Alpha" (dataset 10 with images 100/101, empty
///   dataset 11), project 2 "Beta" (dataset 42), and dataset 42 again at the
///   top level, so container 42 has two mirrors
/// - tags: tag set 7 with tags 70 (tagging image 100) and 71
/// - screens: screen 3 with plate 30
/// - admin: groups 1 and 2, both listing experimenter 5
/// - images/files: experimenter 5, with orphaned image 500 and file 900
pub fn sample_fixture() -> Fixture {
    let shared_images = || {
        leaves(vec![
            image(420, "shared-a.tif"),
            image(421, "shared-b.tif"),
            image(422, "shared-c.tif"),
        ])
    };

    let projects = vec![
        FixtureNode::with_children(
            project(1, "Alpha"),
            vec![
                FixtureNode::with_children(
                    dataset(10, "Control"),
                    leaves(vec![image(100, "cell-1.tif"), image(101, "cell-2.tif")]),
                ),
                FixtureNode {
                    count: Some(0),
                    ..FixtureNode::new(dataset(11, "Pending"))
                },
            ],
        ),
        FixtureNode::with_children(
            project(2, "Beta"),
            vec![FixtureNode::with_children(
                dataset(42, "Shared"),
                shared_images(),
            )],
        ),
        FixtureNode::with_children(dataset(42, "Shared"), shared_images()),
    ];

    let tags = vec![FixtureNode::with_children(
        Payload::TagSet {
            id: 7,
            name: "Stains".to_string(),
            namespace: Some(canopy_core::TAGSET_NAMESPACE.to_string()),
        },
        vec![
            FixtureNode::with_children(tag(70, "DAPI"), leaves(vec![image(100, "cell-1.tif")])),
            FixtureNode::new(tag(71, "GFP")),
        ],
    )];

    let screens = vec![FixtureNode::with_children(
        Payload::Screen {
            id: 3,
            name: "Knockdown".to_string(),
        },
        leaves(vec![Payload::Plate {
            id: 30,
            name: "Plate A".to_string(),
        }]),
    )];

    let members = || vec![FixtureNode::new(experimenter(5, "Ada"))];
    let admin = vec![
        FixtureNode::with_children(group(1, "Lab A"), members()),
        FixtureNode::with_children(group(2, "Lab B"), members()),
    ];

    let mut fixture = Fixture::default();
    fixture.roots.insert(BrowserKind::Projects, projects);
    fixture.roots.insert(BrowserKind::Tags, tags);
    fixture.roots.insert(BrowserKind::Screens, screens);
    fixture.roots.insert(BrowserKind::Admin, admin);
    fixture.roots.insert(BrowserKind::Images, members());
    fixture.roots.insert(BrowserKind::Files, members());
    fixture.buckets.insert(
        TimePeriod::Orphaned.index(),
        vec![FixtureNode::new(image(500, "stray.tif")).owned_by(5)],
    );
    fixture.file_buckets.insert(
        FileBucketKind::Other.index(),
        vec![FixtureNode::new(Payload::File {
            id: 900,
            name: "notes.txt".to_string(),
        })
        .owned_by(5)],
    );
    fixture
}

pub fn sample_store() -> FixtureStore {
    FixtureStore::from_fixture(sample_fixture())
}

/// Sample store whose every call sleeps for `latency_ms`.
pub fn slow_store(latency_ms: u64) -> FixtureStore {
    let mut fixture = sample_fixture();
    fixture.latency_ms = latency_ms;
    FixtureStore::from_fixture(fixture)
}
