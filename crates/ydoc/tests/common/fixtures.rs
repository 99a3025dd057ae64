use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value as Json;
use ydoc::{ContainerKind, ContainerRef, Document, Out, StateVector, Update};

use super::{sync, value_from_json};

pub const EXPECTED_FIXTURE_VERSION: u64 = 1;
pub const EXPECTED_FIXTURE_NAMES: &[&str] = &[
    "array_insert",
    "array_push",
    "array_delete",
    "array_insert_at",
    "map_attrs",
    "mixed",
    "nested_type",
    "cross_doc_sync",
    "bidirectional_sync",
    "empty_doc",
    "content_types",
];

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureFile {
    pub fixture_version: u64,
    pub fixtures: Vec<Fixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub name: String,
    pub steps: Vec<Step>,
    /// Replica id → expected observations.
    pub expect: BTreeMap<String, Expect>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Touch {
        doc: u64,
        container: String,
    },
    Insert {
        doc: u64,
        container: String,
        index: usize,
        values: Vec<Json>,
    },
    Push {
        doc: u64,
        container: String,
        values: Vec<Json>,
    },
    Delete {
        doc: u64,
        container: String,
        index: usize,
        count: usize,
    },
    Set {
        doc: u64,
        container: String,
        #[serde(default)]
        path: Vec<String>,
        key: String,
        value: Json,
    },
    SetMap {
        doc: u64,
        container: String,
        key: String,
    },
    Mark {
        doc: u64,
        label: String,
    },
    Sync {
        doc: u64,
        from: u64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Expect {
    pub sv: BTreeMap<String, u64>,
    pub json: Json,
    pub update_items: Option<usize>,
    pub deleted_ids: Option<u64>,
    #[serde(default)]
    pub diff_items: BTreeMap<String, usize>,
}

pub fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scenarios.json")
}

pub fn load_fixtures() -> FixtureFile {
    let path = fixtures_path();
    let data = fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {:?}: {e}", path));
    serde_json::from_str(&data).unwrap_or_else(|e| panic!("failed to parse {:?}: {e}", path))
}

/// Replicas touched by one fixture run, plus the state vectors it marked.
#[derive(Default)]
pub struct Run {
    pub docs: BTreeMap<u64, Document>,
    pub marks: BTreeMap<(u64, String), StateVector>,
}

impl Run {
    fn doc(&mut self, replica: u64) -> &mut Document {
        self.docs
            .entry(replica)
            .or_insert_with(|| Document::with_replica(replica))
    }

    /// Walk `path` from root map `container` through nested map values.
    fn map_ref(&mut self, replica: u64, container: &str, path: &[String]) -> ContainerRef {
        let doc = self.doc(replica);
        let mut target = doc
            .get_container(container, ContainerKind::Map)
            .unwrap_or_else(|e| panic!("root {container}: {e}"));
        for key in path {
            let next = match doc.map_at(&target).unwrap().get(key) {
                Some(Out::Container(c)) => c,
                other => panic!("{key} is not a nested container: {other:?}"),
            };
            target = next;
        }
        target
    }
}

pub fn run_fixture(fixture: &Fixture) -> Run {
    let mut run = Run::default();
    for step in &fixture.steps {
        match step {
            Step::Touch { doc, container } => {
                run.doc(*doc).sequence(container).unwrap();
            }
            Step::Insert {
                doc,
                container,
                index,
                values,
            } => {
                let values: Vec<_> = values.iter().map(value_from_json).collect();
                run.doc(*doc)
                    .sequence(container)
                    .unwrap()
                    .insert(*index, values)
                    .unwrap();
            }
            Step::Push {
                doc,
                container,
                values,
            } => {
                let values: Vec<_> = values.iter().map(value_from_json).collect();
                run.doc(*doc).sequence(container).unwrap().push(values).unwrap();
            }
            Step::Delete {
                doc,
                container,
                index,
                count,
            } => {
                run.doc(*doc)
                    .sequence(container)
                    .unwrap()
                    .delete(*index, *count)
                    .unwrap();
            }
            Step::Set {
                doc,
                container,
                path,
                key,
                value,
            } => {
                let target = run.map_ref(*doc, container, path);
                run.doc(*doc)
                    .map_at(&target)
                    .unwrap()
                    .set(key, value_from_json(value));
            }
            Step::SetMap { doc, container, key } => {
                run.doc(*doc)
                    .map(container)
                    .unwrap()
                    .set_container(key, ContainerKind::Map);
            }
            Step::Mark { doc, label } => {
                let sv = run.doc(*doc).state_vector();
                run.marks.insert((*doc, label.clone()), sv);
            }
            Step::Sync { doc, from } => {
                run.doc(*from);
                let mut target = run.docs.remove(doc).unwrap_or_else(|| Document::with_replica(*doc));
                sync(&run.docs[from], &mut target);
                run.docs.insert(*doc, target);
            }
        }
    }
    run
}

/// Every mismatch between `run` and the fixture's expectations.
pub fn check_expectations(fixture: &Fixture, run: &mut Run) -> Vec<String> {
    let mut diffs = Vec::new();
    for (replica, expect) in &fixture.expect {
        let replica: u64 = replica.parse().expect("replica keys are integers");
        let doc = run.doc(replica);

        let sv: StateVector = expect
            .sv
            .iter()
            .map(|(r, c)| (r.parse::<u64>().expect("replica keys are integers"), *c))
            .collect();
        if doc.state_vector() != sv {
            diffs.push(format!("{replica}: sv {} != {}", doc.state_vector(), sv));
        }
        let decoded_sv = ydoc::codec::decode_state_vector(&doc.encode_state_vector()).unwrap();
        if decoded_sv != sv {
            diffs.push(format!("{replica}: encoded sv decodes to {decoded_sv}"));
        }

        if doc.to_json() != expect.json {
            diffs.push(format!("{replica}: json {} != {}", doc.to_json(), expect.json));
        }

        if let Some(count) = expect.update_items {
            let update = Update::decode(&doc.encode_update(None)).unwrap();
            if update.item_count() != count {
                diffs.push(format!("{replica}: update has {} items, want {count}", update.item_count()));
            }
        }

        if let Some(count) = expect.deleted_ids {
            if doc.delete_set().id_count() != count {
                diffs.push(format!("{replica}: {} deleted ids, want {count}", doc.delete_set().id_count()));
            }
        }

        for (label, count) in &expect.diff_items {
            let since = &run.marks[&(replica, label.clone())];
            let doc = &run.docs[&replica];
            let update = Update::decode(&doc.encode_update(Some(since))).unwrap();
            if update.item_count() != *count {
                diffs.push(format!("{replica}: diff since {label} has {} items, want {count}", update.item_count()));
            }
        }
    }
    diffs
}
