mod common;

use proptest::prelude::*;
use ydoc::{ContainerKind, Document, Update};

#[derive(Debug, Clone)]
enum Edit {
    Insert { index: usize, values: Vec<i64> },
    Delete { index: usize, count: usize },
    Set { key: u8, value: i64 },
    Remove { key: u8 },
    NestedPush { value: i64 },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (any::<usize>(), prop::collection::vec(-50i64..50, 1..4))
            .prop_map(|(index, values)| Edit::Insert { index, values }),
        2 => (any::<usize>(), 1usize..3).prop_map(|(index, count)| Edit::Delete { index, count }),
        2 => (0u8..4, any::<i64>()).prop_map(|(key, value)| Edit::Set { key, value }),
        1 => (0u8..4).prop_map(|key| Edit::Remove { key }),
        1 => any::<i64>().prop_map(|value| Edit::NestedPush { value }),
    ]
}

/// Apply `edit` with indices folded into range, so every edit is valid.
fn perform(doc: &mut Document, edit: &Edit) {
    match edit {
        Edit::Insert { index, values } => {
            let mut seq = doc.sequence("list").unwrap();
            let index = index % (seq.len() + 1);
            seq.insert(index, values.iter().copied()).unwrap();
        }
        Edit::Delete { index, count } => {
            let mut seq = doc.sequence("list").unwrap();
            if seq.is_empty() {
                return;
            }
            let index = index % seq.len();
            let count = (*count).min(seq.len() - index);
            seq.delete(index, count).unwrap();
        }
        Edit::Set { key, value } => {
            doc.map("map").unwrap().set(&format!("k{key}"), *value);
        }
        Edit::Remove { key } => {
            doc.map("map").unwrap().remove(&format!("k{key}"));
        }
        Edit::NestedPush { value } => {
            let mut map = doc.map("map").unwrap();
            let inner = match map.get("nested").and_then(|o| o.as_container().cloned()) {
                Some(inner) => inner,
                None => map.set_container("nested", ContainerKind::Sequence),
            };
            doc.sequence_at(&inner).unwrap().push([*value]).unwrap();
        }
    }
}

fn two_replicas(edits_a: &[Edit], edits_b: &[Edit]) -> (Document, Document) {
    let mut a = Document::with_replica(1);
    let mut b = Document::with_replica(2);
    for e in edits_a {
        perform(&mut a, e);
    }
    for e in edits_b {
        perform(&mut b, e);
    }
    (a, b)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replicas_converge_after_exchange(
        edits_a in prop::collection::vec(edit(), 0..12),
        edits_b in prop::collection::vec(edit(), 0..12),
    ) {
        let (mut a, mut b) = two_replicas(&edits_a, &edits_b);
        let ua = a.encode_update(None);
        let ub = b.encode_update(None);
        a.apply_update(&ub).unwrap();
        b.apply_update(&ua).unwrap();

        prop_assert_eq!(a.to_json(), b.to_json());
        prop_assert_eq!(a.state_vector(), b.state_vector());
        prop_assert_eq!(a.delete_set(), b.delete_set());
        prop_assert!(a.pending().is_empty());
    }

    #[test]
    fn reapplying_own_update_is_a_no_op(edits in prop::collection::vec(edit(), 0..16)) {
        let (mut a, _) = two_replicas(&edits, &[]);
        let json = a.to_json();
        let sv = a.state_vector();
        let update = a.encode_update(None);
        let report = a.apply_update(&update).unwrap();
        prop_assert!(!report.changed());
        prop_assert_eq!(a.to_json(), json);
        prop_assert_eq!(a.state_vector(), sv);
    }

    #[test]
    fn self_diff_has_no_items(edits in prop::collection::vec(edit(), 0..16)) {
        let (a, _) = two_replicas(&edits, &[]);
        let diff = a.encode_diff(&a.encode_state_vector()).unwrap();
        prop_assert_eq!(Update::decode(&diff).unwrap().item_count(), 0);
    }

    #[test]
    fn split_delivery_matches_full_delivery(
        edits in prop::collection::vec(edit(), 1..16),
        cut in any::<usize>(),
    ) {
        // Deliver the newest part first; it must wait in pending until the
        // older part arrives.
        let (a, _) = two_replicas(&edits, &[]);
        let full = Update::decode(&a.encode_update(None)).unwrap();
        let total = a.state_vector().get(1);
        let split = cut as u64 % (total + 1);
        let since = [(1u64, split)].into_iter().collect();
        let newer = full.diff(&since);
        let mut older = full.clone();
        older.items.values_mut().for_each(|v| v.retain(|r| r.id.clock < split));

        let mut b = Document::with_replica(2);
        b.apply(newer);
        b.apply(older);
        prop_assert!(b.pending().is_empty());
        prop_assert_eq!(b.to_json(), a.to_json());
    }
}
