//! Seeded multi-replica fuzzing: random edits, observer-driven delivery
//! with shuffling and duplication, then a full exchange. Every replica must
//! end up identical.

mod common;

use std::sync::{Arc, Mutex};

use ydoc::{ContainerKind, Document};
use ydoc_util::Fuzzer;

const SEEDS: &[u64] = &[1, 2, 3, 0x5eed, 0xc0ffee, 0x0123_4567_89ab_cdef];
const REPLICAS: u64 = 4;
const ROUNDS: usize = 12;
const EDITS_PER_ROUND: usize = 6;

#[derive(Clone, Copy)]
enum Action {
    Insert,
    Delete,
    Set,
    Remove,
    Nest,
}

fn random_edit(f: &mut Fuzzer, doc: &mut Document) {
    let actions = [
        (Action::Insert, 5),
        (Action::Delete, 3),
        (Action::Set, 3),
        (Action::Remove, 1),
        (Action::Nest, 1),
    ];
    match *f.weighted(&actions) {
        Action::Insert => {
            let mut seq = doc.sequence("text").unwrap();
            let index = f.index(seq.len() + 1);
            let count = f.int(1, 3) as usize;
            let values: Vec<String> = (0..count).map(|_| f.string(2, "abcdef")).collect();
            seq.insert(index, values).unwrap();
        }
        Action::Delete => {
            let mut seq = doc.sequence("text").unwrap();
            if seq.is_empty() {
                return;
            }
            let index = f.index(seq.len());
            let count = f.int(1, 3) as usize;
            seq.delete(index, count.min(seq.len() - index)).unwrap();
        }
        Action::Set => {
            let key = *f.pick(&["a", "b", "c"]);
            let value = f.int(-1000, 1000);
            doc.map("meta").unwrap().set(key, value);
        }
        Action::Remove => {
            let key = *f.pick(&["a", "b", "c"]);
            doc.map("meta").unwrap().remove(key);
        }
        Action::Nest => {
            let kind = if f.chance(0.5) {
                ContainerKind::Map
            } else {
                ContainerKind::Sequence
            };
            let mut seq = doc.sequence("text").unwrap();
            let index = f.index(seq.len() + 1);
            let inner = seq.insert_container(index, kind).unwrap();
            match kind {
                ContainerKind::Map => doc.map_at(&inner).unwrap().set("n", f.int(0, 9)),
                ContainerKind::Sequence => doc.sequence_at(&inner).unwrap().push([f.unit()]).unwrap(),
            }
        }
    }
}

fn run_seed(seed: u64) {
    let mut f = Fuzzer::new(Some(seed));
    let mut docs: Vec<Document> = (1..=REPLICAS).map(Document::with_replica).collect();
    let outboxes: Vec<Arc<Mutex<Vec<Vec<u8>>>>> =
        (0..REPLICAS).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
    for (doc, outbox) in docs.iter_mut().zip(&outboxes) {
        let outbox = Arc::clone(outbox);
        doc.observe_update(move |e| outbox.lock().unwrap().push(e.update));
    }

    for _ in 0..ROUNDS {
        for _ in 0..EDITS_PER_ROUND {
            let who = f.index(docs.len());
            random_edit(&mut f, &mut docs[who]);
        }

        // Deliver a shuffled, partly duplicated slice of each outbox.
        for from in 0..docs.len() {
            let mut batch: Vec<Vec<u8>> = outboxes[from].lock().unwrap().drain(..).collect();
            if batch.is_empty() {
                continue;
            }
            if f.chance(0.3) {
                let dup = f.pick(&batch).clone();
                batch.push(dup);
            }
            f.shuffle(&mut batch);
            for to in 0..docs.len() {
                if to == from || f.chance(0.25) {
                    continue;
                }
                for update in &batch {
                    docs[to].apply_update(update).unwrap();
                }
            }
        }
    }

    common::sync_all(&mut docs);
    let expected = docs[0].to_json();
    for doc in &docs {
        assert!(doc.pending().is_empty(), "seed {seed}: pending {:?}", doc.pending());
        assert_eq!(doc.to_json(), expected, "seed {seed}: replica {}", doc.replica_id());
        assert_eq!(doc.state_vector(), docs[0].state_vector(), "seed {seed}");
        assert_eq!(doc.delete_set(), docs[0].delete_set(), "seed {seed}");
    }
}

#[test]
fn seeded_replicas_converge() {
    common::init_tracing();
    for &seed in SEEDS {
        run_seed(seed);
    }
}
