#![allow(dead_code)]

pub mod fixtures;

use std::sync::Once;

use serde_json::Value as Json;
use tracing_subscriber::EnvFilter;
use ydoc::{Document, Value};

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary, driven by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Send everything `to` is missing from `from`, the way a peer would after
/// exchanging state vectors.
pub fn sync(from: &Document, to: &mut Document) {
    let diff = from
        .encode_diff(&to.encode_state_vector())
        .expect("state vector must decode");
    to.apply_update(&diff).expect("diff must apply");
}

/// Sync every pair until nothing changes.
pub fn sync_all(docs: &mut [Document]) {
    for i in 0..docs.len() {
        for j in 0..docs.len() {
            if i == j {
                continue;
            }
            let update = docs[i].encode_diff(&docs[j].encode_state_vector()).unwrap();
            docs[j].apply_update(&update).unwrap();
        }
    }
}

/// Scalar from a JSON fixture value. Integral numbers stay integers.
pub fn value_from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s.clone()),
        other => panic!("fixture values must be scalars, got {other}"),
    }
}
