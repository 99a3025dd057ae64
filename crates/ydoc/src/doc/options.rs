use rand::Rng;
use serde::{Deserialize, Serialize};

/// Construction options for a [`Document`](super::Document).
///
/// ```
/// use ydoc::DocOptions;
///
/// let opts: DocOptions = serde_json::from_str(r#"{ "replica_id": 7 }"#).unwrap();
/// assert_eq!(opts.replica_id, Some(7));
/// assert!(opts.guid.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocOptions {
    /// Replica id of the local clock. Random when absent.
    pub replica_id: Option<u64>,
    /// Document identity used in log fields. Random hex when absent.
    pub guid: Option<String>,
}

impl DocOptions {
    pub fn with_replica(replica_id: u64) -> Self {
        Self {
            replica_id: Some(replica_id),
            guid: None,
        }
    }
}

/// Random replica id. Kept within 32 bits so ids stay short on the wire.
pub fn generate_replica_id() -> u64 {
    rand::thread_rng().gen_range(1..=u32::MAX as u64)
}

pub(crate) fn generate_guid() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
