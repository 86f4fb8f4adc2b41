use serde::{Deserialize, Serialize};

// Outbound unit placed on a tenant queue. Header order and duplicates are
// preserved as received; the upstream consumer replays them verbatim.
// Encoded as a compact MessagePack array for the queue protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub project_id: u64,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub target_url: String,
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl RequestEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}
