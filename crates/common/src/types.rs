use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace under which natural keys are hashed into stream identifiers.
const STOREFRONT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b0_4d7f_a2c5_0e8b_71d3_9a16);

/// Identifier of an event stream (one aggregate instance).
///
/// Most streams get a random id. Streams that must be unique per natural key
/// (an account per email address, the single settings record) derive their id
/// from that key with [`AggregateId::from_key`], so that two writers racing to
/// create the same record collide on the same stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable id from a kind and a natural key.
    ///
    /// The same `(kind, key)` pair always maps to the same id; different kinds
    /// never collide for the same key.
    pub fn from_key(kind: &str, key: &str) -> Self {
        let name = format!("{kind}:{key}");
        Self(Uuid::new_v5(&STOREFRONT_NAMESPACE, name.as_bytes()))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AggregateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}
