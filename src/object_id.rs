use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU32, Ordering},
        OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const COUNTER_MASK: u32 = 0x00ff_ffff;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("object id must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("object id is not valid hex")]
    InvalidHex,
}

/// A 12-byte document identifier: a 4-byte big-endian timestamp in seconds,
/// 5 bytes unique to this process, and a 3-byte big-endian counter.
///
/// Ids are unique but do not reliably sort in creation order: the counter
/// wraps and the clock can step backwards.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const HEX_LEN: usize = 24;

    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        Self::from_parts(secs, *process_unique(), next_count())
    }

    fn from_parts(secs: u32, process: [u8; 5], count: u32) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        if s.len() != Self::HEX_LEN {
            return Err(ObjectIdError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }

        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ObjectIdError::InvalidHex)?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

fn process_unique() -> &'static [u8; 5] {
    static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    PROCESS_UNIQUE.get_or_init(rand::random)
}

fn next_count() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK))
        .fetch_add(1, Ordering::Relaxed)
        & COUNTER_MASK
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_lowercase_hex() {
        let id = ObjectId::parse_str("65F1C0FFEE0123456789ABCD").unwrap();
        assert_eq!(id.to_string(), "65f1c0ffee0123456789abcd");
        assert_eq!(id.timestamp(), 0x65f1c0ff);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            ObjectId::parse_str("abc"),
            Err(ObjectIdError::InvalidLength {
                expected: 24,
                actual: 3
            })
        );
        assert!(ObjectId::parse_str("").is_err());
        assert!(ObjectId::parse_str("65f1c0ffee0123456789abcd00").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert_eq!(
            ObjectId::parse_str("zzf1c0ffee0123456789abcd"),
            Err(ObjectIdError::InvalidHex)
        );
        // 24 bytes but not 24 ascii characters
        assert!(ObjectId::parse_str("éééééééééééé").is_err());
    }

    #[test]
    fn new_ids_are_unique_within_a_process() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        assert_eq!(a.bytes()[4..9], b.bytes()[4..9]);
    }

    #[test]
    fn counter_wraps_at_three_bytes() {
        let id = ObjectId::from_parts(1, [0; 5], 0x01ff_fffe);
        assert_eq!(id.bytes()[9..], [0xff, 0xff, 0xfe]);
    }

    #[test]
    fn wrapped_counter_sorts_before_its_predecessor() {
        let last = ObjectId::from_parts(7, [1; 5], COUNTER_MASK);
        let wrapped = ObjectId::from_parts(7, [1; 5], COUNTER_MASK + 1);
        assert_eq!(wrapped.bytes()[9..], [0, 0, 0]);
        assert!(wrapped < last);
    }

    #[test]
    fn from_str_matches_parse_str() {
        let raw = "65f1c0ffee0123456789abcd";
        assert_eq!(raw.parse::<ObjectId>(), ObjectId::parse_str(raw));
        assert_eq!(
            "nope".parse::<ObjectId>(),
            Err(ObjectIdError::InvalidLength {
                expected: 24,
                actual: 4
            })
        );

        let mut bytes = [0u8; 12];
        bytes[11] = 0xcd;
        assert_eq!(
            ObjectId::from_bytes(bytes).to_string(),
            "0000000000000000000000cd"
        );
    }

    #[test]
    fn serde_uses_hex_strings() {
        let id = ObjectId::parse_str("65f1c0ffee0123456789abcd").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65f1c0ffee0123456789abcd\"");
        assert_eq!(serde_json::from_str::<ObjectId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<ObjectId>("\"1234\"").is_err());
    }
}
