use std::{
    fmt,
    str::FromStr,
    sync::{
        OnceLock,
        atomic::{AtomicU32, Ordering},
    },
};

/// Store-assigned document identifier.
///
/// Twelve bytes: big-endian seconds since the epoch, a per-process random
/// value, and a wrapping counter. Ids are unique but only roughly ordered;
/// the counter may wrap within a second.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectId([u8; 12]);

#[derive(Debug, thiserror::Error)]
#[error("Cast to ObjectId failed for value \"{value}\"")]
pub struct ParseObjectIdError {
    pub value: String,
}

struct ProcessSeed {
    unique: [u8; 5],
    counter: AtomicU32,
}

fn seed() -> &'static ProcessSeed {
    static SEED: OnceLock<ProcessSeed> = OnceLock::new();
    SEED.get_or_init(|| {
        let random = uuid::Uuid::new_v4().into_bytes();
        let mut unique = [0u8; 5];
        unique.copy_from_slice(&random[..5]);
        let start = u32::from_be_bytes([0, random[5], random[6], random[7]]);
        ProcessSeed { unique, counter: AtomicU32::new(start) }
    })
}

impl ObjectId {
    pub fn new() -> Self {
        let secs = jiff::Timestamp::now().as_second() as u32;
        let seed = seed();
        let count = seed.counter.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&seed.unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Seconds since the epoch at which the id was generated.
    pub fn timestamp(self) -> i64 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]) as i64
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseObjectIdError { value: s.to_string() };
        if s.len() != 24 {
            return Err(err());
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| err())?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
