//! Time-sortable audit identifiers.

use chrono::{DateTime, Utc};
use ulid::Ulid;

/// Default prefix of generated audit IDs.
pub const DEFAULT_ID_PREFIX: &str = "aud_";

/// Source of the 80 random bits embedded in each identifier.
pub trait EntropySource: Send {
    /// Return random bits; only the low 80 are used.
    fn next_bits(&mut self) -> u128;
}

/// Entropy from the thread-local CSPRNG.
#[derive(Debug, Default)]
pub struct RandomEntropy;

impl EntropySource for RandomEntropy {
    fn next_bits(&mut self) -> u128 {
        rand::random::<u128>()
    }
}

/// Deterministic entropy for reproducible identifiers.
#[derive(Debug)]
pub struct SequenceEntropy {
    next: u128,
}

impl SequenceEntropy {
    pub fn new(start: u128) -> Self {
        Self { next: start }
    }
}

impl EntropySource for SequenceEntropy {
    fn next_bits(&mut self) -> u128 {
        let bits = self.next;
        self.next = self.next.wrapping_add(1);
        bits
    }
}

/// Generates `<prefix><ULID>` identifiers.
///
/// The ULID time component is the entry time in milliseconds. IDs minted
/// within the same millisecond increment the previous random part, so a
/// single generator never emits them out of order.
pub struct IdGenerator {
    prefix: String,
    entropy: Box<dyn EntropySource>,
    last: Option<Ulid>,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_entropy(prefix, Box::new(RandomEntropy))
    }

    pub fn with_entropy(prefix: impl Into<String>, entropy: Box<dyn EntropySource>) -> Self {
        Self {
            prefix: prefix.into(),
            entropy,
            last: None,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mint an identifier for an entry stamped at `time`.
    pub fn generate(&mut self, time: DateTime<Utc>) -> String {
        let ms = u64::try_from(time.timestamp_millis()).unwrap_or(0);

        let next = match self.last {
            Some(last) if last.timestamp_ms() == ms => last
                .increment()
                .unwrap_or_else(|| Ulid::from_parts(ms, self.entropy.next_bits())),
            _ => Ulid::from_parts(ms, self.entropy.next_bits()),
        };
        self.last = Some(next);

        format!("{}{}", self.prefix, next)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}
