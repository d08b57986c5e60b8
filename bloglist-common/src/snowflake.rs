//! Module for working with snowflake IDs.
//!
//! A snowflake packs, from the most significant bit down, 42 bits of
//! milliseconds since [`EPOCH`], a 10 bit worker id and a 12 bit sequence
//! number. Snowflakes generated by one worker are strictly increasing.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use std::{
    fmt::{Display, Formatter},
    num::ParseIntError,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error;
use time::{Duration, UtcDateTime, macros::utc_datetime};

pub const EPOCH: UtcDateTime = utc_datetime!(2025-01-01 00:00);

pub const TIMESTAMP_LENGTH: u32 = 42;
pub const WORKER_ID_LENGTH: u32 = 10;
pub const SEQUENCE_LENGTH: u32 = 12;

const WORKER_ID_OFFSET: u32 = SEQUENCE_LENGTH;
const TIMESTAMP_OFFSET: u32 = SEQUENCE_LENGTH + WORKER_ID_LENGTH;

const SEQUENCE_BITMASK: u64 = (1 << SEQUENCE_LENGTH) - 1;
const WORKER_ID_BITMASK: u64 = (1 << WORKER_ID_LENGTH) - 1;
const TIMESTAMP_BITMASK: u64 = (1 << TIMESTAMP_LENGTH) - 1;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WorkerId(u16);

impl WorkerId {
    #[must_use]
    pub fn new(id: u16) -> Option<Self> {
        (u64::from(id) <= WORKER_ID_BITMASK).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Snowflake(u64);

impl Snowflake {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner)
    }

    fn from_parts(millis: u64, worker_id: WorkerId, sequence: u64) -> Self {
        Self(
            (millis << TIMESTAMP_OFFSET)
                | (u64::from(worker_id.get()) << WORKER_ID_OFFSET)
                | (sequence & SEQUENCE_BITMASK),
        )
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        // 42 bits of milliseconds always fit into an i64.
        #[allow(clippy::cast_possible_wrap)]
        let millis = self.millis() as i64;
        EPOCH + Duration::milliseconds(millis)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn worker_id(self) -> WorkerId {
        WorkerId(((self.0 >> WORKER_ID_OFFSET) & WORKER_ID_BITMASK) as u16)
    }

    #[must_use]
    pub fn sequence(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let sequence = (self.0 & SEQUENCE_BITMASK) as u16;
        sequence
    }
}

fn millis_since_epoch(time: UtcDateTime) -> Result<u64, SnowflakeTimestampError> {
    let millis = (time - EPOCH).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeTimestampError::TimeBeforeEpoch);
    }

    u64::try_from(millis)
        .ok()
        .filter(|millis| *millis <= TIMESTAMP_BITMASK)
        .ok_or(SnowflakeTimestampError::TimestampTooLarge)
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Snowflake {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(Self)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Snowflake> for u64 {
    fn from(value: Snowflake) -> Self {
        value.get()
    }
}

// Serialized as a string; JSON numbers lose precision above 2^53.
impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str("a snowflake as a decimal string or integer")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Snowflake(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        value
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

/// Lock-free snowflake source.
///
/// The state holds the last used millisecond and sequence number as a single
/// `millis << SEQUENCE_LENGTH | sequence` word. Once the sequence of a
/// millisecond runs out, or the clock goes backwards, the generator keeps
/// counting and borrows from the following milliseconds instead.
#[derive(Debug, Default)]
pub struct SnowflakeGenerator {
    worker_id: WorkerId,
    state: AtomicU64,
}

impl SnowflakeGenerator {
    #[must_use]
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            state: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn generate_at(&self, time: UtcDateTime) -> Result<Snowflake, SnowflakeTimestampError> {
        let millis = millis_since_epoch(time)?;

        let mut current = self.state.load(Ordering::Relaxed);
        let next = loop {
            let next = if millis > current >> SEQUENCE_LENGTH {
                millis << SEQUENCE_LENGTH
            } else {
                current + 1
            };

            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break next,
                Err(actual) => current = actual,
            }
        };

        let millis = next >> SEQUENCE_LENGTH;
        if millis > TIMESTAMP_BITMASK {
            return Err(SnowflakeTimestampError::TimestampTooLarge);
        }

        Ok(Snowflake::from_parts(millis, self.worker_id, next))
    }

    pub fn generate(&self) -> Result<Snowflake, SnowflakeTimestampError> {
        self.generate_at(UtcDateTime::now())
    }
}
