// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! The key record produced by one protocol run.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Output of one successful run. Immutable once assembled.
///
/// Serialized as `{key, length, matching_bases_count, total_bits_sent,
/// timestamp}` with the timestamp in fractional unix seconds. Timestamps are
/// kept at microsecond precision, which an f64 carries exactly for current
/// dates, so a stored record reloads equal to the one that was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    key: String,
    length: usize,
    matching_bases_count: usize,
    total_bits_sent: usize,
    #[serde(with = "unix_seconds")]
    timestamp: DateTime<Utc>,
}

impl KeyRecord {
    /// Assemble a record from sifted bits. The timestamp is truncated to
    /// whole microseconds.
    pub fn assemble(sifted_bits: &[u8], total_bits_sent: usize, timestamp: DateTime<Utc>) -> Self {
        let key: String = sifted_bits
            .iter()
            .map(|&b| if b == 0 { '0' } else { '1' })
            .collect();
        Self {
            length: key.len(),
            matching_bases_count: sifted_bits.len(),
            key,
            total_bits_sent,
            timestamp: timestamp.trunc_subsecs(6),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn matching_bases_count(&self) -> usize {
        self.matching_bases_count
    }

    pub fn total_bits_sent(&self) -> usize {
        self.total_bits_sent
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the record's counters agree with its key.
    ///
    /// Always true for assembled records; used to reject tampered documents.
    pub fn is_consistent(&self) -> bool {
        self.key.len() == self.length
            && self.length == self.matching_bases_count
            && self.matching_bases_count <= self.total_bits_sent
            && self.key.chars().all(|c| c == '0' || c == '1')
    }
}

/// Fractional unix seconds for a timestamp.
pub fn to_unix_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Serde adapter for timestamps as fractional unix seconds.
pub mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(super::to_unix_seconds(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(de::Error::custom("timestamp is not a finite number"));
        }
        let mut whole = secs.floor();
        let mut micros = ((secs - whole) * 1e6).round() as u32;
        if micros >= 1_000_000 {
            whole += 1.0;
            micros = 0;
        }
        DateTime::from_timestamp(whole as i64, micros * 1_000)
            .ok_or_else(|| de::Error::custom(format!("timestamp {} is out of range", secs)))
    }
}
