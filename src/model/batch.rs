use super::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "B";
const SEPARATOR: &str = "-RT";

/// One processing generation of a batch, identified by batch id and round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Batch {
    batch_id: String,
    round_trip: u32,
}

impl Batch {
    pub fn new(batch_id: impl Into<String>, round_trip: u32) -> Self {
        Self {
            batch_id: batch_id.into(),
            round_trip,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn round_trip(&self) -> u32 {
        self.round_trip
    }

    /// Identifier used as the item key in the event store, e.g. `B400022028241-RT1`.
    pub fn full_id(&self) -> String {
        format!("{}{}{}{}", PREFIX, self.batch_id, SEPARATOR, self.round_trip)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_id())
    }
}

impl FromStr for Batch {
    type Err = ModelError;

    /// Splits on the last separator. The round trip is all digits, so a batch id that
    /// itself contains the separator still parses back to the pair that produced it.
    fn from_str(full_id: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ModelError::MalformedIdentifier {
            full_id: full_id.to_string(),
            reason: reason.to_string(),
        };

        let rest = full_id
            .strip_prefix(PREFIX)
            .ok_or_else(|| malformed("missing 'B' prefix"))?;
        let (batch_id, round_trip) = rest
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| malformed("missing '-RT' separator"))?;

        if batch_id.is_empty() {
            return Err(malformed("empty batch id"));
        }
        if round_trip.is_empty() || !round_trip.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("round trip is not a non-negative integer"));
        }
        let round_trip = round_trip
            .parse()
            .map_err(|_| malformed("round trip out of range"))?;

        Ok(Batch::new(batch_id, round_trip))
    }
}
