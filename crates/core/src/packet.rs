//! Timestamped packets and packet maps
//!
//! Packets are the unit of data flowing through graph streams. A request is
//! marshaled into a `PacketMap` keyed by input stream name; the engine
//! answers with a `PacketMap` keyed by output stream name.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::containers::Detection;
use crate::frame::ImageFrame;
use crate::geometry::NormalizedRect;
use crate::{Error, Result};

/// Engine timestamp units per public millisecond
pub const MICROSECONDS_PER_MILLISECOND: i64 = 1000;

/// Timestamp reported to result delegates when no output timestamp exists
/// (engine failures)
pub const UNSET_TIMESTAMP_MS: i64 = i64::MIN;

/// Logical packet timestamp in engine units (microseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create from raw microseconds
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Convert a public millisecond timestamp into engine units
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - `millis` does not fit in microseconds
    pub fn from_millis(millis: i64) -> Result<Self> {
        millis
            .checked_mul(MICROSECONDS_PER_MILLISECOND)
            .map(Self)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Timestamp {}ms is out of range; at most {}ms is supported",
                    millis,
                    i64::MAX / MICROSECONDS_PER_MILLISECOND
                ))
            })
    }

    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Truncating conversion back to public milliseconds
    pub const fn as_millis(&self) -> i64 {
        self.0 / MICROSECONDS_PER_MILLISECOND
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Packet contents
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Image frame (input image or passthrough output)
    Image(ImageFrame),
    /// Region of interest in normalized coordinates
    NormalizedRect(NormalizedRect),
    /// Detection list produced by a detector graph
    Detections(Vec<Detection>),
    /// Placeholder emitted by graphs that produced nothing for a timestamp
    Empty,
}

impl Payload {
    /// Short name of the payload kind, used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Image(_) => "image",
            Payload::NormalizedRect(_) => "normalized_rect",
            Payload::Detections(_) => "detections",
            Payload::Empty => "empty",
        }
    }
}

/// Opaque, optionally timestamped unit of data
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    payload: Payload,
    timestamp: Option<Timestamp>,
}

impl Packet {
    /// Create an unstamped packet
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            timestamp: None,
        }
    }

    /// Create an image packet
    pub fn image(frame: ImageFrame) -> Self {
        Self::new(Payload::Image(frame))
    }

    /// Create a normalized-rectangle packet
    pub fn normalized_rect(rect: NormalizedRect) -> Self {
        Self::new(Payload::NormalizedRect(rect))
    }

    /// Create a detections packet
    pub fn detections(detections: Vec<Detection>) -> Self {
        Self::new(Payload::Detections(detections))
    }

    /// Create an empty packet
    pub fn empty() -> Self {
        Self::new(Payload::Empty)
    }

    /// Builder pattern: stamp the packet
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builder pattern: stamp the packet if a timestamp is given
    pub fn at_optional(mut self, timestamp: Option<Timestamp>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// True when the packet carries no data
    pub fn is_empty(&self) -> bool {
        matches!(self.payload, Payload::Empty)
    }
}

/// Mapping from stream name to packet
pub type PacketMap = HashMap<String, Packet>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millisecond_round_trip() {
        for ms in [0i64, 1, 10, 20, 33, 1_000, 86_400_000] {
            let ts = Timestamp::from_millis(ms).unwrap();
            assert_eq!(ts.as_micros(), ms * 1000);
            assert_eq!(ts.as_millis(), ms);
        }
    }

    #[test]
    fn test_sub_millisecond_truncates() {
        assert_eq!(Timestamp::from_micros(1_999).as_millis(), 1);
    }

    #[test]
    fn test_out_of_range_millis_rejected() {
        let max_ms = i64::MAX / MICROSECONDS_PER_MILLISECOND;
        assert_eq!(
            Timestamp::from_millis(max_ms).unwrap().as_millis(),
            max_ms
        );

        for ms in [max_ms + 1, i64::MAX, i64::MIN, UNSET_TIMESTAMP_MS] {
            let err = Timestamp::from_millis(ms).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{}", ms);
        }
    }

    #[test]
    fn test_packet_stamping() {
        let packet = Packet::empty();
        assert!(packet.timestamp().is_none());
        assert!(packet.is_empty());

        let stamped = Packet::detections(Vec::new()).at(Timestamp::from_millis(5).unwrap());
        assert_eq!(stamped.timestamp(), Some(Timestamp::from_micros(5_000)));
        assert_eq!(stamped.payload().kind(), "detections");

        let unstamped = Packet::empty().at_optional(None);
        assert!(unstamped.timestamp().is_none());
    }
}
