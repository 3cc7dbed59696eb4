//! What a running session reports to whoever is watching it.

use std::fmt;

use bite_machine::BiteLimit;

/// Whether the pieces needed for a proximity test were visible this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackingStatus {
    NoFaceNoHands,
    NoFace,
    NoHands,
    Tracking,
}

impl TrackingStatus {
    pub fn from_presence(has_mouth: bool, has_fingertips: bool) -> Self {
        match (has_mouth, has_fingertips) {
            (false, false) => TrackingStatus::NoFaceNoHands,
            (false, true)  => TrackingStatus::NoFace,
            (true,  false) => TrackingStatus::NoHands,
            (true,  true)  => TrackingStatus::Tracking,
        }
    }

    /// Short user-facing message; empty while tracking.
    pub fn message(&self) -> &'static str {
        match self {
            TrackingStatus::NoFaceNoHands => "No face or hands detected",
            TrackingStatus::NoFace        => "Face not visible",
            TrackingStatus::NoHands       => "Hands not visible",
            TrackingStatus::Tracking      => "",
        }
    }

    pub fn is_tracking(&self) -> bool {
        *self == TrackingStatus::Tracking
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingStatus::Tracking => f.write_str("Tracking"),
            other                    => f.write_str(other.message()),
        }
    }
}

/// Emitted by [`crate::DetectionLoop`] during frame processing, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A bite was counted.
    Bite { count: u32, limit: BiteLimit },
    /// The bite just counted reached or passed the limit.
    LimitReached { count: u32, limit: BiteLimit },
    /// Tracking status changed since the previous processed frame.
    Status(TrackingStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_maps_to_status() {
        assert_eq!(TrackingStatus::from_presence(false, false), TrackingStatus::NoFaceNoHands);
        assert_eq!(TrackingStatus::from_presence(false, true),  TrackingStatus::NoFace);
        assert_eq!(TrackingStatus::from_presence(true,  false), TrackingStatus::NoHands);
        assert_eq!(TrackingStatus::from_presence(true,  true),  TrackingStatus::Tracking);
    }

    #[test]
    fn tracking_has_empty_message() {
        assert!(TrackingStatus::Tracking.message().is_empty());
        assert_eq!(TrackingStatus::NoFace.to_string(), "Face not visible");
    }
}
