/// Run phase definitions for the harvest loop
///
/// A run moves through these phases in order, bouncing between
/// `Expanding` and `Extracting` until it stops.
use std::fmt;

/// Represents the current phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Reading durable progress and the known-identifier snapshot
    Loading,

    /// The candidate source is scrolling for more entries
    Expanding,

    /// Buffered candidates are being extracted and committed
    Extracting,

    /// The main loop has stopped (target met, exhaustion, or fault)
    Done,

    /// Adjusting the result list against the store
    Reconciling,
}

impl RunPhase {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Loading, Self::Expanding)
                | (Self::Loading, Self::Done)
                | (Self::Expanding, Self::Extracting)
                | (Self::Expanding, Self::Done)
                | (Self::Extracting, Self::Expanding)
                | (Self::Extracting, Self::Done)
                | (Self::Done, Self::Reconciling)
        )
    }

    /// Returns true while the main loop is still running
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loading | Self::Expanding | Self::Extracting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Expanding => "expanding",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::Reconciling => "reconciling",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
