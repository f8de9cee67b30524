//! Stable pub/sub channel names and live-dashboard envelope types.

use serde::{Deserialize, Serialize};

/// Raw sensor reading updates.
pub const CHANNEL_READINGS: &str = "aquamine:readings";

/// Alert transitions.
pub const CHANNEL_ALERTS: &str = "aquamine:alerts";

/// The kind of message carried on a channel, used as the envelope `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reading,
    Alert,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Reading, EventKind::Alert];

    pub fn channel(self) -> &'static str {
        match self {
            EventKind::Reading => CHANNEL_READINGS,
            EventKind::Alert => CHANNEL_ALERTS,
        }
    }

    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            CHANNEL_READINGS => Some(EventKind::Reading),
            CHANNEL_ALERTS => Some(EventKind::Alert),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_channel(kind.channel()), Some(kind));
        }
        assert_eq!(EventKind::from_channel("aquamine:other"), None);
    }
}
