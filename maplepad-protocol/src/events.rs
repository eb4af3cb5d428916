//! Status notifications shown as on-screen overlays

/// Status events reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusEvent {
    /// First packet received from the console
    HostConnected,
    /// Card image was blank and has been formatted
    CardFormatted,
    /// All queued card writes reached flash
    CardSaved,
    /// A card write could not be committed; it will be retried
    SaveFailed,
    /// Console stopped polling
    HostLost,
}

// Wire format values
const STATUS_HOST_CONNECTED: u8 = 0x01;
const STATUS_CARD_FORMATTED: u8 = 0x02;
const STATUS_CARD_SAVED: u8 = 0x03;
const STATUS_SAVE_FAILED: u8 = 0x04;
const STATUS_HOST_LOST: u8 = 0x05;

impl StatusEvent {
    /// Parse an event from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            STATUS_HOST_CONNECTED => Some(StatusEvent::HostConnected),
            STATUS_CARD_FORMATTED => Some(StatusEvent::CardFormatted),
            STATUS_CARD_SAVED => Some(StatusEvent::CardSaved),
            STATUS_SAVE_FAILED => Some(StatusEvent::SaveFailed),
            STATUS_HOST_LOST => Some(StatusEvent::HostLost),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            StatusEvent::HostConnected => STATUS_HOST_CONNECTED,
            StatusEvent::CardFormatted => STATUS_CARD_FORMATTED,
            StatusEvent::CardSaved => STATUS_CARD_SAVED,
            StatusEvent::SaveFailed => STATUS_SAVE_FAILED,
            StatusEvent::HostLost => STATUS_HOST_LOST,
        }
    }

    /// Overlay text for this event (fits one 16-column banner)
    pub fn text(self) -> &'static str {
        match self {
            StatusEvent::HostConnected => "CONNECTED",
            StatusEvent::CardFormatted => "VMU FORMATTED",
            StatusEvent::CardSaved => "SAVED",
            StatusEvent::SaveFailed => "SAVE FAILED",
            StatusEvent::HostLost => "DISCONNECTED",
        }
    }

    /// Returns true if this event reports a fault
    pub fn is_fault(&self) -> bool {
        matches!(self, StatusEvent::SaveFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        let events = [
            StatusEvent::HostConnected,
            StatusEvent::CardFormatted,
            StatusEvent::CardSaved,
            StatusEvent::SaveFailed,
            StatusEvent::HostLost,
        ];

        for event in events {
            assert_eq!(StatusEvent::from_byte(event.to_byte()), Some(event));
            assert!(event.text().len() <= 16);
        }
    }

    #[test]
    fn test_unknown_status() {
        assert!(StatusEvent::from_byte(0x00).is_none());
        assert!(StatusEvent::from_byte(0xFF).is_none());
    }

    #[test]
    fn test_fault_events() {
        assert!(StatusEvent::SaveFailed.is_fault());
        assert!(!StatusEvent::CardSaved.is_fault());
    }
}
