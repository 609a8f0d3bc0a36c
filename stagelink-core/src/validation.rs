//! Input validation
//!
//! Canonical limits and format checks for caller-supplied identifiers and
//! strings, shared by every service. All checks run locally before any
//! state is touched.

use crate::error::{Error, Result};

// ============================================================================
// Canonical validation limits, single source of truth for the entire codebase
// ============================================================================

/// Maximum room id length in bytes
pub const ROOM_ID_MAX: usize = 48;

/// Maximum room name length in bytes (UTF-8)
pub const ROOM_NAME_MAX: usize = 100;

/// Maximum per-room name card length in bytes (UTF-8)
pub const NAME_CARD_MAX: usize = 32;

/// Maximum room password length in bytes
pub const ROOM_PASSWORD_MAX: usize = 64;

/// Maximum metadata key length in bytes
pub const METADATA_KEY_MAX: usize = 50;

/// Maximum metadata value length in bytes
pub const METADATA_VALUE_MAX: usize = 200;

/// Maximum number of metadata keys per room
pub const METADATA_KEY_COUNT_MAX: usize = 50;

/// Room ids must be non-empty printable ASCII (0x20-0x7e), at most
/// [`ROOM_ID_MAX`] bytes.
pub fn validate_room_id(room_id: &str) -> Result<()> {
    if room_id.is_empty() {
        return Err(Error::RoomIdInvalid("room id cannot be empty".to_string()));
    }
    if room_id.len() > ROOM_ID_MAX {
        return Err(Error::RoomIdInvalid(format!(
            "room id exceeds {ROOM_ID_MAX} bytes"
        )));
    }
    if !room_id.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(Error::RoomIdInvalid(
            "room id must be printable ASCII".to_string(),
        ));
    }
    Ok(())
}

/// Room names are UTF-8, non-empty, at most [`ROOM_NAME_MAX`] bytes.
pub fn validate_room_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::RoomNameInvalid("room name cannot be empty".to_string()));
    }
    if name.len() > ROOM_NAME_MAX {
        return Err(Error::RoomNameInvalid(format!(
            "room name exceeds {ROOM_NAME_MAX} bytes"
        )));
    }
    Ok(())
}

/// Name cards are UTF-8, at most [`NAME_CARD_MAX`] bytes (empty clears).
pub fn validate_name_card(name_card: &str) -> Result<()> {
    if name_card.len() > NAME_CARD_MAX {
        return Err(Error::InvalidParameter(format!(
            "name card exceeds {NAME_CARD_MAX} bytes"
        )));
    }
    Ok(())
}

/// Room passwords are at most [`ROOM_PASSWORD_MAX`] bytes (empty clears).
pub fn validate_room_password(password: &str) -> Result<()> {
    if password.len() > ROOM_PASSWORD_MAX {
        return Err(Error::InvalidParameter(format!(
            "room password exceeds {ROOM_PASSWORD_MAX} bytes"
        )));
    }
    Ok(())
}

/// Metadata keys/values have byte-size caps; the key-count cap is checked
/// by the room service against the merged map.
pub fn validate_metadata_entry(key: &str, value: &str) -> Result<()> {
    if key.is_empty() || key.len() > METADATA_KEY_MAX {
        return Err(Error::InvalidParameter(format!(
            "metadata key must be 1-{METADATA_KEY_MAX} bytes"
        )));
    }
    if value.len() > METADATA_VALUE_MAX {
        return Err(Error::MetadataExceedValueSizeLimit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_format() {
        assert!(validate_room_id("room-123").is_ok());
        assert!(validate_room_id("a b!#$%").is_ok());
        assert!(validate_room_id("").is_err());
        assert!(validate_room_id("日本語").is_err());
        assert!(validate_room_id(&"x".repeat(49)).is_err());
        assert!(validate_room_id(&"x".repeat(48)).is_ok());
    }

    #[test]
    fn test_room_name_limits() {
        assert!(validate_room_name("Weekly Standup").is_ok());
        assert!(validate_room_name("").is_err());
        assert!(validate_room_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_name_card_limits() {
        assert!(validate_name_card("").is_ok());
        assert!(validate_name_card(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_metadata_limits() {
        assert!(validate_metadata_entry("cover", "https://img").is_ok());
        assert!(validate_metadata_entry("", "v").is_err());
        assert!(validate_metadata_entry(&"k".repeat(51), "v").is_err());
        assert_eq!(
            validate_metadata_entry("k", &"v".repeat(201)).unwrap_err(),
            Error::MetadataExceedValueSizeLimit
        );
    }
}
