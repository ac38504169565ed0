//! Command protocols spoken by VFD displays
//!
//! A [`Protocol`] turns display operations into the byte frames a device
//! understands. Only ESC/POS is implemented; it is what Epson, Bixolon and
//! most POS customer displays accept.
//!
//! Reference: <https://download4.epson.biz/sec_pubs/pos/reference_en/escpos_dm/commands.html>

use crate::{Error, Result};

/// Form feed, clears the screen
pub const FF: u8 = 0x0C;
/// Escape, prefix of `ESC` commands
pub const ESC: u8 = 0x1B;
/// Unit separator, prefix of display-specific commands
pub const US: u8 = 0x1F;

/// Milliseconds per blink step in `US E n`
pub const BLINK_STEP_MS: u32 = 50;

/// High level operations every command protocol must provide
pub trait Protocol: Sync {
    /// Protocol name used for lookup
    fn name(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Initialize the display and clear its state
    fn clear(&self) -> Vec<u8>;

    /// Clear the screen content
    fn form_feed(&self) -> Vec<u8>;

    /// Move the cursor to a 1-based position
    fn move_cursor(&self, column: u16, row: u16) -> Result<Vec<u8>>;

    /// Wrap already encoded text for output at the cursor
    fn write_text(&self, encoded: &[u8]) -> Vec<u8>;

    /// Set brightness level
    fn set_brightness(&self, level: u8) -> Result<Vec<u8>>;

    /// Set cursor blink period, 0 turns blinking off
    fn set_blink(&self, interval_ms: u32) -> Result<Vec<u8>>;

    /// Select a character code table
    fn set_charset(&self, table: u8) -> Vec<u8>;

    /// Run the built-in self-test
    fn self_test(&self) -> Vec<u8>;
}

/// ESC/POS command set for customer displays
#[derive(Debug, Clone, Copy, Default)]
pub struct EscPos;

impl EscPos {
    /// Largest brightness level accepted by `US X n`
    pub const MAX_BRIGHTNESS: u8 = 4;
}

impl Protocol for EscPos {
    fn name(&self) -> &'static str {
        "ESC/POS"
    }

    fn description(&self) -> &'static str {
        "Standard ESC/POS command set for VFD displays"
    }

    // ESC @
    fn clear(&self) -> Vec<u8> {
        vec![ESC, b'@']
    }

    fn form_feed(&self) -> Vec<u8> {
        vec![FF]
    }

    // US $ n m
    fn move_cursor(&self, column: u16, row: u16) -> Result<Vec<u8>> {
        let column = device_coordinate("column", column)?;
        let row = device_coordinate("row", row)?;
        Ok(vec![US, b'$', column, row])
    }

    fn write_text(&self, encoded: &[u8]) -> Vec<u8> {
        encoded.to_vec()
    }

    // US X n
    fn set_brightness(&self, level: u8) -> Result<Vec<u8>> {
        if !(1..=Self::MAX_BRIGHTNESS).contains(&level) {
            return Err(Error::OutOfRange {
                parameter: "brightness",
                value: level.into(),
                min: 1,
                max: Self::MAX_BRIGHTNESS.into(),
            });
        }
        Ok(vec![US, b'X', level])
    }

    // US E n, n in 50 ms steps
    fn set_blink(&self, interval_ms: u32) -> Result<Vec<u8>> {
        let steps = u8::try_from(interval_ms / BLINK_STEP_MS).map_err(|_| Error::OutOfRange {
            parameter: "blink interval (ms)",
            value: interval_ms,
            min: 0,
            max: u32::from(u8::MAX) * BLINK_STEP_MS + BLINK_STEP_MS - 1,
        })?;
        Ok(vec![US, b'E', steps])
    }

    // ESC t n
    fn set_charset(&self, table: u8) -> Vec<u8> {
        vec![ESC, b't', table]
    }

    // US @
    fn self_test(&self) -> Vec<u8> {
        vec![US, b'@']
    }
}

fn device_coordinate(parameter: &'static str, value: u16) -> Result<u8> {
    match u8::try_from(value) {
        Ok(byte) if byte >= 1 => Ok(byte),
        _ => Err(Error::OutOfRange {
            parameter,
            value: value.into(),
            min: 1,
            max: u8::MAX.into(),
        }),
    }
}

static PROTOCOLS: [&dyn Protocol; 1] = [&EscPos];

/// All registered command protocols
pub fn protocols() -> &'static [&'static dyn Protocol] {
    &PROTOCOLS
}

/// Find a protocol by name, ignoring case
pub fn find_protocol(name: &str) -> Result<&'static dyn Protocol> {
    protocols()
        .iter()
        .copied()
        .find(|protocol| protocol.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnsupportedProtocol(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_frames() {
        let p = EscPos;
        assert_eq!(p.clear(), [0x1B, 0x40]);
        assert_eq!(p.form_feed(), [0x0C]);
        assert_eq!(p.self_test(), [0x1F, 0x40]);
        assert_eq!(p.set_charset(19), [0x1B, 0x74, 19]);
        assert_eq!(p.write_text(b"Hi\x82"), b"Hi\x82");
    }

    #[test]
    fn test_move_cursor() {
        let p = EscPos;
        assert_eq!(p.move_cursor(1, 2).unwrap(), [0x1F, 0x24, 1, 2]);
        assert_eq!(p.move_cursor(255, 255).unwrap(), [0x1F, 0x24, 255, 255]);
        assert!(p.move_cursor(0, 1).is_err());
        assert!(p.move_cursor(1, 256).is_err());
    }

    #[test]
    fn test_brightness_range() {
        let p = EscPos;
        assert_eq!(p.set_brightness(4).unwrap(), [0x1F, 0x58, 4]);
        assert!(p.set_brightness(0).is_err());
        assert!(matches!(
            p.set_brightness(5),
            Err(Error::OutOfRange { value: 5, max: 4, .. })
        ));
    }

    #[test]
    fn test_blink_steps() {
        let p = EscPos;
        assert_eq!(p.set_blink(0).unwrap(), [0x1F, 0x45, 0]);
        assert_eq!(p.set_blink(500).unwrap(), [0x1F, 0x45, 10]);
        // Rounds down to whole steps
        assert_eq!(p.set_blink(149).unwrap(), [0x1F, 0x45, 2]);
        assert_eq!(p.set_blink(12_799).unwrap(), [0x1F, 0x45, 255]);
        assert!(p.set_blink(12_800).is_err());
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!(protocols().len(), 1);
        assert_eq!(find_protocol("esc/pos").unwrap().name(), "ESC/POS");
        assert!(matches!(
            find_protocol("STAR"),
            Err(Error::UnsupportedProtocol(name)) if name == "STAR"
        ));
    }
}
