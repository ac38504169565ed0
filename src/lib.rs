//! # vfd-display - Serial VFD Driver with Automatic Code Page Selection
//!
//! A driver library for vacuum-fluorescent customer displays attached over a
//! serial link. Callers send plain UTF-8 text; the library picks the legacy
//! code page that can show it, switches the display to that page, and emits
//! the ESC/POS command frames.
//!
//! ## Features
//!
//! - **Charset classification** of Latin text into PC437, PC850, PC860 or PC858
//! - **Adaptive encoding** that only switches pages when the current one fails
//! - **Hardware sync** with rollback when the display refuses a page switch
//! - **ESC/POS command frames** for clear, cursor, brightness, blink and self-test
//! - **Model profiles** with serial defaults and capability flags
//!
//! ## Quick Start
//!
//! ```rust
//! use vfd_display::{CodePage, encoder::AdaptiveEncoder};
//!
//! let mut encoder = AdaptiveEncoder::new();
//!
//! // The euro sign is not on PC437, so the encoder moves to PC858
//! let outcome = encoder.encode_text("€19.99");
//! assert_eq!(outcome.page, CodePage::CP_858);
//! assert_eq!(outcome.bytes, b"\xD519.99");
//! ```

#![deny(missing_docs)]

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub mod detection;
pub mod display;
pub mod encoder;
pub mod model;
pub mod protocol;
mod tables;

pub use detection::{DetectionResult, classify};
pub use display::Display;
pub use encoder::{AdaptiveEncoder, CodePageSwitch, EncodeOutcome, EncodeStrategy};
pub use model::{ModelProfile, SerialOptions, SerialOverrides};
pub use protocol::{EscPos, Protocol};

/// Result type for display and encoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a display
#[derive(Debug)]
pub enum Error {
    /// Character cannot be encoded in the target code page
    UnmappableTarget {
        /// The unmappable character
        character: char,
        /// Byte position of the character in the input
        position: usize,
        /// Code page that was tried
        page: CodePage,
    },
    /// Invalid input data
    InvalidInput(String),
    /// Numeric argument outside the range the device accepts
    OutOfRange {
        /// Name of the argument
        parameter: &'static str,
        /// Rejected value
        value: u32,
        /// Smallest accepted value
        min: u32,
        /// Largest accepted value
        max: u32,
    },
    /// No profile is registered for this model identifier
    UnsupportedModel(String),
    /// No command protocol is registered under this name
    UnsupportedProtocol(String),
    /// The model profile says the device lacks this feature
    Unsupported {
        /// Model name
        model: &'static str,
        /// Feature that was requested
        feature: &'static str,
    },
    /// Byte sink failed
    Io(std::io::Error),
    /// Serial port could not be opened or configured
    #[cfg(feature = "serial")]
    Serial(serialport::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnmappableTarget {
                character,
                position,
                page,
            } => {
                write!(
                    f,
                    "Cannot encode character '{}' at position {} in {}",
                    character,
                    position,
                    page.name()
                )
            }
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::OutOfRange {
                parameter,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "{} must be between {} and {} (got {})",
                    parameter, min, max, value
                )
            }
            Error::UnsupportedModel(model) => write!(f, "Unsupported VFD model: {}", model),
            Error::UnsupportedProtocol(name) => {
                write!(f, "Unsupported command protocol: {}", name)
            }
            Error::Unsupported { model, feature } => {
                write!(f, "{} does not support {}", model, feature)
            }
            Error::Io(err) => write!(f, "Display write failed: {}", err),
            #[cfg(feature = "serial")]
            Error::Serial(err) => write!(f, "Serial port error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            #[cfg(feature = "serial")]
            Error::Serial(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(feature = "serial")]
impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Error::Serial(err)
    }
}

/// Single-byte code pages the displays can be switched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum CodePage {
    /// PC437 (USA, standard Europe) - the power-on default
    #[default]
    #[serde(rename = "CP437")]
    CP_437,
    /// PC850 (multilingual Latin)
    #[serde(rename = "CP850")]
    CP_850,
    /// PC860 (Portuguese)
    #[serde(rename = "CP860")]
    CP_860,
    /// PC858 (multilingual Latin with euro sign)
    #[serde(rename = "CP858")]
    CP_858,
}

impl CodePage {
    /// Every supported code page, in device table order
    pub const ALL: [CodePage; 4] = [
        CodePage::CP_437,
        CodePage::CP_850,
        CodePage::CP_860,
        CodePage::CP_858,
    ];

    /// Get the canonical name of this code page
    pub fn name(self) -> &'static str {
        match self {
            CodePage::CP_437 => "CP437",
            CodePage::CP_850 => "CP850",
            CodePage::CP_860 => "CP860",
            CodePage::CP_858 => "CP858",
        }
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match self {
            CodePage::CP_437 => "USA, Standard Europe (default)",
            CodePage::CP_850 => "Multilingual Latin",
            CodePage::CP_860 => "Portuguese",
            CodePage::CP_858 => "Multilingual Latin with Euro",
        }
    }

    /// Character code table number used by `ESC t n`
    pub fn device_table(self) -> u8 {
        match self {
            CodePage::CP_437 => 0,
            CodePage::CP_850 => 2,
            CodePage::CP_860 => 3,
            CodePage::CP_858 => 19,
        }
    }

    /// Look up the code page behind a device character code table number
    pub fn from_device_table(table: u8) -> Option<Self> {
        CodePage::ALL
            .into_iter()
            .find(|page| page.device_table() == table)
    }

    /// Get the shared translation table for this code page
    pub fn table(self) -> &'static TranslationTable {
        TranslationTable::for_page(self)
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pre-computed lookup between Unicode and one code page's bytes
#[derive(Debug, Clone)]
pub struct TranslationTable {
    page: CodePage,
    /// byte -> character, for the whole 0x00-0xFF range
    chars: [char; 256],
    /// character -> byte, for the non-ASCII half only
    lookup: HashMap<char, u8>,
}

static TABLES: [OnceLock<TranslationTable>; 4] = [const { OnceLock::new() }; 4];

impl TranslationTable {
    fn build(page: CodePage) -> Self {
        let high = tables::high_half(page);

        let mut chars = ['\0'; 256];
        for (byte, slot) in chars.iter_mut().enumerate().take(0x80) {
            *slot = char::from(byte as u8);
        }
        chars[0x80..].copy_from_slice(high);

        let lookup = high
            .iter()
            .enumerate()
            .map(|(offset, &ch)| (ch, 0x80 + offset as u8))
            .collect();

        Self {
            page,
            chars,
            lookup,
        }
    }

    /// Get the table for a code page, building it on first use
    pub fn for_page(page: CodePage) -> &'static Self {
        let slot = match page {
            CodePage::CP_437 => &TABLES[0],
            CodePage::CP_850 => &TABLES[1],
            CodePage::CP_860 => &TABLES[2],
            CodePage::CP_858 => &TABLES[3],
        };
        slot.get_or_init(|| Self::build(page))
    }

    /// Code page this table belongs to
    pub fn page(&self) -> CodePage {
        self.page
    }

    /// Encode a single character, `None` if the page has no byte for it
    #[inline]
    pub fn encode_char(&self, ch: char) -> Option<u8> {
        if ch.is_ascii() {
            Some(ch as u8)
        } else {
            self.lookup.get(&ch).copied()
        }
    }

    /// Encode text, failing on the first character the page cannot represent
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(text.len());
        for (position, character) in text.char_indices() {
            match self.encode_char(character) {
                Some(byte) => output.push(byte),
                None => {
                    return Err(Error::UnmappableTarget {
                        character,
                        position,
                        page: self.page,
                    });
                }
            }
        }
        Ok(output)
    }

    /// Check whether every character of `text` has a byte on this page
    pub fn can_encode(&self, text: &str) -> bool {
        text.chars().all(|ch| self.encode_char(ch).is_some())
    }

    /// Character shown for a byte
    #[inline]
    pub fn decode_byte(&self, byte: u8) -> char {
        self.chars[byte as usize]
    }

    /// Decode bytes into the text the display would show
    pub fn decode(&self, input: &[u8]) -> String {
        input.iter().map(|&byte| self.decode_byte(byte)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_identity_on_every_page() {
        let text = "Hello, World! 0123456789 ~{}";
        for page in CodePage::ALL {
            assert_eq!(page.table().encode(text).unwrap(), text.as_bytes());
        }
    }

    #[test]
    fn test_cp437_accented_letters() {
        let table = CodePage::CP_437.table();

        assert_eq!(table.encode("café").unwrap(), b"caf\x82");
        assert_eq!(table.encode("niño").unwrap(), b"ni\xA4o");
        assert_eq!(table.encode_char('°'), Some(0xF8));
        assert_eq!(table.encode_char('ã'), None);
    }

    #[test]
    fn test_unmappable_reports_character_and_position() {
        let err = CodePage::CP_437.table().encode("ação").unwrap_err();
        match err {
            Error::UnmappableTarget {
                character,
                position,
                page,
            } => {
                // 'ç' is on PC437, so the failure is the tilde at byte 3
                assert_eq!(character, 'ã');
                assert_eq!(position, 3);
                assert_eq!(page, CodePage::CP_437);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_portuguese_page() {
        let table = CodePage::CP_860.table();
        assert_eq!(table.encode("ação").unwrap(), b"a\x87\x84o");
        assert_eq!(table.encode("SÃO").unwrap(), b"S\x8EO");
        assert!(!table.can_encode("€"));
    }

    #[test]
    fn test_euro_only_on_cp858() {
        for page in CodePage::ALL {
            let expected = page == CodePage::CP_858;
            assert_eq!(page.table().can_encode("€"), expected, "{}", page);
        }
        assert_eq!(CodePage::CP_858.table().encode_char('€'), Some(0xD5));
        assert_eq!(CodePage::CP_850.table().encode_char('ı'), Some(0xD5));
    }

    #[test]
    fn test_decode_matches_encode() {
        let table = CodePage::CP_850.table();
        let text = "Ørsted Ãé ×";
        let encoded = table.encode(text).unwrap();
        assert_eq!(table.decode(&encoded), text);
        assert_eq!(table.decode_byte(0x9D), 'Ø');
    }

    #[test]
    fn test_code_page_properties() {
        assert_eq!(CodePage::default(), CodePage::CP_437);
        assert_eq!(CodePage::CP_858.name(), "CP858");
        assert_eq!(CodePage::CP_858.device_table(), 19);
        assert_eq!(CodePage::from_device_table(3), Some(CodePage::CP_860));
        assert_eq!(CodePage::from_device_table(1), None);
        assert_eq!(CodePage::CP_850.to_string(), "CP850");
    }

    #[test]
    fn test_code_page_serde_names() {
        let json = serde_json::to_string(&CodePage::CP_860).unwrap();
        assert_eq!(json, "\"CP860\"");
        let page: CodePage = serde_json::from_str("\"CP858\"").unwrap();
        assert_eq!(page, CodePage::CP_858);
    }

    #[test]
    fn test_error_display() {
        let err = Error::OutOfRange {
            parameter: "brightness",
            value: 7,
            min: 1,
            max: 4,
        };
        assert_eq!(err.to_string(), "brightness must be between 1 and 4 (got 7)");
    }
}
