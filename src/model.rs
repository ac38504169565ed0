//! Display model profiles and serial settings
//!
//! Profiles are static data. [`SerialOverrides`] lets callers (or a JSON
//! config file) replace individual defaults of a profile.

use serde::{Deserialize, Serialize};

use crate::protocol::{self, Protocol};
use crate::{Error, Result};

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Serial stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    /// One stop bit
    #[default]
    One,
    /// Two stop bits
    Two,
}

/// Specification and capabilities of one display model
#[derive(Debug, Clone, Serialize)]
pub struct ModelProfile {
    /// Identifier used for lookup, e.g. `EPSON_DM_D110`
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Manufacturer
    pub manufacturer: &'static str,
    /// Model designation
    pub model: &'static str,
    /// Characters per line
    pub columns: u16,
    /// Number of lines
    pub rows: u16,
    /// Default baud rate
    pub baud_rate: u32,
    /// Default data bits
    pub data_bits: u8,
    /// Default parity
    pub parity: Parity,
    /// Default stop bits
    pub stop_bits: StopBits,
    /// Name of the command protocol
    pub protocol: &'static str,
    /// Brightness can be changed
    pub supports_brightness: bool,
    /// Number of brightness levels, 1-based
    pub brightness_levels: u8,
    /// Cursor blink can be changed
    pub supports_cursor_blink: bool,
    /// Character code tables can be selected
    pub supports_charset_table: bool,
    /// Built-in self-test is available
    pub supports_self_test: bool,
    /// Command reference
    pub documentation_url: &'static str,
}

impl ModelProfile {
    /// Command protocol implementation for this model
    pub fn command_protocol(&self) -> Result<&'static dyn Protocol> {
        protocol::find_protocol(self.protocol)
    }
}

/// Epson DM-D110 customer display
pub const EPSON_DM_D110: ModelProfile = ModelProfile {
    id: "EPSON_DM_D110",
    name: "Epson DM-D110",
    manufacturer: "Epson",
    model: "DM-D110",
    columns: 20,
    rows: 2,
    baud_rate: 9600,
    data_bits: 8,
    parity: Parity::None,
    stop_bits: StopBits::One,
    protocol: "ESC/POS",
    supports_brightness: true,
    brightness_levels: 4,
    supports_cursor_blink: true,
    supports_charset_table: true,
    supports_self_test: true,
    documentation_url: "https://download4.epson.biz/sec_pubs/pos/reference_en/escpos_dm/commands.html",
};

static MODELS: [ModelProfile; 1] = [EPSON_DM_D110];

/// All supported display models
pub fn models() -> &'static [ModelProfile] {
    &MODELS
}

/// Find a model by id or model designation, ignoring case and `-`/`_`
pub fn find_model(id: &str) -> Result<&'static ModelProfile> {
    let wanted = normalize(id);
    models()
        .iter()
        .find(|profile| normalize(profile.id) == wanted || normalize(profile.model) == wanted)
        .ok_or_else(|| Error::UnsupportedModel(id.to_string()))
}

fn normalize(id: &str) -> String {
    id.chars()
        .filter(|ch| !matches!(ch, '-' | '_' | ' '))
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

/// Serial connection parameters and logical screen size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialOptions {
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    pub data_bits: u8,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Characters per line, 0 when unknown
    pub columns: u16,
    /// Number of lines, 0 when unknown
    pub rows: u16,
}

impl Default for SerialOptions {
    /// 9600 8N1 with no screen size
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            columns: 0,
            rows: 0,
        }
    }
}

impl SerialOptions {
    /// Defaults of a model profile
    pub fn for_model(profile: &ModelProfile) -> Self {
        Self {
            baud_rate: profile.baud_rate,
            data_bits: profile.data_bits,
            parity: profile.parity,
            stop_bits: profile.stop_bits,
            columns: profile.columns,
            rows: profile.rows,
        }
    }

    /// Replace every field that `overrides` sets
    pub fn apply(&mut self, overrides: &SerialOverrides) {
        if let Some(baud_rate) = overrides.baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(data_bits) = overrides.data_bits {
            self.data_bits = data_bits;
        }
        if let Some(parity) = overrides.parity {
            self.parity = parity;
        }
        if let Some(stop_bits) = overrides.stop_bits {
            self.stop_bits = stop_bits;
        }
        if let Some(columns) = overrides.columns {
            self.columns = columns;
        }
        if let Some(rows) = overrides.rows {
            self.rows = rows;
        }
    }

    /// Check values the serial driver would reject
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::InvalidInput("baud rate must be positive".to_string()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(Error::OutOfRange {
                parameter: "data bits",
                value: self.data_bits.into(),
                min: 5,
                max: 8,
            });
        }
        Ok(())
    }
}

/// Partial [`SerialOptions`]; unset fields keep the model default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialOverrides {
    /// Baud rate
    pub baud_rate: Option<u32>,
    /// Data bits
    pub data_bits: Option<u8>,
    /// Parity
    pub parity: Option<Parity>,
    /// Stop bits
    pub stop_bits: Option<StopBits>,
    /// Characters per line
    pub columns: Option<u16>,
    /// Number of lines
    pub rows: Option<u16>,
}

impl SerialOverrides {
    /// Layer `other` on top, its set fields win
    pub fn merge(mut self, other: &SerialOverrides) -> Self {
        self.baud_rate = other.baud_rate.or(self.baud_rate);
        self.data_bits = other.data_bits.or(self.data_bits);
        self.parity = other.parity.or(self.parity);
        self.stop_bits = other.stop_bits.or(self.stop_bits);
        self.columns = other.columns.or(self.columns);
        self.rows = other.rows.or(self.rows);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_model_aliases() {
        for id in ["EPSON_DM_D110", "epson-dm-d110", "DM-D110", "dmd110"] {
            assert_eq!(find_model(id).unwrap().name, "Epson DM-D110", "{id}");
        }
        assert!(matches!(
            find_model("BCD-1100"),
            Err(Error::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_model_protocol_resolves() {
        let protocol = EPSON_DM_D110.command_protocol().unwrap();
        assert_eq!(protocol.name(), "ESC/POS");
    }

    #[test]
    fn test_overrides_keep_unset_defaults() {
        let mut options = SerialOptions::for_model(&EPSON_DM_D110);
        options.apply(&SerialOverrides {
            baud_rate: Some(19200),
            ..Default::default()
        });
        assert_eq!(options.baud_rate, 19200);
        assert_eq!(options.data_bits, 8);
        assert_eq!((options.columns, options.rows), (20, 2));
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides: SerialOverrides =
            serde_json::from_str(r#"{"baud_rate": 38400, "parity": "even"}"#).unwrap();
        assert_eq!(overrides.baud_rate, Some(38400));
        assert_eq!(overrides.parity, Some(Parity::Even));
        assert_eq!(overrides.rows, None);

        assert!(serde_json::from_str::<SerialOverrides>(r#"{"baud": 1}"#).is_err());
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let file = SerialOverrides {
            baud_rate: Some(19200),
            columns: Some(40),
            ..Default::default()
        };
        let flags = SerialOverrides {
            baud_rate: Some(115200),
            ..Default::default()
        };
        let merged = file.merge(&flags);
        assert_eq!(merged.baud_rate, Some(115200));
        assert_eq!(merged.columns, Some(40));
    }

    #[test]
    fn test_validate() {
        assert!(SerialOptions::default().validate().is_ok());
        let options = SerialOptions {
            data_bits: 9,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
