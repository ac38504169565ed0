//! Display sessions
//!
//! A [`Display`] owns the byte sink of one connected device, the command
//! protocol it speaks and the [`AdaptiveEncoder`] that keeps its code page in
//! step with the text being written. Any [`std::io::Write`] works as the sink,
//! which is how the tests drive it without hardware.

use std::io::Write;

use tracing::{debug, trace, warn};

use crate::encoder::{AdaptiveEncoder, CodePageSwitch, EncodeOutcome};
use crate::model::ModelProfile;
use crate::protocol::{EscPos, Protocol};
use crate::{CodePage, Error, Result};

/// Sink plus protocol; the part of a session that talks to the device
struct Link<W> {
    sink: W,
    protocol: &'static dyn Protocol,
    profile: Option<&'static ModelProfile>,
    /// Last character code table the device confirmed
    active_table: Option<u8>,
}

impl<W: Write> Link<W> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        trace!(frame = ?frame, "writing frame");
        self.sink.write_all(frame)?;
        self.sink.flush()?;
        Ok(())
    }

    fn require(&self, feature: &'static str, supported: fn(&ModelProfile) -> bool) -> Result<()> {
        match self.profile {
            Some(profile) if !supported(profile) => Err(Error::Unsupported {
                model: profile.name,
                feature,
            }),
            _ => Ok(()),
        }
    }

    fn select_table(&mut self, table: u8) -> Result<()> {
        self.require("character code tables", |p| p.supports_charset_table)?;
        let frame = self.protocol.set_charset(table);
        self.send(&frame)?;
        self.active_table = Some(table);
        Ok(())
    }
}

impl<W: Write> CodePageSwitch for Link<W> {
    fn try_set_active_code_page(&mut self, page: CodePage) -> Result<()> {
        self.select_table(page.device_table())
    }
}

/// An open connection to one VFD
pub struct Display<W: Write> {
    link: Link<W>,
    encoder: AdaptiveEncoder,
    columns: u16,
    rows: u16,
    cursor: Option<(u16, u16)>,
    brightness: Option<u8>,
    blink_ms: Option<u32>,
}

impl<W: Write> Display<W> {
    /// Wrap a sink speaking ESC/POS, with no model profile and no known size
    pub fn new(sink: W) -> Self {
        Self {
            link: Link {
                sink,
                protocol: &EscPos,
                profile: None,
                active_table: None,
            },
            encoder: AdaptiveEncoder::new(),
            columns: 0,
            rows: 0,
            cursor: None,
            brightness: None,
            blink_ms: None,
        }
    }

    /// Wrap a sink for a known model, taking its protocol and size
    pub fn for_model(sink: W, profile: &'static ModelProfile) -> Result<Self> {
        Self::new(sink).with_profile(profile)
    }

    /// Apply a model profile: protocol, size and capability flags
    pub fn with_profile(mut self, profile: &'static ModelProfile) -> Result<Self> {
        self.link.protocol = profile.command_protocol()?;
        self.link.profile = Some(profile);
        if self.columns == 0 && self.rows == 0 {
            self.columns = profile.columns;
            self.rows = profile.rows;
        }
        Ok(self)
    }

    /// Use a different command protocol
    pub fn with_protocol(mut self, protocol: &'static dyn Protocol) -> Self {
        self.link.protocol = protocol;
        self
    }

    /// Set the logical screen size used for cursor bounds; 0 means unknown
    pub fn with_dimensions(mut self, columns: u16, rows: u16) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Initialize the display (`ESC @`).
    ///
    /// The device comes back on its default code page with the cursor home,
    /// so the session state is reset to match.
    pub fn clear(&mut self) -> Result<()> {
        let frame = self.link.protocol.clear();
        self.link.send(&frame)?;
        self.encoder.set_page(CodePage::default());
        self.link.active_table = Some(CodePage::default().device_table());
        self.cursor = Some((1, 1));
        Ok(())
    }

    /// Clear the screen content and home the cursor
    pub fn form_feed(&mut self) -> Result<()> {
        let frame = self.link.protocol.form_feed();
        self.link.send(&frame)?;
        self.cursor = Some((1, 1));
        Ok(())
    }

    /// Write text at the cursor, switching code page when needed
    pub fn write_text(&mut self, text: &str) -> Result<EncodeOutcome> {
        let outcome = self
            .encoder
            .encode_text_with_hardware_sync(text, &mut self.link)?;
        let frame = self.link.protocol.write_text(&outcome.bytes);
        self.link.send(&frame)?;
        self.advance_cursor_by(outcome.bytes.len());
        Ok(outcome)
    }

    /// Write bytes as they are, without encoding
    pub fn write_raw_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.link.send(data)?;
        self.advance_cursor_by(data.len());
        Ok(())
    }

    /// Move the cursor to a 1-based position (`US $ n m`)
    pub fn set_cursor(&mut self, column: u16, row: u16) -> Result<()> {
        if self.cursor == Some((column, row)) {
            return Ok(());
        }
        if column < 1 || row < 1 {
            return Err(Error::InvalidInput("column/row must be >= 1".to_string()));
        }
        if self.columns > 0 && column > self.columns {
            return Err(Error::OutOfRange {
                parameter: "column",
                value: column.into(),
                min: 1,
                max: self.columns.into(),
            });
        }
        if self.rows > 0 && row > self.rows {
            return Err(Error::OutOfRange {
                parameter: "row",
                value: row.into(),
                min: 1,
                max: self.rows.into(),
            });
        }

        let frame = self.link.protocol.move_cursor(column, row)?;
        self.link.send(&frame)?;
        self.cursor = Some((column, row));
        Ok(())
    }

    /// Tracked cursor position, `None` until it is known
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Set brightness (`US X n`), 1 up to the model's level count
    pub fn set_brightness(&mut self, level: u8) -> Result<()> {
        self.link.require("brightness", |p| p.supports_brightness)?;
        let max = self
            .link
            .profile
            .map_or(EscPos::MAX_BRIGHTNESS, |p| p.brightness_levels);
        if !(1..=max).contains(&level) {
            return Err(Error::OutOfRange {
                parameter: "brightness",
                value: level.into(),
                min: 1,
                max: max.into(),
            });
        }

        let frame = self.link.protocol.set_brightness(level)?;
        self.link.send(&frame)?;
        self.brightness = Some(level);
        Ok(())
    }

    /// Last brightness level set through this session
    pub fn brightness(&self) -> Option<u8> {
        self.brightness
    }

    /// Set the cursor blink period in milliseconds, 0 disables blinking
    pub fn set_blink(&mut self, interval_ms: u32) -> Result<()> {
        self.link.require("cursor blink", |p| p.supports_cursor_blink)?;
        let frame = self.link.protocol.set_blink(interval_ms)?;
        self.link.send(&frame)?;
        // The device only knows whole steps
        let step = crate::protocol::BLINK_STEP_MS;
        self.blink_ms = Some(interval_ms / step * step);
        Ok(())
    }

    /// Last blink period set, rounded down to the device step
    pub fn blink_ms(&self) -> Option<u32> {
        self.blink_ms
    }

    /// Logical size as (columns, rows); zero means unknown
    pub fn dimensions(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    /// Run the built-in self-test (`US @`)
    pub fn self_test(&mut self) -> Result<()> {
        self.link.require("self-test", |p| p.supports_self_test)?;
        let frame = self.link.protocol.self_test();
        self.link.send(&frame)
    }

    /// Select a character code table by number (`ESC t n`).
    ///
    /// Normally not needed: [`write_text`](Self::write_text) switches tables
    /// on its own. Tables without a known code page make the encoder fall back
    /// to the PC437 table.
    pub fn set_character_code_table(&mut self, table: u8) -> Result<()> {
        self.link.select_table(table)?;
        match CodePage::from_device_table(table) {
            Some(page) => self.encoder.set_page(page),
            None => {
                warn!(table, "no encoder for character code table, encoding as CP437");
                self.encoder.set_page(CodePage::default());
            }
        }
        debug!(table, page = %self.encoder.page(), "selected character code table");
        Ok(())
    }

    /// Code page the encoder is currently using
    pub fn code_page(&self) -> CodePage {
        self.encoder.page()
    }

    /// Last character code table the device accepted, if any was sent
    pub fn active_table(&self) -> Option<u8> {
        self.link.active_table
    }

    /// Model profile, if the session was opened for a model
    pub fn profile(&self) -> Option<&'static ModelProfile> {
        self.link.profile
    }

    /// Command protocol in use
    pub fn protocol(&self) -> &'static dyn Protocol {
        self.link.protocol
    }

    /// Borrow the byte sink
    pub fn get_ref(&self) -> &W {
        &self.link.sink
    }

    /// Close the session and hand back the byte sink
    pub fn into_inner(self) -> W {
        self.link.sink
    }

    fn advance_cursor_by(&mut self, count: usize) {
        if count == 0 || self.columns == 0 || self.rows == 0 {
            return;
        }
        let (column, row) = self.cursor.unwrap_or((1, 1));
        let columns = usize::from(self.columns);
        let rows = usize::from(self.rows);

        let total = usize::from(column.max(1)) - 1 + count;
        let new_column = total % columns + 1;
        let new_row = (usize::from(row.max(1)) - 1 + total / columns) % rows + 1;

        // Both are bounded by u16 dimensions
        self.cursor = Some((new_column as u16, new_row as u16));
    }
}

#[cfg(feature = "serial")]
pub use serial::{open, open_model};

#[cfg(feature = "serial")]
mod serial {
    use std::time::Duration;

    use serialport::{DataBits, FlowControl, SerialPort};
    use tracing::debug;

    use super::Display;
    use crate::model::{self, Parity, SerialOptions, SerialOverrides, StopBits};
    use crate::{Error, Result};

    const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

    /// Open a display on a serial port with explicit options, speaking ESC/POS
    pub fn open(port_name: &str, options: &SerialOptions) -> Result<Display<Box<dyn SerialPort>>> {
        if port_name.is_empty() {
            return Err(Error::InvalidInput("port name is required".to_string()));
        }
        options.validate()?;

        let data_bits = match options.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        let parity = match options.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let stop_bits = match options.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        };

        let port = serialport::new(port_name, options.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()?;
        debug!(port = port_name, baud_rate = options.baud_rate, "opened serial port");

        Ok(Display::new(port).with_dimensions(options.columns, options.rows))
    }

    /// Open a display using a model's defaults, with optional overrides
    pub fn open_model(
        port_name: &str,
        model_id: &str,
        overrides: Option<&SerialOverrides>,
    ) -> Result<Display<Box<dyn SerialPort>>> {
        if port_name.is_empty() {
            return Err(Error::InvalidInput("port name is required".to_string()));
        }
        let profile = model::find_model(model_id)?;
        let mut options = SerialOptions::for_model(profile);
        if let Some(overrides) = overrides {
            options.apply(overrides);
        }
        open(port_name, &options)?.with_profile(profile)
    }
}
