//! Adaptive encoding from UTF-8 text to display code pages
//!
//! [`AdaptiveEncoder`] remembers which code page is active and only moves to
//! another one when the active page cannot represent the text. When nothing
//! fits, the original bytes are returned untouched: the display may show
//! garbage for the non-ASCII part, but ASCII is never lost and the write never
//! fails.
//!
//! The encoder mutates its active page, so one display session owns one
//! encoder and calls it from one place at a time.

use tracing::{debug, warn};

use crate::{CodePage, Error, Result, TranslationTable, detection};

/// Something that can switch the device's active code page
pub trait CodePageSwitch {
    /// Ask the device to make `page` active.
    ///
    /// Must be safe to call when `page` is already active.
    fn try_set_active_code_page(&mut self, page: CodePage) -> Result<()>;
}

impl<F> CodePageSwitch for F
where
    F: FnMut(CodePage) -> Result<()>,
{
    fn try_set_active_code_page(&mut self, page: CodePage) -> Result<()> {
        self(page)
    }
}

/// How the bytes of an [`EncodeOutcome`] were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStrategy {
    /// Input was not valid UTF-8 and is returned as is
    PassThrough,
    /// Encoded with the page that was already active
    CurrentPage,
    /// Encoded after moving to a better page
    Switched,
    /// No page could represent the text, UTF-8 bytes returned unchanged
    RawFallback,
}

/// Bytes for the display plus the page they were produced under
#[derive(Debug)]
pub struct EncodeOutcome {
    /// Bytes to send to the display
    pub bytes: Vec<u8>,
    /// Active page after the call
    pub page: CodePage,
    /// How `bytes` were produced
    pub strategy: EncodeStrategy,
    /// Hardware refused a page switch; local state was rolled back
    pub switch_error: Option<Error>,
}

impl EncodeOutcome {
    fn new(bytes: Vec<u8>, page: CodePage, strategy: EncodeStrategy) -> Self {
        Self {
            bytes,
            page,
            strategy,
            switch_error: None,
        }
    }

    /// True when the bytes are a faithful rendering of the input
    pub fn is_exact(&self) -> bool {
        matches!(
            self.strategy,
            EncodeStrategy::CurrentPage | EncodeStrategy::Switched
        )
    }
}

/// Stateful UTF-8 to code page encoder
#[derive(Debug, Clone)]
pub struct AdaptiveEncoder {
    page: CodePage,
    table: &'static TranslationTable,
}

impl Default for AdaptiveEncoder {
    fn default() -> Self {
        Self::with_page(CodePage::default())
    }
}

/// Result of trying the active page, then the detected page
enum Attempt {
    Current(Vec<u8>),
    /// Encoded under a new page; `previous` is what was active before
    Switched { bytes: Vec<u8>, previous: CodePage },
    Failed,
}

impl AdaptiveEncoder {
    /// Create an encoder starting on PC437
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder starting on `page`
    pub fn with_page(page: CodePage) -> Self {
        Self {
            page,
            table: TranslationTable::for_page(page),
        }
    }

    /// Currently active code page
    pub fn page(&self) -> CodePage {
        self.page
    }

    /// Make `page` active and bind its table
    pub fn set_page(&mut self, page: CodePage) {
        self.page = page;
        self.table = TranslationTable::for_page(page);
    }

    /// Encode text without touching the hardware.
    ///
    /// A page switch that makes the text encodable is kept as the new active
    /// page even though the device was never told. Use
    /// [`encode_text_with_hardware_sync`](Self::encode_text_with_hardware_sync)
    /// when the device must follow.
    pub fn encode_text(&mut self, text: impl AsRef<[u8]>) -> EncodeOutcome {
        let raw = text.as_ref();
        let Ok(text) = std::str::from_utf8(raw) else {
            return EncodeOutcome::new(raw.to_vec(), self.page, EncodeStrategy::PassThrough);
        };

        match self.attempt(text) {
            Attempt::Current(bytes) => {
                EncodeOutcome::new(bytes, self.page, EncodeStrategy::CurrentPage)
            }
            Attempt::Switched { bytes, previous } => {
                debug!(from = %previous, to = %self.page, "adopted code page locally");
                EncodeOutcome::new(bytes, self.page, EncodeStrategy::Switched)
            }
            Attempt::Failed => self.raw_fallback(text),
        }
    }

    /// Encode text and switch the device to the page that was used.
    ///
    /// If the device refuses the switch, the encoder goes back to the page it
    /// had before the call and returns the raw bytes, with the refusal in
    /// [`EncodeOutcome::switch_error`]. Encoding problems never produce `Err`.
    pub fn encode_text_with_hardware_sync<S>(
        &mut self,
        text: impl AsRef<[u8]>,
        hardware: &mut S,
    ) -> Result<EncodeOutcome>
    where
        S: CodePageSwitch + ?Sized,
    {
        let raw = text.as_ref();
        let Ok(text) = std::str::from_utf8(raw) else {
            return Ok(EncodeOutcome::new(
                raw.to_vec(),
                self.page,
                EncodeStrategy::PassThrough,
            ));
        };

        match self.attempt(text) {
            Attempt::Current(bytes) => Ok(EncodeOutcome::new(
                bytes,
                self.page,
                EncodeStrategy::CurrentPage,
            )),
            Attempt::Switched { bytes, previous } => {
                match hardware.try_set_active_code_page(self.page) {
                    Ok(()) => {
                        debug!(from = %previous, to = %self.page, "switched display code page");
                        Ok(EncodeOutcome::new(bytes, self.page, EncodeStrategy::Switched))
                    }
                    Err(err) => {
                        warn!(
                            page = %self.page,
                            error = %err,
                            "display refused code page switch, rolling back to {}",
                            previous
                        );
                        self.set_page(previous);
                        let mut outcome = self.raw_fallback(text);
                        outcome.switch_error = Some(err);
                        Ok(outcome)
                    }
                }
            }
            Attempt::Failed => Ok(self.raw_fallback(text)),
        }
    }

    /// Try the active page, then the detected page.
    ///
    /// On `Switched` the detected page is left active. On `Failed` the active
    /// page is what it was on entry.
    fn attempt(&mut self, text: &str) -> Attempt {
        if let Ok(bytes) = self.table.encode(text) {
            return Attempt::Current(bytes);
        }

        let best = detection::classify(text);
        if best == self.page {
            return Attempt::Failed;
        }

        let previous = self.page;
        self.set_page(best);
        match self.table.encode(text) {
            Ok(bytes) => Attempt::Switched { bytes, previous },
            Err(err) => {
                debug!(error = %err, "detected code page cannot encode text either");
                self.set_page(previous);
                Attempt::Failed
            }
        }
    }

    fn raw_fallback(&self, text: &str) -> EncodeOutcome {
        warn!(
            page = %self.page,
            "no code page can represent text, sending UTF-8 bytes unchanged"
        );
        EncodeOutcome::new(
            text.as_bytes().to_vec(),
            self.page,
            EncodeStrategy::RawFallback,
        )
    }
}
