//! Code page detection for Latin text
//!
//! Picks the single code page that best fits a string by looking at which
//! non-ASCII characters it contains. Detection never fails and never checks
//! that the chosen page can actually represent every character; that is left
//! to the encode step.

use serde::Serialize;

use crate::CodePage;

/// Characters that only the Portuguese page covers comfortably
const PORTUGUESE_MARKERS: [char; 6] = ['ã', 'õ', 'ç', 'Ã', 'Õ', 'Ç'];

const EURO_SIGN: char = '\u{20AC}';

/// Result of code page detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DetectionResult {
    /// Best code page for the text
    pub page: CodePage,
    /// Text contains ã, õ, ç or their capitals
    pub has_portuguese: bool,
    /// Text contains the euro sign
    pub has_euro: bool,
    /// Text contains a Latin-1 letter in U+00C0..=U+00FF
    pub has_latin_extended: bool,
}

/// Scan `text` and pick a code page.
///
/// Priority, first match wins: Portuguese marker, euro sign, any Latin-1
/// accented letter, otherwise the default page. ASCII is ignored.
pub fn detect(text: &str) -> DetectionResult {
    let mut result = DetectionResult::default();

    for ch in text.chars().filter(|ch| !ch.is_ascii()) {
        match ch {
            EURO_SIGN => result.has_euro = true,
            '\u{C0}'..='\u{FF}' => {
                result.has_latin_extended = true;
                if PORTUGUESE_MARKERS.contains(&ch) {
                    result.has_portuguese = true;
                }
            }
            _ => {}
        }
    }

    result.page = if result.has_portuguese {
        CodePage::CP_860
    } else if result.has_euro {
        CodePage::CP_858
    } else if result.has_latin_extended {
        CodePage::CP_850
    } else {
        CodePage::CP_437
    };

    result
}

/// Best code page for `text`
#[inline]
pub fn classify(text: &str) -> CodePage {
    detect(text).page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_default_page() {
        assert_eq!(classify(""), CodePage::CP_437);
        assert_eq!(classify("Hello, World! 19.99"), CodePage::CP_437);
    }

    #[test]
    fn test_portuguese_markers() {
        for text in ["ação", "São Paulo", "coração", "PORÇÃO", "Õ"] {
            assert_eq!(classify(text), CodePage::CP_860, "{text}");
        }
    }

    #[test]
    fn test_euro_sign() {
        let result = detect("€19.99");
        assert_eq!(result.page, CodePage::CP_858);
        assert!(result.has_euro);
        assert!(!result.has_latin_extended);
    }

    #[test]
    fn test_latin_extended() {
        for text in ["café", "Müller", "größe", "città", "Ørsted", "naïve"] {
            assert_eq!(classify(text), CodePage::CP_850, "{text}");
        }
    }

    #[test]
    fn test_priority_order() {
        // Portuguese beats euro
        assert_eq!(classify("€ ação"), CodePage::CP_860);
        // Euro beats plain accents
        assert_eq!(classify("café €3"), CodePage::CP_858);

        let result = detect("Preço: €5, café");
        assert!(result.has_portuguese);
        assert!(result.has_euro);
        assert!(result.has_latin_extended);
        assert_eq!(result.page, CodePage::CP_860);
    }

    #[test]
    fn test_characters_outside_checked_ranges() {
        // Below U+00C0 or outside Latin-1 entirely: no flag is raised
        for text in ["£5", "¿qué?", "日本", "Ωmega", "ŁÓDŹ"] {
            let result = detect(text);
            assert!(!result.has_euro && !result.has_portuguese, "{text}");
        }
        assert_eq!(classify("£5"), CodePage::CP_437);
        assert_eq!(classify("日本"), CodePage::CP_437);
        // Ó is in range even though Ł and Ź are not
        assert_eq!(classify("ŁÓDŹ"), CodePage::CP_850);
    }

    #[test]
    fn test_multiplication_and_division_signs_count_as_latin() {
        assert_eq!(classify("2×3"), CodePage::CP_850);
        assert_eq!(classify("6÷2"), CodePage::CP_850);
    }
}
