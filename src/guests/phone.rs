//! Phone number canonicalization.
//!
//! Guests are keyed by a digit-only international number. This is a
//! local-to-international heuristic for a single calling-code convention,
//! not an E.164 parser: `0538268277` becomes `972538268277` and the
//! redundant trunk zero in `9720538268277` is dropped.

use crate::config::DEFAULT_COUNTRY_CODE;

/// Characters removed before any other rule runs.
const STRIPPED_CHARS: &[char] = &['+', ' ', '-', '(', ')'];

/// Length of a local number with its leading trunk zero.
const LOCAL_NUMBER_LEN: usize = 10;

/// Canonicalizes raw phone input using a configured country calling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNormalizer {
    country_code: String,
}

impl Default for PhoneNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODE)
    }
}

impl PhoneNormalizer {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Normalize raw input into the canonical key. Total: malformed input
    /// passes through with only the stripping applied.
    pub fn canonicalize(&self, raw: &str) -> String {
        let mut number: String = raw.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();

        if number.starts_with('0') && number.len() == LOCAL_NUMBER_LEN {
            number = format!("{}{}", self.country_code, &number[1..]);
        }

        if let Some(rest) = number
            .strip_prefix(self.country_code.as_str())
            .and_then(|rest| rest.strip_prefix('0'))
        {
            number = format!("{}{}", self.country_code, rest);
        }

        number
    }

    /// Canonical phone number of a transport sender identity such as
    /// `972501112222@s.whatsapp.net` or `972501112222:7@s.whatsapp.net`.
    pub fn sender_phone(&self, sender_id: &str) -> String {
        let user = sender_id.split('@').next().unwrap_or_default();
        let user = user.split(':').next().unwrap_or_default();
        self.canonicalize(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> PhoneNormalizer {
        PhoneNormalizer::default()
    }

    #[test]
    fn local_number_gains_country_code() {
        assert_eq!(normalizer().canonicalize("0538268277"), "972538268277");
    }

    #[test]
    fn redundant_zero_after_country_code_dropped() {
        assert_eq!(normalizer().canonicalize("9720538268277"), "972538268277");
    }

    #[test]
    fn strips_formatting_characters() {
        assert_eq!(
            normalizer().canonicalize("+972 (53) 826-8277"),
            "972538268277"
        );
        assert_eq!(normalizer().canonicalize("053-826-8277"), "972538268277");
    }

    #[test]
    fn plus_prefixed_redundant_zero() {
        assert_eq!(normalizer().canonicalize("+972 053 826 8277"), "972538268277");
    }

    #[test]
    fn leading_zero_with_other_length_unchanged() {
        assert_eq!(normalizer().canonicalize("053826827"), "053826827");
        assert_eq!(normalizer().canonicalize("05382682770"), "05382682770");
    }

    #[test]
    fn foreign_numbers_unchanged() {
        assert_eq!(normalizer().canonicalize("+1 (415) 555-0100"), "14155550100");
    }

    #[test]
    fn malformed_input_passes_through() {
        assert_eq!(normalizer().canonicalize(""), "");
        assert_eq!(normalizer().canonicalize("abc"), "abc");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let n = normalizer();
        for raw in [
            "0538268277",
            "9720538268277",
            "972538268277",
            "+972 53-826-8277",
            "14155550100",
            "053826827",
        ] {
            let once = n.canonicalize(raw);
            assert_eq!(n.canonicalize(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn configurable_country_code() {
        let n = PhoneNormalizer::new("44");
        assert_eq!(n.country_code(), "44");
        assert_eq!(n.canonicalize("0791234567"), "44791234567");
        assert_eq!(n.canonicalize("440791234567"), "44791234567");
    }

    #[test]
    fn sender_phone_strips_transport_suffix() {
        let n = normalizer();
        assert_eq!(n.sender_phone("972501112222@s.whatsapp.net"), "972501112222");
        assert_eq!(n.sender_phone("972501112222:12@s.whatsapp.net"), "972501112222");
        assert_eq!(n.sender_phone("972501112222"), "972501112222");
    }
}
