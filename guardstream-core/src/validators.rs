// File: guardstream-core/src/validators.rs
//! Programmatic validation for pattern-detected values.
//!
//! Regular expressions alone over-match digit runs in generated text (order numbers,
//! timestamps). These checks reject structurally impossible SSNs and card numbers
//! that fail the Luhn checksum before they are reported as spans.
//!
//! License: MIT OR APACHE 2.0

use crate::span::SpanKind;

/// Validates a US SSN in `AAA-GG-SSSS` form against SSA structural rules.
pub fn is_valid_ssn(ssn: &str) -> bool {
    let mut parts = ssn.split('-');

    let (Some(area), Some(group), Some(serial), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if area.len() != 3 || group.len() != 2 || serial.len() != 4 {
        return false;
    }

    let Some(area_num) = area.parse::<u16>().ok() else { return false; };
    let Some(group_num) = group.parse::<u8>().ok() else { return false; };
    let Some(serial_num) = serial.parse::<u16>().ok() else { return false; };

    let invalid_area = area_num == 0 || area_num == 666 || area_num >= 900;
    !(invalid_area || group_num == 0 || serial_num == 0)
}

/// Mod-10 checksum over a string of ASCII digits.
pub fn is_valid_luhn(num_str: &str) -> bool {
    let mut sum = 0;
    let mut alternate = false;

    for c in num_str.chars().rev() {
        let Some(mut digit) = c.to_digit(10) else { return false; };

        if alternate {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        alternate = !alternate;
    }

    sum % 10 == 0
}

/// Strips separators and applies the Luhn check. Card numbers are 13 to 19 digits.
pub fn is_valid_credit_card(cc_number: &str) -> bool {
    let digits: String = cc_number.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    is_valid_luhn(&digits)
}

/// Dispatches to the validator for `kind`. Kinds without a validator always pass.
pub fn validate_for_kind(kind: SpanKind, value: &str) -> bool {
    match kind {
        SpanKind::Ssn => is_valid_ssn(value),
        SpanKind::CreditCard => is_valid_credit_card(value),
        _ => true,
    }
}
