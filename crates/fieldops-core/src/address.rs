// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender address normalization.
//!
//! Transports report addresses like `5511987654321@c.us`; the contact directory
//! stores whatever the administrator typed. Both sides are reduced to digits and
//! compared with tolerance for the `55` country code and the Brazilian mobile
//! ninth digit.

use crate::types::Contact;

const COUNTRY_CODE: &str = "55";

/// Drop the transport suffix (from `@`) and every non-digit character.
pub fn normalize_address(raw: &str) -> String {
    let head = raw.split('@').next().unwrap_or(raw);
    head.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// National form: country code removed, ninth digit removed from mobiles.
fn national_key(digits: &str) -> String {
    let national = if digits.len() >= 12 {
        digits.strip_prefix(COUNTRY_CODE).unwrap_or(digits)
    } else {
        digits
    };
    // DDD (2 digits) + 9 + 8 digits.
    if national.len() == 11 && national.as_bytes()[2] == b'9' {
        format!("{}{}", &national[..2], &national[3..])
    } else {
        national.to_string()
    }
}

/// True when two addresses designate the same phone.
pub fn addresses_match(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_address(a), normalize_address(b));
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || national_key(&a) == national_key(&b)
}

/// Find the contact whose address matches `address`. Exact matches win.
pub fn find_contact<'a>(contacts: &'a [Contact], address: &str) -> Option<&'a Contact> {
    let wanted = normalize_address(address);
    contacts
        .iter()
        .find(|c| normalize_address(&c.address) == wanted)
        .or_else(|| contacts.iter().find(|c| addresses_match(&c.address, address)))
}
