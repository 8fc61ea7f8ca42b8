//! Order-identifier checksum validation.
//!
//! Every order number entering the system — submitted orders and withdrawal
//! references alike — must pass the mod-10 (Luhn) check before any storage or
//! network call is made on its behalf.
//!
//! # Determinism
//! `is_valid` is a pure, total function over arbitrary input strings: no IO,
//! no panics. Anything that is not a non-empty ASCII digit string is simply
//! invalid.

/// Returns `true` when `s` is a non-empty ASCII digit string whose mod-10
/// (double-every-second-digit) checksum is zero.
///
/// Non-digit input, the empty string, and whitespace are all rejected; the
/// function never panics.
pub fn is_valid(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    let mut sum: u32 = 0;
    let mut double = false;

    for c in s.bytes().rev() {
        if !c.is_ascii_digit() {
            return false;
        }
        let mut d = (c - b'0') as u32;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }

    sum % 10 == 0
}
