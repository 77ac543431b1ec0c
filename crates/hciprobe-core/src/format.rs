//! Response rendering

use std::fmt::Write;

/// Render bytes as ` xx` pairs: a space then two lowercase hex digits each.
///
/// An empty slice renders as an empty string.
pub fn hex_line(bytes: &[u8]) -> String {
    let mut line = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        // Writing to a String cannot fail
        let _ = write!(line, " {:02x}", b);
    }
    line
}
