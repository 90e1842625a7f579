//! Text position utilities for byte offset and line:column conversions.
//!
//! Lines and columns are 1-indexed (matching editor conventions); byte
//! offsets are 0-indexed. Columns count bytes, which is what the patch IR
//! and the host's span-addressed locations use.

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds the content length, returns the position at the end
/// of the content.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, byte) in content.bytes().enumerate() {
        if i >= offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Convert a 1-indexed line and column to a byte offset.
///
/// Values of 0 are clamped to 1. Returns `None` if the position is past the
/// end of the content.
pub fn position_to_byte_offset(content: &str, line: u32, col: u32) -> Option<usize> {
    let line = line.max(1);
    let col = col.max(1);
    let mut current_line = 1u32;
    let mut current_col = 1u32;

    for (i, byte) in content.bytes().enumerate() {
        if current_line == line && current_col == col {
            return Some(i);
        }
        if byte == b'\n' {
            current_line += 1;
            current_col = 1;
        } else {
            current_col += 1;
        }
    }

    if current_line == line && current_col == col {
        return Some(content.len());
    }

    None
}
