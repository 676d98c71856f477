//
// utf16.rs
//
// Conversions between LSP positions (UTF-16 columns) and byte offsets
//

use std::ops::Range as ByteRange;

use tower_lsp::lsp_types::{Position, Range};

/// Convert a UTF-16 column offset (from LSP Position.character) to a byte
/// offset within the given line. The core works on byte offsets, not UTF-16
/// code units.
pub fn utf16_column_to_byte_offset(line: &str, utf16_col: u32) -> usize {
    let mut utf16_count = 0;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_count >= utf16_col as usize {
            return byte_idx;
        }
        utf16_count += ch.len_utf16();
    }
    line.len()
}

/// Text of line `line` without its terminator.
pub fn line_text(text: &str, line: u32) -> Option<&str> {
    let raw = text.split('\n').nth(line as usize)?;
    Some(raw.strip_suffix('\r').unwrap_or(raw))
}

/// Byte offset of `position` in `text`, clamped to the end of its line and
/// to the end of the text.
pub fn position_to_byte_offset(text: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }
    let rest = &text[line_start..];
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let line = rest[..line_end].strip_suffix('\r').unwrap_or(&rest[..line_end]);
    line_start + utf16_column_to_byte_offset(line, position.character)
}

/// LSP position of byte `offset` in `text`. Offsets inside a multi-byte
/// character round down to its start.
pub fn byte_offset_to_position(text: &str, offset: usize) -> Position {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let character = text[line_start..offset].encode_utf16().count() as u32;
    Position::new(line, character)
}

pub fn byte_range_to_range(text: &str, range: &ByteRange<usize>) -> Range {
    Range::new(
        byte_offset_to_position(text, range.start),
        byte_offset_to_position(text, range.end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_column_to_byte_offset() {
        assert_eq!(utf16_column_to_byte_offset("abc", 2), 2);
        // 'é' is 2 bytes, 1 UTF-16 unit
        assert_eq!(utf16_column_to_byte_offset("é$x", 1), 2);
        // '😀' is 4 bytes, 2 UTF-16 units
        assert_eq!(utf16_column_to_byte_offset("😀a", 2), 4);
        assert_eq!(utf16_column_to_byte_offset("ab", 10), 2);
    }

    #[test]
    fn test_line_text_strips_crlf() {
        let text = "one\r\ntwo\r\n";
        assert_eq!(line_text(text, 0), Some("one"));
        assert_eq!(line_text(text, 1), Some("two"));
        assert_eq!(line_text(text, 2), Some(""));
        assert_eq!(line_text(text, 3), None);
    }

    #[test]
    fn test_position_round_trip() {
        let text = "Func A()\r\n\tLocal $é = 1\nEndFunc";
        let offset = text.find('$').unwrap();
        let pos = byte_offset_to_position(text, offset);
        assert_eq!(pos, Position::new(1, 7));
        assert_eq!(position_to_byte_offset(text, pos), offset);
    }

    #[test]
    fn test_position_clamped() {
        let text = "ab\ncd";
        assert_eq!(position_to_byte_offset(text, Position::new(0, 99)), 2);
        assert_eq!(position_to_byte_offset(text, Position::new(9, 0)), text.len());
    }

    #[test]
    fn test_byte_range_to_range() {
        let text = "x\nFunc F()\nEndFunc";
        let start = text.find("Func").unwrap();
        let range = byte_range_to_range(text, &(start..text.len()));
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(2, 7));
    }
}
