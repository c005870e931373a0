//! Small operations on wide strings.

use crate::wchar::prelude::*;

pub fn join_strings<S: AsRef<wstr>>(strs: &[S], sep: char) -> WString {
    let mut pieces = strs.iter().map(AsRef::<wstr>::as_ref);
    let mut result = pieces.next().map(ToOwned::to_owned).unwrap_or_default();
    for piece in pieces {
        result.push(sep);
        result.push_utfstr(piece);
    }
    result
}

/// At most `max_len` chars. When something is cut, the last char kept is an ellipsis.
pub fn truncate(input: &wstr, max_len: usize) -> WString {
    let chars = input.as_char_slice();
    if chars.len() <= max_len {
        return input.to_owned();
    }
    let mut output: WString = chars[..max_len.saturating_sub(1)].iter().copied().collect();
    if max_len > 0 {
        output.push('\u{2026}');
    }
    output
}

/// Strip chars in `any_of`, or whitespace by default, from both ends.
pub fn trim(input: WString, any_of: Option<&wstr>) -> WString {
    let strip = any_of.unwrap_or(L!("\t\x0B \r\n"));
    let keep = |c: &char| !strip.contains(*c);
    let chars = input.as_char_slice();
    match (chars.iter().position(keep), chars.iter().rposition(keep)) {
        (Some(first), Some(last)) => chars[first..=last].iter().copied().collect(),
        _ => WString::new(),
    }
}
