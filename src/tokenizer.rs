//! Character-level scanning helpers shared by the command substitution locator and slices.

use crate::wchar::prelude::*;

/// Given a string and the offset of an opening quote, return the offset of the matching close
/// quote, or None if the quote is unterminated.
pub fn quote_end(s: &wstr, mut pos: usize, quote: char) -> Option<usize> {
    let chars = s.as_char_slice();
    loop {
        pos += 1;

        let c = *chars.get(pos)?;
        if c == '\\' {
            pos += 1;
        } else if c == quote ||
                // Command substitutions also end a double quoted string.  This is how we
                // support command substitutions inside double quotes.
                (quote == '"' && c == '$' && chars.get(pos + 1) == Some(&'('))
        {
            return Some(pos);
        }
    }
}

/// Given the offset of a '#', return the offset of the newline ending the comment or the end of
/// the string.
pub fn comment_end(s: &wstr, mut pos: usize) -> usize {
    loop {
        pos += 1;
        if pos >= s.len() || s.char_at(pos) == '\n' {
            return pos;
        }
    }
}

/// Tests if this character can be a part of a string. Hash (#) starts a comment if it's the first
/// character in a token; otherwise it is considered a string character.
pub fn tok_is_string_character(c: char, _next: Option<char>) -> bool {
    // Unconditional separators.
    !matches!(
        c,
        '\0' | ' ' | '\n' | '|' | '\t' | ';' | '\r' | '<' | '>' | '&'
    )
}

/// Whether a token boundary follows `c`, so that a '#' after it starts a comment.
pub fn is_token_delimiter(c: char, next: Option<char>) -> bool {
    c == '(' || !tok_is_string_character(c, next)
}
