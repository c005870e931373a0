//! Error codes, error rendering and the user-facing messages of word expansion.

use crate::wchar::prelude::*;
use unicode_width::UnicodeWidthChar;

/// A `source_start` for errors that cannot point at a location.
pub const SOURCE_LOCATION_UNKNOWN: usize = usize::MAX;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ParseErrorCode {
    #[default]
    none,
    syntax,
    cmdsubst,
    /// Anything else, such as too many results.
    generic,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParseError {
    pub text: WString,
    pub code: ParseErrorCode,
    /// Where in the word the error is, in chars.
    pub source_start: usize,
    pub source_length: usize,
}

pub type ParseErrorList = Vec<ParseError>;

fn display_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

impl ParseError {
    /// The message, then the line of `src` it is about with a caret underneath.
    pub fn describe(&self, src: &wstr) -> WString {
        self.describe_with_prefix(src, L!(""), false)
    }

    /// Like [`ParseError::describe`] with `prefix` in front of the message. With `skip_caret` only
    /// the prefixed message is returned, or nothing when there is no message.
    pub fn describe_with_prefix(&self, src: &wstr, prefix: &wstr, skip_caret: bool) -> WString {
        if skip_caret && self.text.is_empty() {
            return WString::new();
        }
        let mut result = prefix.to_owned() + self.text.as_utfstr();
        if skip_caret || src.is_empty() || self.source_start == SOURCE_LOCATION_UNKNOWN {
            return result;
        }

        let chars = src.as_char_slice();
        // A location past the end points at the last char.
        let (start, len) = if self.source_start < chars.len() {
            let start = self.source_start;
            (start, self.source_length.min(chars.len() - start))
        } else {
            (chars.len() - 1, 0)
        };
        // The line holding the start of the range, or its end if the range spans lines.
        let line_start = chars[..start]
            .iter()
            .rposition(|&c| c == '\n')
            .map_or(0, |nl| nl + 1);
        let last = start + len.saturating_sub(1);
        let line_end = chars[last..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(chars.len(), |nl| last + nl);

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_utfstr(wstr::from_char_slice(&chars[line_start..line_end.max(line_start)]));
        result.push('\n');
        result.push_utfstr(&caret_line(&chars[line_start..start], &chars[start..start + len]));
        result
    }
}

/// Pad past `before`, keeping its tabs so the caret lines up, then mark `range` as `^`, or as
/// `^~~^` when it is at least two columns wide.
fn caret_line(before: &[char], range: &[char]) -> WString {
    let mut line = WString::new();
    for &c in before {
        match c {
            '\t' => line.push('\t'),
            '\n' => line.push(' '),
            _ => line.extend(std::iter::repeat(' ').take(display_width(c))),
        }
    }
    line.push('^');
    let width: usize = range.iter().map(|&c| display_width(c)).sum();
    if range.len() > 1 && width >= 2 {
        line.extend(std::iter::repeat('~').take(width - 2));
        line.push('^');
    }
    line
}

/// Shift errors found in a piece of a larger word so they point into the whole word.
pub fn parse_error_offset_source_start(errors: &mut ParseErrorList, amt: usize) {
    for error in errors
        .iter_mut()
        .filter(|e| e.source_start != SOURCE_LOCATION_UNKNOWN)
    {
        error.source_start += amt;
    }
}

// Messages for `$` followed by something from another shell.
pub const ERROR_NOT_STATUS: &str = "$? is not the exit status. In fish, please use $status.";
pub const ERROR_NOT_PID: &str = "$$ is not the pid. In fish, please use $fish_pid.";
pub const ERROR_NOT_ARGV_COUNT: &str = "$# is not supported. In fish, please use 'count $argv'.";
pub const ERROR_NOT_ARGV_AT: &str = "$@ is not supported. In fish, please use $argv.";
pub const ERROR_NOT_ARGV_STAR: &str = "$* is not supported. In fish, please use $argv.";
pub const ERROR_NO_VAR_NAME: &str = "Expected a variable name after this $.";

pub fn error_bad_var_char(c: char) -> WString {
    WString::from(format!("${c} is not a valid variable in fish."))
}

/// For `${name}`.
pub fn error_bracketed_variable(name: &wstr) -> WString {
    WString::from(format!(
        "Variables cannot be bracketed. In fish, please use {{${name}}}."
    ))
}

/// For `"${name}"`.
pub fn error_bracketed_variable_quoted(name: &wstr) -> WString {
    WString::from(format!(
        "Variables cannot be bracketed. In fish, please use \"${name}\"."
    ))
}
