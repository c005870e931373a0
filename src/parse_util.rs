//! Scanning helpers used by expansion: finding command substitutions, turning user globs into
//! wildcard markers, and explaining bad `$` syntax.

use crate::common::valid_var_name;
use crate::expand::{
    BRACE_BEGIN, BRACE_END, BRACE_SEP, INTERNAL_SEPARATOR, VARIABLE_EXPAND, VARIABLE_EXPAND_EMPTY,
    VARIABLE_EXPAND_SINGLE,
};
use crate::future_feature_flags::{feature_test, FeatureFlag};
use crate::parse_constants::{
    error_bad_var_char, error_bracketed_variable, error_bracketed_variable_quoted, ParseError,
    ParseErrorCode, ParseErrorList, ERROR_NOT_ARGV_AT, ERROR_NOT_ARGV_COUNT, ERROR_NOT_ARGV_STAR,
    ERROR_NOT_PID, ERROR_NOT_STATUS, ERROR_NO_VAR_NAME,
};
use crate::tokenizer::{comment_end, is_token_delimiter, quote_end};
use crate::wchar::prelude::*;
use crate::wcstringutil::truncate;
use crate::wildcard::{ANY_CHAR, ANY_STRING, ANY_STRING_RECURSIVE};
use std::ops::Range;

/// Bracketed names in error messages are cut to this many chars.
const BRACKETED_NAME_MAX: usize = 16;

/// A command substitution: the opening paren through the closing one, if there is one.
#[derive(Debug, Eq, PartialEq)]
pub struct Parentheses {
    range: Range<usize>,
    closed: bool,
}

impl Parentheses {
    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The text between the parens.
    pub fn command(&self) -> Range<usize> {
        self.range.start + 1..self.range.end - usize::from(self.closed)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum MaybeParentheses {
    Error,
    None,
    CommandSubstitution(Parentheses),
}

/// State while looking for the first top-level `(`.
struct CmdsubScan<'a> {
    text: &'a wstr,
    depth: i32,
    /// Depths at which a substitution was opened from inside double quotes. Its `)` resumes the
    /// quoted string.
    quoted_at: Vec<i32>,
    last_dollar: Option<usize>,
    open: Option<usize>,
    close: Option<usize>,
    has_dollar: bool,
    /// Whether the outermost substitution sits inside double quotes, once known.
    quoted: Option<bool>,
}

impl<'a> CmdsubScan<'a> {
    fn new(text: &'a wstr) -> Self {
        CmdsubScan {
            text,
            depth: 0,
            quoted_at: Vec::new(),
            last_dollar: None,
            open: None,
            close: None,
            has_dollar: false,
            quoted: None,
        }
    }

    /// Skip the quoted string whose opening quote is at `pos`. It ends at the closing quote, or
    /// at the `$` of a `$(` inside double quotes.
    fn skip_quoted(&mut self, pos: usize, quote: char) -> Option<usize> {
        let end = quote_end(self.text, pos, quote)?;
        let into_cmdsub = self.text.char_at(end) == '$';
        if into_cmdsub {
            self.last_dollar = Some(end);
            self.quoted_at.push(self.depth);
        }
        if self.depth == 0 {
            self.quoted = Some(into_cmdsub);
        }
        Some(end)
    }

    fn run(&mut self, start: usize, starts_quoted: bool) {
        let chars = self.text.as_char_slice();
        let mut pos = start;
        if starts_quoted {
            pos = self.skip_quoted(pos, '"').unwrap_or(chars.len());
        }
        let mut escaped = false;
        let mut token_begin = true;
        while let Some(&c) = chars.get(pos) {
            if escaped {
                escaped = false;
                token_begin = false;
                pos += 1;
                continue;
            }
            match c {
                '\'' | '"' => match self.skip_quoted(pos, c) {
                    Some(end) => pos = end,
                    None => return,
                },
                '\\' => escaped = true,
                '#' if token_begin => pos = comment_end(self.text, pos) - 1,
                '$' => self.last_dollar = Some(pos),
                '(' => {
                    if self.depth == 0 && self.open.is_none() {
                        self.open = Some(pos);
                        self.has_dollar = pos > 0 && self.last_dollar == Some(pos - 1);
                    }
                    self.depth += 1;
                }
                ')' => {
                    self.depth -= 1;
                    if self.depth <= 0 {
                        if self.depth == 0 {
                            self.close = Some(pos);
                        }
                        return;
                    }
                    if self.quoted_at.last() == Some(&self.depth) {
                        self.quoted_at.pop();
                        // Act as if a double quote followed the paren.
                        match self.skip_quoted(pos, '"') {
                            Some(end) => pos = end,
                            None => return,
                        }
                    }
                }
                _ => (),
            }
            token_begin = is_token_delimiter(c, chars.get(pos + 1).copied());
            pos += 1;
        }
    }
}

/// Find the first command substitution at or after `cursor` and move the cursor past it.
///
/// `inout_is_quoted` says whether scanning starts inside double quotes, and on return whether
/// the substitution found is itself quoted. `out_has_dollar` reports the `$(` spelling. With
/// `accept_incomplete`, an unclosed substitution runs to the end of the string instead of being
/// an error.
pub fn parse_util_locate_cmdsubst_range(
    s: &wstr,
    cursor: &mut usize,
    accept_incomplete: bool,
    inout_is_quoted: Option<&mut bool>,
    out_has_dollar: Option<&mut bool>,
) -> MaybeParentheses {
    if *cursor >= s.len() {
        return MaybeParentheses::None;
    }
    let starts_quoted = inout_is_quoted.as_deref().copied().unwrap_or(false);
    let mut scan = CmdsubScan::new(s);
    scan.run(*cursor, starts_quoted);

    if let (Some(quoted), Some(out)) = (scan.quoted, inout_is_quoted) {
        *out = quoted;
    }
    if scan.depth < 0 || (scan.depth > 0 && !accept_incomplete) {
        return MaybeParentheses::Error;
    }
    let Some(open) = scan.open else {
        return MaybeParentheses::None;
    };
    if let Some(out) = out_has_dollar {
        *out = scan.has_dollar;
    }
    let parens = match scan.close {
        Some(close) if scan.depth == 0 => Parentheses {
            range: open..close + 1,
            closed: true,
        },
        _ => Parentheses {
            range: open..s.len(),
            closed: false,
        },
    };
    *cursor = parens.end();
    MaybeParentheses::CommandSubstitution(parens)
}

/// Turn `*` and `?` into wildcard markers. A backslash keeps the next wildcard literal. `?` is
/// literal anyway under qmark-noglob.
pub fn parse_util_unescape_wildcards(s: &wstr) -> WString {
    let qmark_globs = !feature_test(FeatureFlag::qmark_noglob);
    let mut out = WString::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('*', _) => out.push(ANY_STRING),
            ('?', _) if qmark_globs => out.push(ANY_CHAR),
            ('\\', Some('*')) => {
                out.push('*');
                chars.next();
            }
            ('\\', Some('?')) if qmark_globs => {
                out.push('?');
                chars.next();
            }
            ('\\', Some('\\')) => {
                out.push_str("\\\\");
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Message for `$` followed by `c`, pointing users of other shells to the fish spelling.
fn error_for_character(c: char) -> WString {
    let text = match c {
        '?' => ERROR_NOT_STATUS,
        '#' => ERROR_NOT_ARGV_COUNT,
        '@' => ERROR_NOT_ARGV_AT,
        '*' | ANY_STRING | ANY_STRING_RECURSIVE => ERROR_NOT_ARGV_STAR,
        ANY_CHAR => ERROR_NOT_STATUS,
        '$' | VARIABLE_EXPAND | VARIABLE_EXPAND_SINGLE | VARIABLE_EXPAND_EMPTY => ERROR_NOT_PID,
        '}' | ',' | BRACE_END | BRACE_SEP => ERROR_NO_VAR_NAME,
        _ => return error_bad_var_char(c),
    };
    WString::from_str(text)
}

/// Message for `${name}`. Falls back to a bad-char error when no valid name is closed.
fn bracketed_variable_error(token: &[char], name_start: usize, opener: char, quoted: bool) -> WString {
    let closer = if opener == '{' { '}' } else { BRACE_END };
    let name = token
        .get(name_start..)
        .and_then(|rest| rest.iter().position(|&c| c == closer).map(|len| &rest[..len]))
        .map(wstr::from_char_slice)
        .filter(|name| valid_var_name(name));
    match name {
        Some(name) if quoted => error_bracketed_variable_quoted(&truncate(name, BRACKETED_NAME_MAX)),
        Some(name) => error_bracketed_variable(&truncate(name, BRACKETED_NAME_MAX)),
        None => error_bad_var_char('{'),
    }
}

/// Report the bad variable expansion whose `$` (usually a marker char) is at `dollar_pos` in
/// `token`. `global_token_pos` is where the token starts in the whole source.
pub fn parse_util_expand_variable_error(
    token: &wstr,
    global_token_pos: usize,
    dollar_pos: usize,
    errors: &mut ParseErrorList,
) {
    let chars = token.as_char_slice();
    let quoted = chars.get(dollar_pos) == Some(&VARIABLE_EXPAND_SINGLE);
    let dollar_at = global_token_pos + dollar_pos;
    let next = chars.get(dollar_pos + 1).copied().unwrap_or('\0');
    let (source_start, text) = match next {
        BRACE_BEGIN | '{' => (
            dollar_at + 1,
            bracketed_variable_error(chars, dollar_pos + 2, next, quoted),
        ),
        // A lone `$`, e.g. echo foo"$"baz.
        INTERNAL_SEPARATOR | '\0' => (dollar_at, WString::from_str(ERROR_NO_VAR_NAME)),
        c => (dollar_at + 1, error_for_character(c)),
    };
    errors.push(ParseError {
        text,
        code: ParseErrorCode::syntax,
        source_start,
        source_length: 1,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future_feature_flags::scoped_test;

    fn locate(s: &wstr, accept_incomplete: bool) -> MaybeParentheses {
        let mut cursor = 0;
        parse_util_locate_cmdsubst_range(s, &mut cursor, accept_incomplete, None, None)
    }

    #[test]
    fn test_locate_cmdsubst() {
        let s = L!("echo (foo (bar)) baz");
        let mut cursor = 0;
        let mut has_dollar = false;
        let MaybeParentheses::CommandSubstitution(parens) =
            parse_util_locate_cmdsubst_range(s, &mut cursor, false, None, Some(&mut has_dollar))
        else {
            panic!("expected a command substitution");
        };
        assert_eq!(parens.start(), 5);
        assert_eq!(parens.end(), 16);
        assert!(parens.is_closed());
        assert_eq!(&s[parens.command()], "foo (bar)");
        assert_eq!(cursor, 16);
        assert!(!has_dollar);
        assert_eq!(
            parse_util_locate_cmdsubst_range(s, &mut cursor, false, None, None),
            MaybeParentheses::None
        );
    }

    #[test]
    fn test_locate_cmdsubst_quoted_and_errors() {
        let s = L!("a\"$(echo)\"");
        let mut cursor = 0;
        let mut is_quoted = false;
        let mut has_dollar = false;
        let ret = parse_util_locate_cmdsubst_range(
            s,
            &mut cursor,
            false,
            Some(&mut is_quoted),
            Some(&mut has_dollar),
        );
        assert!(matches!(ret, MaybeParentheses::CommandSubstitution(_)));
        assert!(is_quoted);
        assert!(has_dollar);

        for bad in [L!("a(b"), L!("a)b"), L!("a((b)")] {
            assert_eq!(locate(bad, false), MaybeParentheses::Error, "{}", bad);
        }
        // Parens inside quotes, escapes and comments do not count.
        for plain in [L!("'(a'"), L!("a\\(b"), L!("a #(b")] {
            assert_eq!(locate(plain, false), MaybeParentheses::None, "{}", plain);
        }

        let MaybeParentheses::CommandSubstitution(parens) = locate(L!("x(ab"), true) else {
            panic!("expected an incomplete command substitution");
        };
        assert_eq!(parens.command(), 2..4);
        assert!(!parens.is_closed());
    }

    #[test]
    fn test_locate_cmdsubst_resumes_quotes() {
        // The `)` of a quoted substitution reopens the string, so the `(` in the quoted tail is
        // plain text and the outer substitution closes at the last paren.
        let s = L!("(echo \"$(a)(b\")");
        let MaybeParentheses::CommandSubstitution(parens) = locate(s, false) else {
            panic!("expected a command substitution");
        };
        assert_eq!(parens.end(), s.len());

        // A hash inside a word is not a comment.
        let MaybeParentheses::CommandSubstitution(parens) = locate(L!("a#(b)"), false) else {
            panic!("expected a command substitution");
        };
        assert_eq!(parens.start(), 2);
    }

    #[test]
    fn test_wildcard_escapes() {
        scoped_test(FeatureFlag::qmark_noglob, false, || {
            let unesc = parse_util_unescape_wildcards(L!("a*b?c\\*d\\\\e"));
            let expected: WString = ['a', ANY_STRING, 'b', ANY_CHAR, 'c', '*', 'd', '\\', '\\', 'e']
                .into_iter()
                .collect();
            assert_eq!(unesc, expected);
            assert_eq!(parse_util_unescape_wildcards(L!("\\?")), "?");
        });
        scoped_test(FeatureFlag::qmark_noglob, true, || {
            assert_eq!(parse_util_unescape_wildcards(L!("a?")), "a?");
            assert_eq!(parse_util_unescape_wildcards(L!("\\?")), "\\?");
        });
    }

    #[test]
    fn test_expand_variable_error() {
        fn error_text(token: WString) -> WString {
            let mut errors = ParseErrorList::new();
            parse_util_expand_variable_error(&token, 10, 0, &mut errors);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].code, ParseErrorCode::syntax);
            errors.remove(0).text
        }
        let dollar = |rest: &str| -> WString {
            let mut s = WString::new();
            s.push(VARIABLE_EXPAND);
            s.push_str(rest);
            s
        };
        assert_eq!(error_text(dollar("?")), ERROR_NOT_STATUS);
        assert_eq!(error_text(dollar("#")), ERROR_NOT_ARGV_COUNT);
        assert_eq!(error_text(dollar("@")), ERROR_NOT_ARGV_AT);
        assert_eq!(error_text(dollar("$")), ERROR_NOT_PID);
        assert_eq!(error_text(dollar("")), ERROR_NO_VAR_NAME);
        assert_eq!(error_text(dollar("%")), "$% is not a valid variable in fish.");
        assert_eq!(
            error_text(dollar("{foo}")),
            "Variables cannot be bracketed. In fish, please use {$foo}."
        );
        let mut quoted = WString::new();
        quoted.push(VARIABLE_EXPAND_SINGLE);
        quoted.push_str("{foo}");
        assert_eq!(
            error_text(quoted),
            "Variables cannot be bracketed. In fish, please use \"$foo\"."
        );
        assert_eq!(error_text(dollar("{-}")), "${ is not a valid variable in fish.");
        let mut star = dollar("");
        star.push(ANY_STRING);
        assert_eq!(error_text(star), ERROR_NOT_ARGV_STAR);
    }
}
