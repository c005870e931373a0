//! Quoting and unquoting of shell words, the reserved marker band, and conversion between bytes
//! and wide strings.

use crate::expand::{
    BRACE_BEGIN, BRACE_END, BRACE_SEP, BRACE_SPACE, HOME_DIRECTORY, INTERNAL_SEPARATOR,
    PROCESS_EXPAND_SELF, PROCESS_EXPAND_SELF_STR, VARIABLE_EXPAND, VARIABLE_EXPAND_SINGLE,
};
use crate::future_feature_flags::{feature_test, FeatureFlag};
use crate::wchar::prelude::*;
use crate::wildcard::{ANY_CHAR, ANY_STRING, ANY_STRING_RECURSIVE};
use crate::wutil::fish_iswalnum;
use bitflags::bitflags;

// Markers live in the Unicode non-characters U+FDD0..U+FDEF, which never occur in real input.
// The first sixteen belong to expansion, the rest to wildcards.
const RESERVED_BASE: u32 = 0xFDD0;
const WILDCARD_OFFSET: u32 = 16;
const RESERVED_LEN: u32 = 32;

/// One past the last expansion marker.
pub const EXPAND_RESERVED_END: char = reserved(WILDCARD_OFFSET);

const fn reserved(offset: u32) -> char {
    match char::from_u32(RESERVED_BASE + offset) {
        Some(c) => c,
        None => panic!("reserved offset out of range"),
    }
}

/// The out-of-band characters that unescaping and the expansion stages leave in a word.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Marker {
    /// A leading tilde.
    HomeDirectory = 0,
    /// The whole word was `%self`.
    ProcessExpandSelf = 1,
    /// `$`, one word per value.
    VariableExpand = 2,
    /// `$` inside double quotes, one word in total.
    VariableExpandSingle = 3,
    BraceBegin = 4,
    BraceEnd = 5,
    BraceSep = 6,
    /// Whitespace inside an unquoted brace group.
    BraceSpace = 7,
    /// Where quotes or escapes used to be.
    InternalSeparator = 8,
    /// Left by a variable that expanded to nothing.
    VariableExpandEmpty = 9,
    AnyChar = WILDCARD_OFFSET,
    AnyString = WILDCARD_OFFSET + 1,
    AnyStringRecursive = WILDCARD_OFFSET + 2,
}

impl Marker {
    const ALL: [Marker; 13] = [
        Marker::HomeDirectory,
        Marker::ProcessExpandSelf,
        Marker::VariableExpand,
        Marker::VariableExpandSingle,
        Marker::BraceBegin,
        Marker::BraceEnd,
        Marker::BraceSep,
        Marker::BraceSpace,
        Marker::InternalSeparator,
        Marker::VariableExpandEmpty,
        Marker::AnyChar,
        Marker::AnyString,
        Marker::AnyStringRecursive,
    ];

    pub const fn to_char(self) -> char {
        reserved(self as u32)
    }

    /// The marker `c` stands for, if any. Unassigned code points of the band are not markers.
    pub fn from_char(c: char) -> Option<Marker> {
        if !fish_reserved_codepoint(c) {
            return None;
        }
        Marker::ALL.into_iter().find(|m| m.to_char() == c)
    }

    /// How a glob marker is typed.
    pub fn glob_text(self) -> Option<&'static str> {
        match self {
            Marker::AnyChar => Some("?"),
            Marker::AnyString => Some("*"),
            Marker::AnyStringRecursive => Some("**"),
            _ => None,
        }
    }
}

/// A function which may be used to poll for cancellation.
pub type CancelChecker = Box<dyn Fn() -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStringStyle {
    Script(EscapeFlags),
    /// Only ASCII alphanumerics survive; everything else is `_HH` hex.
    Var,
}

impl Default for EscapeStringStyle {
    fn default() -> Self {
        Self::Script(EscapeFlags::default())
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct EscapeFlags: u32 {
        /// Always use backslashes. The empty string comes out empty instead of as `''`.
        const NO_QUOTED = 1 << 0;
        /// Escape `,` too, for words that end up inside a brace group.
        const COMMA = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnescapeStringStyle {
    Script(UnescapeFlags),
    Var,
}

impl Default for UnescapeStringStyle {
    fn default() -> Self {
        Self::Script(UnescapeFlags::default())
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct UnescapeFlags: u32 {
        /// Turn expansion syntax into markers.
        const SPECIAL = 1 << 0;
        /// Accept a word that ends inside an escape or a quote.
        const INCOMPLETE = 1 << 1;
    }
}

/// Backslash letters shared by both directions.
const NAMED_ESCAPES: [(char, char); 8] = [
    ('a', '\x07'),
    ('b', '\x08'),
    ('e', '\x1B'),
    ('f', '\x0C'),
    ('n', '\n'),
    ('r', '\r'),
    ('t', '\t'),
    ('v', '\x0B'),
];

pub fn escape(s: &wstr) -> WString {
    escape_string(s, EscapeStringStyle::default())
}

pub fn escape_string(s: &wstr, style: EscapeStringStyle) -> WString {
    match style {
        EscapeStringStyle::Script(flags) => escape_script(s, flags),
        EscapeStringStyle::Var => escape_var(s),
    }
}

/// What a word needs in order to be read back unchanged.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Needs {
    Nothing,
    /// Quotes would do.
    Quoting,
    /// Only backslashes will do.
    Backslashes,
}

fn escape_script(input: &wstr, flags: EscapeFlags) -> WString {
    let quotes_allowed = !flags.contains(EscapeFlags::NO_QUOTED);
    if input.is_empty() && quotes_allowed {
        return L!("''").to_owned();
    }
    let mut out = WString::new();
    let mut needs = Needs::Nothing;
    for c in input.chars() {
        needs = needs.max(push_backslashed(&mut out, c, flags));
    }
    if quotes_allowed && needs == Needs::Quoting {
        return quote(input);
    }
    out
}

fn push_backslashed(out: &mut WString, c: char, flags: EscapeFlags) -> Needs {
    if let Some(&(letter, _)) = NAMED_ESCAPES.iter().find(|(_, raw)| *raw == c) {
        out.push('\\');
        out.push(letter);
        return Needs::Backslashes;
    }
    if let Some(glob) = Marker::from_char(c).and_then(Marker::glob_text) {
        out.push_str(glob);
        // A glob must stay outside quotes to stay live.
        return Needs::Backslashes;
    }
    match c {
        '\x01'..='\x1A' => {
            out.push_str("\\c");
            out.push(char::from(b'a' - 1 + c as u8));
        }
        '\0' | '\x1B'..='\x1F' | '\x7F' => out.push_str(&format!("\\x{:02x}", u32::from(c))),
        '?' if feature_test(FeatureFlag::qmark_noglob) => {
            out.push(c);
            return Needs::Nothing;
        }
        ',' if flags.contains(EscapeFlags::COMMA) => {
            out.push_str("\\,");
            return Needs::Quoting;
        }
        '\\' | '\'' | '"' | '&' | '$' | ' ' | '#' | '<' | '>' | '(' | ')' | '[' | ']' | '{'
        | '}' | '?' | '*' | '|' | ';' | '%' | '~' => {
            out.push('\\');
            out.push(c);
            return Needs::Quoting;
        }
        _ => {
            out.push(c);
            return Needs::Nothing;
        }
    }
    // Control characters have no quoted form.
    Needs::Backslashes
}

/// Wrap the word in whichever quote leaves fewer characters to escape inside.
fn quote(input: &wstr) -> WString {
    let count = |wanted: char| input.chars().filter(|&c| c == wanted).count();
    let quote = if count('\'') > count('"') + count('$') {
        '"'
    } else {
        '\''
    };
    let mut out = WString::new();
    out.push(quote);
    for c in input.chars() {
        if c == quote || c == '\\' || (quote == '"' && c == '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quote);
    out
}

fn is_upper_hex_digit(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='F')
}

/// Underscores double, other non-alphanumeric bytes of the UTF-8 form become `_HH`. Right after
/// a hex escape, digits and `A`-`F` are hex encoded as well and other letters get a `_` first.
fn escape_var(input: &wstr) -> WString {
    let mut out = WString::new();
    let mut after_hex = false;
    for byte in wcs2string(input) {
        let c = char::from(byte);
        if byte == b'_' {
            out.push_str("__");
            after_hex = false;
        } else if byte.is_ascii_alphanumeric() && !(after_hex && is_upper_hex_digit(c)) {
            if after_hex {
                out.push('_');
            }
            out.push(c);
            after_hex = false;
        } else {
            out.push_str(&format!("_{byte:02X}"));
            after_hex = true;
        }
    }
    if after_hex {
        out.push('_');
    }
    out
}

fn unescape_var(input: &wstr) -> Option<WString> {
    let chars = input.as_char_slice();
    let mut bytes = Vec::with_capacity(chars.len());
    let mut seen_hex = false;
    let mut i = 0;
    while let Some(&c) = chars.get(i) {
        if !c.is_ascii() {
            return None;
        }
        i += 1;
        if c != '_' {
            bytes.push(c as u8);
            continue;
        }
        match chars.get(i) {
            // A trailing underscore can only close a hex escape.
            None if seen_hex => break,
            None => return None,
            Some('_') => {
                bytes.push(b'_');
                i += 1;
            }
            Some(&high) if is_upper_hex_digit(high) => {
                let low = chars.get(i + 1)?.to_digit(16)?;
                bytes.push((high.to_digit(16)? * 16 + low) as u8);
                i += 2;
                seen_hex = true;
            }
            Some(_) => (),
        }
    }
    Some(str2wcstring(&bytes))
}

/// Escape a string so that it may be inserted into a double-quoted string.
pub fn escape_string_for_double_quotes(input: &wstr) -> WString {
    let mut out = WString::new();
    for c in input.chars() {
        if matches!(c, '\\' | '$' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Returns None when the word holds an invalid escape, or ends early without
/// [`UnescapeFlags::INCOMPLETE`].
pub fn unescape_string(input: &wstr, style: UnescapeStringStyle) -> Option<WString> {
    match style {
        UnescapeStringStyle::Script(flags) => Unescaper::new(input, flags).run(),
        UnescapeStringStyle::Var => unescape_var(input),
    }
}

#[derive(Copy, Clone)]
enum Quoting {
    Bare,
    Single,
    Double,
}

struct Unescaper<'a> {
    input: &'a [char],
    /// Index of the next unread char.
    pos: usize,
    out: WString,
    special: bool,
    incomplete: bool,
    /// Output offsets of the brace groups still open.
    open_braces: Vec<usize>,
    /// Output offsets of `$` and `,`. A group without one after its opening brace is literal.
    expanders: Vec<usize>,
}

impl<'a> Unescaper<'a> {
    fn new(input: &'a wstr, flags: UnescapeFlags) -> Self {
        Unescaper {
            input: input.as_char_slice(),
            pos: 0,
            out: WString::new(),
            special: flags.contains(UnescapeFlags::SPECIAL),
            incomplete: flags.contains(UnescapeFlags::INCOMPLETE),
            open_braces: Vec::new(),
            expanders: Vec::new(),
        }
    }

    fn run(mut self) -> Option<WString> {
        let mut quoting = Quoting::Bare;
        while let Some(&c) = self.input.get(self.pos) {
            self.pos += 1;
            quoting = match quoting {
                Quoting::Bare => self.bare(c)?,
                Quoting::Single => self.single_quoted(c)?,
                Quoting::Double => self.double_quoted(c)?,
            };
        }
        Some(self.out)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn separator(&mut self) {
        if self.special {
            self.out.push(INTERNAL_SEPARATOR);
        }
    }

    fn expander(&mut self, marker: char) {
        self.expanders.push(self.out.len());
        self.out.push(marker);
    }

    fn bare(&mut self, c: char) -> Option<Quoting> {
        let first = self.pos == 1;
        match c {
            '\\' => {
                let used = unescape_backslash(
                    &self.input[self.pos - 1..],
                    &mut self.out,
                    self.incomplete,
                    self.special,
                )?;
                self.pos += used - 1;
            }
            '\'' => {
                self.separator();
                return Some(Quoting::Single);
            }
            '"' => {
                self.separator();
                return Some(Quoting::Double);
            }
            _ if !self.special => self.out.push(c),
            '~' if first => self.out.push(HOME_DIRECTORY),
            '%' if first
                && !feature_test(FeatureFlag::remove_percent_self)
                && self.input == PROCESS_EXPAND_SELF_STR.as_char_slice() =>
            {
                self.out.push(PROCESS_EXPAND_SELF);
                self.pos = self.input.len();
            }
            '*' => {
                if self.out.as_char_slice().last() == Some(&ANY_STRING) {
                    self.out.pop();
                    self.out.push(ANY_STRING_RECURSIVE);
                } else {
                    self.out.push(ANY_STRING);
                }
            }
            '?' if !feature_test(FeatureFlag::qmark_noglob) => self.out.push(ANY_CHAR),
            // `$(` belongs to command substitution, which runs before this.
            '$' if self.peek() != Some('(') => self.expander(VARIABLE_EXPAND),
            '{' => {
                self.open_braces.push(self.out.len());
                self.out.push(BRACE_BEGIN);
            }
            '}' => self.close_brace(),
            ',' if !self.open_braces.is_empty() => self.expander(BRACE_SEP),
            ' ' if !self.open_braces.is_empty() => self.out.push(BRACE_SPACE),
            _ => self.out.push(c),
        }
        Some(Quoting::Bare)
    }

    fn close_brace(&mut self) {
        // Completion hands us partial words, so a stray closer is kept and judged later.
        let Some(open) = self.open_braces.pop() else {
            self.out.push(BRACE_END);
            return;
        };
        let expands = self.expanders.last().is_some_and(|&at| at > open);
        self.expanders.retain(|&at| at < open);
        if expands {
            // An expanding group makes its enclosing group expand too.
            self.expanders.push(open);
            self.out.push(BRACE_END);
            return;
        }
        let chars = self.out.as_char_slice_mut();
        chars[open] = '{';
        for c in &mut chars[open + 1..] {
            if *c == BRACE_SPACE {
                *c = ' ';
            }
        }
        self.out.push('}');
    }

    fn single_quoted(&mut self, c: char) -> Option<Quoting> {
        match c {
            '\'' => {
                self.separator();
                return Some(Quoting::Bare);
            }
            '\\' => match self.peek() {
                Some(next @ ('\\' | '\'')) => {
                    self.pos += 1;
                    self.out.push(next);
                }
                None if !self.incomplete => return None,
                _ => self.out.push('\\'),
            },
            _ => self.out.push(c),
        }
        Some(Quoting::Single)
    }

    fn double_quoted(&mut self, c: char) -> Option<Quoting> {
        match c {
            '"' => {
                self.separator();
                return Some(Quoting::Bare);
            }
            '\\' => match self.peek() {
                Some(next @ ('\\' | '$' | '"')) => {
                    self.pos += 1;
                    self.out.push(next);
                }
                // Line continuation.
                Some('\n') => self.pos += 1,
                None if !self.incomplete => return None,
                _ => self.out.push('\\'),
            },
            '$' if self.special => self.expander(VARIABLE_EXPAND_SINGLE),
            _ => self.out.push(c),
        }
        Some(Quoting::Double)
    }
}

/// Read the escape at the start of `input`, which begins with a backslash, into `out`. Returns
/// the number of chars used.
fn unescape_backslash(
    input: &[char],
    out: &mut WString,
    incomplete: bool,
    special: bool,
) -> Option<usize> {
    let Some(&kind) = input.get(1) else {
        return incomplete.then_some(1);
    };
    let (decoded, used) = match kind {
        'x' | 'X' => return unescape_bytes(input, out),
        '0'..='7' => code_point(&input[1..], 8, 3, 0x7F).map(|(c, len)| (Some(c), 1 + len))?,
        'u' => code_point(&input[2..], 16, 4, 0xFFFF).map(|(c, len)| (Some(c), 2 + len))?,
        'U' => code_point(&input[2..], 16, 8, u32::from(char::MAX))
            .map(|(c, len)| (Some(c), 2 + len))?,
        'c' => {
            let letter = input.get(2).filter(|c| c.is_ascii_alphabetic())?;
            let control = letter.to_ascii_lowercase() as u8 - b'a' + 1;
            (Some(char::from(control)), 3)
        }
        '\n' => (None, 2),
        _ => match NAMED_ESCAPES.iter().find(|(letter, _)| *letter == kind) {
            Some(&(_, raw)) => (Some(raw), 2),
            None => {
                if special {
                    out.push(INTERNAL_SEPARATOR);
                }
                (Some(kind), 2)
            }
        },
    };
    if let Some(c) = decoded {
        if fish_reserved_codepoint(c) {
            return None;
        }
        out.push(c);
    }
    Some(used)
}

/// Up to `max_len` digits in `radix`, no larger than `limit`. Values that are not chars, such as
/// surrogates, become U+FFFD.
fn code_point(digits: &[char], radix: u32, max_len: usize, limit: u32) -> Option<(char, usize)> {
    let (value, len) = read_digits(digits, radix, max_len)?;
    if value > limit {
        return None;
    }
    Some((char::from_u32(value).unwrap_or('\u{FFFD}'), len))
}

fn read_digits(digits: &[char], radix: u32, max_len: usize) -> Option<(u32, usize)> {
    let len = digits
        .iter()
        .take(max_len)
        .take_while(|c| c.is_digit(radix))
        .count();
    if len == 0 {
        return None;
    }
    let value = digits[..len]
        .iter()
        .filter_map(|c| c.to_digit(radix))
        .fold(0, |acc, d| acc * radix + d);
    Some((value, len))
}

/// A run of `\xHH` escapes is one byte sequence, decoded as UTF-8 all at once.
fn unescape_bytes(input: &[char], out: &mut WString) -> Option<usize> {
    let mut bytes = Vec::new();
    let mut used = 0;
    while let Some(['\\', 'x' | 'X']) = input.get(used..used + 2) {
        let (byte, len) = read_digits(&input[used + 2..], 16, 2)?;
        bytes.push(byte as u8);
        used += 2 + len;
    }
    let decoded = str2wcstring(&bytes);
    if decoded.chars().any(fish_reserved_codepoint) {
        return None;
    }
    out.push_utfstr(&decoded);
    Some(used)
}

/// Decode bytes to a wide string. Invalid sequences become U+FFFD.
pub fn str2wcstring(inp: &[u8]) -> WString {
    WString::from_str(&String::from_utf8_lossy(inp))
}

/// Encode a wide string as UTF-8 bytes.
pub fn wcs2string(input: &wstr) -> Vec<u8> {
    input.to_string().into_bytes()
}

/// Whether `c` is in the band reserved for markers.
pub fn fish_reserved_codepoint(c: char) -> bool {
    (RESERVED_BASE..RESERVED_BASE + RESERVED_LEN).contains(&u32::from(c))
}

pub fn valid_var_name_char(chr: char) -> bool {
    fish_iswalnum(chr) || chr == '_'
}

pub fn valid_var_name(s: &wstr) -> bool {
    !s.is_empty() && s.chars().all(valid_var_name_char)
}
