//! Word expansion. A token is expanded in five passes, each fed the output of the previous one:
//! command substitution, variables, braces, home directories and `%self`, and wildcards.
//!
//! Quoting and escapes are resolved at the start of the variable pass. From then on the special
//! characters that survived unquoted are represented by the marker chars below, which sit in a
//! private use range no user text can produce.

use crate::common::{
    escape, escape_string, escape_string_for_double_quotes, str2wcstring, unescape_string,
    valid_var_name_char, EscapeFlags, EscapeStringStyle, Marker, UnescapeFlags,
    UnescapeStringStyle, EXPAND_RESERVED_END,
};
use crate::complete::{CompleteFlags, Completion, CompletionList, CompletionReceiver};
use crate::env::{EnvVar, Environment};
use crate::flog::{FLOG, FLOGF};
use crate::future_feature_flags::{feature_test, FeatureFlag};
use crate::history::HistorySource;
use crate::operation_context::OperationContext;
use crate::parse_constants::{ParseError, ParseErrorCode, ParseErrorList, SOURCE_LOCATION_UNKNOWN};
use crate::parse_util::{
    parse_util_expand_variable_error, parse_util_locate_cmdsubst_range, MaybeParentheses,
    Parentheses,
};
use crate::path::path_apply_working_directory;
use crate::subshell::SubshellError;
use crate::util::wcsfilecmp_glob;
use crate::wchar::prelude::*;
use crate::wcstringutil::join_strings;
use crate::wildcard::{wildcard_expand_string, wildcard_has_internal};
use crate::wildcard::{WildcardResult, ANY_CHAR, ANY_STRING, ANY_STRING_RECURSIVE};
use crate::wutil::{normalize_path, wcstoi_partial, Options};
use bitflags::bitflags;
use std::os::unix::ffi::OsStrExt;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct ExpandFlags : u16 {
        /// Treat any command substitution as an error instead of running it.
        const SKIP_CMDSUBST = 1 << 0;
        /// Leave `$name` as typed.
        const SKIP_VARIABLES = 1 << 1;
        /// Leave `*` and `?` as typed.
        const SKIP_WILDCARDS = 1 << 2;
        /// Expanding a partial token for completion. Wildcard results may then be suffixes of
        /// what was typed rather than whole paths.
        const FOR_COMPLETIONS = 1 << 3;
        const EXECUTABLES_ONLY = 1 << 4;
        const DIRECTORIES_ONLY = 1 << 5;
        const NO_DESCRIPTIONS = 1 << 6;
        /// Keep `~` literal, and do not put it back on completions either.
        const SKIP_HOME_DIRECTORIES = 1 << 7;
        /// Accepted for compatibility. There is no job expansion to skip.
        const SKIP_JOBS = 1 << 8;
        /// Let `*` and `?` match the leading dot of hidden files.
        const ALLOW_NONLITERAL_LEADING_DOT = 1 << 9;
        /// Resolve relative paths against CDPATH, and keep `..` logical.
        const SPECIAL_FOR_CD = 1 << 10;
        /// Resolve bare names against PATH.
        const SPECIAL_FOR_COMMAND = 1 << 11;
    }
}

/// An unquoted `~` at the start of a token.
pub const HOME_DIRECTORY: char = Marker::HomeDirectory.to_char();
/// An unquoted `%self` at the start of a token.
pub const PROCESS_EXPAND_SELF: char = Marker::ProcessExpandSelf.to_char();
/// An unquoted `$`.
pub const VARIABLE_EXPAND: char = Marker::VariableExpand.to_char();
/// A `$` inside double quotes. Its values are joined into one word.
pub const VARIABLE_EXPAND_SINGLE: char = Marker::VariableExpandSingle.to_char();
pub const BRACE_BEGIN: char = Marker::BraceBegin.to_char();
pub const BRACE_END: char = Marker::BraceEnd.to_char();
pub const BRACE_SEP: char = Marker::BraceSep.to_char();
/// Unquoted whitespace inside braces.
pub const BRACE_SPACE: char = Marker::BraceSpace.to_char();
/// Keeps pieces of a token apart until the wildcard pass, e.g. a variable's value and the text
/// after it.
pub const INTERNAL_SEPARATOR: char = Marker::InternalSeparator.to_char();
/// Stands for an empty value directly after another variable marker, so that `$$x` with an
/// empty `$x` still has a name to look up.
pub const VARIABLE_EXPAND_EMPTY: char = Marker::VariableExpandEmpty.to_char();

const _: () = assert!(
    EXPAND_RESERVED_END as u32 > VARIABLE_EXPAND_EMPTY as u32,
    "expansion markers overflow their reserved range"
);

pub const PROCESS_EXPAND_SELF_STR: &wstr = L!("%self");

/// `$status` after a failed expansion.
pub const STATUS_EXPAND_ERROR: i32 = 121;

/// `$status` after a command substitution whose output was too large to keep.
pub const STATUS_READ_TOO_MUCH: i32 = 122;

/// How deeply brace groups may nest inside each other.
pub const EXPAND_MAX_DEPTH: usize = 512;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExpandResultCode {
    /// Bad syntax, or a command substitution that failed.
    error,
    /// More results than the context's expansion limit.
    overflow,
    cancel,
    ok,
    /// A wildcard matched at least one file.
    wildcard_match,
    /// Every wildcard matched nothing, so there is no output.
    wildcard_no_match,
}

#[must_use]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExpandResult {
    pub result: ExpandResultCode,
    /// What `$status` should become. Zero unless the expansion failed.
    pub status: i32,
}

impl ExpandResult {
    pub fn new(result: ExpandResultCode) -> Self {
        ExpandResult { result, status: 0 }
    }

    pub fn ok() -> Self {
        ExpandResult::new(ExpandResultCode::ok)
    }

    pub fn make_error(status: i32) -> Self {
        debug_assert!(status != 0, "an error needs a non-zero status");
        ExpandResult {
            result: ExpandResultCode::error,
            status,
        }
    }

    /// Whether expansion produced usable output. A wildcard that matched nothing still counts.
    pub fn is_success(&self) -> bool {
        matches!(
            self.result,
            ExpandResultCode::ok
                | ExpandResultCode::wildcard_match
                | ExpandResultCode::wildcard_no_match
        )
    }
}

impl PartialEq<ExpandResultCode> for ExpandResult {
    fn eq(&self, other: &ExpandResultCode) -> bool {
        self.result == *other
    }
}

/// Why a pass stopped. Any message has already gone to the error sink.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ExpandError {
    /// Carries the status to report.
    Error(i32),
    Overflow,
    Cancel,
}

impl ExpandError {
    fn syntax() -> Self {
        ExpandError::Error(STATUS_EXPAND_ERROR)
    }
}

impl From<ExpandError> for ExpandResult {
    fn from(err: ExpandError) -> Self {
        match err {
            ExpandError::Error(status) => ExpandResult::make_error(status),
            ExpandError::Overflow => ExpandResult {
                result: ExpandResultCode::overflow,
                status: STATUS_EXPAND_ERROR,
            },
            ExpandError::Cancel => ExpandResult::new(ExpandResultCode::cancel),
        }
    }
}

type StageResult = Result<ExpandResultCode, ExpandError>;

/// Where expansion reports errors. With no list attached, reports are dropped.
struct ErrorSink<'a>(Option<&'a mut ParseErrorList>);

impl ErrorSink<'_> {
    fn push(&mut self, code: ParseErrorCode, source_start: usize, source_length: usize, text: &str) {
        if let Some(list) = self.0.as_deref_mut() {
            list.push(ParseError {
                text: WString::from_str(text),
                code,
                source_start,
                source_length,
            });
        }
    }

    fn syntax(&mut self, pos: usize, text: &str) -> ExpandError {
        self.push(ParseErrorCode::syntax, pos, 0, text);
        ExpandError::syntax()
    }

    /// Substitutions are expanded recursively, so one failure can be seen several times. Each
    /// message is recorded once.
    fn cmdsubst(&mut self, parens: &Parentheses, text: &str, status: i32) -> ExpandError {
        let seen = self
            .0
            .as_deref()
            .is_some_and(|list| list.iter().any(|e| e.text == text));
        if !seen {
            let length = parens.end() - parens.start();
            self.push(ParseErrorCode::cmdsubst, parens.start(), length, text);
        }
        ExpandError::Error(status)
    }

    fn overflow(&mut self) -> ExpandError {
        FLOG!(expand, "Expansion produced too many results");
        self.push(
            ParseErrorCode::generic,
            SOURCE_LOCATION_UNKNOWN,
            0,
            "Expansion produced too many results",
        );
        ExpandError::Overflow
    }

    /// A `$` at `dollar_pos` in `token` that is not followed by a usable name.
    fn bad_variable(&mut self, token: &wstr, dollar_pos: usize) -> ExpandError {
        FLOGF!(expand, "Missing variable name in '{}'", token);
        if let Some(list) = self.0.as_deref_mut() {
            parse_util_expand_variable_error(token, 0, dollar_pos, list);
        }
        ExpandError::syntax()
    }
}

fn add_result(
    out: &mut CompletionReceiver,
    item: impl Into<Completion>,
    errors: &mut ErrorSink,
) -> Result<(), ExpandError> {
    match out.add(item) {
        true => Ok(()),
        false => Err(errors.overflow()),
    }
}

/// Expand `input`, appending the results to `out_completions`. On failure, nothing is appended.
///
/// `wildcard_match` and `wildcard_no_match` are successful results that tell whether the
/// token's wildcards found anything.
pub fn expand_string(
    input: WString,
    out_completions: &mut CompletionList,
    flags: ExpandFlags,
    ctx: &OperationContext,
    errors: Option<&mut ParseErrorList>,
) -> ExpandResult {
    let mut recv =
        CompletionReceiver::from_list(std::mem::take(out_completions), ctx.expansion_limit);
    let result = expand_to_receiver(input, &mut recv, flags, ctx, errors);
    *out_completions = recv.take();
    result
}

/// Like [`expand_string`], collecting into a receiver whose limit also bounds this expansion.
pub fn expand_to_receiver(
    input: WString,
    out_completions: &mut CompletionReceiver,
    flags: ExpandFlags,
    ctx: &OperationContext,
    errors: Option<&mut ParseErrorList>,
) -> ExpandResult {
    let mut expander = Expander {
        ctx,
        flags,
        errors: ErrorSink(errors),
    };
    expander.expand(input, out_completions)
}

/// Expand `s` in place, requiring exactly one result. Used for command names. On failure `s` is
/// left alone.
pub fn expand_one(
    s: &mut WString,
    flags: ExpandFlags,
    ctx: &OperationContext,
    errors: Option<&mut ParseErrorList>,
) -> bool {
    if !flags.contains(ExpandFlags::FOR_COMPLETIONS) && expand_is_clean(s) {
        return true;
    }

    let mut completions = CompletionList::new();
    let flags = flags | ExpandFlags::NO_DESCRIPTIONS;
    let res = expand_string(s.clone(), &mut completions, flags, ctx, errors);
    match completions.pop() {
        Some(only) if res.is_success() && completions.is_empty() => {
            *s = only.completion;
            true
        }
        _ => false,
    }
}

/// Expand a command word such as `$EDITOR`, whose value may carry arguments. The first result
/// becomes the command and the rest are appended to `out_args`. Expanding to nothing leaves the
/// command empty. Command substitutions are refused.
pub fn expand_to_command_and_args(
    instr: &wstr,
    ctx: &OperationContext<'_>,
    out_cmd: &mut WString,
    out_args: Option<&mut Vec<WString>>,
    errors: Option<&mut ParseErrorList>,
) -> ExpandResult {
    if expand_is_clean(instr) {
        *out_cmd = instr.to_owned();
        return ExpandResult::ok();
    }

    let flags = ExpandFlags::SKIP_CMDSUBST | ExpandFlags::NO_DESCRIPTIONS | ExpandFlags::SKIP_JOBS;
    let mut completions = CompletionList::new();
    let res = expand_string(instr.to_owned(), &mut completions, flags, ctx, errors);
    if !matches!(
        res.result,
        ExpandResultCode::ok | ExpandResultCode::wildcard_match
    ) {
        return res;
    }

    let mut words = completions.into_iter().map(|comp| comp.completion);
    if let Some(cmd) = words.next() {
        *out_cmd = cmd;
    }
    if let Some(out_args) = out_args {
        out_args.extend(words);
    }
    res
}

fn push_for_display(value: &wstr, want_quotes: bool, buff: &mut WString) {
    if want_quotes && is_quotable(value) {
        buff.push('\'');
        buff.push_utfstr(value);
        buff.push('\'');
    } else {
        buff.push_utfstr(&escape(value));
    }
}

/// Render a variable's values for display, separated by two spaces. Values are single-quoted
/// when there are several or they hold a space, if quoting can represent them.
pub fn expand_escape_variable(var: &EnvVar) -> WString {
    let values = var.as_list();
    let mut buff = WString::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            buff.push_str("  ");
        }
        push_for_display(value, values.len() > 1 || value.contains(' '), &mut buff);
    }
    buff
}

/// Render one string for display, the way [`expand_escape_variable`] renders a single value.
pub fn expand_escape_string(el: &wstr) -> WString {
    let mut buff = WString::new();
    push_for_display(el, el.contains(' '), &mut buff);
    buff
}

/// Whether `s` can be shown in single quotes as-is.
pub fn is_quotable(s: &wstr) -> bool {
    !s.chars()
        .any(|c| matches!(c, '\n' | '\t' | '\r' | '\x08' | '\x1B'))
}

/// Replace a leading literal `~` or `~user` with that home directory. Nothing else is expanded.
pub fn expand_tilde(input: &mut WString, vars: &dyn Environment) {
    if input.starts_with('~') {
        input.as_char_slice_mut()[0] = HOME_DIRECTORY;
        expand_home_directory(input, vars);
    }
}

/// Write an absolute path under `$HOME` as `~/...`. Other strings come back unchanged.
pub fn replace_home_directory_with_tilde(s: &wstr, vars: &dyn Environment) -> WString {
    if !s.starts_with('/') {
        return s.to_owned();
    }
    let mut home = L!("~").to_owned();
    expand_tilde(&mut home, vars);
    if home.is_empty() {
        return s.to_owned();
    }
    if !home.ends_with('/') {
        home.push('/');
    }
    match s.strip_prefix(&home) {
        Some(rest) => L!("~/").to_owned() + rest,
        None => s.to_owned(),
    }
}

/// If `cmds` is exactly `exec "$@"`, as some display managers run login shells, rewrite it to
/// exec the given arguments directly, each one single-quoted. `args` is the full argument vector,
/// including the program name. Return whether the command was rewritten.
pub fn rewrite_login_exec_command(cmds: &mut Vec<String>, args: &[String]) -> bool {
    if cmds.len() != 1 {
        return false;
    }
    let cmd = &cmds[0];
    if cmd != "exec \"${@}\"" && cmd != "exec \"$@\"" {
        return false;
    }

    let mut new_cmd = String::from("exec");
    for arg in args.iter().skip(1) {
        new_cmd.push_str(" '");
        for c in arg.chars() {
            if c == '\\' || c == '\'' {
                new_cmd.push('\\');
            }
            new_cmd.push(c);
        }
        new_cmd.push('\'');
    }
    cmds[0] = new_cmd;
    true
}

/// Whether `input` expands to exactly itself, so that all passes can be skipped.
fn expand_is_clean(input: &wstr) -> bool {
    match input.as_char_slice() {
        [] => true,
        ['~' | '%', ..] => false,
        chars => !chars.iter().any(|&c| "$*?\\\"'({})".contains(c)),
    }
}

/// A malformed `[...]` slice. Positions are relative to the `[`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SliceError {
    ZeroIndex(usize),
    BadIndex(usize),
}

impl SliceError {
    fn pos(self) -> usize {
        match self {
            SliceError::ZeroIndex(pos) | SliceError::BadIndex(pos) => pos,
        }
    }

    /// Report this error for a slice starting at `base` in the token.
    fn report(self, base: usize, errors: &mut ErrorSink) -> ExpandError {
        let text = match self {
            SliceError::ZeroIndex(_) => "array indices start at 1, not 0.",
            SliceError::BadIndex(_) => "Invalid index value",
        };
        errors.syntax(base + self.pos(), text)
    }
}

/// Parse the slice at the start of `input`, which begins with `[`, for a list of `size` values.
/// Return the one-based indexes it selects, in order, and the length of the slice text.
///
/// Negative indexes count from the end. A range keeps only the part that lies inside the list,
/// so `[1..9]` of three values selects three. Single indexes out of range are kept; whoever reads
/// the values skips them.
fn parse_slice(input: &wstr, size: usize) -> Result<(Vec<usize>, usize), SliceError> {
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    let chars = input.as_char_slice();
    let at = |pos: usize| chars.get(pos).copied().unwrap_or('\0');
    let at_range = |pos: usize| at(pos) == '.' && at(pos + 1) == '.';
    let skip = |pos: &mut usize, pred: fn(char) -> bool| {
        while pred(at(*pos)) {
            *pos += 1;
        }
    };
    let from_end = |n: i64| if n < 0 { size + n + 1 } else { n };
    let number = |pos: &mut usize| {
        let mut consumed = 0;
        match wcstoi_partial::<i64>(&input[*pos..], Options::default(), &mut consumed) {
            // `[0]` is refused even where it would select nothing anyway.
            Ok(0) => Err(SliceError::ZeroIndex(*pos)),
            Ok(n) => {
                *pos += consumed;
                skip(pos, char::is_whitespace);
                Ok(n)
            }
            Err(_) => Err(SliceError::BadIndex(*pos)),
        }
    };

    let mut selected: Vec<i64> = vec![];
    let mut pos = 1;
    loop {
        skip(&mut pos, |c| c.is_whitespace() || c == INTERNAL_SEPARATOR);
        if at(pos) == ']' {
            break;
        }
        if pos >= chars.len() {
            return Err(SliceError::BadIndex(pos));
        }

        // `[..n]` starts at the first value.
        let first = if selected.is_empty() && at_range(pos) {
            1
        } else {
            number(&mut pos)?
        };
        skip(&mut pos, |c| c == INTERNAL_SEPARATOR);
        if !at_range(pos) {
            selected.push(from_end(first));
            continue;
        }

        pos += 2;
        skip(&mut pos, |c| c == INTERNAL_SEPARATOR);
        skip(&mut pos, char::is_whitespace);
        // `[n..]` ends at the last value.
        let last = if at(pos) == ']' { -1 } else { number(&mut pos)? };
        let (lo, hi) = (from_end(first), from_end(last));
        // When exactly one end counts from the back, that end decides the direction, so that
        // `[2..-1]` never runs backwards on a short list.
        let forward = if (first < 0) != (last < 0) {
            last < 0
        } else {
            lo <= hi
        };
        let (a, b) = if forward { (lo, hi) } else { (hi, lo) };
        let inside = a.max(1)..=b.min(size);
        if forward {
            selected.extend(inside);
        } else {
            selected.extend(inside.rev());
        }
    }

    let indexes = selected
        .into_iter()
        .filter_map(|i| usize::try_from(i).ok())
        .filter(|&i| i > 0)
        .collect();
    Ok((indexes, pos + 1))
}

/// Where the values of an expanded variable come from.
enum VarSource<'a> {
    Var(EnvVar),
    History(&'a dyn HistorySource),
}

impl VarSource<'_> {
    fn count(&self) -> usize {
        match self {
            VarSource::Var(var) => var.as_list().len(),
            VarSource::History(history) => history.size(),
        }
    }

    /// History is always joined with a space.
    fn delimiter(&self) -> char {
        match self {
            VarSource::Var(var) => var.get_delimiter(),
            VarSource::History(_) => ' ',
        }
    }

    /// Every value, or those at the given one-based indexes. Indexes past the end are skipped.
    fn values(&self, indexes: Option<&[usize]>) -> Vec<WString> {
        match (self, indexes) {
            (VarSource::Var(var), None) => var.as_list().to_vec(),
            (VarSource::Var(var), Some(indexes)) => indexes
                .iter()
                .filter_map(|&i| var.as_list().get(i - 1).cloned())
                .collect(),
            (VarSource::History(history), None) => history.get_history(),
            (VarSource::History(history), Some(indexes)) => {
                let items = history.items_at_indexes(indexes);
                indexes
                    .iter()
                    .filter_map(|i| items.get(i).cloned())
                    .collect()
            }
        }
    }
}

/// `$history` always reads the history source, even if a variable has that name.
fn lookup_variable<'c>(ctx: &'c OperationContext, name: &wstr) -> Option<VarSource<'c>> {
    if name == "history" {
        return ctx.history().map(VarSource::History);
    }
    if name.as_char_slice() == [VARIABLE_EXPAND_EMPTY] {
        return None;
    }
    ctx.vars().get(name).map(VarSource::Var)
}

/// The end of the variable name starting at `pos`. An empty-value marker is a name by itself.
fn variable_name_end(chars: &[char], pos: usize) -> usize {
    match chars.get(pos) {
        Some(&VARIABLE_EXPAND_EMPTY) => pos + 1,
        _ => {
            let len = chars[pos..]
                .iter()
                .take_while(|&&c| valid_var_name_char(c))
                .count();
            pos + len
        }
    }
}

/// Replace the variable reference at `instr[start..end]` with `value`.
///
/// Directly after a marker of the same kind, the value becomes that marker's name, so an empty
/// value is made visible. After anything else a separator keeps the value from running into the
/// text before it, when `separate` asks for one.
fn splice_value(
    instr: &wstr,
    start: usize,
    end: usize,
    value: &wstr,
    value_is_empty: bool,
    separate: bool,
) -> WString {
    let marker = instr.char_at(start);
    let prefix = &instr[..start];
    let mut result = prefix.to_owned();
    match prefix.as_char_slice().last() {
        Some(&c) if c == marker && value_is_empty => result.push(VARIABLE_EXPAND_EMPTY),
        Some(&c) if c != marker && separate => result.push(INTERNAL_SEPARATOR),
        _ => (),
    }
    result.push_utfstr(value);
    result.push_utfstr(&instr[end..]);
    result
}

/// Expand the variable references in `instr` that start before `before`, last one first.
///
/// Working from the back means that a value is never scanned for references of its own, while
/// `$$name` still works: once `$name` is replaced, the outer `$` reads the value as its name.
/// An unquoted multi-valued variable makes one word per value, and several such variables
/// multiply; the earlier reference varies fastest.
fn expand_variables(
    instr: WString,
    before: usize,
    ctx: &OperationContext,
    out: &mut CompletionReceiver,
    errors: &mut ErrorSink,
) -> Result<(), ExpandError> {
    let chars = instr.as_char_slice();
    let Some(start) = chars[..before.min(chars.len())]
        .iter()
        .rposition(|&c| c == VARIABLE_EXPAND || c == VARIABLE_EXPAND_SINGLE)
    else {
        return add_result(out, instr, errors);
    };
    let quoted = chars[start] == VARIABLE_EXPAND_SINGLE;
    let name_end = variable_name_end(chars, start + 1);
    if name_end == start + 1 {
        return Err(errors.bad_variable(&instr, start));
    }
    let source = lookup_variable(ctx, &instr[start + 1..name_end]);

    let mut end = name_end;
    let mut indexes = None;
    if instr.char_at(end) == '[' {
        // A missing variable slices like a single value, so `$var[1]` is always valid.
        let size = source.as_ref().map_or(1, VarSource::count);
        let (selected, len) =
            parse_slice(&instr[end..], size).map_err(|err| err.report(end, errors))?;
        end += len;
        indexes = Some(selected);
    }

    let Some(source) = source else {
        // Unquoted, a missing variable takes its whole word with it. Quoted, it is empty.
        if !quoted {
            return Ok(());
        }
        let rebuilt = splice_value(&instr, start, end, L!(""), true, false);
        return expand_variables(rebuilt, start, ctx, out, errors);
    };

    let values = source.values(indexes.as_deref());
    if quoted {
        let joined = join_strings(&values, source.delimiter());
        let leads_empty = values.first().map_or(true, |v| v.is_empty());
        let rebuilt = splice_value(&instr, start, end, &joined, leads_empty, true);
        return expand_variables(rebuilt, start, ctx, out, errors);
    }
    for value in &values {
        let rebuilt = splice_value(&instr, start, end, value, value.is_empty(), true);
        expand_variables(rebuilt, start, ctx, out, errors)?;
    }
    Ok(())
}

/// The last top-level brace group of a token.
#[derive(Debug, Eq, PartialEq)]
enum BraceScan {
    None,
    /// Separators are those of the group itself, not of groups nested in it.
    Group {
        open: usize,
        close: usize,
        seps: Vec<usize>,
    },
    Unclosed {
        open: usize,
        seps: Vec<usize>,
    },
    /// A closing brace with nothing to close.
    Stray(usize),
}

fn scan_braces(chars: &[char]) -> BraceScan {
    let mut depth = 0usize;
    let mut open = None;
    let mut close = None;
    let mut seps = vec![];
    for (pos, &c) in chars.iter().enumerate() {
        match c {
            BRACE_BEGIN => {
                if depth == 0 {
                    open = Some(pos);
                    close = None;
                    seps.clear();
                }
                depth += 1;
            }
            BRACE_END if depth == 0 => return BraceScan::Stray(pos),
            BRACE_END => {
                depth -= 1;
                if depth == 0 {
                    close = Some(pos);
                }
            }
            BRACE_SEP if depth == 1 => seps.push(pos),
            _ => (),
        }
    }
    match (open, close) {
        (Some(open), _) if depth > 0 => BraceScan::Unclosed { open, seps },
        (Some(open), Some(close)) => BraceScan::Group { open, close, seps },
        _ => BraceScan::None,
    }
}

/// One alternative of a group, without the unquoted whitespace around it. Unquoted whitespace
/// inside it turns back into spaces.
fn brace_item(raw: &wstr) -> WString {
    let pad = |c: &char| *c == BRACE_SPACE || *c == '\0';
    let chars = raw.as_char_slice();
    let start = chars.iter().position(|c| !pad(c)).unwrap_or(chars.len());
    let end = chars.iter().rposition(|c| !pad(c)).map_or(start, |p| p + 1);
    chars[start..end]
        .iter()
        .map(|&c| if c == BRACE_SPACE { ' ' } else { c })
        .collect()
}

fn mismatched_braces(input: &wstr, pos: usize, errors: &mut ErrorSink) -> ExpandError {
    FLOGF!(expand, "Mismatched braces in '{}'", input);
    errors.syntax(pos, "Mismatched braces")
}

/// Expand brace groups, last group first, so that the last group varies slowest. `depth` counts
/// how many groups enclose this one.
fn expand_braces(
    input: WString,
    flags: ExpandFlags,
    out: &mut CompletionReceiver,
    errors: &mut ErrorSink,
    depth: usize,
) -> Result<(), ExpandError> {
    if depth > EXPAND_MAX_DEPTH {
        FLOGF!(expand, "Braces nested deeper than {}", EXPAND_MAX_DEPTH);
        return Err(errors.syntax(SOURCE_LOCATION_UNKNOWN, "Expansion is nested too deeply"));
    }

    let (open, close, seps) = match scan_braces(input.as_char_slice()) {
        BraceScan::None => return add_result(out, input, errors),
        BraceScan::Stray(pos) => return Err(mismatched_braces(&input, pos, errors)),
        BraceScan::Unclosed { open, seps } if flags.contains(ExpandFlags::FOR_COMPLETIONS) => {
            // Complete the alternative being typed as if its group were closed. The made-up
            // token must not run anything.
            let resume = seps.last().map_or(open + 1, |&sep| sep + 1);
            let mut closed = input[..open + 1].to_owned();
            closed.push_utfstr(&input[resume..]);
            closed.push(BRACE_END);
            let flags = flags | ExpandFlags::SKIP_CMDSUBST;
            return expand_braces(closed, flags, out, errors, depth + 1);
        }
        BraceScan::Unclosed { open, .. } => return Err(mismatched_braces(&input, open, errors)),
        BraceScan::Group { open, close, seps } => (open, close, seps),
    };

    let bounds: Vec<usize> = std::iter::once(open)
        .chain(seps)
        .chain(std::iter::once(close))
        .collect();
    for pair in bounds.windows(2) {
        let item = brace_item(&input[pair[0] + 1..pair[1]]);
        let nested = item.contains(BRACE_BEGIN);
        let mut word = input[..open].to_owned();
        word.push_utfstr(&item);
        word.push_utfstr(&input[close + 1..]);
        expand_braces(word, flags, out, errors, depth + usize::from(nested))?;
    }
    Ok(())
}

/// Run every command substitution in `input` and put the results into `out`. Separators are
/// left in place; the variable pass resolves them.
pub fn expand_cmdsubst(
    input: WString,
    ctx: &OperationContext,
    out: &mut CompletionReceiver,
    errors: Option<&mut ParseErrorList>,
) -> ExpandResult {
    match expand_cmdsubst_impl(input, ctx, out, &mut ErrorSink(errors)) {
        Ok(()) => ExpandResult::ok(),
        Err(err) => err.into(),
    }
}

/// Run the command of one substitution and return its lines.
fn run_substitution(
    ctx: &OperationContext,
    input: &wstr,
    parens: &Parentheses,
    errors: &mut ErrorSink,
) -> Result<Vec<WString>, ExpandError> {
    let Some(subshell) = ctx.subshell() else {
        FLOG!(expand, "No command runner for a command substitution");
        return Err(errors.cmdsubst(
            parens,
            "Command substitutions cannot be evaluated here",
            STATUS_EXPAND_ERROR,
        ));
    };
    subshell.run(&input[parens.command()]).map_err(|err| {
        FLOGF!(expand, "Command substitution failed: {:?}", err);
        match err {
            SubshellError::Cancelled => ExpandError::Cancel,
            SubshellError::ReadTooMuch => errors.cmdsubst(
                parens,
                "Too much data emitted by command substitution so it was discarded",
                STATUS_READ_TOO_MUCH,
            ),
            SubshellError::Failed(status) => errors.cmdsubst(
                parens,
                "Unknown error while evaluating command substitution",
                if status == 0 { STATUS_EXPAND_ERROR } else { status },
            ),
        }
    })
}

/// Expand the first substitution in `input`, then the rest of the token after it. Unquoted, each
/// output line is a separate word and the first substitution varies slowest. Inside double
/// quotes, the whole output is one word, minus trailing newlines.
fn expand_cmdsubst_impl(
    input: WString,
    ctx: &OperationContext,
    out: &mut CompletionReceiver,
    errors: &mut ErrorSink,
) -> Result<(), ExpandError> {
    let mut cursor = 0;
    let mut quoted = false;
    let mut has_dollar = false;
    let located = parse_util_locate_cmdsubst_range(
        &input,
        &mut cursor,
        false,
        Some(&mut quoted),
        Some(&mut has_dollar),
    );
    let parens = match located {
        MaybeParentheses::None => return add_result(out, input, errors),
        MaybeParentheses::Error => {
            return Err(errors.syntax(SOURCE_LOCATION_UNKNOWN, "Mismatched parenthesis"));
        }
        MaybeParentheses::CommandSubstitution(parens) => parens,
    };

    let mut lines = run_substitution(ctx, &input, &parens, errors)?;
    let mut tail_start = parens.end();
    if input.char_at(tail_start) == '[' {
        let (indexes, len) = parse_slice(&input[tail_start..], lines.len())
            .map_err(|err| err.report(tail_start, errors))?;
        lines = indexes
            .into_iter()
            .filter_map(|i| lines.get(i - 1).cloned())
            .collect();
        tail_start += len;
    }

    // A quoted substitution ends the quoted string it sits in; the tail reopens it.
    let mut tail = WString::new();
    if quoted {
        tail.push('"');
    }
    tail.push_utfstr(&input[tail_start..]);
    let mut tail_recv = out.subreceiver();
    expand_cmdsubst_impl(tail, ctx, &mut tail_recv, errors)?;
    let tails = tail_recv.take();

    let prefix = &input[..parens.start() - usize::from(has_dollar)];
    let word = |middle: &wstr, rest: &wstr| {
        let mut word = prefix.to_owned();
        word.push(INTERNAL_SEPARATOR);
        word.push_utfstr(middle);
        word.push(INTERNAL_SEPARATOR);
        word.push_utfstr(rest);
        word
    };

    if quoted {
        let escaped: Vec<WString> = lines
            .iter()
            .map(|line| escape_string_for_double_quotes(line))
            .collect();
        let mut joined = join_strings(&escaped, '\n');
        while joined.ends_with('\n') {
            joined.pop();
        }
        for tail in &tails {
            // Drop the quote the tail was given above.
            add_result(out, word(&joined, tail.completion.slice_from(1)), errors)?;
        }
        return Ok(());
    }

    for line in &lines {
        let escaped = escape_string(line, EscapeStringStyle::Script(EscapeFlags::COMMA));
        for tail in &tails {
            add_result(out, word(&escaped, &tail.completion), errors)?;
        }
    }
    Ok(())
}

/// Look up a user's home directory in the system user database.
fn home_directory_of(username: &wstr) -> Option<WString> {
    match nix::unistd::User::from_name(&username.to_string()) {
        Ok(user) => user.map(|user| str2wcstring(user.dir.as_os_str().as_bytes())),
        Err(err) => {
            FLOGF!(expand, "Failed to look up user '{}': {}", username, err);
            None
        }
    }
}

/// Turn home directory markers back into the `~` that was typed.
fn restore_tildes(s: &mut WString) {
    for c in s.as_char_slice_mut() {
        if *c == HOME_DIRECTORY {
            *c = '~';
        }
    }
}

/// Expand a leading `~` or `~user` marker. `~` without a usable `$HOME` empties the string, and
/// an unknown user keeps the tilde.
fn expand_home_directory(input: &mut WString, vars: &dyn Environment) {
    let marked = input.char_at(0) == HOME_DIRECTORY;
    restore_tildes(input);
    if !marked {
        return;
    }

    let name_end = input.find_char('/').unwrap_or(input.len());
    let name = input[1..name_end].to_owned();
    let home = if name.is_empty() {
        match vars.get_unless_empty(L!("HOME")) {
            Some(var) => var.as_string(),
            None => {
                input.clear();
                return;
            }
        }
    } else {
        match home_directory_of(&name) {
            Some(dir) => dir,
            None => return,
        }
    };
    input.replace_range(..name_end, &normalize_path(&home, true));
}

fn expand_percent_self(input: &mut WString) {
    if input.char_at(0) == PROCESS_EXPAND_SELF {
        let pid = nix::unistd::getpid().as_raw().to_wstring();
        input.replace_range(..1, &pid);
    }
}

/// Drop internal separators. With `literal_wildcards`, wildcard markers become the `?` and `*`
/// that were typed.
fn strip_internal_separators(s: &mut WString, literal_wildcards: bool) {
    s.retain(|c| c != INTERNAL_SEPARATOR);
    if literal_wildcards {
        for c in s.as_char_slice_mut() {
            *c = match *c {
                ANY_CHAR => '?',
                ANY_STRING | ANY_STRING_RECURSIVE => '*',
                other => other,
            };
        }
    }
}

/// After expanding a token that starts with `~` or `~user`, write whole-token results under that
/// home directory with the tilde again. Only a complete path component counts, so `/home/meh`
/// is not under `/home/me`. Results that extend the token keep the tilde the user typed.
fn unexpand_tildes(input: &wstr, vars: &dyn Environment, completions: &mut CompletionList) {
    if input.char_at(0) != '~' || !completions.iter().any(Completion::replaces_token) {
        return;
    }

    let name_end = input.find_char('/').unwrap_or(input.len());
    let tilde = input[..name_end].to_owned();
    let mut home = tilde.clone();
    expand_tilde(&mut home, vars);
    if home.is_empty() || home == tilde {
        return;
    }

    for comp in completions.iter_mut().filter(|c| c.replaces_token()) {
        let Some(rest) = comp.completion.strip_prefix(&home) else {
            continue;
        };
        if rest.is_empty() || rest.starts_with('/') || home.ends_with('/') {
            comp.completion.replace_range(..home.len(), &tilde);
            comp.flags |= CompleteFlags::DONT_ESCAPE_TILDES;
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ExpandStage {
    CommandSubstitution,
    Variables,
    Braces,
    HomeAndSelf,
    Wildcards,
}

impl ExpandStage {
    const ALL: [ExpandStage; 5] = [
        ExpandStage::CommandSubstitution,
        ExpandStage::Variables,
        ExpandStage::Braces,
        ExpandStage::HomeAndSelf,
        ExpandStage::Wildcards,
    ];
}

/// Combine the outcomes of two words. Once any wildcard matched, the expansion matched.
fn merge_results(total: ExpandResultCode, this: ExpandResultCode) -> ExpandResultCode {
    match (total, this) {
        (_, ExpandResultCode::wildcard_match) => ExpandResultCode::wildcard_match,
        (ExpandResultCode::wildcard_match, _) => ExpandResultCode::wildcard_match,
        (_, ExpandResultCode::wildcard_no_match) => ExpandResultCode::wildcard_no_match,
        (total, _) => total,
    }
}

struct Expander<'a, 'ctx> {
    ctx: &'a OperationContext<'ctx>,
    flags: ExpandFlags,
    errors: ErrorSink<'a>,
}

impl Expander<'_, '_> {
    fn expand(&mut self, input: WString, out: &mut CompletionReceiver) -> ExpandResult {
        let outcome = if !self.flags.contains(ExpandFlags::FOR_COMPLETIONS) && expand_is_clean(&input)
        {
            add_result(out, input, &mut self.errors).map(|()| ExpandResultCode::ok)
        } else {
            self.run_stages(&input, out).map_err(|err| {
                FLOGF!(expand, "Expanding '{}' failed: {:?}", input, err);
                err
            })
        };
        match outcome {
            Ok(code) => ExpandResult::new(code),
            Err(err) => err.into(),
        }
    }

    /// Run the stages in order, each on every word the previous one produced. Nothing reaches
    /// `out` unless every stage succeeds.
    fn run_stages(&mut self, input: &wstr, out: &mut CompletionReceiver) -> StageResult {
        let mut words = vec![Completion::from_completion(input.to_owned())];
        let mut total = ExpandResultCode::ok;
        let mut next = out.subreceiver();
        for stage in ExpandStage::ALL {
            for word in words {
                if self.ctx.check_cancel() {
                    FLOGF!(expand, "Cancelled during {:?}", stage);
                    return Err(ExpandError::Cancel);
                }
                let this = self.run_stage(stage, word.completion, &mut next)?;
                total = merge_results(total, this);
            }
            words = next.take();
        }

        // With `$dirs/*.txt`, one directory may match while another does not. Any output at all
        // makes that a success.
        if total == ExpandResultCode::wildcard_no_match && !words.is_empty() {
            total = ExpandResultCode::ok;
        }

        if !self.flags.contains(ExpandFlags::SKIP_HOME_DIRECTORIES) {
            unexpand_tildes(input, self.ctx.vars(), &mut words);
        }
        if !out.extend(words) {
            return Err(self.errors.overflow());
        }
        Ok(total)
    }

    fn run_stage(
        &mut self,
        stage: ExpandStage,
        input: WString,
        out: &mut CompletionReceiver,
    ) -> StageResult {
        match stage {
            ExpandStage::CommandSubstitution => self.stage_cmdsubst(input, out),
            ExpandStage::Variables => self.stage_variables(input, out),
            ExpandStage::Braces => self.stage_braces(input, out),
            ExpandStage::HomeAndSelf => self.stage_home_and_self(input, out),
            ExpandStage::Wildcards => self.stage_wildcards(input, out),
        }
    }

    fn stage_cmdsubst(&mut self, input: WString, out: &mut CompletionReceiver) -> StageResult {
        if !self.flags.contains(ExpandFlags::SKIP_CMDSUBST) {
            expand_cmdsubst_impl(input, self.ctx, out, &mut self.errors)?;
            return Ok(ExpandResultCode::ok);
        }

        // Nothing may run, so even an unfinished substitution is refused.
        let mut cursor = 0;
        match parse_util_locate_cmdsubst_range(&input, &mut cursor, true, None, None) {
            MaybeParentheses::None => {
                add_result(out, input, &mut self.errors)?;
                Ok(ExpandResultCode::ok)
            }
            MaybeParentheses::Error => Err(self
                .errors
                .syntax(SOURCE_LOCATION_UNKNOWN, "Mismatched parenthesis")),
            MaybeParentheses::CommandSubstitution(parens) => Err(self.errors.cmdsubst(
                &parens,
                "Command substitutions not allowed",
                STATUS_EXPAND_ERROR,
            )),
        }
    }

    fn stage_variables(&mut self, input: WString, out: &mut CompletionReceiver) -> StageResult {
        // Completion expands tokens that are still being typed, so unfinished quotes are fine.
        let style = UnescapeStringStyle::Script(UnescapeFlags::SPECIAL | UnescapeFlags::INCOMPLETE);
        let Some(mut word) = unescape_string(&input, style) else {
            FLOGF!(expand, "Invalid escape in '{}'", input);
            return Err(self
                .errors
                .syntax(SOURCE_LOCATION_UNKNOWN, "Invalid escape sequence"));
        };

        if self.flags.contains(ExpandFlags::SKIP_VARIABLES) {
            for c in word.as_char_slice_mut() {
                if matches!(*c, VARIABLE_EXPAND | VARIABLE_EXPAND_SINGLE) {
                    *c = '$';
                }
            }
            add_result(out, word, &mut self.errors)?;
        } else {
            let end = word.len();
            expand_variables(word, end, self.ctx, out, &mut self.errors)?;
        }
        Ok(ExpandResultCode::ok)
    }

    fn stage_braces(&mut self, input: WString, out: &mut CompletionReceiver) -> StageResult {
        expand_braces(input, self.flags, out, &mut self.errors, 0)?;
        Ok(ExpandResultCode::ok)
    }

    fn stage_home_and_self(&mut self, mut input: WString, out: &mut CompletionReceiver) -> StageResult {
        if self.flags.contains(ExpandFlags::SKIP_HOME_DIRECTORIES) {
            restore_tildes(&mut input);
        } else {
            expand_home_directory(&mut input, self.ctx.vars());
        }
        if !feature_test(FeatureFlag::remove_percent_self) {
            expand_percent_self(&mut input);
        }
        add_result(out, input, &mut self.errors)?;
        Ok(ExpandResultCode::ok)
    }

    /// The directories a relative path is resolved in: the working directory, except that cd
    /// searches CDPATH and command lookup searches PATH.
    fn search_dirs(&self, path: &wstr) -> Vec<WString> {
        let pwd = self.ctx.vars().get_pwd_slash();
        let for_cd = self.flags.contains(ExpandFlags::SPECIAL_FOR_CD);
        let for_command = self.flags.contains(ExpandFlags::SPECIAL_FOR_COMMAND);
        // A path that names its own starting point is not searched for. For commands, neither is
        // any path with a slash; CDPATH entries may hold subdirectories.
        let anchored = path.starts_with('/') || path.starts_with("./") || path.starts_with("../");
        if !(for_cd || for_command) || anchored || (for_command && path.contains('/')) {
            return vec![pwd];
        }

        let var_name = if for_cd { L!("CDPATH") } else { L!("PATH") };
        let mut entries: Vec<WString> = self
            .ctx
            .vars()
            .get_unless_empty(var_name)
            .map(|var| var.as_list().to_vec())
            .unwrap_or_default();
        // cd always falls back to the working directory. Commands are never looked up there.
        if for_cd {
            entries.push(WString::new());
        }

        let mut dirs: Vec<WString> = vec![];
        for entry in entries {
            // An empty entry is the working directory.
            let entry = if entry.is_empty() { L!(".").to_owned() } else { entry };
            let dir = path_apply_working_directory(&entry, &pwd);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    fn stage_wildcards(&mut self, mut path: WString, out: &mut CompletionReceiver) -> StageResult {
        let skip_wildcards = self.flags.contains(ExpandFlags::SKIP_WILDCARDS);
        let completing = self.flags.contains(ExpandFlags::FOR_COMPLETIONS);
        strip_internal_separators(&mut path, skip_wildcards);
        let wild = wildcard_has_internal(&path);

        if wild && self.flags.contains(ExpandFlags::EXECUTABLES_ONLY) {
            return Ok(ExpandResultCode::ok);
        }
        if !wild && (!completing || skip_wildcards) {
            // A plain word is its own result. When completing without file completion, it
            // completes to nothing.
            if !completing {
                add_result(out, path, &mut self.errors)?;
            }
            return Ok(ExpandResultCode::ok);
        }

        // Either a real wildcard, or a path being completed as if it ended in `*`.
        let mut result = ExpandResultCode::wildcard_no_match;
        let mut found = out.subreceiver();
        for dir in self.search_dirs(&path) {
            match wildcard_expand_string(
                &path,
                &dir,
                self.flags,
                &*self.ctx.cancel_checker,
                self.ctx.lister(),
                &mut found,
            ) {
                WildcardResult::Match => result = ExpandResultCode::wildcard_match,
                WildcardResult::NoMatch => (),
                WildcardResult::Overflow => return Err(self.errors.overflow()),
                WildcardResult::Cancel => return Err(ExpandError::Cancel),
            }
        }

        let mut found = found.take();
        found.sort_by(|a, b| wcsfilecmp_glob(&a.completion, &b.completion));
        // Several search directories may produce the same text.
        found.dedup_by(|a, b| a.completion == b.completion);
        if !out.extend(found) {
            return Err(self.errors.overflow());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvMap;

    fn slice(text: &str, size: usize) -> Result<Vec<usize>, usize> {
        parse_slice(&WString::from_str(text), size)
            .map(|(indexes, _)| indexes)
            .map_err(SliceError::pos)
    }

    #[test]
    fn test_parse_slice() {
        assert_eq!(slice("[1]", 5), Ok(vec![1]));
        assert_eq!(slice("[-1]", 5), Ok(vec![5]));
        assert_eq!(slice("[2..-1]", 5), Ok(vec![2, 3, 4, 5]));
        assert_eq!(slice("[-1..2]", 5), Ok(vec![5, 4, 3, 2]));
        assert_eq!(slice("[..2]", 5), Ok(vec![1, 2]));
        assert_eq!(slice("[4..]", 5), Ok(vec![4, 5]));
        assert_eq!(slice("[1 3]", 5), Ok(vec![1, 3]));
        assert_eq!(slice("[7..9]", 5), Ok(vec![]));
        assert_eq!(slice("[2..-1]", 1), Ok(vec![]));
        assert_eq!(slice("[-1..-30000000]", 2), Ok(vec![2, 1]));
        assert_eq!(slice("[-30000000..-40000000]", 2), Ok(vec![]));
        assert_eq!(slice("[1..30000000]", 2), Ok(vec![1, 2]));
        assert_eq!(slice("[-30000000..2]", 3), Ok(vec![]));
        assert_eq!(slice("[2..-30000000]", 3), Ok(vec![]));
        assert_eq!(slice("[-9..-1]", 3), Ok(vec![1, 2, 3]));
        // Single indexes past the end are left for the reader to skip.
        assert_eq!(slice("[9 -9]", 5), Ok(vec![9]));
        assert_eq!(slice("[0]", 5), Err(1));
        assert_eq!(slice("[1..0]", 5), Err(4));
        assert_eq!(slice("[x]", 5), Err(1));
        assert_eq!(slice("[1", 5), Err(2));

        let (_, len) = parse_slice(L!("[1 2]tail"), 3).unwrap();
        assert_eq!(len, 5);
    }

    #[test]
    fn test_expand_is_clean() {
        assert!(expand_is_clean(L!("")));
        assert!(expand_is_clean(L!("foo/bar")));
        assert!(expand_is_clean(L!("a~b")));
        assert!(!expand_is_clean(L!("~/x")));
        assert!(!expand_is_clean(L!("%self")));
        assert!(!expand_is_clean(L!("$x")));
        assert!(!expand_is_clean(L!("a*")));
        assert!(!expand_is_clean(L!("{a,b}")));
    }

    #[test]
    fn test_scan_braces() {
        let marked = |s: &str| -> WString {
            s.chars()
                .map(|c| match c {
                    '{' => BRACE_BEGIN,
                    '}' => BRACE_END,
                    ',' => BRACE_SEP,
                    c => c,
                })
                .collect()
        };
        let scan = |s: &str| scan_braces(marked(s).as_char_slice());

        assert_eq!(scan("abc"), BraceScan::None);
        assert_eq!(
            scan("{a,b}x{c,{d,e}}"),
            BraceScan::Group {
                open: 6,
                close: 14,
                seps: vec![8]
            }
        );
        assert_eq!(scan("a}{b"), BraceScan::Stray(1));
        assert_eq!(scan("{a,{b"), BraceScan::Unclosed { open: 0, seps: vec![2] });

        let padded: WString = [BRACE_SPACE, 'a', BRACE_SPACE, 'b', BRACE_SPACE]
            .into_iter()
            .collect();
        assert_eq!(brace_item(&padded), "a b");
        assert_eq!(brace_item(L!("")), "");
    }

    #[test]
    fn test_splice_value() {
        let token: WString = ['x', VARIABLE_EXPAND, 'v', '!'].into_iter().collect();
        let spliced = splice_value(&token, 1, 3, L!("1"), false, true);
        assert_eq!(spliced.as_char_slice(), ['x', INTERNAL_SEPARATOR, '1', '!']);

        // `$$v` with an empty `$v` leaves the outer `$` a name to look up.
        let token: WString = [VARIABLE_EXPAND, VARIABLE_EXPAND, 'v'].into_iter().collect();
        let spliced = splice_value(&token, 1, 3, L!(""), true, true);
        assert_eq!(spliced.as_char_slice(), [VARIABLE_EXPAND, VARIABLE_EXPAND_EMPTY]);
        assert_eq!(variable_name_end(spliced.as_char_slice(), 1), 2);
    }

    #[test]
    fn test_merge_results() {
        use ExpandResultCode::*;
        assert_eq!(merge_results(ok, ok), ok);
        assert_eq!(merge_results(ok, wildcard_no_match), wildcard_no_match);
        assert_eq!(merge_results(wildcard_match, wildcard_no_match), wildcard_match);
        assert_eq!(merge_results(wildcard_no_match, wildcard_match), wildcard_match);
        assert_eq!(merge_results(wildcard_no_match, ok), wildcard_no_match);
    }

    #[test]
    fn test_escape_for_display() {
        let var = EnvVar::new_vec(
            vec![L!("a b").to_owned(), L!("c").to_owned()],
            Default::default(),
        );
        assert_eq!(expand_escape_variable(&var), "'a b'  'c'");
        let var = EnvVar::new(L!("plain").to_owned(), Default::default());
        assert_eq!(expand_escape_variable(&var), "plain");
        assert_eq!(expand_escape_string(L!("x y")), "'x y'");
        assert_eq!(expand_escape_string(L!("tab\there")), "tab\\there");
        assert!(is_quotable(L!("a b")));
        assert!(!is_quotable(L!("a\nb")));
    }

    #[test]
    fn test_tilde_helpers() {
        let mut vars = EnvMap::new();
        vars.set_one(L!("HOME"), L!("/home/me").to_owned());

        let mut s = L!("~/src").to_owned();
        expand_tilde(&mut s, &vars);
        assert_eq!(s, "/home/me/src");

        let mut s = L!("x~").to_owned();
        expand_tilde(&mut s, &vars);
        assert_eq!(s, "x~");

        assert_eq!(
            replace_home_directory_with_tilde(L!("/home/me/src"), &vars),
            "~/src"
        );
        assert_eq!(
            replace_home_directory_with_tilde(L!("/home/meh"), &vars),
            "/home/meh"
        );
        assert_eq!(replace_home_directory_with_tilde(L!("rel"), &vars), "rel");

        let empty = EnvMap::new();
        let mut s = L!("~/src").to_owned();
        expand_tilde(&mut s, &empty);
        assert_eq!(s, "");
        assert_eq!(
            replace_home_directory_with_tilde(L!("/home/me/src"), &empty),
            "/home/me/src"
        );
    }

    #[test]
    fn test_unknown_user_keeps_tilde() {
        let vars = EnvMap::new();
        let mut s = L!("~no_such_user_for_fish_tests/x").to_owned();
        expand_tilde(&mut s, &vars);
        assert_eq!(s, "~no_such_user_for_fish_tests/x");
    }

    #[test]
    fn test_unexpand_tildes() {
        let mut vars = EnvMap::new();
        vars.set_one(L!("HOME"), L!("/home/me").to_owned());
        let whole = |s: &str| {
            Completion::new(
                WString::from_str(s),
                WString::new(),
                CompleteFlags::REPLACES_TOKEN,
            )
        };

        let mut completions = vec![
            whole("/home/me/x"),
            whole("/home/meh/x"),
            whole("/home/me"),
            Completion::from_completion(L!("/home/me/y").to_owned()),
        ];
        unexpand_tildes(L!("~/"), &vars, &mut completions);
        assert_eq!(completions[0].completion, "~/x");
        assert!(completions[0]
            .flags
            .contains(CompleteFlags::DONT_ESCAPE_TILDES));
        // A sibling directory sharing the prefix is not under home.
        assert_eq!(completions[1].completion, "/home/meh/x");
        assert_eq!(completions[1].flags, CompleteFlags::REPLACES_TOKEN);
        assert_eq!(completions[2].completion, "~");
        // Suffix completions are never touched.
        assert_eq!(completions[3].completion, "/home/me/y");

        // Only tokens that started with a tilde are affected.
        let mut completions = vec![whole("/home/me/x")];
        unexpand_tildes(L!("/home/me/"), &vars, &mut completions);
        assert_eq!(completions[0].completion, "/home/me/x");
    }

    #[test]
    fn test_rewrite_login_exec_command() {
        let args: Vec<String> = ["fish", "ls", "it's", "a\\b"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut cmds = vec!["exec \"$@\"".to_string()];
        assert!(rewrite_login_exec_command(&mut cmds, &args));
        assert_eq!(cmds, vec!["exec 'ls' 'it\\'s' 'a\\\\b'".to_string()]);

        let mut cmds = vec!["exec \"${@}\"".to_string()];
        assert!(rewrite_login_exec_command(&mut cmds, &args[..1]));
        assert_eq!(cmds, vec!["exec".to_string()]);

        let mut cmds = vec!["echo hi".to_string()];
        assert!(!rewrite_login_exec_command(&mut cmds, &args));
        assert_eq!(cmds, vec!["echo hi".to_string()]);

        let mut cmds = vec!["exec \"$@\"".to_string(), "x".to_string()];
        assert!(!rewrite_login_exec_command(&mut cmds, &args));
    }

    #[test]
    fn test_expand_result_from_error() {
        let res: ExpandResult = ExpandError::Overflow.into();
        assert_eq!(res, ExpandResultCode::overflow);
        let res: ExpandResult = ExpandError::Cancel.into();
        assert_eq!(res, ExpandResultCode::cancel);
        let res: ExpandResult = ExpandError::Error(7).into();
        assert_eq!(res, ExpandResultCode::error);
        assert_eq!(res.status, 7);
        assert!(!res.is_success());
        assert!(ExpandResult::new(ExpandResultCode::wildcard_no_match).is_success());
    }
}
