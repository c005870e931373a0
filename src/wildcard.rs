//! Glob matching, and the directory walk that turns a wildcard into file names.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;

use crate::common::{str2wcstring, unescape_string, Marker, UnescapeFlags, UnescapeStringStyle};
use crate::complete::{CompleteFlags, Completion, CompletionReceiver};
use crate::expand::ExpandFlags;
use crate::flog::FLOGF;
use crate::future_feature_flags::{feature_test, FeatureFlag};
use crate::path::append_path_component;
use crate::wchar::prelude::*;
use crate::wutil::{normalize_path, wcs2osstring};

/// Matches one char other than `/`.
pub const ANY_CHAR: char = Marker::AnyChar.to_char();
/// Matches any run of chars other than `/`.
pub const ANY_STRING: char = Marker::AnyString.to_char();
/// Matches any run of chars, descending into subdirectories.
pub const ANY_STRING_RECURSIVE: char = Marker::AnyStringRecursive.to_char();

fn is_wild(c: char) -> bool {
    matches!(c, ANY_CHAR | ANY_STRING | ANY_STRING_RECURSIVE)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WildcardResult {
    NoMatch,
    Match,
    Cancel,
    Overflow,
}

/// Identifies a file independently of the path used to reach it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FileId {
    pub device: u64,
    pub inode: u64,
}

/// One entry of a directory listing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DirEntry {
    /// The file name, without any directory.
    pub name: WString,
    /// A directory, or a symlink to one.
    pub is_dir: bool,
    pub is_link: bool,
    /// A regular file, after following links, that we may execute.
    pub is_executable: bool,
    /// None when the file cannot be stat'ed, e.g. a broken link.
    pub file_id: Option<FileId>,
}

impl DirEntry {
    pub fn file(name: &wstr) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn dir(name: &wstr) -> Self {
        Self {
            name: name.to_owned(),
            is_dir: true,
            ..Default::default()
        }
    }

    /// The description shown for a completion of this entry.
    fn description(&self) -> &'static wstr {
        match (self.is_link, self.is_dir, self.is_executable) {
            (true, true, _) => L!("dir symlink"),
            (true, false, true) => L!("command link"),
            (true, false, false) => L!("symlink"),
            (false, true, _) => L!("directory"),
            (false, false, true) => L!("command"),
            (false, false, false) => L!("file"),
        }
    }
}

/// Where wildcard expansion reads directories from. Paths are absolute and may end in a slash.
pub trait DirectoryLister {
    /// The entries of the directory at `path`, in any order. `.` and `..` only with
    /// `include_dots`.
    fn list(&self, path: &wstr, include_dots: bool) -> io::Result<Vec<DirEntry>>;

    fn exists(&self, path: &wstr) -> bool;
}

/// Lists directories of the real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsDirectoryLister;

impl FsDirectoryLister {
    fn entry(dir: &wstr, name: WString) -> DirEntry {
        let mut full_path = dir.to_owned();
        append_path_component(&mut full_path, &name);
        let path = wcs2osstring(&full_path);

        let is_link = fs::symlink_metadata(&path).is_ok_and(|md| md.file_type().is_symlink());
        let md = fs::metadata(&path).ok();
        let is_dir = md.as_ref().is_some_and(|md| md.is_dir());
        let is_executable = md.as_ref().is_some_and(|md| md.is_file())
            && nix::unistd::access(path.as_os_str(), nix::unistd::AccessFlags::X_OK).is_ok();
        DirEntry {
            name,
            is_dir,
            is_link,
            is_executable,
            file_id: md.map(|md| FileId {
                device: md.dev(),
                inode: md.ino(),
            }),
        }
    }
}

impl DirectoryLister for FsDirectoryLister {
    fn list(&self, path: &wstr, include_dots: bool) -> io::Result<Vec<DirEntry>> {
        let mut entries = vec![];
        if include_dots {
            entries.push(Self::entry(path, L!(".").to_owned()));
            entries.push(Self::entry(path, L!("..").to_owned()));
        }
        for dirent in fs::read_dir(wcs2osstring(path))? {
            // Entries may vanish while we read.
            let Ok(dirent) = dirent else {
                continue;
            };
            let name = str2wcstring(dirent.file_name().as_bytes());
            entries.push(Self::entry(path, name));
        }
        Ok(entries)
    }

    fn exists(&self, path: &wstr) -> bool {
        fs::metadata(wcs2osstring(path)).is_ok()
    }
}

/// How a name completes what was typed so far.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Fit {
    NoMatch,
    /// Typed text is an exact prefix; only the rest of the name is inserted.
    Suffix,
    /// A wildcard or a case difference was involved; the name replaces the token.
    Whole,
}

impl Fit {
    fn whole(self) -> Fit {
        match self {
            Fit::NoMatch => Fit::NoMatch,
            _ => Fit::Whole,
        }
    }
}

fn equals_ignoring_case(a: &[char], b: &[char]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x == y || x.to_lowercase().eq(y.to_lowercase()))
}

/// `**` is not completed; it only ever fails to fit.
fn completion_fit(s: &[char], wc: &[char]) -> Fit {
    let literal = wc.iter().position(|&c| is_wild(c)).unwrap_or(wc.len());
    if literal > s.len() {
        return Fit::NoMatch;
    }
    if literal > 0 {
        let (typed, name) = (&wc[..literal], &s[..literal]);
        let rest = || completion_fit(&s[literal..], &wc[literal..]);
        return if typed == name {
            rest()
        } else if equals_ignoring_case(name, typed) {
            rest().whole()
        } else {
            Fit::NoMatch
        };
    }
    match wc.first() {
        None => Fit::Suffix,
        Some(&ANY_CHAR) if !s.is_empty() => completion_fit(&s[1..], &wc[1..]).whole(),
        // The shortest match wins.
        Some(&ANY_STRING) => (0..=s.len())
            .map(|i| completion_fit(&s[i..], &wc[1..]))
            .find(|&fit| fit != Fit::NoMatch)
            .map_or(Fit::NoMatch, Fit::whole),
        _ => Fit::NoMatch,
    }
}

/// Whether `s` completes the wildcard `wc`. On a match, and if `out` is given, add either the
/// rest of `s` or, when the whole token has to be replaced, all of `s`.
pub fn wildcard_complete(
    s: &wstr,
    wc: &wstr,
    description: &wstr,
    out: Option<&mut CompletionReceiver>,
    expand_flags: ExpandFlags,
    flags: CompleteFlags,
) -> WildcardResult {
    // Hidden files only complete from a typed dot.
    if !expand_flags.contains(ExpandFlags::ALLOW_NONLITERAL_LEADING_DOT)
        && s.starts_with('.')
        && !wc.starts_with('.')
    {
        return WildcardResult::NoMatch;
    }
    let fit = completion_fit(s.as_char_slice(), wc.as_char_slice());
    let whole = match fit {
        Fit::NoMatch => return WildcardResult::NoMatch,
        _ if flags.contains(CompleteFlags::REPLACES_TOKEN) => true,
        fit => fit == Fit::Whole,
    };
    let Some(out) = out else {
        return WildcardResult::Match;
    };
    let (text, flags) = if whole {
        (s, flags | CompleteFlags::REPLACES_TOKEN)
    } else {
        (s.slice_from(wc.len()), flags)
    };
    let description = if expand_flags.contains(ExpandFlags::NO_DESCRIPTIONS) {
        WString::new()
    } else {
        description.to_owned()
    };
    if !out.add(Completion::new(text.to_owned(), description, flags)) {
        return WildcardResult::Overflow;
    }
    WildcardResult::Match
}

/// Walks directories for one wildcard.
struct Walk<'a> {
    cancel_checker: &'a dyn Fn() -> bool,
    lister: &'a dyn DirectoryLister,
    /// Relative base directories are resolved against this.
    working_directory: &'a wstr,
    flags: ExpandFlags,
    out: &'a mut CompletionReceiver,
    /// Paths already added, for the non-completion case.
    added: HashSet<WString>,
    /// Directories on the current descent, to stop at symlink loops.
    ancestors: HashSet<FileId>,
    cancelled: bool,
    overflowed: bool,
    matched: bool,
}

impl<'a> Walk<'a> {
    fn stopped(&mut self) -> bool {
        self.cancelled |= (self.cancel_checker)();
        self.cancelled || self.overflowed
    }

    fn result(&self) -> WildcardResult {
        if self.cancelled {
            WildcardResult::Cancel
        } else if self.overflowed {
            WildcardResult::Overflow
        } else if self.matched {
            WildcardResult::Match
        } else {
            WildcardResult::NoMatch
        }
    }

    fn completing(&self) -> bool {
        self.flags.contains(ExpandFlags::FOR_COMPLETIONS)
    }

    /// Match `wc` below `base_dir`. `prefix` is put before completions that replace the token;
    /// it is empty or ends in a slash.
    fn expand(&mut self, base_dir: &wstr, wc: &wstr, prefix: &wstr) {
        if self.stopped() {
            return;
        }
        let (segment, rest) = match wc.find_char('/') {
            Some(slash) => (wc.slice_to(slash), Some(wc.slice_from(slash + 1))),
            None => (wc, None),
        };

        match rest {
            None if segment.is_empty() => self.expand_trailing_slash(base_dir, prefix),
            Some(rest) if segment.is_empty() => {
                self.expand(base_dir, rest, &(prefix.to_owned() + L!("/")));
            }
            // A literal directory is entered without reading its parent.
            Some(rest) if !wildcard_has_internal(segment) => {
                let dir = base_dir.to_owned() + segment + L!("/");
                self.expand(&dir, rest, &(prefix.to_owned() + segment + L!("/")));
            }
            _ => self.expand_wild_segment(base_dir, segment, wc, rest, prefix),
        }
    }

    fn expand_wild_segment(
        &mut self,
        base_dir: &wstr,
        segment: &wstr,
        wc: &wstr,
        rest: Option<&wstr>,
        prefix: &wstr,
    ) {
        // `**/x` also matches `x` right here.
        if let (Some(rest), [ANY_STRING_RECURSIVE]) = (rest, segment.as_char_slice()) {
            self.expand(base_dir, rest, prefix);
            if self.stopped() {
                return;
            }
        }
        let Some(entries) = self.list(base_dir, self.completing()) else {
            return;
        };
        match rest {
            Some(rest) => self.descend(base_dir, &entries, segment, rest, prefix),
            None => self.match_last_segment(base_dir, &entries, segment, prefix),
        }
        // A `**` inside the segment: the part up to it matches directory names here, and
        // everything from it on is tried again inside each of them.
        if let Some(recursive) = segment.find_char(ANY_STRING_RECURSIVE) {
            let head = segment.slice_to(recursive + 1);
            let tail = wc.slice_from(recursive);
            self.descend(base_dir, &entries, head, tail, prefix);
        }
    }

    fn expand_trailing_slash(&mut self, base_dir: &wstr, prefix: &wstr) {
        if !self.completing() {
            // `echo /xyz/` expands to itself if it exists.
            if self.lister.exists(&self.resolve(base_dir)) {
                self.add_path(base_dir.to_owned());
            }
            return;
        }
        let Some(entries) = self.list(base_dir, false) else {
            return;
        };
        for entry in &entries {
            if self.stopped() {
                break;
            }
            if !entry.name.is_empty() && !entry.name.starts_with('.') {
                self.add_completion(L!(""), prefix, entry);
            }
        }
    }

    /// Enter each directory matching `segment`, and match `rest` inside.
    fn descend(
        &mut self,
        base_dir: &wstr,
        entries: &[DirEntry],
        segment: &wstr,
        rest: &wstr,
        prefix: &wstr,
    ) {
        for entry in entries {
            if self.stopped() {
                break;
            }
            // Hidden names, and so `.` and `..`, need a literal dot.
            if !entry.is_dir || !wildcard_match(&entry.name, segment, true) {
                continue;
            }
            if let Some(id) = entry.file_id {
                if !self.ancestors.insert(id) {
                    FLOGF!(wildcard, "Skipping symlink loop at '{}{}'", base_dir, entry.name);
                    continue;
                }
            }
            let dir = base_dir.to_owned() + entry.name.as_utfstr() + L!("/");
            let child_prefix = prefix.to_owned() + entry.name.as_utfstr() + L!("/");
            self.expand(&dir, rest, &child_prefix);
            if let Some(id) = entry.file_id {
                self.ancestors.remove(&id);
            }
        }
    }

    fn match_last_segment(&mut self, base_dir: &wstr, entries: &[DirEntry], wc: &wstr, prefix: &wstr) {
        let hidden_need_dot = !self.flags.contains(ExpandFlags::ALLOW_NONLITERAL_LEADING_DOT);
        for entry in entries {
            if self.stopped() {
                break;
            }
            if self.completing() {
                self.add_completion(wc, prefix, entry);
            } else if (entry.is_dir || !self.flags.contains(ExpandFlags::DIRECTORIES_ONLY))
                && wildcard_match(&entry.name, wc, hidden_need_dot)
            {
                self.add_path(base_dir.to_owned() + entry.name.as_utfstr());
            }
        }
    }

    fn add_path(&mut self, path: WString) {
        if !self.added.insert(path.clone()) {
            return;
        }
        if self.out.add(path) {
            self.matched = true;
        } else {
            self.overflowed = true;
        }
    }

    fn add_completion(&mut self, wc: &wstr, prefix: &wstr, entry: &DirEntry) {
        if (self.flags.contains(ExpandFlags::DIRECTORIES_ONLY) && !entry.is_dir)
            || (self.flags.contains(ExpandFlags::EXECUTABLES_ONLY) && !entry.is_executable)
        {
            return;
        }
        let (name, flags) = if entry.is_dir {
            (entry.name.clone() + L!("/"), CompleteFlags::NO_SPACE)
        } else {
            (entry.name.clone(), CompleteFlags::empty())
        };
        let before = self.out.size();
        let desc = entry.description();
        match wildcard_complete(&name, wc, desc, Some(&mut *self.out), self.flags, flags) {
            WildcardResult::Match => {
                self.matched = true;
                if self.out.size() > before {
                    if let Some(added) = self.out.last_mut() {
                        added.prepend_token_prefix(prefix);
                    }
                }
            }
            WildcardResult::Overflow => self.overflowed = true,
            WildcardResult::NoMatch | WildcardResult::Cancel => (),
        }
    }

    fn resolve(&self, base_dir: &wstr) -> WString {
        let mut path = self.working_directory.to_owned();
        append_path_component(&mut path, base_dir);
        if self.flags.contains(ExpandFlags::SPECIAL_FOR_CD) {
            // cd works on logical paths, so `..` is taken lexically.
            path = normalize_path(&path, true);
        }
        path
    }

    /// List a directory. Unreadable ones are treated as empty.
    fn list(&self, base_dir: &wstr, include_dots: bool) -> Option<Vec<DirEntry>> {
        let path = self.resolve(base_dir);
        match self.lister.list(&path, include_dots) {
            Ok(entries) => Some(entries),
            Err(err) => {
                FLOGF!(wildcard, "Cannot read '{}': {}", path, err);
                None
            }
        }
    }
}

/// Expand the wildcard `wc` against the directories `lister` supplies. Relative wildcards are
/// taken from `working_directory`. Each `/`-separated segment is matched against the directory
/// reached so far. With `FOR_COMPLETIONS` the results are completions of the last segment rather
/// than paths.
pub fn wildcard_expand_string(
    wc: &wstr,
    working_directory: &wstr,
    flags: ExpandFlags,
    cancel_checker: &dyn Fn() -> bool,
    lister: &dyn DirectoryLister,
    output: &mut CompletionReceiver,
) -> WildcardResult {
    // No file name contains a NUL.
    if wc.contains('\0') {
        return WildcardResult::NoMatch;
    }
    if flags.contains(ExpandFlags::FOR_COMPLETIONS) && wc.contains(ANY_STRING_RECURSIVE) {
        return WildcardResult::NoMatch;
    }

    let (working_directory, base_dir, wc) = match wc.strip_prefix('/') {
        Some(rest) => (L!(""), L!("/"), rest),
        None => (working_directory, L!(""), wc),
    };
    let mut walk = Walk {
        cancel_checker,
        lister,
        working_directory,
        flags,
        added: output.iter().map(|c| c.completion.clone()).collect(),
        out: output,
        ancestors: HashSet::new(),
        cancelled: false,
        overflowed: false,
        matched: false,
    };
    walk.expand(base_dir, wc, base_dir);
    let result = walk.result();
    FLOGF!(wildcard, "Expanded wildcard from '{}': {:?}", working_directory, result);
    result
}

/// Whether `name` matches the glob `pattern`, which uses the wildcard markers. Does no I/O.
///
/// With `leading_dots_fail_to_match`, a name starting with a dot is hidden: only a literal dot in
/// the pattern matches it, and `.` and `..` only match themselves.
#[must_use]
pub fn wildcard_match(
    name: impl AsRef<wstr>,
    pattern: impl AsRef<wstr>,
    leading_dots_fail_to_match: bool,
) -> bool {
    let name = name.as_ref().as_char_slice();
    let pattern = pattern.as_ref().as_char_slice();
    if leading_dots_fail_to_match {
        if name == ['.'] || name == ['.', '.'] {
            return name == pattern;
        }
        if name.first() == Some(&'.') && pattern.first().is_some_and(|&c| is_wild(c)) {
            return false;
        }
    }

    // Backtrack to the most recent star only, which keeps matching linear in practice.
    let (mut p, mut n) = (0, 0);
    // The last star seen, and where in the name its next attempt starts.
    let mut star: Option<(usize, usize)> = None;
    while p < pattern.len() || n < name.len() {
        match pattern.get(p) {
            Some(&(ANY_STRING | ANY_STRING_RECURSIVE)) => {
                star = Some((p, n + 1));
                p += 1;
                continue;
            }
            Some(&ANY_CHAR) if n < name.len() => {
                p += 1;
                n += 1;
                continue;
            }
            Some(&c) if name.get(n) == Some(&c) => {
                p += 1;
                n += 1;
                continue;
            }
            _ => (),
        }
        match star {
            Some((star_at, retry)) if retry <= name.len() => {
                p = star_at + 1;
                n = retry;
                star = Some((star_at, retry + 1));
            }
            _ => return false,
        }
    }
    true
}

/// Whether `s` contains wildcard markers.
#[must_use]
pub fn wildcard_has_internal(s: impl AsRef<wstr>) -> bool {
    s.as_ref().chars().any(is_wild)
}

/// Whether the typed string `s` contains an unquoted, unescaped wildcard.
#[must_use]
pub fn wildcard_has(s: impl AsRef<wstr>) -> bool {
    let s = s.as_ref();
    let qmark_globs = !feature_test(FeatureFlag::qmark_noglob);
    if !s.contains('*') && !(qmark_globs && s.contains('?')) {
        return false;
    }
    unescape_string(s, UnescapeStringStyle::Script(UnescapeFlags::SPECIAL))
        .is_some_and(|unescaped| wildcard_has_internal(unescaped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future_feature_flags::scoped_test;
    use crate::parse_util::parse_util_unescape_wildcards;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    #[test]
    #[serial]
    fn test_wildcards() {
        assert!(!wildcard_has(L!("")));
        assert!(wildcard_has(L!("*")));
        assert!(!wildcard_has(L!("\\*")));
        assert!(!wildcard_has(L!("'*'")));

        let wc = L!("foo*bar");
        assert!(wildcard_has(wc) && !wildcard_has_internal(wc));
        let wc = unescape_string(wc, UnescapeStringStyle::Script(UnescapeFlags::SPECIAL)).unwrap();
        assert!(!wildcard_has(&wc) && wildcard_has_internal(&wc));

        scoped_test(FeatureFlag::qmark_noglob, false, || {
            assert!(wildcard_has(L!("?")));
            assert!(!wildcard_has(L!("\\?")));
        });

        scoped_test(FeatureFlag::qmark_noglob, true, || {
            assert!(!wildcard_has(L!("?")));
            assert!(!wildcard_has(L!("\\?")));
        });
    }

    #[test]
    #[serial]
    fn test_wildcard_match() {
        let m = |name: &str, pattern: &str, hidden: bool| {
            let wc = parse_util_unescape_wildcards(&WString::from_str(pattern));
            wildcard_match(WString::from_str(name), wc, hidden)
        };
        assert!(m("foo.txt", "*.txt", true));
        assert!(m("foo.txt", "f?o.*", true));
        assert!(!m("foo.txt", "*.md", true));
        assert!(m("abcabd", "*abd", true));
        assert!(m("aXbXc", "a*b*c", true));
        assert!(!m("aXbX", "a*b*c", true));
        assert!(!m(".hidden", "*", true));
        assert!(!m(".hidden", "?hidden", true));
        assert!(m(".hidden", "*", false));
        assert!(m(".hidden", ".*", true));
        assert!(!m(".", "*", true));
        assert!(m("..", "..", true));
        assert!(m("", "*", true));
        assert!(!m("", "?", true));
        assert!(!m("ab", "abc", true));
    }

    #[test]
    fn test_wildcard_complete() {
        let mut out = CompletionReceiver::new(usize::MAX);
        let flags = ExpandFlags::FOR_COMPLETIONS;
        let none = CompleteFlags::empty();

        // A plain prefix only appends the rest.
        let res = wildcard_complete(L!("foobar"), L!("foo"), L!("file"), Some(&mut out), flags, none);
        assert_eq!(res, WildcardResult::Match);
        assert_eq!(out[0].completion, "bar");
        assert_eq!(out[0].description, "file");
        assert!(!out[0].replaces_token());

        // A different case replaces the token.
        let res = wildcard_complete(L!("Foobar"), L!("foo"), L!(""), Some(&mut out), flags, none);
        assert_eq!(res, WildcardResult::Match);
        assert_eq!(out[1].completion, "Foobar");
        assert!(out[1].replaces_token());

        // So does looking past a wildcard.
        let mut wc = L!("f").to_owned();
        wc.push(ANY_STRING);
        wc.push('r');
        let res = wildcard_complete(L!("foobar"), &wc, L!(""), Some(&mut out), flags, none);
        assert_eq!(res, WildcardResult::Match);
        assert_eq!(out[2].completion, "foobar");
        assert!(out[2].replaces_token());

        let quiet = flags | ExpandFlags::NO_DESCRIPTIONS;
        let res = wildcard_complete(L!("foo"), L!("fo"), L!("file"), Some(&mut out), quiet, none);
        assert_eq!(res, WildcardResult::Match);
        assert!(out[3].description.is_empty());

        let check = |s: &str, wc: &wstr| {
            wildcard_complete(&WString::from_str(s), wc, L!(""), None, flags, none)
        };
        assert_eq!(check(".hidden", L!("")), WildcardResult::NoMatch);
        assert_eq!(check(".hidden", L!(".h")), WildcardResult::Match);
        assert_eq!(check("ab", L!("abc")), WildcardResult::NoMatch);

        let mut full = CompletionReceiver::new(0);
        assert_eq!(
            wildcard_complete(L!("foo"), L!("f"), L!(""), Some(&mut full), flags, none),
            WildcardResult::Overflow
        );
    }

    #[test]
    fn test_file_descriptions() {
        let entry = |is_dir, is_link, is_executable| DirEntry {
            is_dir,
            is_link,
            is_executable,
            ..DirEntry::file(L!("x"))
        };
        assert_eq!(entry(true, false, false).description(), "directory");
        assert_eq!(entry(true, true, false).description(), "dir symlink");
        assert_eq!(entry(false, true, true).description(), "command link");
        assert_eq!(entry(false, true, false).description(), "symlink");
        assert_eq!(entry(false, false, true).description(), "command");
        assert_eq!(entry(false, false, false).description(), "file");
    }

    /// A scratch directory removed on drop.
    struct ScratchDir(PathBuf);

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_fs_lister() {
        let root = std::env::temp_dir().join(format!("fish-expand-lister-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let scratch = ScratchDir(root.clone());
        fs::create_dir_all(root.join("dir")).unwrap();
        fs::write(root.join("plain"), "").unwrap();
        fs::write(root.join(".hidden"), "").unwrap();
        fs::write(root.join("tool"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(root.join("tool"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(root.join("plain"), fs::Permissions::from_mode(0o644)).unwrap();
        std::os::unix::fs::symlink("dir", root.join("dirlink")).unwrap();
        std::os::unix::fs::symlink("tool", root.join("toollink")).unwrap();
        std::os::unix::fs::symlink("missing", root.join("broken")).unwrap();

        let path = str2wcstring(root.as_os_str().as_bytes());
        let lister = FsDirectoryLister;
        let mut entries = lister.list(&path, false).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<String> = entries.iter().map(|e| e.name.to_string()).collect();
        assert_eq!(
            names,
            [".hidden", "broken", "dir", "dirlink", "plain", "tool", "toollink"]
        );

        let get = |name: &str| entries.iter().find(|e| e.name == name).unwrap();
        assert!(get("dir").is_dir && !get("dir").is_link && !get("dir").is_executable);
        assert!(get("dirlink").is_dir && get("dirlink").is_link);
        assert_eq!(get("dirlink").file_id, get("dir").file_id);
        assert!(get("dirlink").file_id.is_some());
        assert!(get("broken").is_link && !get("broken").is_dir);
        assert_eq!(get("broken").file_id, None);
        assert!(get("tool").is_executable && !get("tool").is_link);
        assert!(get("toollink").is_executable && get("toollink").is_link);
        assert!(!get("plain").is_executable);
        assert_eq!(get("toollink").description(), "command link");
        assert_eq!(get(".hidden").description(), "file");

        let with_dots = lister.list(&path, true).unwrap();
        assert_eq!(with_dots.len(), entries.len() + 2);
        assert!(with_dots.iter().any(|e| e.name == "." && e.is_dir));
        assert!(with_dots.iter().any(|e| e.name == ".." && e.is_dir));

        assert!(lister.exists(&path));
        assert!(lister.exists(&(path.clone() + L!("/dirlink"))));
        assert!(!lister.exists(&(path.clone() + L!("/broken"))));
        assert!(lister.list(&(path.clone() + L!("/plain")), false).is_err());
        drop(scratch);
        assert!(!lister.exists(&path));
    }
}
