//! Category-based debug output.
//!
//! Every category is a static switch. `FLOG!` and `FLOGF!` test the switch before formatting
//! anything, then write a single line, prefixed with the category name, to the log fd.

use crate::parse_util::parse_util_unescape_wildcards;
use crate::wchar::prelude::*;
use crate::wildcard::wildcard_match;
use crate::wutil::write_to_fd;
use libc::c_int;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

pub struct Category {
    pub name: &'static wstr,
    pub description: &'static wstr,
    enabled: AtomicBool,
}

impl Category {
    const fn new(name: &'static wstr, description: &'static wstr, enabled: bool) -> Self {
        Category {
            name,
            description,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

pub mod categories {
    use super::Category;
    use crate::wchar::L;

    pub static error: Category = Category::new(L!("error"), L!("Serious unexpected errors"), true);
    pub static warning: Category = Category::new(L!("warning"), L!("Warnings"), true);
    pub static debug: Category = Category::new(L!("debug"), L!("Debugging aid"), true);
    pub static expand: Category = Category::new(L!("expand"), L!("Word expansion stages"), false);
    pub static wildcard: Category =
        Category::new(L!("wildcard"), L!("Wildcard matching and directory walks"), false);
    pub static history: Category =
        Category::new(L!("history"), L!("History lookups during expansion"), false);
    pub static abbrs: Category = Category::new(L!("abbrs"), L!("Abbreviation lookups"), false);

    pub static ALL: [&Category; 7] = [
        &error, &warning, &debug, &expand, &wildcard, &history, &abbrs,
    ];
}

/// Where log lines go. Negative turns logging off.
static FLOG_FD: AtomicI32 = AtomicI32::new(libc::STDERR_FILENO);

pub fn set_flog_file_fd(fd: c_int) {
    FLOG_FD.store(fd, Ordering::Relaxed);
}

pub fn get_flog_file_fd() -> c_int {
    FLOG_FD.load(Ordering::Relaxed)
}

/// Write one line for `category`. Each line goes out in a single write, so concurrent writers do
/// not interleave within a line.
pub fn emit(category: &Category, message: &str) {
    let fd = get_flog_file_fd();
    if fd < 0 {
        return;
    }
    let line = format!("{}: {}\n", category.name, message);
    // Losing a log line is not worth reporting.
    let _ = write_to_fd(line.as_bytes(), fd);
}

/// Log the Display form of each argument, separated by spaces.
#[macro_export]
macro_rules! FLOG {
    ($category:ident, $($elem:expr),+ $(,)?) => {
        if $crate::flog::categories::$category.is_enabled() {
            let parts: Vec<String> = vec![$(($elem).to_string()),+];
            $crate::flog::emit(&$crate::flog::categories::$category, &parts.join(" "));
        }
    };
}

/// Log a `format!` string.
#[macro_export]
macro_rules! FLOGF {
    ($category:ident, $fmt:expr $(, $elem:expr)* $(,)?) => {
        if $crate::flog::categories::$category.is_enabled() {
            $crate::flog::emit(&$crate::flog::categories::$category, &format!($fmt $(, $elem)*));
        }
    };
}

#[macro_export]
macro_rules! should_flog {
    ($category:ident) => {
        $crate::flog::categories::$category.is_enabled()
    };
}

pub use {should_flog, FLOG, FLOGF};

/// Turn categories on or off by name. `patterns` is a comma-separated list of globs. A leading
/// `-` turns matching categories off, and `_` may be written for `-`. Returns whether every
/// pattern matched some category.
pub fn activate_flog_categories_by_pattern(patterns: &wstr) -> bool {
    let patterns: WString = patterns
        .chars()
        .map(|c| if c == '_' { '-' } else { c })
        .collect();
    let mut all_matched = true;
    for pattern in patterns.split(',') {
        let (glob, enable) = match pattern.strip_prefix('-') {
            Some(rest) => (rest, false),
            None => (pattern, true),
        };
        let glob = parse_util_unescape_wildcards(glob);
        let mut matched = false;
        for category in categories::ALL {
            if wildcard_match(category.name, &glob, false) {
                category.set_enabled(enable);
                matched = true;
            }
        }
        if !matched {
            FLOG!(warning, "Failed to match debug category:", pattern);
            all_matched = false;
        }
    }
    all_matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_activate_by_pattern() {
        let saved_fd = get_flog_file_fd();
        set_flog_file_fd(-1);

        assert!(activate_flog_categories_by_pattern(L!("exp*,wild*")));
        assert!(should_flog!(expand));
        assert!(should_flog!(wildcard));
        assert!(!should_flog!(abbrs));

        // Underscores stand in for dashes, and "wild-card" names nothing.
        assert!(!activate_flog_categories_by_pattern(L!("-expand,-wild_card")));
        assert!(!should_flog!(expand));
        assert!(should_flog!(wildcard));

        assert!(activate_flog_categories_by_pattern(L!("-wild*")));
        assert!(!should_flog!(wildcard));

        assert!(!activate_flog_categories_by_pattern(L!("no-such-category")));
        set_flog_file_fd(saved_fd);
    }

    #[test]
    #[serial]
    fn test_categories_are_unique() {
        let names: std::collections::HashSet<&wstr> =
            categories::ALL.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), categories::ALL.len());
        assert!(categories::error.is_enabled());
        assert!(!categories::ALL.iter().any(|c| c.description.is_empty()));
    }
}
