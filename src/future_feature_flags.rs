//! Process-wide switches for syntax that changes between releases.
//!
//! Each flag has a default, belongs to the release group that first turned it on, and can be
//! toggled by name from a comma-separated string such as `"qmark-noglob,no-remove-percent-self"`.

use crate::wchar::prelude::*;
use crate::wcstringutil::trim;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(test)]
use std::cell::Cell;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureFlag {
    /// `?` is an ordinary character instead of a single-char glob.
    qmark_noglob,
    /// `%self` is left alone instead of becoming the pid.
    remove_percent_self,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 2] = [FeatureFlag::qmark_noglob, FeatureFlag::remove_percent_self];

    /// The name used to toggle the flag.
    pub fn name(self) -> &'static wstr {
        match self {
            FeatureFlag::qmark_noglob => L!("qmark-noglob"),
            FeatureFlag::remove_percent_self => L!("remove-percent-self"),
        }
    }

    /// The release group which turns the flag on.
    pub fn group(self) -> &'static wstr {
        match self {
            FeatureFlag::qmark_noglob => L!("3.0"),
            FeatureFlag::remove_percent_self => L!("4.0"),
        }
    }

    pub fn description(self) -> &'static wstr {
        match self {
            FeatureFlag::qmark_noglob => L!("? no longer globs"),
            FeatureFlag::remove_percent_self => L!("%self is no longer expanded (use $fish_pid)"),
        }
    }

    pub fn default_value(self) -> bool {
        false
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// One value per flag. Atomics keep readers on other threads consistent.
pub struct FeatureSet {
    values: [AtomicBool; FeatureFlag::ALL.len()],
}

impl FeatureSet {
    const fn new() -> Self {
        // Every flag currently defaults to off.
        FeatureSet {
            values: [AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    pub fn get(&self, flag: FeatureFlag) -> bool {
        self.values[flag.slot()].load(Ordering::Relaxed)
    }

    pub fn set(&self, flag: FeatureFlag, value: bool) {
        self.values[flag.slot()].store(value, Ordering::Relaxed);
    }

    /// Apply a comma-separated list of flag names or group names, each optionally prefixed with
    /// `no-`. The group `all` names every flag. Unknown names are ignored so that a newer
    /// configuration still works with an older build.
    pub fn apply(&self, names: &wstr) {
        for entry in names.split(',') {
            let entry = trim(entry.to_owned(), None);
            if entry.is_empty() {
                continue;
            }
            let (name, value) = match entry.strip_prefix("no-") {
                Some(rest) => (rest, false),
                None => (entry.as_utfstr(), true),
            };
            let by_name = FeatureFlag::ALL.into_iter().find(|f| f.name() == name);
            match by_name {
                Some(flag) => self.set(flag, value),
                None => {
                    for flag in FeatureFlag::ALL {
                        if name == L!("all") || flag.group() == name {
                            self.set(flag, value);
                        }
                    }
                }
            }
        }
    }
}

static FEATURES: FeatureSet = FeatureSet::new();

#[cfg(test)]
thread_local! {
    static OVERRIDE: Cell<Option<(FeatureFlag, bool)>> = const { Cell::new(None) };
}

/// Whether `flag` is on.
pub fn feature_test(flag: FeatureFlag) -> bool {
    #[cfg(test)]
    {
        if let Some((overridden, value)) = OVERRIDE.with(Cell::get) {
            if overridden == flag {
                return value;
            }
        }
    }
    FEATURES.get(flag)
}

/// Update the process-wide flags from a comma-separated string, see [`FeatureSet::apply`].
pub fn set_from_string(names: &wstr) {
    FEATURES.apply(names);
}

/// Run `f` with `flag` forced to `value` on this thread only. Scopes do not nest.
#[cfg(test)]
pub fn scoped_test(flag: FeatureFlag, value: bool, f: impl FnOnce()) {
    struct Reset;
    impl Drop for Reset {
        fn drop(&mut self) {
            OVERRIDE.with(|o| o.set(None));
        }
    }

    assert!(
        OVERRIDE.with(Cell::get).is_none(),
        "scoped_test() does not support nesting"
    );
    OVERRIDE.with(|o| o.set(Some((flag, value))));
    let _reset = Reset;
    f();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_apply() {
        let set = FeatureSet::new();
        assert!(!set.get(FeatureFlag::qmark_noglob));
        set.apply(L!("qmark-noglob,nonsense"));
        assert!(set.get(FeatureFlag::qmark_noglob));
        set.apply(L!(" no-qmark-noglob , remove-percent-self"));
        assert!(!set.get(FeatureFlag::qmark_noglob));
        assert!(set.get(FeatureFlag::remove_percent_self));
        set.apply(L!("no-all"));
        assert!(!set.get(FeatureFlag::remove_percent_self));
        set.apply(L!("3.0"));
        assert!(set.get(FeatureFlag::qmark_noglob));
        assert!(!set.get(FeatureFlag::remove_percent_self));
    }

    #[test]
    fn test_flag_metadata() {
        for (i, flag) in FeatureFlag::ALL.into_iter().enumerate() {
            assert_eq!(flag.slot(), i);
            assert!(!flag.description().is_empty());
            assert_eq!(FEATURES.get(flag), flag.default_value());
        }
    }

    #[test]
    fn test_scoped() {
        scoped_test(FeatureFlag::qmark_noglob, true, || {
            assert!(feature_test(FeatureFlag::qmark_noglob));
            assert!(!feature_test(FeatureFlag::remove_percent_self));
        });
        assert!(!feature_test(FeatureFlag::qmark_noglob));
    }

    #[test]
    #[should_panic]
    fn test_nested_scopes_not_supported() {
        scoped_test(FeatureFlag::qmark_noglob, true, || {
            scoped_test(FeatureFlag::qmark_noglob, false, || {});
        });
    }
}
