use crate::wchar::prelude::*;
use crate::wcstringutil::join_strings;
use bitflags::bitflags;
use std::sync::Arc;

/// Joins the values of a path variable, and splits imported path values.
pub const PATH_ARRAY_SEP: char = ':';
/// Joins the values of any other variable.
pub const NONPATH_ARRAY_SEP: char = ' ';

bitflags! {
    /// Which variables a lookup may see. Empty means all of them.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct EnvMode: u8 {
        const EXPORT = 1 << 0;
        const UNEXPORT = 1 << 1;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct EnvVarFlags: u8 {
        const EXPORT = 1 << 0;
        const PATHVAR = 1 << 1;
    }
}

/// The value of a variable: a list of strings plus flags. Clones share the list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvVar {
    values: Arc<[WString]>,
    flags: EnvVarFlags,
}

impl Default for EnvVar {
    fn default() -> Self {
        Self::new_vec(Vec::new(), EnvVarFlags::empty())
    }
}

impl EnvVar {
    pub fn new(value: WString, flags: EnvVarFlags) -> Self {
        Self::new_vec(vec![value], flags)
    }

    pub fn new_vec(values: Vec<WString>, flags: EnvVarFlags) -> Self {
        EnvVar {
            values: values.into(),
            flags,
        }
    }

    /// A variable named `name`. Names ending in `PATH` become path variables.
    pub fn new_from_name_vec(name: &wstr, values: Vec<WString>) -> Self {
        let mut flags = EnvVarFlags::empty();
        flags.set(EnvVarFlags::PATHVAR, name.ends_with("PATH"));
        Self::new_vec(values, flags)
    }

    pub fn new_from_name(name: &wstr, value: WString) -> Self {
        Self::new_from_name_vec(name, vec![value])
    }

    /// No values at all, or one empty value.
    pub fn is_empty(&self) -> bool {
        match &*self.values {
            [] => true,
            [only] => only.is_empty(),
            _ => false,
        }
    }

    pub fn exports(&self) -> bool {
        self.flags.contains(EnvVarFlags::EXPORT)
    }

    pub fn is_pathvar(&self) -> bool {
        self.flags.contains(EnvVarFlags::PATHVAR)
    }

    pub fn as_list(&self) -> &[WString] {
        &self.values
    }

    /// The values joined by the variable's delimiter.
    pub fn as_string(&self) -> WString {
        join_strings(&self.values, self.get_delimiter())
    }

    pub fn get_delimiter(&self) -> char {
        if self.is_pathvar() {
            PATH_ARRAY_SEP
        } else {
            NONPATH_ARRAY_SEP
        }
    }

    fn with_flag(&self, flag: EnvVarFlags, on: bool) -> Self {
        let mut var = self.clone();
        var.flags.set(flag, on);
        var
    }

    pub fn setting_exports(&self, export: bool) -> Self {
        self.with_flag(EnvVarFlags::EXPORT, export)
    }

    pub fn setting_pathvar(&self, pathvar: bool) -> Self {
        self.with_flag(EnvVarFlags::PATHVAR, pathvar)
    }
}

/// Split each value at colons, the way path variables arrive from the process environment.
pub fn colon_split<T: AsRef<wstr>>(values: &[T]) -> Vec<WString> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(PATH_ARRAY_SEP))
        .map(|piece| piece.to_owned())
        .collect()
}
