use crate::env::{EnvMode, EnvVar};
use crate::wchar::prelude::*;
use std::collections::HashMap;

/// Read access to variables.
pub trait Environment {
    fn get(&self, name: &wstr) -> Option<EnvVar> {
        self.getf(name, EnvMode::default())
    }

    /// Look up `name`, seeing only the variables `mode` admits.
    fn getf(&self, name: &wstr, mode: EnvMode) -> Option<EnvVar>;

    /// Names of the variables `mode` admits, sorted.
    fn get_names(&self, mode: EnvMode) -> Vec<WString>;

    /// `$PWD` ending in a slash, or `/` when it is unset or empty.
    fn get_pwd_slash(&self) -> WString {
        let mut pwd = self
            .get_unless_empty(L!("PWD"))
            .map(|var| var.as_string())
            .unwrap_or_default();
        if !pwd.ends_with('/') {
            pwd.push('/');
        }
        pwd
    }

    fn get_unless_empty(&self, name: &wstr) -> Option<EnvVar> {
        self.getf_unless_empty(name, EnvMode::default())
    }

    fn getf_unless_empty(&self, name: &wstr, mode: EnvMode) -> Option<EnvVar> {
        self.getf(name, mode).filter(|var| !var.is_empty())
    }
}

/// No variables at all.
#[derive(Default)]
pub struct EnvNull;

impl EnvNull {
    pub fn new() -> EnvNull {
        EnvNull
    }
}

impl Environment for EnvNull {
    fn getf(&self, _name: &wstr, _mode: EnvMode) -> Option<EnvVar> {
        None
    }

    fn get_names(&self, _mode: EnvMode) -> Vec<WString> {
        Vec::new()
    }
}

/// Asking for both exported and unexported variables is the same as asking for neither.
fn mode_admits(mode: EnvMode, var: &EnvVar) -> bool {
    let exported = mode.contains(EnvMode::EXPORT);
    exported == mode.contains(EnvMode::UNEXPORT) || var.exports() == exported
}

/// A flat table of variables.
/// Callers that own real variable storage implement [`Environment`] themselves; this one serves
/// embedders with a fixed set of variables and the test suite.
#[derive(Clone, Debug, Default)]
pub struct EnvMap {
    vars: HashMap<WString, EnvVar>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable to the given values, inferring its flags from the name.
    pub fn set(&mut self, name: &wstr, values: Vec<WString>) {
        self.vars
            .insert(name.to_owned(), EnvVar::new_from_name_vec(name, values));
    }

    pub fn set_one(&mut self, name: &wstr, value: WString) {
        self.set(name, vec![value]);
    }

    /// Store a prepared variable under a name.
    pub fn set_var(&mut self, name: &wstr, var: EnvVar) {
        self.vars.insert(name.to_owned(), var);
    }

    /// Remove a variable, returning whether it existed.
    pub fn remove(&mut self, name: &wstr) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Snapshot the process environment. Values of path variables are split on colons.
    pub fn from_process_env() -> Self {
        let mut result = Self::new();
        for (key, val) in std::env::vars_os() {
            use std::os::unix::ffi::OsStrExt;
            let name = crate::common::str2wcstring(key.as_bytes());
            let value = crate::common::str2wcstring(val.as_bytes());
            let mut var = EnvVar::new_from_name(&name, value);
            if var.is_pathvar() {
                var = EnvVar::new_from_name_vec(&name, super::colon_split(var.as_list()));
            }
            result.set_var(&name, var.setting_exports(true));
        }
        result
    }
}

impl Environment for EnvMap {
    fn getf(&self, name: &wstr, mode: EnvMode) -> Option<EnvVar> {
        self.vars
            .get(name)
            .filter(|var| mode_admits(mode, var))
            .cloned()
    }

    fn get_names(&self, mode: EnvMode) -> Vec<WString> {
        let mut names: Vec<WString> = self
            .vars
            .iter()
            .filter(|(_, var)| mode_admits(mode, var))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_map() {
        let mut vars = EnvMap::new();
        assert_eq!(vars.get_pwd_slash(), "/");
        vars.set_one(L!("PWD"), L!("/home/me").to_owned());
        assert_eq!(vars.get_pwd_slash(), "/home/me/");

        vars.set(L!("empty"), vec![]);
        assert!(vars.get(L!("empty")).is_some());
        assert!(vars.get_unless_empty(L!("empty")).is_none());

        let exported = EnvVar::new_from_name(L!("TERM"), L!("dumb").to_owned()).setting_exports(true);
        vars.set_var(L!("TERM"), exported);
        assert_eq!(vars.get_names(EnvMode::EXPORT), &["TERM"]);
        assert_eq!(vars.get_names(EnvMode::UNEXPORT), &["PWD", "empty"]);
        assert_eq!(vars.get_names(EnvMode::default()).len(), 3);
        assert!(vars.getf(L!("PWD"), EnvMode::EXPORT).is_none());

        assert!(vars.remove(L!("TERM")));
        assert!(!vars.remove(L!("TERM")));
        assert!(EnvNull::new().get(L!("PWD")).is_none());
    }

    #[test]
    fn test_env_map_from_process_env() {
        let vars = EnvMap::from_process_env();
        for (key, val) in std::env::vars() {
            let var = vars.get(&WString::from_str(&key)).unwrap();
            assert!(var.exports());
            if !var.is_pathvar() {
                assert_eq!(var.as_string(), WString::from_str(&val));
            }
        }
    }
}
