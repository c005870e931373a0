//! Abbreviations, as stored in the environment.
//!
//! Each abbreviation lives in a variable named `_fish_abbr_` followed by the abbreviation's name,
//! escaped with [`EscapeStringStyle::Var`] so that any name makes a valid variable name. The
//! variable's value is the replacement text.

use std::collections::BTreeMap;

use crate::common::{escape_string, unescape_string, EscapeStringStyle, UnescapeStringStyle};
use crate::env::{EnvMode, Environment};
use crate::flog::FLOGF;
use crate::wchar::prelude::*;

/// The prefix shared by all abbreviation variables.
pub const ABBR_VAR_PREFIX: &wstr = L!("_fish_abbr_");

/// Return the name of the variable which holds the abbreviation `name`, or None if the name
/// cannot be an abbreviation.
pub fn abbr_var_name(name: &wstr) -> Option<WString> {
    if name.is_empty() {
        return None;
    }
    let esc_src = escape_string(name, EscapeStringStyle::Var);
    if esc_src.is_empty() {
        return None;
    }
    let mut var_name = ABBR_VAR_PREFIX.to_owned();
    var_name.push_utfstr(&esc_src);
    Some(var_name)
}

/// Given a token, return the replacement for it if it is an abbreviation.
pub fn expand_abbreviation(src: &wstr, vars: &dyn Environment) -> Option<WString> {
    let var_name = abbr_var_name(src)?;
    let replacement = vars.get(&var_name)?.as_string();
    FLOGF!(abbrs, "Expanded abbreviation '{}' to '{}'", src, replacement);
    Some(replacement)
}

/// Return every abbreviation, keyed by its name, in sorted order.
pub fn get_abbreviations(vars: &dyn Environment) -> BTreeMap<WString, WString> {
    let mut result = BTreeMap::new();
    for name in vars.get_names(EnvMode::default()) {
        let Some(escaped) = name.strip_prefix(ABBR_VAR_PREFIX) else {
            continue;
        };
        let Some(key) = unescape_string(escaped, UnescapeStringStyle::Var) else {
            // Someone set a variable that looks like an abbreviation but isn't one.
            FLOGF!(abbrs, "Ignoring badly encoded abbreviation variable '{}'", name);
            continue;
        };
        if let Some(var) = vars.get(&name) {
            result.insert(key, var.as_string());
        }
    }
    result
}
