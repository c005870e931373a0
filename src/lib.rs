//! Word expansion for fish-style shells.
//!
//! The entry points live in [`expand`]: a raw token produced by the tokenizer is run through
//! command substitution, variable expansion, brace expansion, home directory and `%self`
//! expansion, and finally wildcard expansion.

pub mod abbrs;
pub mod common;
pub mod complete;
pub mod env;
pub mod expand;
pub mod flog;
pub mod future_feature_flags;
pub mod history;
pub mod operation_context;
pub mod parse_constants;
pub mod parse_util;
pub mod path;
pub mod subshell;
pub mod tokenizer;
pub mod util;
pub mod wchar;
pub mod wchar_ext;
pub mod wcstringutil;
pub mod wildcard;
pub mod wutil;
