//! Support for wide strings.
//!
//! There are two wide string types that are commonly used:
//!   - wstr: a string slice without a nul terminator. Like `&str` but wide chars.
//!   - WString: an owning string without a nul terminator. Like `String` but wide chars.
//!
//! Tokens are wide strings because the expansion markers live in a private-use band of
//! code points, which must survive every stage intact.

pub use widestring::{Utf32Str as wstr, Utf32String as WString};

pub mod prelude {
    pub use crate::{
        wchar::{wstr, WString, L},
        wchar_ext::{ToWString, WExt},
    };
}

/// Creates a wstr string slice, like the "L" prefix of C++.
/// The result is of type wstr.
/// It is NOT nul-terminated.
#[macro_export]
macro_rules! L {
    ($string:expr) => {
        widestring::utf32str!($string)
    };
}
pub use L;
