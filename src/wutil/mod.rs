pub mod wcstoi;

use crate::common::{fish_reserved_codepoint, wcs2string};
use crate::wchar::prelude::*;
use nix::errno::Errno;
use std::ffi::OsString;
use std::os::unix::prelude::*;

pub use wcstoi::*;

/// Convert a wide string to an OsString for use with std::fs.
pub fn wcs2osstring(input: &wstr) -> OsString {
    OsString::from_vec(wcs2string(input))
}

/// Write all of `input` to `fd`, retrying on EINTR. Returns how much was written before the
/// descriptor stopped taking data.
pub fn write_to_fd(mut input: &[u8], fd: RawFd) -> nix::Result<usize> {
    let mut written = 0;
    while !input.is_empty() {
        let amt = unsafe { libc::write(fd, input.as_ptr().cast(), input.len()) };
        match usize::try_from(amt) {
            Ok(0) => break,
            Ok(n) => {
                written += n;
                input = &input[n..];
            }
            Err(_) => match Errno::last() {
                Errno::EINTR => continue,
                err => return Err(err),
            },
        }
    }
    Ok(written)
}

/// Alphanumeric, but never a marker or a private-use code point.
pub fn fish_iswalnum(c: char) -> bool {
    let private_use = matches!(
        u32::from(c),
        0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD
    );
    c.is_alphanumeric() && !private_use && !fish_reserved_codepoint(c)
}

/// Lexically clean up a path: repeated and trailing slashes go, `.` components go, and `..`
/// removes the component before it. A relative path keeps the `..` it cannot resolve; an
/// absolute one drops them. Exactly two leading slashes survive only when
/// `allow_leading_double_slashes` is set. Symlinks are not consulted.
pub fn normalize_path(path: &wstr, allow_leading_double_slashes: bool) -> WString {
    let leading = path.chars().take_while(|&c| c == '/').count();
    let mut parts: Vec<&wstr> = vec![];
    for part in path.split('/') {
        match part.as_char_slice() {
            [] | ['.'] => (),
            ['.', '.'] if parts.last().is_some_and(|p| *p != "..") => {
                parts.pop();
            }
            ['.', '.'] if leading > 0 => (),
            _ => parts.push(part),
        }
    }

    let mut result = WString::new();
    match leading {
        0 => (),
        2 if allow_leading_double_slashes => result.push_str("//"),
        _ => result.push('/'),
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            result.push('/');
        }
        result.push_utfstr(part);
    }
    if result.is_empty() {
        result.push('.');
    }
    result
}
