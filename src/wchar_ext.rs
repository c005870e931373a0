use std::fmt::Display;

use crate::wchar::{wstr, WString};

/// Format anything displayable as a wide string.
pub trait ToWString {
    fn to_wstring(&self) -> WString;
}

impl<T: Display + ?Sized> ToWString for T {
    fn to_wstring(&self) -> WString {
        WString::from_str(&self.to_string())
    }
}

/// A needle for [`WExt::starts_with`] and friends: a char, a `&str`, or a wide string.
pub trait Affix {
    /// Length of the needle in chars.
    fn char_len(&self) -> usize;

    /// Whether `chars` is exactly the needle. Callers guarantee the lengths agree.
    fn is_exactly(&self, chars: &[char]) -> bool;
}

impl Affix for char {
    fn char_len(&self) -> usize {
        1
    }
    fn is_exactly(&self, chars: &[char]) -> bool {
        chars == [*self]
    }
}

impl Affix for &str {
    fn char_len(&self) -> usize {
        self.chars().count()
    }
    fn is_exactly(&self, chars: &[char]) -> bool {
        self.chars().eq(chars.iter().copied())
    }
}

impl Affix for &wstr {
    fn char_len(&self) -> usize {
        self.len()
    }
    fn is_exactly(&self, chars: &[char]) -> bool {
        self.as_char_slice() == chars
    }
}

impl Affix for &WString {
    fn char_len(&self) -> usize {
        self.len()
    }
    fn is_exactly(&self, chars: &[char]) -> bool {
        self.as_char_slice() == chars
    }
}

/// The pieces of a wide string between occurrences of a separator char.
pub struct SplitChar<'a> {
    rest: Option<&'a wstr>,
    sep: char,
}

impl<'a> Iterator for SplitChar<'a> {
    type Item = &'a wstr;

    fn next(&mut self) -> Option<&'a wstr> {
        let rest = self.rest.take()?;
        match rest.find_char(self.sep) {
            Some(idx) => {
                self.rest = Some(rest.slice_from(idx + 1));
                Some(rest.slice_to(idx))
            }
            None => Some(rest),
        }
    }
}

/// Char-indexed helpers shared by `wstr` and `WString`.
pub trait WExt {
    fn as_char_slice(&self) -> &[char];

    fn slice_from(&self, start: usize) -> &wstr {
        wstr::from_char_slice(&self.as_char_slice()[start..])
    }

    fn slice_to(&self, end: usize) -> &wstr {
        wstr::from_char_slice(&self.as_char_slice()[..end])
    }

    /// The char at `index`, or NUL one past the end. Panics further out.
    fn char_at(&self, index: usize) -> char {
        let chars = self.as_char_slice();
        if index == chars.len() {
            return '\0';
        }
        chars[index]
    }

    /// Split on every `sep`. An empty string yields one empty piece.
    fn split(&self, sep: char) -> SplitChar<'_> {
        SplitChar {
            rest: Some(wstr::from_char_slice(self.as_char_slice())),
            sep,
        }
    }

    fn find_char(&self, c: char) -> Option<usize> {
        self.as_char_slice().iter().position(|&x| x == c)
    }

    fn contains(&self, c: char) -> bool {
        self.as_char_slice().contains(&c)
    }

    fn starts_with<A: Affix>(&self, affix: A) -> bool {
        let chars = self.as_char_slice();
        let n = affix.char_len();
        n <= chars.len() && affix.is_exactly(&chars[..n])
    }

    fn ends_with<A: Affix>(&self, affix: A) -> bool {
        let chars = self.as_char_slice();
        let n = affix.char_len();
        n <= chars.len() && affix.is_exactly(&chars[chars.len() - n..])
    }

    fn strip_prefix<A: Affix>(&self, affix: A) -> Option<&wstr> {
        let n = affix.char_len();
        self.starts_with(affix).then(|| self.slice_from(n))
    }
}

impl WExt for WString {
    fn as_char_slice(&self) -> &[char] {
        self.as_utfstr().as_char_slice()
    }
}

impl WExt for wstr {
    fn as_char_slice(&self) -> &[char] {
        wstr::as_char_slice(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wchar::L;

    #[test]
    fn test_affixes() {
        let path = L!("~/src/fish");
        assert!(path.starts_with('~'));
        assert!(path.starts_with("~/"));
        assert!(path.starts_with(L!("~/src")));
        assert!(!path.starts_with("~/src/fish/more"));
        assert!(path.ends_with("fish"));
        assert!(!L!("").ends_with('/'));
        let home = WString::from_str("~/");
        assert_eq!(path.strip_prefix(&home), Some(L!("src/fish")));
        assert_eq!(path.strip_prefix("/"), None);
    }

    #[test]
    fn test_char_at_and_find() {
        let s = L!("a/b");
        assert_eq!(s.char_at(1), '/');
        assert_eq!(s.char_at(3), '\0');
        assert_eq!(s.find_char('b'), Some(2));
        assert!(!s.contains('c'));
        assert_eq!(std::process::id().to_wstring(), std::process::id().to_string().as_str());
    }

    #[test]
    fn test_split() {
        let pieces = |s: &'static str, sep| -> Vec<WString> {
            WString::from_str(s).split(sep).map(|p| p.to_owned()).collect()
        };
        assert_eq!(pieces("", ':'), &[""]);
        assert_eq!(pieces("/bin::/usr/bin:", ':'), &["/bin", "", "/usr/bin", ""]);
        assert_eq!(pieces("echo", ' '), &["echo"]);
    }
}
