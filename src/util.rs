//! Ordering of file names.

use crate::wchar::prelude::*;
use std::cmp::Ordering;

/// Order names the way glob results are listed: letters compare case-insensitively and a run of
/// digits compares by value, so `file5` sorts before `file12`. Names that tie this way, such as
/// `a1` and `A01`, fall back to plain char order so the result is still total.
pub fn wcsfilecmp_glob(a: &wstr, b: &wstr) -> Ordering {
    let (mut x, mut y) = (a.as_char_slice(), b.as_char_slice());
    loop {
        let ord = match (x.first(), y.first()) {
            (None, None) => return a.as_char_slice().cmp(b.as_char_slice()),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) if ac.is_ascii_digit() && bc.is_ascii_digit() => {
                let (an, arest) = split_number(x);
                let (bn, brest) = split_number(y);
                x = arest;
                y = brest;
                an.len().cmp(&bn.len()).then_with(|| an.cmp(bn))
            }
            (Some(&ac), Some(&bc)) => {
                x = &x[1..];
                y = &y[1..];
                fold(ac).cmp(&fold(bc))
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Split a leading number into its significant digits and the remainder. Leading zeros and any
/// whitespace after the number are dropped.
fn split_number(s: &[char]) -> (&[char], &[char]) {
    let zeros = s.iter().take_while(|&&c| c == '0').count();
    let digits = s[zeros..].iter().take_while(|c| c.is_ascii_digit()).count();
    let (number, rest) = s[zeros..].split_at(digits);
    let spaces = rest.iter().take_while(|c| c.is_whitespace()).count();
    (number, &rest[spaces..])
}
