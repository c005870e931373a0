//! Decimal integers read out of wide strings.

use crate::wchar::wstr;
use num_traits::{NumCast, PrimInt};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    Overflow,
    Empty,
    InvalidDigit,
    CharsLeft,
}

/// Only decimal is recognized; slice indexes and similar user-facing numbers take no radix
/// prefixes.
#[derive(Debug, Copy, Clone)]
pub struct Options {
    /// Skip whitespace before the number.
    pub leading_whitespace: bool,
    /// Accept a leading `+` or `-`.
    pub sign_prefix: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            leading_whitespace: true,
            sign_prefix: true,
        }
    }
}

fn whitespace_len(chars: &[char]) -> usize {
    chars.iter().take_while(|c| c.is_whitespace()).count()
}

/// Fit a magnitude and sign into `Int`. A minus sign on an unsigned type is an invalid digit,
/// except in front of zero.
fn with_sign<Int: PrimInt>(magnitude: u64, negative: bool) -> Result<Int, Error> {
    if !negative || magnitude == 0 {
        return <Int as NumCast>::from(magnitude).ok_or(Error::Overflow);
    }
    if Int::min_value() == Int::zero() {
        return Err(Error::InvalidDigit);
    }
    let value = i64::try_from(-<i128 as From<u64>>::from(magnitude)).map_err(|_| Error::Overflow)?;
    <Int as NumCast>::from(value).ok_or(Error::Overflow)
}

/// Parse a decimal integer from the start of `src`, storing how many chars it covered in
/// `out_consumed`. Whatever follows the digits is left alone.
pub fn wcstoi_partial<Int: PrimInt>(
    src: &wstr,
    options: Options,
    out_consumed: &mut usize,
) -> Result<Int, Error> {
    let chars = src.as_char_slice();
    let mut pos = 0;
    if options.leading_whitespace {
        pos = whitespace_len(chars);
    }
    *out_consumed = pos;

    let negative = match chars.get(pos) {
        None => return Err(Error::Empty),
        Some(&sign @ ('+' | '-')) if options.sign_prefix => {
            pos += 1;
            sign == '-'
        }
        Some(_) => false,
    };
    let digits = &chars[pos..];
    let len = digits.iter().take_while(|c| c.is_ascii_digit()).count();
    if len == 0 {
        return Err(Error::InvalidDigit);
    }
    *out_consumed = pos + len;

    let magnitude = digits[..len]
        .iter()
        .filter_map(|c| c.to_digit(10))
        .try_fold(0u64, |acc, d| acc.checked_mul(10)?.checked_add(<u64 as From<_>>::from(d)))
        .ok_or(Error::Overflow)?;
    with_sign(magnitude, negative)
}

/// Parse a decimal integer that makes up all of `src`, apart from surrounding whitespace.
pub fn wcstoi<Int: PrimInt>(src: &wstr) -> Result<Int, Error> {
    let mut consumed = 0;
    let value = wcstoi_partial(src, Options::default(), &mut consumed)?;
    let rest = &src.as_char_slice()[consumed..];
    if whitespace_len(rest) != rest.len() {
        return Err(Error::CharsLeft);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wchar::L;

    #[test]
    fn test_wcstoi_partial() {
        let mut consumed = 0;
        let r: Result<i64, _> = wcstoi_partial(L!("-12..3]"), Options::default(), &mut consumed);
        assert_eq!((r, consumed), (Ok(-12), 3));

        let r: Result<i64, _> = wcstoi_partial(L!("  7]"), Options::default(), &mut consumed);
        assert_eq!((r, consumed), (Ok(7), 3));

        let r: Result<i64, _> = wcstoi_partial(L!("+5"), Options::default(), &mut consumed);
        assert_eq!((r, consumed), (Ok(5), 2));

        let no_sign = Options {
            leading_whitespace: false,
            sign_prefix: false,
        };
        let r: Result<i64, _> = wcstoi_partial(L!("-5"), no_sign, &mut consumed);
        assert_eq!(r, Err(Error::InvalidDigit));
        let r: Result<i64, _> = wcstoi_partial(L!(" 5"), no_sign, &mut consumed);
        assert_eq!(r, Err(Error::InvalidDigit));

        let r: Result<i64, _> = wcstoi_partial(L!("x"), Options::default(), &mut consumed);
        assert_eq!(r, Err(Error::InvalidDigit));
        let r: Result<i64, _> = wcstoi_partial(L!("   "), Options::default(), &mut consumed);
        assert_eq!(r, Err(Error::Empty));
        let r: Result<i64, _> =
            wcstoi_partial(L!("99999999999999999999"), Options::default(), &mut consumed);
        assert_eq!(r, Err(Error::Overflow));
    }

    #[test]
    fn test_wcstoi() {
        assert_eq!(wcstoi::<i32>(L!(" 42 ")), Ok(42));
        assert_eq!(wcstoi::<i32>(L!("42x")), Err(Error::CharsLeft));
        assert_eq!(wcstoi::<u8>(L!("-1")), Err(Error::InvalidDigit));
        assert_eq!(wcstoi::<u8>(L!("-0")), Ok(0));
        assert_eq!(wcstoi::<i64>(L!("-9223372036854775808")), Ok(i64::MIN));
        assert_eq!(wcstoi::<i64>(L!("9223372036854775808")), Err(Error::Overflow));
        assert_eq!(wcstoi::<i8>(L!("300")), Err(Error::Overflow));
        assert_eq!(wcstoi::<i8>(L!("-128")), Ok(i8::MIN));
    }
}
