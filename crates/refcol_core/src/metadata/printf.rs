//! # Printf-Style Templates
//!
//! Formatted metadata arrives as a C format string plus arguments. This
//! renders the common conversions without trusting that the argument kinds
//! match the template.
//!
//! Supported: `%d %i %u %x %X %o %f %F %e %E %s %c %%`, flags `- 0 + #` and
//! space, width, precision. Length modifiers are accepted and ignored.

use std::iter::Peekable;
use std::str::Chars;

/// Rendered for a conversion with no argument left.
pub const MISSING_ARG: &str = "<missing>";

/// Rendered for an argument that cannot satisfy its conversion.
pub const BAD_ARG: &str = "<bad arg>";

/// Width and precision are clamped to this many characters.
const MAX_FIELD: usize = 512;

/// One argument for a formatted metadata template.
#[derive(Clone, Debug, PartialEq)]
pub enum FormatArg {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point value.
    Float(f64),
    /// Text.
    Str(String),
    /// Single character.
    Char(char),
}

impl FormatArg {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v < u64::MAX as f64 => Some(*v as u64),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Char(c) => Some(c.to_string()),
            _ => None,
        }
    }

    fn as_char(&self) -> Option<char> {
        match self {
            Self::Char(c) => Some(*c),
            Self::Int(_) | Self::UInt(_) => char::from_u32(u32::try_from(self.as_u64()?).ok()?),
            _ => None,
        }
    }
}

macro_rules! impl_arg_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for FormatArg {
                fn from(value: $ty) -> Self {
                    Self::$variant($conv(value))
                }
            }
        )*
    };
}

impl_arg_from! {
    i64 => Int(std::convert::identity),
    i32 => Int(i64::from),
    u64 => UInt(std::convert::identity),
    u32 => UInt(u64::from),
    f64 => Float(std::convert::identity),
    f32 => Float(f64::from),
    String => Str(std::convert::identity),
    &str => Str(str::to_owned),
    char => Char(std::convert::identity),
}

/// A parsed conversion specification.
#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conv: char,
}

impl Spec {
    /// Parses everything after a `%`, echoing consumed characters to `raw`
    /// so an unsupported conversion can be emitted literally.
    fn parse(chars: &mut Peekable<Chars<'_>>, raw: &mut String) -> Option<Self> {
        let mut spec = Self::default();

        while let Some(&c) = chars.peek() {
            match c {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '#' => spec.alt = true,
                _ => break,
            }
            raw.push(c);
            chars.next();
        }

        spec.width = parse_number(chars, raw);
        if chars.peek() == Some(&'.') {
            raw.push('.');
            chars.next();
            spec.precision = Some(parse_number(chars, raw).unwrap_or(0));
        }

        while let Some(&c) = chars.peek() {
            if !matches!(c, 'h' | 'l' | 'L' | 'z' | 'j' | 't' | 'q') {
                break;
            }
            raw.push(c);
            chars.next();
        }

        let conv = chars.next()?;
        raw.push(conv);
        matches!(
            conv,
            'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'f' | 'F' | 'e' | 'E' | 's' | 'c' | '%'
        )
        .then_some(Self { conv, ..spec })
    }

    fn render(&self, arg: &FormatArg) -> Option<String> {
        match self.conv {
            'd' | 'i' => arg.as_i64().map(|v| self.signed(v)),
            'u' => arg.as_u64().map(|v| self.unsigned(v.to_string(), "")),
            'x' => arg
                .as_u64()
                .map(|v| self.unsigned(format!("{v:x}"), if self.alt && v != 0 { "0x" } else { "" })),
            'X' => arg
                .as_u64()
                .map(|v| self.unsigned(format!("{v:X}"), if self.alt && v != 0 { "0X" } else { "" })),
            'o' => arg
                .as_u64()
                .map(|v| self.unsigned(format!("{v:o}"), if self.alt && v != 0 { "0" } else { "" })),
            'f' | 'F' | 'e' | 'E' => arg.as_f64().map(|v| self.float(v)),
            's' => arg.as_text().map(|text| {
                let body: String = match self.precision {
                    Some(max) => text.chars().take(max.min(MAX_FIELD)).collect(),
                    None => text,
                };
                self.pad("", &body, false)
            }),
            'c' => arg.as_char().map(|c| self.pad("", &c.to_string(), false)),
            _ => None,
        }
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    /// Applies integer precision (minimum digit count).
    fn digits(&self, digits: String, is_zero: bool) -> String {
        match self.precision {
            Some(0) if is_zero => String::new(),
            Some(min) if digits.len() < min.min(MAX_FIELD) => {
                let mut padded = "0".repeat(min.min(MAX_FIELD) - digits.len());
                padded.push_str(&digits);
                padded
            }
            _ => digits,
        }
    }

    fn signed(&self, value: i64) -> String {
        let digits = self.digits(value.unsigned_abs().to_string(), value == 0);
        self.pad(self.sign(value < 0), &digits, self.precision.is_none())
    }

    fn unsigned(&self, digits: String, prefix: &str) -> String {
        let is_zero = digits == "0";
        let digits = self.digits(digits, is_zero);
        self.pad(prefix, &digits, self.precision.is_none())
    }

    fn float(&self, value: f64) -> String {
        let upper = self.conv.is_ascii_uppercase();
        let sign = self.sign(value.is_sign_negative() && !value.is_nan());

        if !value.is_finite() {
            let body = if value.is_nan() { "nan" } else { "inf" };
            let body = if upper { body.to_ascii_uppercase() } else { body.to_owned() };
            return self.pad(sign, &body, false);
        }

        let precision = self.precision.unwrap_or(6).min(MAX_FIELD);
        let magnitude = value.abs();
        let body = match self.conv {
            'e' | 'E' => c_exponent(magnitude, precision, upper),
            _ => format!("{magnitude:.precision$}"),
        };
        self.pad(sign, &body, true)
    }

    /// Pads `prefix` + `body` to the field width.
    fn pad(&self, prefix: &str, body: &str, zero_allowed: bool) -> String {
        let len = prefix.chars().count() + body.chars().count();
        let width = self.width.unwrap_or(0).min(MAX_FIELD);
        let fill = width.saturating_sub(len);

        let mut out = String::with_capacity(len + fill);
        if self.left {
            out.push_str(prefix);
            out.push_str(body);
            out.extend(std::iter::repeat(' ').take(fill));
        } else if self.zero && zero_allowed {
            out.push_str(prefix);
            out.extend(std::iter::repeat('0').take(fill));
            out.push_str(body);
        } else {
            out.extend(std::iter::repeat(' ').take(fill));
            out.push_str(prefix);
            out.push_str(body);
        }
        out
    }
}

fn parse_number(chars: &mut Peekable<Chars<'_>>, raw: &mut String) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(&c) = chars.peek() {
        let Some(digit) = c.to_digit(10) else {
            break;
        };
        value = Some(
            value
                .unwrap_or(0)
                .saturating_mul(10)
                .saturating_add(digit as usize),
        );
        raw.push(c);
        chars.next();
    }
    value
}

/// `%e` layout: mantissa, `e`, explicit exponent sign, at least two digits.
fn c_exponent(magnitude: f64, precision: usize, upper: bool) -> String {
    let rust = format!("{magnitude:.precision$e}");
    let (mantissa, exponent) = rust.split_once('e').unwrap_or((rust.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or_default();
    let marker = if upper { 'E' } else { 'e' };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}{marker}{sign}{:02}", exponent.unsigned_abs())
}

/// Renders `template` with `args`.
///
/// Never fails: missing arguments render [`MISSING_ARG`], mismatched ones
/// [`BAD_ARG`], unsupported conversions are copied through literally.
#[must_use]
pub fn render(template: &str, args: &[FormatArg]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut raw = String::from('%');
        let Some(spec) = Spec::parse(&mut chars, &mut raw) else {
            out.push_str(&raw);
            continue;
        };

        if spec.conv == '%' {
            out.push('%');
            continue;
        }

        match args.next() {
            Some(arg) => out.push_str(spec.render(arg).as_deref().unwrap_or(BAD_ARG)),
            None => out.push_str(MISSING_ARG),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[FormatArg]) -> Vec<FormatArg> {
        list.to_vec()
    }

    #[test]
    fn test_basic_conversions() {
        let out = render("x=%d y=%s", &args(&[5i64.into(), "hi".into()]));
        assert_eq!(out, "x=5 y=hi");
        assert_eq!(render("%lu/%lld/%hd", &[7u64.into(), (-8i64).into(), 9i32.into()]), "7/-8/9");
    }

    #[test]
    fn test_width_and_flags() {
        let v: FormatArg = 42i64.into();
        assert_eq!(render("%5d|%-5d|%05d", &[v.clone(), v.clone(), v]), "   42|42   |00042");
        assert_eq!(render("%05d", &[(-42i64).into()]), "-0042");
        assert_eq!(render("%+d % d", &[5i64.into(), 5i64.into()]), "+5  5");
        assert_eq!(render("%.3d", &[7i64.into()]), "007");
    }

    #[test]
    fn test_radix_conversions() {
        let v: FormatArg = 255u64.into();
        assert_eq!(
            render("%x %X %#x %o", &[v.clone(), v.clone(), v.clone(), v]),
            "ff FF 0xff 377"
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(render("%f", &[1.5f64.into()]), "1.500000");
        assert_eq!(render("%.2f", &[3.14159f64.into()]), "3.14");
        assert_eq!(render("%e", &[1500.0f64.into()]), "1.500000e+03");
        assert_eq!(render("%.1E", &[0.00025f64.into()]), "2.5E-04");
        assert_eq!(render("%8.3f", &[(-2.5f64).into()]), "  -2.500");
        assert_eq!(render("%f", &[f64::INFINITY.into()]), "inf");
    }

    #[test]
    fn test_text_and_chars() {
        assert_eq!(render("%.3s|%-4s|", &["abcdef".into(), "ab".into()]), "abc|ab  |");
        assert_eq!(render("%c%c", &['z'.into(), 65u64.into()]), "zA");
    }

    #[test]
    fn test_lossless_conversions() {
        assert_eq!(render("%d", &[7u64.into()]), "7");
        assert_eq!(render("%f", &[2i64.into()]), "2.000000");
        assert_eq!(render("%u", &[3.0f64.into()]), "3");
    }

    #[test]
    fn test_mismatch_and_missing() {
        assert_eq!(render("%d", &["text".into()]), BAD_ARG);
        assert_eq!(render("%u", &[(-1i64).into()]), BAD_ARG);
        assert_eq!(render("%s %d", &["a".into()]), "a <missing>");
    }

    #[test]
    fn test_literals() {
        assert_eq!(render("100%%", &[]), "100%");
        assert_eq!(render("odd %y end", &[]), "odd %y end");
        assert_eq!(render("trailing %", &[]), "trailing %");
    }
}
