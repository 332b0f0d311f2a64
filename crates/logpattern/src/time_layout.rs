/*
 * time_layout.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! strftime-style layouts used by `%date{...}`.
//!
//! A layout such as `%Y-%m-%d %H:%M:%S.%3f` is translated once into a list
//! of [`LayoutItem`]s. Known directives map onto chrono formatting items;
//! the fractional-second directive `%<n>f` carries its digit count. Anything
//! else, including unknown directives, is kept as literal text, so rendering
//! a translated layout can never fail.

use chrono::format::StrftimeItems;
use chrono::{DateTime, FixedOffset, Timelike};
use std::fmt::Write;

/// Digits rendered by a fractional-second directive without a count.
pub const DEFAULT_FRACTION_DIGITS: usize = 3;

/// Largest digit count a fractional-second directive renders.
pub const MAX_FRACTION_DIGITS: usize = 18;

/// One translated piece of a layout.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    /// Text copied as-is.
    Literal(String),
    /// A calendar directive, rendered by chrono.
    Format(&'static str),
    /// Fractional seconds with exactly this many digits.
    Fraction(usize),
}

/// A translated layout, ready to format timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeLayout {
    source: String,
    items: Vec<LayoutItem>,
}

/// Map a single directive letter onto its chrono equivalent.
fn directive(letter: char) -> Option<&'static str> {
    let native = match letter {
        'a' => "%a", // weekday, short
        'A' => "%A", // weekday, long
        'w' => "%w", // weekday number, Sunday = 0
        'd' => "%d", // day of month
        'b' => "%b", // month, short
        'B' => "%B", // month, long
        'm' => "%m", // month number
        'y' => "%y", // two-digit year
        'Y' => "%Y", // four-digit year
        'H' => "%H", // hour, 24h
        'I' => "%I", // hour, 12h
        'p' => "%p", // AM/PM
        'M' => "%M", // minute
        'S' => "%S", // second
        'z' => "%z", // numeric zone offset
        'Z' => "%Z", // zone name
        'j' => "%j", // day of year
        _ => return None,
    };
    Some(native)
}

impl TimeLayout {
    /// Translate a strftime-style layout.
    pub fn translate(layout: &str) -> Self {
        let mut items = Vec::new();
        let mut literal = String::new();
        let mut chars = layout.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            // `%<digits>f`
            let mut end = start + 1;
            while let Some(&(i, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                end = i + d.len_utf8();
                chars.next();
            }
            let digits = &layout[start + 1..end];

            match chars.peek().copied() {
                Some((_, 'f')) => {
                    chars.next();
                    let count = fraction_digits(digits);
                    flush_literal(&mut items, &mut literal);
                    items.push(LayoutItem::Fraction(count));
                }
                Some((_, letter)) if digits.is_empty() => match directive(letter) {
                    Some(native) => {
                        chars.next();
                        flush_literal(&mut items, &mut literal);
                        items.push(LayoutItem::Format(native));
                    }
                    None => {
                        // Unknown directive: the `%` and the letter stay literal.
                        literal.push('%');
                    }
                },
                _ => {
                    literal.push('%');
                    literal.push_str(digits);
                }
            }
        }
        flush_literal(&mut items, &mut literal);

        Self {
            source: layout.to_string(),
            items,
        }
    }

    /// The layout this was translated from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    /// Format `time` into `out`.
    pub fn format_into(&self, time: &DateTime<FixedOffset>, out: &mut String) {
        for item in &self.items {
            match item {
                LayoutItem::Literal(text) => out.push_str(text),
                LayoutItem::Format(native) => {
                    // Every directive in the table is valid for a zoned timestamp.
                    let _ = write!(out, "{}", time.format_with_items(StrftimeItems::new(native)));
                }
                LayoutItem::Fraction(digits) => push_fraction(out, time.nanosecond(), *digits),
            }
        }
    }

    pub fn format(&self, time: &DateTime<FixedOffset>) -> String {
        let mut out = String::new();
        self.format_into(time, &mut out);
        out
    }
}

/// Digit count of a `%<digits>f` directive, capped at [`MAX_FRACTION_DIGITS`].
fn fraction_digits(digits: &str) -> usize {
    if digits.is_empty() {
        return DEFAULT_FRACTION_DIGITS;
    }
    match digits.parse::<usize>() {
        Ok(count) if count <= MAX_FRACTION_DIGITS => count,
        _ => {
            tracing::warn!(
                digits,
                max = MAX_FRACTION_DIGITS,
                "fractional-second digit count too large; capping"
            );
            MAX_FRACTION_DIGITS
        }
    }
}

fn flush_literal(items: &mut Vec<LayoutItem>, literal: &mut String) {
    if !literal.is_empty() {
        items.push(LayoutItem::Literal(std::mem::take(literal)));
    }
}

/// Leap seconds report nanoseconds above one billion; they are folded back.
fn push_fraction(out: &mut String, nanos: u32, digits: usize) {
    let nanos = format!("{:09}", nanos % 1_000_000_000);
    if digits <= nanos.len() {
        out.push_str(&nanos[..digits]);
    } else {
        out.push_str(&nanos);
        out.extend(std::iter::repeat_n('0', digits - nanos.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-02T03:04:05.123456789+08:00").unwrap()
    }

    // ========================================================================
    // Translation
    // ========================================================================

    #[test]
    fn test_translate_default_layout() {
        let layout = TimeLayout::translate("%Y-%m-%d %H:%M:%S.%3f");
        assert_eq!(
            layout.items(),
            &[
                LayoutItem::Format("%Y"),
                LayoutItem::Literal("-".to_string()),
                LayoutItem::Format("%m"),
                LayoutItem::Literal("-".to_string()),
                LayoutItem::Format("%d"),
                LayoutItem::Literal(" ".to_string()),
                LayoutItem::Format("%H"),
                LayoutItem::Literal(":".to_string()),
                LayoutItem::Format("%M"),
                LayoutItem::Literal(":".to_string()),
                LayoutItem::Format("%S"),
                LayoutItem::Literal(".".to_string()),
                LayoutItem::Fraction(3),
            ]
        );
    }

    #[test]
    fn test_fraction_digit_counts() {
        assert_eq!(
            TimeLayout::translate("%3f").items(),
            &[LayoutItem::Fraction(3)]
        );
        assert_eq!(
            TimeLayout::translate("%6f").items(),
            &[LayoutItem::Fraction(6)]
        );
        assert_eq!(
            TimeLayout::translate("%f").items(),
            &[LayoutItem::Fraction(DEFAULT_FRACTION_DIGITS)]
        );
    }

    #[test]
    fn test_huge_fraction_counts_are_capped() {
        assert_eq!(
            TimeLayout::translate("%18446744073709551615f").items(),
            &[LayoutItem::Fraction(MAX_FRACTION_DIGITS)]
        );
        assert_eq!(
            TimeLayout::translate("%99999999999999999999999f").items(),
            &[LayoutItem::Fraction(MAX_FRACTION_DIGITS)]
        );
        assert_eq!(
            TimeLayout::translate("%19f").format(&sample()),
            "123456789000000000"
        );
    }

    #[test]
    fn test_unknown_directives_pass_through() {
        let layout = TimeLayout::translate("%Q %5x 100%");
        assert_eq!(
            layout.items(),
            &[LayoutItem::Literal("%Q %5x 100%".to_string())]
        );
        assert_eq!(layout.format(&sample()), "%Q %5x 100%");
    }

    // ========================================================================
    // Formatting
    // ========================================================================

    #[test]
    fn test_format_default_layout() {
        let layout = TimeLayout::translate("%Y-%m-%d %H:%M:%S.%3f");
        assert_eq!(layout.format(&sample()), "2024-01-02 03:04:05.123");
    }

    #[test]
    fn test_format_fraction_widths() {
        let time = sample();
        assert_eq!(TimeLayout::translate("%3f").format(&time), "123");
        assert_eq!(TimeLayout::translate("%6f").format(&time), "123456");
        assert_eq!(TimeLayout::translate("%9f").format(&time), "123456789");
        assert_eq!(TimeLayout::translate("%12f").format(&time), "123456789000");
        assert_eq!(TimeLayout::translate("%0f").format(&time), "");
    }

    #[test]
    fn test_format_names_and_zone() {
        let layout = TimeLayout::translate("%a %A %b %B %y %I %p %z %j %w");
        assert_eq!(
            layout.format(&sample()),
            "Tue Tuesday Jan January 24 03 AM +0800 002 2"
        );
    }

    #[test]
    fn test_multibyte_literals_survive() {
        let layout = TimeLayout::translate("%Y年%m月%d日");
        assert_eq!(layout.format(&sample()), "2024年01月02日");
    }
}
