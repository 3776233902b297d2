//! The LaTeX-subset conversion pipeline.
//!
//! The steps run in a fixed order: square roots, fractions, literal symbols, fixed
//! super/subscripts, braced super/subscripts. Roots and fractions only match when their arguments
//! contain no braces (`\frac{\sqrt{2}}{2}` works because the root is already HTML by the time
//! fractions are matched; `\sqrt{\frac{1}{2}}` is left as is).

use memchr::memmem::Finder;
use std::sync::LazyLock;

use crate::{html, script, symbol};

static SQRT_WITH_INDEX: LazyLock<Finder<'static>> = LazyLock::new(|| Finder::new(r"\sqrt["));
static SQRT: LazyLock<Finder<'static>> = LazyLock::new(|| Finder::new(r"\sqrt{"));
static FRAC: LazyLock<Finder<'static>> = LazyLock::new(|| Finder::new(r"\frac{"));

/// Convert a trimmed math expression into an HTML fragment.
pub fn convert(latex: &str) -> String {
    let result = replace_roots_with_index(latex);
    let result = replace_roots(&result);
    let result = replace_fractions(&result);
    let result = symbol::substitute(&result);
    let result = script::replace_fixed(&result);
    script::replace_braced(&result)
}

/// Match a group starting at `pos` that opens with `open` and closes with `close`, with no
/// further `open` or `close` inside.
///
/// Returns the content and the index just past the closing byte.
fn flat_group(input: &str, pos: usize, open: u8, close: u8) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(pos) != Some(&open) {
        return None;
    }
    let start = pos + 1;
    let end = start + memchr::memchr2(open, close, &bytes[start..])?;
    if bytes[end] != close {
        return None;
    }
    Some((&input[start..end], end + 1))
}

/// Drive a scan over every occurrence of `finder`'s needle.
///
/// `try_match` receives the position right after the needle and returns the end of the matched
/// construct after writing its replacement; on `None` the needle's first byte is copied and the
/// scan resumes one byte later.
fn scan<F>(input: &str, finder: &Finder, needle_len: usize, mut try_match: F) -> String
where
    F: FnMut(&mut String, usize) -> Option<usize>,
{
    let Some(first) = finder.find(input.as_bytes()) else {
        return input.to_string();
    };
    let mut output = String::with_capacity(input.len());
    output.push_str(&input[..first]);
    let mut pos = first;
    loop {
        match try_match(&mut output, pos + needle_len) {
            Some(end) => pos = end,
            None => {
                // The needle starts with an ASCII backslash.
                output.push_str(&input[pos..pos + 1]);
                pos += 1;
            }
        }
        match finder.find(&input.as_bytes()[pos..]) {
            Some(idx) => {
                output.push_str(&input[pos..pos + idx]);
                pos += idx;
            }
            None => {
                output.push_str(&input[pos..]);
                return output;
            }
        }
    }
}

/// `\sqrt[index]{radicand}`
fn replace_roots_with_index(input: &str) -> String {
    scan(input, &SQRT_WITH_INDEX, r"\sqrt".len(), |out, pos| {
        let (index, after_index) = flat_group(input, pos, b'[', b']')?;
        let (radicand, end) = flat_group(input, after_index, b'{', b'}')?;
        html::push_root(out, Some(&convert(index)), &convert(radicand));
        Some(end)
    })
}

/// `\sqrt{radicand}`
fn replace_roots(input: &str) -> String {
    scan(input, &SQRT, r"\sqrt".len(), |out, pos| {
        let (radicand, end) = flat_group(input, pos, b'{', b'}')?;
        html::push_root(out, None, &convert(radicand));
        Some(end)
    })
}

/// `\frac{numerator}{denominator}`
fn replace_fractions(input: &str) -> String {
    scan(input, &FRAC, r"\frac".len(), |out, pos| {
        let (numerator, after_numerator) = flat_group(input, pos, b'{', b'}')?;
        let (denominator, end) = flat_group(input, after_numerator, b'{', b'}')?;
        html::push_fraction(out, &convert(numerator), &convert(denominator));
        Some(end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_group_basic() {
        assert_eq!(flat_group("{ab}c", 0, b'{', b'}'), Some(("ab", 4)));
        assert_eq!(flat_group("x{}", 1, b'{', b'}'), Some(("", 3)));
    }

    #[test]
    fn flat_group_rejects_nesting() {
        assert_eq!(flat_group("{a{b}}", 0, b'{', b'}'), None);
        assert_eq!(flat_group("{abc", 0, b'{', b'}'), None);
        assert_eq!(flat_group("ab}", 0, b'{', b'}'), None);
    }

    #[test]
    fn index_may_contain_braces() {
        let out = replace_roots_with_index(r"\sqrt[{n}]{x}");
        assert!(!out.contains(r"\sqrt"));
        assert!(out.contains(">{n}</span>"));
    }

    #[test]
    fn fraction_simple() {
        let out = convert(r"\frac{1}{2}");
        assert!(!out.contains(r"\frac"));
        assert!(out.contains(">1</span>"));
        assert!(out.contains(">2</span>"));
    }

    #[test]
    fn fraction_with_symbols() {
        let out = convert(r"\frac{\alpha}{2}");
        assert!(out.contains(">α</span>"));
        assert!(!out.contains(r"\alpha"));
    }

    #[test]
    fn root_inside_fraction() {
        let out = convert(r"\frac{\sqrt{2}}{2}");
        assert!(!out.contains(r"\frac"));
        assert!(!out.contains(r"\sqrt"));
        assert!(out.contains("√"));
    }

    #[test]
    fn fraction_inside_root_is_left_alone() {
        let out = convert(r"\sqrt{\frac{1}{2}}");
        assert!(out.starts_with(r"\sqrt{"));
        assert!(out.ends_with('}'));
        assert!(!out.contains(r"\frac"));
    }

    #[test]
    fn malformed_structures_pass_through() {
        assert_eq!(convert(r"\frac{1}"), r"\frac{1}");
        assert_eq!(convert(r"\sqrt[3{8}"), r"\sqrt[3{8}");
        assert_eq!(convert(r"\sqrt x"), r"\sqrt x");
    }

    #[test]
    fn multiple_roots() {
        let out = convert(r"\sqrt{a} + \sqrt[3]{b} + \sqrt{c}");
        assert_eq!(out.matches('√').count(), 3);
        assert!(out.contains(" + "));
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(convert("a + b = c"), "a + b = c");
        assert_eq!(convert(""), "");
    }
}
