//! Unicode superscripts and subscripts.
//!
//! Only a handful of scripts have a glyph here. Anything else stays as literal LaTeX.

const FIXED: [(&str, &str); 9] = [
    ("^0", "⁰"),
    ("^1", "¹"),
    ("^2", "²"),
    ("^3", "³"),
    ("^n", "ⁿ"),
    ("_0", "₀"),
    ("_1", "₁"),
    ("_2", "₂"),
    ("_n", "ₙ"),
];

const BRACED_SUPERSCRIPTS: [(&str, &str); 2] = [("2", "²"), ("3", "³")];
const BRACED_SUBSCRIPTS: [(&str, &str); 2] = [("1", "₁"), ("2", "₂")];

/// Replace the unbraced single-character scripts in [`FIXED`].
pub(crate) fn replace_fixed(input: &str) -> String {
    let mut output = input.to_string();
    if memchr::memchr2(b'^', b'_', output.as_bytes()).is_none() {
        return output;
    }
    for (pattern, glyph) in FIXED {
        if output.contains(pattern) {
            output = output.replace(pattern, glyph);
        }
    }
    output
}

/// Replace `^{...}` and `_{...}` whose content has a glyph.
pub(crate) fn replace_braced(input: &str) -> String {
    let output = replace_braced_with(input, b'^', &BRACED_SUPERSCRIPTS);
    replace_braced_with(&output, b'_', &BRACED_SUBSCRIPTS)
}

fn replace_braced_with(input: &str, marker: u8, glyphs: &[(&str, &str)]) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len());
    let mut copied = 0;
    let mut pos = 0;
    while let Some(idx) = memchr::memchr(marker, &bytes[pos..]) {
        let at = pos + idx;
        pos = at + 1;
        if bytes.get(at + 1) != Some(&b'{') {
            continue;
        }
        let content_start = at + 2;
        let Some(len) = memchr::memchr(b'}', &bytes[content_start..]) else {
            break;
        };
        if len == 0 {
            continue;
        }
        let content = &input[content_start..content_start + len];
        if let Some((_, glyph)) = glyphs.iter().find(|(script, _)| *script == content) {
            output.push_str(&input[copied..at]);
            output.push_str(glyph);
            copied = content_start + len + 1;
        }
        // Unconvertible content stays literal; the regex this mirrors resumes after the match.
        pos = content_start + len + 1;
    }
    output.push_str(&input[copied..]);
    output
}
