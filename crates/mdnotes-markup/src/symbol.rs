//! The command-to-glyph catalogue used for literal symbol substitution.

use std::sync::LazyLock;

use phf::phf_map;

/// Every supported LaTeX command, keyed including its leading backslash.
///
/// `\frac` and `\sqrt` map to the empty string: they are laid out structurally by the converter
/// and must never be substituted literally.
static SYMBOLS: phf::Map<&'static str, &'static str> = phf_map! {
    // Greek, lowercase
    r"\alpha" => "α",
    r"\beta" => "β",
    r"\gamma" => "γ",
    r"\delta" => "δ",
    r"\epsilon" => "ε",
    r"\zeta" => "ζ",
    r"\eta" => "η",
    r"\theta" => "θ",
    r"\iota" => "ι",
    r"\kappa" => "κ",
    r"\lambda" => "λ",
    r"\mu" => "μ",
    r"\nu" => "ν",
    r"\xi" => "ξ",
    r"\pi" => "π",
    r"\rho" => "ρ",
    r"\sigma" => "σ",
    r"\tau" => "τ",
    r"\upsilon" => "υ",
    r"\phi" => "φ",
    r"\chi" => "χ",
    r"\psi" => "ψ",
    r"\omega" => "ω",
    // Greek, uppercase
    r"\Gamma" => "Γ",
    r"\Delta" => "Δ",
    r"\Theta" => "Θ",
    r"\Lambda" => "Λ",
    r"\Xi" => "Ξ",
    r"\Pi" => "Π",
    r"\Sigma" => "Σ",
    r"\Upsilon" => "Υ",
    r"\Phi" => "Φ",
    r"\Psi" => "Ψ",
    r"\Omega" => "Ω",
    // Calculus
    r"\infty" => "∞",
    r"\partial" => "∂",
    r"\nabla" => "∇",
    r"\sum" => "∑",
    r"\prod" => "∏",
    r"\int" => "∫",
    // Arithmetic
    r"\pm" => "±",
    r"\mp" => "∓",
    r"\times" => "×",
    r"\div" => "÷",
    r"\cdot" => "·",
    // Relations
    r"\leq" => "≤",
    r"\geq" => "≥",
    r"\neq" => "≠",
    r"\approx" => "≈",
    r"\propto" => "∝",
    // Sets and logic
    r"\in" => "∈",
    r"\notin" => "∉",
    r"\subset" => "⊂",
    r"\supset" => "⊃",
    r"\cup" => "∪",
    r"\cap" => "∩",
    r"\wedge" => "∧",
    r"\vee" => "∨",
    r"\neg" => "¬",
    r"\forall" => "∀",
    r"\exists" => "∃",
    r"\emptyset" => "∅",
    // Structural placeholders
    r"\frac" => "",
    r"\sqrt" => "",
    r"\surd" => "√",
};

/// All non-empty entries, longest command first.
///
/// Substituting in this order keeps a short command from eating the prefix of a longer one
/// (`\in` inside `\infty` or `\int`).
static SUBSTITUTIONS: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    let mut entries: Vec<_> = SYMBOLS
        .entries()
        .filter(|(_, glyph)| !glyph.is_empty())
        .map(|(command, glyph)| (*command, *glyph))
        .collect();
    entries.sort_unstable_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
    entries
});

/// Look up the glyph for a command such as `\alpha`.
///
/// Structural commands (`\frac`, `\sqrt`) are found but yield an empty glyph.
#[inline]
pub fn lookup(command: &str) -> Option<&'static str> {
    SYMBOLS.get(command).copied()
}

/// Whether the command is handled by layout rather than by literal substitution.
#[inline]
pub fn is_structural(command: &str) -> bool {
    matches!(lookup(command), Some(""))
}

/// The substitution list used by the converter, longest command first.
pub fn substitutions() -> &'static [(&'static str, &'static str)] {
    SUBSTITUTIONS.as_slice()
}

/// Number of catalogued commands, placeholders included.
pub fn len() -> usize {
    SYMBOLS.len()
}

/// Replace every literal occurrence of every catalogued command with its glyph.
pub(crate) fn substitute(input: &str) -> String {
    let mut output = input.to_string();
    // Every command starts with a backslash, so there is nothing to do without one.
    if memchr::memchr(b'\\', output.as_bytes()).is_none() {
        return output;
    }
    for (command, glyph) in substitutions() {
        if output.contains(command) {
            output = output.replace(command, glyph);
        }
    }
    output
}
