//! Render LaTeX-subset math and markdown notes to HTML.
//!
//! The math side understands Greek letters and common operators (substituted by their Unicode
//! glyphs), `\frac`, `\sqrt` with and without an index, and a few Unicode super/subscripts. The
//! result is inline-styled HTML meant for a rich-text preview pane, not MathML.
//!
//! # Usage
//!
//! ```rust
//! use mdnotes_markup::{LatexToHtml, MathDisplay, RenderConfig};
//!
//! let converter = LatexToHtml::new(RenderConfig::default());
//! let html = converter.render(r"\frac{\alpha}{2} \leq x^2", MathDisplay::Block);
//! assert!(html.contains("α"));
//! assert!(html.contains("≤"));
//! assert!(html.contains("x²"));
//! ```
//!
//! Whole documents go through [`DocumentRenderer`], which replaces `$$...$$` and `$...$` spans
//! before handing the text to a markdown engine.
//!
//! # Features
//!
//! - `serde`: With this feature, `RenderConfig` implements serde's `Deserialize`.
//!
mod convert;
mod document;
mod html;
mod replace;
mod script;
pub mod symbol;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::convert::convert;
pub use self::document::{CommonMark, DocumentRenderer, MarkdownEngine};
pub use self::replace::Replacer;

/// Display mode for math spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDisplay {
    /// For inline equations, like those in `$...$`.
    Inline,
    /// For block equations, like those in `$$...$$`.
    Block,
}

/// Fonts and colors used by the rendered output.
///
/// The math fields apply to the block and inline wrappers, the document fields to the style
/// block injected into a rendered document's head.
///
/// ```rust
/// use mdnotes_markup::RenderConfig;
///
/// let config = RenderConfig {
///     font_size: "16px".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.document_font_size, "14pt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct RenderConfig {
    /// CSS `font-family` of math spans.
    pub font_family: String,
    /// CSS `font-size` of math spans.
    pub font_size: String,
    /// CSS `font-family` of the document body.
    pub document_font_family: String,
    /// CSS `font-size` of the document body.
    pub document_font_size: String,
    /// CSS `color` of the document body.
    pub document_color: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: "'Microsoft YaHei', '微软雅黑', sans-serif".to_string(),
            font_size: "14px".to_string(),
            document_font_family: "\"Microsoft YaHei\"".to_string(),
            document_font_size: "14pt".to_string(),
            document_color: "#333".to_string(),
        }
    }
}

/// A converter from LaTeX math to styled HTML.
#[derive(Debug, Clone, Default)]
pub struct LatexToHtml {
    config: RenderConfig,
}

impl LatexToHtml {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Convert a math expression into an unwrapped HTML fragment.
    ///
    /// ```rust
    /// use mdnotes_markup::{LatexToHtml, RenderConfig};
    ///
    /// let converter = LatexToHtml::new(RenderConfig::default());
    /// assert_eq!(converter.convert(r"\alpha + \beta"), "α + β");
    /// assert_eq!(converter.convert("x^{10}"), "x^{10}");
    /// ```
    #[inline]
    pub fn convert(&self, latex: &str) -> String {
        convert(latex)
    }

    /// Convert a math expression and wrap it for the given display mode.
    pub fn render(&self, latex: &str, display: MathDisplay) -> String {
        let mut output = String::new();
        self.render_into(&mut output, latex, display);
        output
    }

    /// Like [`render`](Self::render), but appends to an existing buffer.
    pub fn render_into(&self, output: &mut String, latex: &str, display: MathDisplay) {
        let converted = convert(latex);
        match display {
            MathDisplay::Block => html::push_block(output, &converted, &self.config),
            MathDisplay::Inline => html::push_inline(output, &converted, &self.config),
        }
    }

    /// Centered block container, as used for `$$...$$`.
    #[inline]
    pub fn render_block(&self, latex: &str) -> String {
        self.render(latex, MathDisplay::Block)
    }

    /// Inline pill, as used for `$...$`.
    #[inline]
    pub fn render_inline(&self, latex: &str) -> String {
        self.render(latex, MathDisplay::Inline)
    }
}
