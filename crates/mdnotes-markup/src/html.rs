//! HTML layouts for structural constructs and the two display wrappers.
//!
//! All layouts are plain inline-styled `<span>`/`<div>` elements so they survive a rich-text view
//! that does not load external stylesheets.

use crate::RenderConfig;

const RADICAL: &str = "√";

/// Radical with an overline over the radicand and, optionally, a raised index.
///
/// The indexed layout positions the glyph and the index absolutely and reserves room on the
/// left of the radicand for both.
pub(crate) fn push_root(out: &mut String, index: Option<&str>, radicand: &str) {
    match index {
        Some(index) => {
            out.push_str(
                r#"<span style="display: inline-block; vertical-align: middle; position: relative;">"#,
            );
            out.push_str(
                r#"<span style="position: absolute; top: -0.5em; left: 0.5em; font-size: 0.7em;">"#,
            );
            out.push_str(index);
            out.push_str("</span>");
            out.push_str(
                r#"<span style="position: absolute; left: 0; top: 0; font-size: 1.2em;">"#,
            );
            out.push_str(RADICAL);
            out.push_str("</span>");
            out.push_str(r#"<span style="border-top: 1px solid; margin-left: 0.8em;">"#);
            out.push_str(radicand);
            out.push_str("</span></span>");
        }
        None => {
            out.push_str(r#"<span style="display: inline-block; vertical-align: middle;">"#);
            out.push_str(r#"<span style="margin-right: 0.1em; font-size: 1.2em;">"#);
            out.push_str(RADICAL);
            out.push_str("</span>");
            out.push_str(r#"<span style="border-top: 1px solid;">"#);
            out.push_str(radicand);
            out.push_str("</span></span>");
        }
    }
}

/// Numerator stacked over a rule over the denominator.
pub(crate) fn push_fraction(out: &mut String, numerator: &str, denominator: &str) {
    out.push_str(
        r#"<span style="display: inline-block; text-align: center; vertical-align: middle; margin: 0 0.1em;">"#,
    );
    out.push_str(
        r#"<span style="display: block; padding: 0 0.1em; border-bottom: 1px solid; font-size: 0.8em;">"#,
    );
    out.push_str(numerator);
    out.push_str("</span>");
    out.push_str(r#"<span style="display: block; padding: 0 0.1em; font-size: 0.8em;">"#);
    out.push_str(denominator);
    out.push_str("</span></span>");
}

/// Centered, bordered and shaded container for `$$...$$` equations.
pub(crate) fn push_block(out: &mut String, content: &str, config: &RenderConfig) {
    out.push_str(
        r#"<div style="text-align: center; margin: 1em 0; padding: 0.5em; border: 1px solid #ccc; background: #f9f9f9; font-family: "#,
    );
    out.push_str(&config.font_family);
    out.push_str("; font-size: ");
    out.push_str(&config.font_size);
    out.push_str(r#"; line-height: 1.5;">"#);
    out.push_str(content);
    out.push_str("</div>");
}

/// Pill-shaped span for `$...$` equations.
pub(crate) fn push_inline(out: &mut String, content: &str, config: &RenderConfig) {
    out.push_str(r#"<span style="font-family: "#);
    out.push_str(&config.font_family);
    out.push_str(" !important; background: #f0f0f0 !important; padding: 0.1em 0.3em !important; border-radius: 3px !important; font-size: ");
    out.push_str(&config.font_size);
    out.push_str(r#" !important; line-height: 1.5 !important;">"#);
    out.push_str(content);
    out.push_str("</span>");
}

/// The `<style>` element placed at the top of a rendered document's head.
pub(crate) fn document_style(config: &RenderConfig) -> String {
    format!(
        "<style>\nbody {{ font-family: {}; font-size: {}; color: {}; }}\n</style>",
        config.document_font_family, config.document_font_size, config.document_color
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_without_index_has_no_absolute_layout() {
        let mut out = String::new();
        push_root(&mut out, None, "4");
        assert!(out.contains("√"));
        assert!(out.contains(">4</span>"));
        assert!(!out.contains("position: absolute"));
    }

    #[test]
    fn root_with_index_reserves_space() {
        let mut out = String::new();
        push_root(&mut out, Some("3"), "8");
        assert!(out.contains("font-size: 0.7em;\">3</span>"));
        assert!(out.contains("margin-left: 0.8em;\">8</span>"));
    }

    #[test]
    fn fraction_order() {
        let mut out = String::new();
        push_fraction(&mut out, "a", "b");
        let a = out.find(">a<").unwrap();
        let b = out.find(">b<").unwrap();
        assert!(a < b);
        assert!(out.contains("border-bottom: 1px solid"));
    }

    #[test]
    fn wrappers_use_configured_font() {
        let config = RenderConfig {
            font_family: "serif".to_string(),
            font_size: "20px".to_string(),
            ..Default::default()
        };
        let mut block = String::new();
        push_block(&mut block, "x", &config);
        assert!(block.starts_with("<div"));
        assert!(block.contains("font-family: serif; font-size: 20px;"));

        let mut inline = String::new();
        push_inline(&mut inline, "x", &config);
        assert!(inline.starts_with("<span"));
        assert!(inline.contains("font-size: 20px !important"));
    }
}
