//! Character-level line wrapping with overflow truncation.
//!
//! Wrapping is greedy and per `char`, so it breaks mid-word; that suits
//! CJK-heavy text, which has no spaces to break on anyway. The font is an
//! explicit argument everywhere: nothing here reads ambient context state.

use serde::Deserialize;

use crate::api::CanvasText;
use crate::error::Result;
use crate::geometry::Point;

/// Font description, rendered to and parsed from the CSS shorthand
/// `"<weight> <size>px <family>"`.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub size: f64,
    pub family: String,
    pub weight: String,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size: 10.0,
            family: "sans-serif".to_string(),
            weight: "normal".to_string(),
        }
    }
}

impl FontSpec {
    pub fn new(size: f64, family: impl Into<String>, weight: impl Into<String>) -> Self {
        Self {
            size,
            family: family.into(),
            weight: weight.into(),
        }
    }

    pub fn to_css(&self) -> String {
        format!("{} {}px {}", self.weight, self.size, self.family)
    }

    /// Lenient parse of a CSS font shorthand; unknown pieces fall back to the defaults.
    pub fn parse(css: &str) -> Self {
        let mut font = FontSpec::default();
        let mut family = Vec::new();
        for part in css.split_whitespace() {
            if let Some(px) = part.strip_suffix("px").and_then(|n| n.parse::<f64>().ok()) {
                font.size = px;
            } else if family.is_empty() && is_weight(part) {
                font.weight = part.to_string();
            } else if !matches!(part, "italic" | "oblique") {
                family.push(part);
            }
        }
        if !family.is_empty() {
            font.family = family.join(" ");
        }
        font
    }

    pub fn is_bold(&self) -> bool {
        match self.weight.as_str() {
            "bold" | "bolder" => true,
            w => w.parse::<u32>().is_ok_and(|n| n >= 600),
        }
    }
}

fn is_weight(part: &str) -> bool {
    matches!(part, "normal" | "bold" | "bolder" | "lighter") || part.parse::<u32>().is_ok()
}

/// What to do with the last line when text is cut at the line limit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OverflowPolicy {
    /// Hard cut, no suffix.
    Clip,
    /// Append `...`.
    #[default]
    Ellipsis,
    /// Append the given string.
    Custom(String),
}

impl From<String> for OverflowPolicy {
    fn from(value: String) -> Self {
        match value.as_str() {
            "clip" | "" => OverflowPolicy::Clip,
            "ellipsis" => OverflowPolicy::Ellipsis,
            _ => OverflowPolicy::Custom(value),
        }
    }
}

impl OverflowPolicy {
    fn suffix(&self) -> Option<&str> {
        match self {
            OverflowPolicy::Clip => None,
            OverflowPolicy::Ellipsis => Some("..."),
            OverflowPolicy::Custom(s) => Some(s),
        }
    }
}

/// Width measurement under an explicit font.
pub trait TextMeasure {
    fn measure(&mut self, font: &FontSpec, text: &str) -> Result<f64>;
}

impl<C: CanvasText + ?Sized> TextMeasure for C {
    fn measure(&mut self, font: &FontSpec, text: &str) -> Result<f64> {
        let css = font.to_css();
        if self.font()? != css {
            self.set_font(css)?;
        }
        Ok(self.measure_text(text)?.width)
    }
}

/// One laid-out line, positioned at its anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WrapLayout {
    pub max_width: f64,
    pub max_lines: usize,
    pub overflow: OverflowPolicy,
    /// Narrows the first line's budget and shifts it right.
    pub indent: f64,
    pub origin: Point,
    pub line_height: f64,
}

struct Wrapped {
    lines: Vec<TextLine>,
    truncated: bool,
}

/// Lays out `text` into at most `layout.max_lines` lines.
pub fn wrap_text<M: TextMeasure + ?Sized>(
    measure: &mut M,
    font: &FontSpec,
    text: &str,
    layout: &WrapLayout,
) -> Result<Vec<TextLine>> {
    Ok(wrap_block(measure, font, text, layout)?.lines)
}

/// Splits on `\n` first, then wraps every paragraph on its own. The line
/// limit covers the whole block and each paragraph's first line is indented.
pub fn wrap_paragraphs<M: TextMeasure + ?Sized>(
    measure: &mut M,
    font: &FontSpec,
    text: &str,
    layout: &WrapLayout,
) -> Result<Vec<TextLine>> {
    let mut lines: Vec<TextLine> = Vec::new();
    // Whether the newest line opened its paragraph, which decides its budget.
    let mut last_opens_paragraph = true;

    let paragraphs: Vec<&str> = text.split('\n').collect();
    for (i, paragraph) in paragraphs.iter().copied().enumerate() {
        let remaining = layout.max_lines.saturating_sub(lines.len());
        if remaining == 0 {
            // Only text that is actually cut off earns the suffix; trailing
            // blank paragraphs do not.
            let cut = paragraphs[i..].iter().any(|p| !p.is_empty());
            if cut {
                let budget = line_budget(layout, last_opens_paragraph);
                if let Some(last) = lines.last_mut() {
                    apply_overflow(measure, font, last, &layout.overflow, budget)?;
                }
            }
            break;
        }
        let sub = WrapLayout {
            max_lines: remaining,
            origin: Point::new(
                layout.origin.x,
                layout.origin.y + lines.len() as f64 * layout.line_height,
            ),
            ..layout.clone()
        };

        if paragraph.is_empty() {
            lines.push(TextLine {
                text: String::new(),
                x: sub.origin.x + sub.indent,
                y: sub.origin.y,
            });
            last_opens_paragraph = true;
            continue;
        }

        let wrapped = wrap_block(measure, font, paragraph, &sub)?;
        last_opens_paragraph = wrapped.lines.len() == 1;
        lines.extend(wrapped.lines);
        if wrapped.truncated {
            break;
        }
    }

    Ok(lines)
}

fn line_budget(layout: &WrapLayout, first: bool) -> f64 {
    if first {
        layout.max_width - layout.indent
    } else {
        layout.max_width
    }
}

fn wrap_block<M: TextMeasure + ?Sized>(
    measure: &mut M,
    font: &FontSpec,
    text: &str,
    layout: &WrapLayout,
) -> Result<Wrapped> {
    let mut lines = Vec::new();
    if text.is_empty() || layout.max_lines == 0 {
        return Ok(Wrapped {
            lines,
            truncated: false,
        });
    }

    let close = |text: String, index: usize| TextLine {
        text,
        x: if index == 0 {
            layout.origin.x + layout.indent
        } else {
            layout.origin.x
        },
        y: layout.origin.y + index as f64 * layout.line_height,
    };

    if measure.measure(font, text)? <= line_budget(layout, true) {
        lines.push(close(text.to_string(), 0));
        return Ok(Wrapped {
            lines,
            truncated: false,
        });
    }

    let mut current = String::new();
    let mut width = 0.0;
    let mut truncated = false;
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        let char_width = measure.measure(font, ch.encode_utf8(&mut buf))?;
        let budget = line_budget(layout, lines.is_empty());
        // An empty line always takes one character, so a glyph wider than
        // the budget still makes progress.
        if current.is_empty() || width + char_width <= budget {
            current.push(ch);
            width += char_width;
            continue;
        }

        let index = lines.len();
        lines.push(close(std::mem::take(&mut current), index));
        if lines.len() >= layout.max_lines {
            truncated = true;
            break;
        }
        current.push(ch);
        width = char_width;
    }

    if !truncated && !current.is_empty() {
        let index = lines.len();
        lines.push(close(current, index));
    }

    if truncated {
        let budget = line_budget(layout, lines.len() == 1);
        if let Some(last) = lines.last_mut() {
            apply_overflow(measure, font, last, &layout.overflow, budget)?;
        }
    }

    Ok(Wrapped { lines, truncated })
}

/// Trims trailing characters until `line + suffix` fits `budget`; an emptied
/// line still receives the suffix.
fn apply_overflow<M: TextMeasure + ?Sized>(
    measure: &mut M,
    font: &FontSpec,
    line: &mut TextLine,
    overflow: &OverflowPolicy,
    budget: f64,
) -> Result<()> {
    let Some(suffix) = overflow.suffix() else {
        return Ok(());
    };

    let mut text = std::mem::take(&mut line.text);
    while !text.is_empty() && measure.measure(font, &format!("{text}{suffix}"))? > budget {
        text.pop();
    }
    text.push_str(suffix);
    line.text = text;
    Ok(())
}

/// Options for [`measure_text_height`].
#[derive(Clone, Debug, PartialEq)]
pub struct TextHeightOptions {
    pub text: String,
    pub max_width: f64,
    /// `None` means unlimited.
    pub max_lines: Option<usize>,
    /// Honor `\n` as a forced break.
    pub has_break: bool,
    pub font: FontSpec,
    /// Defaults to 1.2 × font size.
    pub line_height: Option<f64>,
}

/// Height of `opts.text` once wrapped: line count × line height.
pub fn measure_text_height<M: TextMeasure + ?Sized>(
    measure: &mut M,
    opts: &TextHeightOptions,
) -> Result<f64> {
    let line_height = opts.line_height.unwrap_or(opts.font.size * 1.2);
    let layout = WrapLayout {
        max_width: opts.max_width,
        max_lines: opts.max_lines.unwrap_or(usize::MAX),
        overflow: OverflowPolicy::Clip,
        indent: 0.0,
        origin: Point::default(),
        line_height,
    };
    let lines = if opts.has_break {
        wrap_paragraphs(measure, &opts.font, &opts.text, &layout)?
    } else {
        wrap_text(measure, &opts.font, &opts.text, &layout)?
    };
    Ok(lines.len() as f64 * line_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::recording::RecordingCanvas;

    // RecordingCanvas measures every char as one font-size wide.
    fn font() -> FontSpec {
        FontSpec::new(10.0, "sans-serif", "normal")
    }

    fn layout(max_width: f64, max_lines: usize, overflow: OverflowPolicy) -> WrapLayout {
        WrapLayout {
            max_width,
            max_lines,
            overflow,
            indent: 0.0,
            origin: Point::new(5.0, 100.0),
            line_height: 20.0,
        }
    }

    fn texts(lines: &[TextLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn font_css_round_trips() {
        let f = FontSpec::new(12.0, "PingFang SC", "bold");
        assert_eq!(f.to_css(), "bold 12px PingFang SC");
        assert_eq!(FontSpec::parse(&f.to_css()), f);
        assert!(f.is_bold());

        let parsed = FontSpec::parse("16px Sans");
        assert_eq!(parsed, FontSpec::new(16.0, "Sans", "normal"));
        assert!(!FontSpec::new(12.0, "x", "400").is_bold());
    }

    #[test]
    fn overflow_policy_from_strings() {
        assert_eq!(OverflowPolicy::from("clip".to_string()), OverflowPolicy::Clip);
        assert_eq!(OverflowPolicy::from("ellipsis".to_string()), OverflowPolicy::Ellipsis);
        assert_eq!(
            OverflowPolicy::from("…more".to_string()),
            OverflowPolicy::Custom("…more".into())
        );
    }

    #[test]
    fn fast_path_emits_single_line() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_text(&mut c, &font(), "hello", &layout(50.0, 3, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(
            lines,
            vec![TextLine {
                text: "hello".into(),
                x: 5.0,
                y: 100.0
            }]
        );
    }

    #[test]
    fn wraps_mid_word_and_positions_lines() {
        let mut c = RecordingCanvas::new();
        let lines =
            wrap_text(&mut c, &font(), "abcdefghij", &layout(40.0, 5, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["abcd", "efgh", "ij"]);
        assert_eq!(lines[1].y, 120.0);
        assert_eq!(lines[2].y, 140.0);
        assert!(lines.iter().all(|l| l.x == 5.0));
    }

    #[test]
    fn indent_narrows_and_shifts_first_line_only() {
        let mut c = RecordingCanvas::new();
        let mut l = layout(40.0, 5, OverflowPolicy::Clip);
        l.indent = 20.0;
        let lines = wrap_text(&mut c, &font(), "abcdefgh", &l).unwrap();
        assert_eq!(texts(&lines), vec!["ab", "cdef", "gh"]);
        assert_eq!(lines[0].x, 25.0);
        assert_eq!(lines[1].x, 5.0);
    }

    #[test]
    fn ellipsis_fits_within_max_width() {
        let mut c = RecordingCanvas::new();
        let f = font();
        let lines =
            wrap_text(&mut c, &f, "abcdefghij", &layout(60.0, 1, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.ends_with("..."));
        assert_eq!(lines[0].text, "abc...");
        assert!(c.measure(&f, &lines[0].text).unwrap() <= 60.0);
    }

    #[test]
    fn clip_cuts_without_suffix() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_text(&mut c, &font(), "abcdefghij", &layout(40.0, 2, OverflowPolicy::Clip)).unwrap();
        assert_eq!(texts(&lines), vec!["abcd", "efgh"]);
    }

    #[test]
    fn custom_suffix_replaces_tail() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_text(
            &mut c,
            &font(),
            "abcdefghij",
            &layout(50.0, 1, OverflowPolicy::Custom(">>".into())),
        )
        .unwrap();
        assert_eq!(texts(&lines), vec!["abc>>"]);
    }

    #[test]
    fn suffix_alone_when_nothing_else_fits() {
        let mut c = RecordingCanvas::new();
        let lines =
            wrap_text(&mut c, &font(), "abcdefghij", &layout(30.0, 1, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["..."]);

        let lines =
            wrap_text(&mut c, &font(), "abcdefghij", &layout(20.0, 1, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["..."]);
    }

    #[test]
    fn text_that_fits_the_line_limit_is_not_truncated() {
        let mut c = RecordingCanvas::new();
        let lines =
            wrap_text(&mut c, &font(), "abcdefgh", &layout(40.0, 2, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["abcd", "efgh"]);
    }

    #[test]
    fn paragraphs_break_on_newlines() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_paragraphs(
            &mut c,
            &font(),
            "abcdef\n\nxy",
            &layout(40.0, 10, OverflowPolicy::Ellipsis),
        )
        .unwrap();
        assert_eq!(texts(&lines), vec!["abcd", "ef", "", "xy"]);
        let ys: Vec<f64> = lines.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![100.0, 120.0, 140.0, 160.0]);
    }

    #[test]
    fn paragraph_limit_spans_the_block() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_paragraphs(
            &mut c,
            &font(),
            "ab\ncd\nef",
            &layout(40.0, 2, OverflowPolicy::Ellipsis),
        )
        .unwrap();
        assert_eq!(texts(&lines), vec!["ab", "c..."]);
    }

    #[test]
    fn trailing_newline_at_the_limit_is_not_overflow() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_paragraphs(&mut c, &font(), "ab\n", &layout(40.0, 1, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["ab"]);

        let lines = wrap_paragraphs(&mut c, &font(), "ab\n\n", &layout(40.0, 1, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["ab"]);
    }

    #[test]
    fn text_after_blank_paragraphs_is_overflow() {
        let mut c = RecordingCanvas::new();
        let lines = wrap_paragraphs(&mut c, &font(), "ab\n\ncd", &layout(40.0, 1, OverflowPolicy::Ellipsis)).unwrap();
        assert_eq!(texts(&lines), vec!["a..."]);
    }

    #[test]
    fn height_counts_wrapped_lines() {
        let mut c = RecordingCanvas::new();
        let opts = TextHeightOptions {
            text: "abcdefghij\nk".into(),
            max_width: 40.0,
            max_lines: None,
            has_break: true,
            font: font(),
            line_height: None,
        };
        assert_eq!(measure_text_height(&mut c, &opts).unwrap(), 4.0 * (10.0 * 1.2));

        let opts = TextHeightOptions {
            has_break: false,
            max_lines: Some(2),
            line_height: Some(15.0),
            ..opts
        };
        assert_eq!(measure_text_height(&mut c, &opts).unwrap(), 30.0);
    }
}
