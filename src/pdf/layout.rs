use crate::model::StyleSpec;

const ELLIPSIS: char = '…';

/// Text measurement the layout engine depends on.
///
/// Only `measure_width` is required; wrapping is derived from it.
pub trait Typesetter {
    fn measure_width(&self, text: &str, style: &StyleSpec) -> f32;

    /// Greedy word wrap into lines no wider than `max_width`.
    /// A single word wider than `max_width` is broken at character boundaries.
    fn wrap(&self, text: &str, style: &StyleSpec, max_width: f32) -> Vec<String> {
        wrap_words(self, text, style, max_width)
    }
}

fn wrap_words<T: Typesetter + ?Sized>(
    ts: &T,
    text: &str,
    style: &StyleSpec,
    max_width: f32,
) -> Vec<String> {
    let space_w = ts.measure_width(" ", style);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_x: f32 = 0.0;

    for word in text.split_whitespace() {
        let ww = ts.measure_width(word, style);

        if ww > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = break_word(ts, word, style, max_width);
            let last = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            current_x = ts.measure_width(&last, style);
            current = last;
            continue;
        }

        let proposed_x = if current.is_empty() {
            0.0
        } else {
            current_x + space_w
        };
        if !current.is_empty() && proposed_x + ww > max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_x = ww;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_x = proposed_x + ww;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split one overlong word into pieces that each fit `max_width`.
fn break_word<T: Typesetter + ?Sized>(
    ts: &T,
    word: &str,
    style: &StyleSpec,
    max_width: f32,
) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for ch in word.chars() {
        piece.push(ch);
        if piece.chars().count() > 1 && ts.measure_width(&piece, style) > max_width {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(ch);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Shorten `text` so that it followed by an ellipsis fits `max_width`.
/// Text that already fits is returned unchanged.
pub(crate) fn fit_with_ellipsis<T: Typesetter + ?Sized>(
    ts: &T,
    text: &str,
    style: &StyleSpec,
    max_width: f32,
) -> String {
    if ts.measure_width(text, style) <= max_width {
        return text.to_string();
    }
    ellipsize(ts, text, style, max_width)
}

/// Append an ellipsis to `text`, dropping trailing characters until it fits.
pub(crate) fn ellipsize<T: Typesetter + ?Sized>(
    ts: &T,
    text: &str,
    style: &StyleSpec,
    max_width: f32,
) -> String {
    let mut kept: Vec<char> = text.trim_end().chars().collect();
    loop {
        let candidate: String = kept.iter().chain(std::iter::once(&ELLIPSIS)).collect();
        if kept.is_empty() || ts.measure_width(&candidate, style) <= max_width {
            return candidate;
        }
        kept.pop();
        while kept.last().is_some_and(|c| c.is_whitespace()) {
            kept.pop();
        }
    }
}
