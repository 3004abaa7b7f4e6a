use crate::config::LayoutMetrics;
use crate::model::TextStyle;

use super::Page;
use super::layout::{Typesetter, fit_with_ellipsis};

/// Height of the accent rule drawn under the subtitle.
const RULE_HEIGHT: f32 = 3.0;

/// Draw the report title and the optional section subtitle at their fixed
/// positions. Returns the cursor position of the first content line.
pub fn compose_header<T: Typesetter + ?Sized>(
    page: &mut Page,
    ts: &T,
    metrics: &LayoutMetrics,
    title: &str,
    subtitle: Option<&str>,
) -> f32 {
    let width = metrics.content_width();

    let title_style = metrics.style(TextStyle::Title);
    let title = fit_with_ellipsis(ts, title, &title_style, width);
    page.draw_text(
        metrics.margin,
        metrics.page_height - metrics.title_offset,
        &title,
        title_style,
    );

    if let Some(subtitle) = subtitle.filter(|s| !s.trim().is_empty()) {
        let style = metrics.style(TextStyle::Subtitle);
        let subtitle = fit_with_ellipsis(ts, subtitle, &style, width);
        let baseline = metrics.page_height - metrics.subtitle_offset;
        let rule_w = ts.measure_width(&subtitle, &style).min(width);
        page.draw_text(metrics.margin, baseline, &subtitle, style);
        page.fill_rect(
            metrics.margin,
            baseline - style.font_size * 0.45 - RULE_HEIGHT,
            rule_w,
            RULE_HEIGHT,
            metrics.accent_color,
        );
    }

    metrics.content_top()
}
