use crate::config::LayoutMetrics;
use crate::model::{Entry, LayoutPolicy, StyleSpec, TextStyle};

use super::Page;
use super::chrome::compose_header;
use super::gradient::paint_gradient;
use super::layout::{Typesetter, ellipsize, fit_with_ellipsis};

/// What every page of one section repeats.
pub(crate) struct FlowContext<'a, T: Typesetter + ?Sized> {
    pub(crate) ts: &'a T,
    pub(crate) metrics: &'a LayoutMetrics,
    pub(crate) title: &'a str,
    pub(crate) subtitle: &'a str,
}

/// Cursor state while drawing one section.
struct Flow<'a, T: Typesetter + ?Sized> {
    ctx: FlowContext<'a, T>,
    pages: Vec<Page>,
    cursor_y: f32,
    entries_on_page: usize,
    /// Fixed page count: lines that do not fit are dropped instead of
    /// starting a new page.
    clip: bool,
    page_full: bool,
    dropped_lines: usize,
    /// Index into the current page's ops of the last content line drawn.
    last_line_op: Option<usize>,
}

impl<'a, T: Typesetter + ?Sized> Flow<'a, T> {
    fn new(ctx: FlowContext<'a, T>, clip: bool) -> Self {
        let mut flow = Self {
            cursor_y: ctx.metrics.content_top(),
            ctx,
            pages: Vec::new(),
            entries_on_page: 0,
            clip,
            page_full: false,
            dropped_lines: 0,
            last_line_op: None,
        };
        flow.start_page();
        flow
    }

    fn start_page(&mut self) {
        let m = self.ctx.metrics;
        let mut page = Page::new(m.page_width, m.page_height);
        paint_gradient(&mut page, &m.gradient);
        self.cursor_y = compose_header(
            &mut page,
            self.ctx.ts,
            m,
            self.ctx.title,
            Some(self.ctx.subtitle),
        );
        self.pages.push(page);
        self.entries_on_page = 0;
        self.page_full = false;
        self.dropped_lines = 0;
        self.last_line_op = None;
    }

    fn finish_page(&self) {
        if self.dropped_lines > 0 {
            log::warn!(
                "{}: page {} is full, {} line(s) not drawn",
                self.ctx.subtitle,
                self.pages.len(),
                self.dropped_lines,
            );
        }
    }

    fn page_break(&mut self) {
        self.finish_page();
        self.start_page();
    }

    fn current_page(&mut self) -> &mut Page {
        // start_page runs in the constructor, so there is always a page
        let idx = self.pages.len() - 1;
        &mut self.pages[idx]
    }

    /// Decide whether the next line may be drawn at the cursor, breaking the
    /// page first when the cursor is below the bottom margin.
    fn reserve_line(&mut self) -> bool {
        if self.page_full {
            self.dropped_lines += 1;
            return false;
        }
        if self.cursor_y >= self.ctx.metrics.bottom_margin {
            return true;
        }
        if !self.clip {
            self.page_break();
            return true;
        }
        self.page_full = true;
        self.dropped_lines += 1;
        self.mark_truncated();
        false
    }

    /// Terminate the last drawn line with an ellipsis.
    fn mark_truncated(&mut self) {
        let Some(idx) = self.last_line_op else {
            return;
        };
        let ts = self.ctx.ts;
        let width = self.ctx.metrics.content_width();
        if let Some((text, style)) = self.current_page().text_at_mut(idx) {
            let shortened = ellipsize(ts, text, style, width);
            *text = shortened;
        }
    }

    fn line(&mut self, text: &str, style: StyleSpec, advance: f32) {
        if !self.reserve_line() {
            return;
        }
        let (x, y) = (self.ctx.metrics.margin, self.cursor_y);
        let page = self.current_page();
        page.draw_text(x, y, text, style);
        self.last_line_op = Some(page.ops().len() - 1);
        self.cursor_y -= advance;
    }

    fn draw_entry(&mut self, entry: &Entry) {
        let m = self.ctx.metrics;
        let ts = self.ctx.ts;
        let width = m.content_width();

        let label_style = m.style(TextStyle::Label);
        for line in ts.wrap(entry.label(), &label_style, width) {
            self.line(&line, label_style, m.label_line_height);
        }

        match entry {
            Entry::Explained { explanation, .. } => {
                let body = m.style(TextStyle::Body);
                for line in ts.wrap(explanation, &body, width) {
                    self.line(&line, body, m.body_line_height);
                }
            }
            Entry::Value { value, .. } => {
                let style = m.style(TextStyle::Value);
                let value = fit_with_ellipsis(ts, value.trim(), &style, width);
                if !value.is_empty() {
                    self.line(&value, style, m.body_line_height);
                }
            }
        }

        self.cursor_y -= m.entry_gap;
        self.entries_on_page += 1;
    }

    fn finish(self) -> Vec<Page> {
        self.finish_page();
        self.pages
    }
}

/// Split entries into consecutive groups of the given sizes; whatever is left
/// after the listed sizes becomes one final group. Zero sizes are skipped.
pub(crate) fn split_groups<'e>(entries: &'e [Entry], sizes: &[usize]) -> Vec<&'e [Entry]> {
    let mut groups = Vec::new();
    let mut rest = entries;
    for &size in sizes {
        if rest.is_empty() {
            break;
        }
        if size == 0 {
            continue;
        }
        let (head, tail) = rest.split_at(size.min(rest.len()));
        groups.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups
}

/// Lay out one section's entries into pages according to `policy`.
/// Always returns at least one page.
pub(crate) fn flow_section<T: Typesetter + ?Sized>(
    ctx: FlowContext<'_, T>,
    entries: &[Entry],
    policy: &LayoutPolicy,
) -> Vec<Page> {
    match policy {
        LayoutPolicy::Overflow => flow_continuous(ctx, entries, None),
        LayoutPolicy::Capped(n) => flow_continuous(ctx, entries, Some((*n).max(1))),
        LayoutPolicy::FixedGroups(sizes) => flow_groups(ctx, entries, sizes),
    }
}

fn flow_continuous<T: Typesetter + ?Sized>(
    ctx: FlowContext<'_, T>,
    entries: &[Entry],
    cap: Option<usize>,
) -> Vec<Page> {
    let mut flow = Flow::new(ctx, false);
    for (i, entry) in entries.iter().enumerate() {
        flow.draw_entry(entry);
        let more = i + 1 < entries.len();
        if more && cap.is_some_and(|n| flow.entries_on_page >= n) {
            flow.page_break();
        }
    }
    flow.finish()
}

fn flow_groups<T: Typesetter + ?Sized>(
    ctx: FlowContext<'_, T>,
    entries: &[Entry],
    sizes: &[usize],
) -> Vec<Page> {
    let mut flow = Flow::new(ctx, true);
    for (i, group) in split_groups(entries, sizes).into_iter().enumerate() {
        if i > 0 {
            flow.page_break();
        }
        for entry in group {
            flow.draw_entry(entry);
        }
    }
    flow.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageGeometry;
    use crate::pdf::layout::tests::Monospace;

    fn metrics() -> LayoutMetrics {
        LayoutMetrics::for_geometry(PageGeometry::Current)
    }

    fn run(entries: &[Entry], policy: LayoutPolicy) -> Vec<Page> {
        let m = metrics();
        let ts = Monospace { advance: 12.0 };
        let ctx = FlowContext {
            ts: &ts,
            metrics: &m,
            title: "Analisi",
            subtitle: "Sezione",
        };
        flow_section(ctx, entries, &policy)
    }

    fn short_entries(n: usize) -> Vec<Entry> {
        (0..n)
            .map(|i| Entry::explained(format!("Voce {i}"), "breve spiegazione"))
            .collect()
    }

    fn long_text(words: usize) -> String {
        vec!["parola"; words].join(" ")
    }

    /// Content lines only: everything below the header.
    fn body_lines(page: &Page) -> Vec<(f32, String)> {
        let top = metrics().content_top();
        page.texts()
            .filter(|(_, y, _, _)| *y <= top)
            .map(|(_, y, t, _)| (y, t.to_string()))
            .collect()
    }

    #[test]
    fn empty_section_yields_header_page() {
        let pages = run(&[], LayoutPolicy::Overflow);
        assert_eq!(pages.len(), 1);
        assert!(body_lines(&pages[0]).is_empty());
        let pages = run(&[], LayoutPolicy::FixedGroups(vec![3]));
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn cap_forces_breaks() {
        assert_eq!(run(&short_entries(5), LayoutPolicy::Capped(2)).len(), 3);
        assert_eq!(run(&short_entries(4), LayoutPolicy::Capped(2)).len(), 2);
        assert_eq!(run(&short_entries(7), LayoutPolicy::Capped(3)).len(), 3);
        assert_eq!(run(&short_entries(5), LayoutPolicy::Overflow).len(), 1);
    }

    #[test]
    fn long_explanation_spans_pages_without_crossing_bottom_margin() {
        let entries = vec![Entry::explained("Lunga", long_text(2000))];
        let pages = run(&entries, LayoutPolicy::Overflow);
        assert!(pages.len() > 3);
        let m = metrics();
        for page in &pages {
            for (y, _) in body_lines(page) {
                assert!(y >= m.bottom_margin, "line drawn at {y}");
            }
        }
        // every page repeats the chrome
        for page in &pages {
            let header: Vec<&str> = page.texts().map(|(_, _, t, _)| t).take(2).collect();
            assert_eq!(header, vec!["Analisi", "Sezione"]);
        }
    }

    #[test]
    fn overflow_preserves_every_wrapped_line() {
        let text = long_text(900);
        let m = metrics();
        let ts = Monospace { advance: 12.0 };
        let expected = ts.wrap(&text, &m.style(TextStyle::Body), m.content_width());
        let pages = run(&[Entry::explained("L", text)], LayoutPolicy::Overflow);
        let drawn: Vec<String> = pages
            .iter()
            .flat_map(body_lines)
            .map(|(_, t)| t)
            .filter(|t| t != "L")
            .collect();
        assert_eq!(drawn, expected);
    }

    #[test]
    fn cursor_resets_on_each_page() {
        let pages = run(&short_entries(4), LayoutPolicy::Capped(1));
        let top = metrics().content_top();
        for page in &pages {
            let first = body_lines(page)[0].0;
            assert_eq!(first, top);
        }
    }

    #[test]
    fn fixed_groups_page_count_ignores_text_length() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| Entry::explained(format!("Campo {i}"), long_text(400)))
            .collect();
        let pages = run(&entries, LayoutPolicy::FixedGroups(vec![3]));
        assert_eq!(pages.len(), 2);
        let m = metrics();
        for page in &pages {
            let lines = body_lines(page);
            assert!(lines.iter().all(|(y, _)| *y >= m.bottom_margin));
            assert!(lines.last().is_some_and(|(_, t)| t.ends_with('…')));
        }
    }

    #[test]
    fn fixed_groups_with_short_values() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| Entry::value(format!("Campo {i}"), "valore"))
            .collect();
        let pages = run(&entries, LayoutPolicy::FixedGroups(vec![3]));
        assert_eq!(pages.len(), 2);
        assert_eq!(body_lines(&pages[0]).len(), 6);
        assert_eq!(body_lines(&pages[1]).len(), 4);
    }

    #[test]
    fn split_groups_rules() {
        let e = short_entries(7);
        let sizes: Vec<usize> = split_groups(&e, &[3]).iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![3, 4]);
        let sizes: Vec<usize> = split_groups(&e, &[2, 0, 2]).iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![2, 2, 3]);
        let sizes: Vec<usize> = split_groups(&e[..2], &[3]).iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![2]);
        assert!(split_groups(&[], &[3]).is_empty());
    }

    #[test]
    fn long_value_is_truncated_to_one_line() {
        let entries = vec![Entry::value("Interessi", long_text(50))];
        let pages = run(&entries, LayoutPolicy::FixedGroups(vec![3]));
        let lines = body_lines(&pages[0]);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].1.ends_with('…'));
    }
}
