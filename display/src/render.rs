//! Grid Rendering
//!
//! Draws a [`ViewModel`] as the wall's 3x3 grid:
//!
//! ```text
//! ┌ logo ┐┌ head ┐┌ logo  ┐
//! ┌ left ┐┌ top  ┐┌ right ┐
//!         ┌ bottom┐┌ shoes ┐
//!  ● connected │ IDLE │ assets: ready
//!  top=a.png bottom=- shoes=- left=- right=-
//! ```
//!
//! Pure functions of the view model; nothing here mutates state.

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Frame;

use lookbook_core::{HeadView, LoadPhase, Slot, ViewModel};

use crate::theme;

/// Placeholder for an absent slot in the debug strip
const NONE_MARK: &str = "-";

/// Draw the full surface into `frame`
pub fn draw(frame: &mut Frame, view: &ViewModel, show_debug: bool) {
    let debug_height = u16::from(show_debug);
    let [grid, status, debug] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(debug_height),
    ])
    .areas(frame.area());

    if view.is_renderable() {
        draw_grid(frame, grid, view);
    } else {
        let loading = Paragraph::new("Loading assets...")
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme::LABEL))
            .block(Block::bordered().border_style(Style::default().fg(theme::BORDER)));
        frame.render_widget(loading, grid);
    }

    frame.render_widget(
        Paragraph::new(status_line(view)).style(Style::default().bg(theme::STATUS_BG)),
        status,
    );
    if show_debug {
        frame.render_widget(
            Paragraph::new(debug_line(view)).style(Style::default().fg(theme::LABEL)),
            debug,
        );
    }
}

fn draw_grid(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let rows: [Rect; 3] = Layout::vertical([Constraint::Ratio(1, 3); 3]).areas(area);
    let cols = |row: Rect| -> [Rect; 3] { Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(row) };

    let [logo_left, head, logo_right] = cols(rows[0]);
    frame.render_widget(asset_cell("logo", Some(basename(&view.logo_left))), logo_left);
    frame.render_widget(head_cell(&view.head), head);
    frame.render_widget(asset_cell("logo", Some(basename(&view.logo_right))), logo_right);

    let [left, top, right] = cols(rows[1]);
    frame.render_widget(slot_cell(view, Slot::Left), left);
    frame.render_widget(slot_cell(view, Slot::Top), top);
    frame.render_widget(slot_cell(view, Slot::Right), right);

    // bottom-left is an intentional spacer
    let [_, bottom, shoes] = cols(rows[2]);
    frame.render_widget(slot_cell(view, Slot::Bottom), bottom);
    frame.render_widget(slot_cell(view, Slot::Shoes), shoes);
}

fn cell_block(title: &str) -> Block<'static> {
    Block::bordered()
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme::LABEL)))
        .border_style(Style::default().fg(theme::BORDER))
}

fn asset_cell(title: &str, filename: Option<&str>) -> Paragraph<'static> {
    let body = match filename {
        Some(name) if !name.is_empty() => {
            Span::styled(name.to_string(), Style::default().fg(theme::ASSET))
        }
        _ => Span::styled("(empty)", Style::default().fg(theme::EMPTY)),
    };
    Paragraph::new(Line::from(body))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(cell_block(title))
}

fn slot_cell(view: &ViewModel, slot: Slot) -> Paragraph<'static> {
    asset_cell(slot.as_str(), view.slot(slot).map(|s| s.filename.as_str()))
}

fn head_cell(head: &HeadView) -> Paragraph<'static> {
    let lines = match head {
        HeadView::Photo(photo) => vec![
            Line::from(Span::styled(
                "portrait",
                Style::default().fg(theme::SESSION).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(photo.clone(), Style::default().fg(theme::ASSET))),
        ],
        HeadView::Default(url) => vec![Line::from(Span::styled(
            basename(url).to_string(),
            Style::default().fg(theme::ASSET),
        ))],
    };
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(cell_block("head"))
}

/// Status bar: connectivity, mode and asset readiness
#[must_use]
pub fn status_line(view: &ViewModel) -> Line<'static> {
    let separator = || Span::styled(" │ ", Style::default().fg(theme::BORDER));

    let assets = match &view.phase {
        LoadPhase::Loading => "assets: loading".to_string(),
        LoadPhase::Ready => "assets: ready".to_string(),
        LoadPhase::Failed(reason) => format!("assets: failed ({reason})"),
    };

    let mut spans = vec![
        Span::styled(
            " ● ",
            Style::default().fg(theme::connectivity_color(view.connectivity)),
        ),
        Span::raw(view.connectivity.as_str()),
        separator(),
        Span::styled(view.mode.as_str().to_uppercase(), theme::mode_style(view.mode)),
        separator(),
        Span::raw(assets),
    ];
    if let Some(source) = &view.photo_source {
        spans.push(separator());
        spans.push(Span::raw(format!("source: {source}")));
    }
    Line::from(spans)
}

/// Debug strip: the filename in every outfit slot
#[must_use]
pub fn debug_line(view: &ViewModel) -> String {
    [Slot::Top, Slot::Bottom, Slot::Shoes, Slot::Left, Slot::Right]
        .iter()
        .map(|slot| {
            let name = view.slot(*slot).map_or(NONE_MARK, |s| s.filename.as_str());
            format!("{}={name}", slot.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn basename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
