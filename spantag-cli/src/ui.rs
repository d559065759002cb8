//! Terminal UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use spantag_core::projection::Segment;
use spantag_core::Mode;

use crate::app::{App, Screen};

// Catppuccin Mocha colors
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const TEXT: Color = Color::Rgb(205, 214, 244);
const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
const RED: Color = Color::Rgb(243, 139, 168);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const GREEN: Color = Color::Rgb(166, 227, 161);
const BLUE: Color = Color::Rgb(137, 180, 250);
const MAUVE: Color = Color::Rgb(203, 166, 247);

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(1), // Class chips
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);
    match app.screen {
        Screen::Project => draw_listing(frame, app, chunks[1].union(chunks[2])),
        Screen::Document => {
            draw_chips(frame, app, chunks[1]);
            draw_main_area(frame, app, chunks[2]);
        }
    }
    draw_status_bar(frame, app, chunks[3]);

    match app.session.mode() {
        Mode::Popover => draw_popover(frame, app),
        Mode::ConfirmLeave => draw_confirm(frame, app),
        Mode::Normal => {}
    }
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut title_text = format!(" spantag - {}", app.title());

    if app.screen == Screen::Document {
        if let Some((index, count)) = app.session.position() {
            title_text.push_str(&format!(" [{}/{}]", index + 1, count));
        }
        if app.session.is_dirty() {
            title_text.push('*');
        }
        if let Some(status) = app.session.displayed_status() {
            title_text.push_str(&format!(" | {}", status.as_str()));
        }
    }

    let dirty = app.session.dirty_count();
    if dirty > 0 {
        title_text.push_str(&format!(" | {dirty} unsaved"));
    }
    if app.session.autosave() {
        title_text.push_str(" | autosave");
    }

    let title_bar = Paragraph::new(title_text).style(Style::default().fg(TEXT).bg(SURFACE0));
    frame.render_widget(title_bar, area);
}

fn draw_chips(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.session.active_class_index();
    let mut spans = vec![Span::raw(" ")];

    for (i, class) in app.session.classes().iter().enumerate() {
        let color = parse_color(&class.color).unwrap_or(YELLOW);
        let style = if Some(i) == active {
            Style::default()
                .fg(SURFACE0)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };
        spans.push(Span::styled(format!(" {}. {} ", i + 1, class.name), style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_main_area(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Editor
            Constraint::Length(30), // Sidebar
        ])
        .split(area);

    let segments = app.session.segments();
    draw_editor(frame, app, &segments, chunks[0]);
    draw_sidebar(frame, app, chunks[1]);
}

fn draw_editor(frame: &mut Frame, app: &App, segments: &[Segment], area: Rect) {
    let title = if app.anchor.is_some() {
        "Document [VISUAL]"
    } else {
        "Document"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = editor_lines(app, segments);

    // Keep the cursor row on screen
    let cursor = app.cursor.cursor();
    let visible_height = inner.height as usize;
    let scroll_offset = if cursor.0 >= visible_height {
        cursor.0 - visible_height + 1
    } else {
        0
    };

    let paragraph = Paragraph::new(lines).scroll((scroll_offset as u16, 0));
    frame.render_widget(paragraph, inner);
}

/// Paint the projection one character at a time, breaking rows on `\n`
fn editor_lines(app: &App, segments: &[Segment]) -> Vec<Line<'static>> {
    let selection = app.selection_range();
    let focused = app.focused_entity().map(|e| e.range());
    let cursor = app.cursor.offset();

    let mut lines = Vec::new();
    let mut spans = Vec::new();
    let mut offset = 0;

    for segment in segments {
        let base = segment_style(segment);
        for ch in segment.text().chars() {
            let mut style = base;
            if focused.is_some_and(|range| range.contains(offset)) {
                style = style.add_modifier(Modifier::BOLD).bg(SURFACE0);
            }
            if selection.is_some_and(|range| range.contains(offset)) {
                style = style.bg(SURFACE1).add_modifier(Modifier::BOLD);
            }
            if offset == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }

            if ch == '\n' {
                if offset == cursor {
                    spans.push(Span::styled(" ", style));
                }
                lines.push(Line::from(std::mem::take(&mut spans)));
            } else {
                spans.push(Span::styled(ch.to_string(), style));
            }
            offset += 1;
        }
    }

    if offset == cursor {
        spans.push(Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)));
    }
    lines.push(Line::from(spans));
    lines
}

fn segment_style(segment: &Segment) -> Style {
    match segment {
        Segment::Literal { .. } => Style::default().fg(TEXT),
        Segment::Annotated { color, .. } => Style::default()
            .fg(parse_color(color).unwrap_or(YELLOW))
            .add_modifier(Modifier::UNDERLINED),
    }
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let entities = app.sorted_entities();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title(format!("Entities ({})", entities.len()));

    let items: Vec<ListItem> = entities
        .iter()
        .enumerate()
        .map(|(sorted_index, entity)| {
            let selected = app.focused == Some(sorted_index);
            let marker = if selected { ">" } else { " " };
            let preview: String = entity.text.chars().take(15).collect::<String>().replace('\n', " ");

            let style = if selected {
                Style::default().fg(TEXT).bg(SURFACE1)
            } else {
                Style::default().fg(TEXT)
            };
            let label_style = style.fg(parse_color(&entity.color).unwrap_or(YELLOW));

            ListItem::new(Line::from(vec![
                Span::styled(format!("{marker} "), style),
                Span::styled(format!("[{}] ", entity.label), label_style),
                Span::styled(format!("\"{preview}\""), style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_listing(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title(format!("Documents ({})", app.listing.len()));

    let items: Vec<ListItem> = app
        .listing
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let selected = i == app.listing_selected;
            let marker = if selected { ">" } else { " " };
            let name = doc.name.clone().unwrap_or_else(|| doc.id.to_string());
            let unsaved = if app.session.buffer().is_dirty(&doc.id) {
                "*"
            } else {
                ""
            };

            let style = if selected {
                Style::default().fg(TEXT).bg(SURFACE1)
            } else {
                Style::default().fg(TEXT)
            };
            ListItem::new(format!("{marker} {}. {name}{unsaved}", i + 1)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_str = match (app.screen, app.session.mode()) {
        (Screen::Project, _) => "PROJECT",
        (_, Mode::Popover) => "CLASS",
        (_, Mode::ConfirmLeave) => "CONFIRM",
        _ if app.anchor.is_some() => "VISUAL",
        _ => "NORMAL",
    };

    let help_hint = match app.screen {
        Screen::Project => "j/k move | Enter open | q quit",
        Screen::Document => "1-9 class | v select | a add | ]/[ focus | x remove | n/p doc | s/S save | c complete",
    };

    let status = app.status_message.as_deref().unwrap_or("");
    let status_text = format!(
        " {} | {}",
        mode_str,
        if status.is_empty() { help_hint } else { status },
    );

    let status_bar = Paragraph::new(status_text).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));
    frame.render_widget(status_bar, area);
}

fn draw_popover(frame: &mut Frame, app: &App) {
    let classes = app.session.filtered_classes();
    let height = classes.len().min(10) as u16 + 3;
    let area = centered_rect(40, height, frame.area());
    frame.render_widget(Clear, area);

    let filter = app
        .session
        .popover()
        .map(|p| p.filter.as_str())
        .unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MAUVE))
        .title(format!("Change class: {filter}_"));

    let items: Vec<ListItem> = if classes.is_empty() {
        vec![ListItem::new("  No matching classes").style(Style::default().fg(SUBTEXT0))]
    } else {
        classes
            .iter()
            .enumerate()
            .map(|(i, class)| {
                let selected = i == app.popover_selected;
                let marker = if selected { ">" } else { " " };
                let color = parse_color(&class.color).unwrap_or(YELLOW);
                let style = if selected {
                    Style::default().fg(color).bg(SURFACE1)
                } else {
                    Style::default().fg(color)
                };
                ListItem::new(format!("{marker} {}", class.name)).style(style)
            })
            .collect()
    };

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_confirm(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(RED))
        .title("Unsaved changes");

    let text = vec![
        Line::from(format!(
            "{} document(s) have unsaved changes.",
            app.session.dirty_count()
        )),
        Line::from(""),
        Line::from(Span::styled("  y  Save all and leave", Style::default().fg(GREEN))),
        Line::from(Span::styled("  d  Discard and leave", Style::default().fg(RED))),
        Line::from(Span::styled("  n  Stay", Style::default().fg(SUBTEXT0))),
    ];

    frame.render_widget(Paragraph::new(text).block(block), area);
}

/// Parse a `#rrggbb` class color
pub fn parse_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(parse_color("#FFEB3B"), Some(Color::Rgb(255, 235, 59)));
    }

    #[test]
    fn test_parse_color_rejects_malformed() {
        assert_eq!(parse_color("ff8000"), None);
        assert_eq!(parse_color("#ff80"), None);
        assert_eq!(parse_color("#gg0000"), None);
        assert_eq!(parse_color("#ffé00"), None);
    }

    #[test]
    fn test_centered_rect_fits_area() {
        let area = Rect::new(0, 0, 20, 5);
        let rect = centered_rect(40, 10, area);
        assert_eq!((rect.width, rect.height), (20, 5));
    }
}
