use crate::app::{App, Focus, Mode};
use crate::map::{MapLayers, PopupView, SurfaceView};
use crate::model::CityRef;
use crate::query::Autocomplete;
use crate::session::Endpoint;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 34;

/// Sidebar, map and status bar areas for a terminal of size `area`
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Sidebar + map
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
        .split(rows[0]);
    (cols[0], cols[1], rows[1])
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Safety Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Inner map rectangle, in terminal cells
pub fn map_area(area: Rect) -> Rect {
    let (_, map, _) = layout(area);
    map_block().inner(map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let (sidebar, map, status) = layout(frame.area());
    match app.mode {
        Mode::Browse => render_browse_sidebar(frame, app, sidebar),
        Mode::Route => render_route_sidebar(frame, app, sidebar),
    }
    render_map(frame, app, map);
    render_status_bar(frame, app, status);
}

fn sidebar_block(title: &'static str, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn zone_dot(app: &App, city: &CityRef) -> Span<'static> {
    let icon = app.surface.registry().icon(city.zone);
    Span::styled(format!("{} ", icon.glyph), Style::default().fg(icon.fill))
}

fn input_line(label: &'static str, text: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(label, dim()),
        Span::styled(format!("{text}{cursor}"), style),
    ])
}

fn render_browse_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Search;
    let block = sidebar_block(" Cities ", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        input_line("Search: ", &app.query.text, focused),
        Line::from(vec![
            Span::styled("Zone:   ", dim()),
            Span::styled(app.zone_filter_label(), Style::default().fg(Color::Yellow)),
        ]),
        Line::default(),
    ];

    let visible = app.visible_cities();
    if visible.is_empty() && !app.is_loading() && app.load_error.is_none() {
        lines.push(Line::styled("No cities match", dim()));
    }

    // keep the cursor row on screen, leaving room for the details panel
    let list_rows = (inner.height as usize).saturating_sub(lines.len() + 7).max(1);
    let first = app.list_cursor.saturating_sub(list_rows - 1);
    for (i, city) in visible.iter().enumerate().skip(first).take(list_rows) {
        let mut style = Style::default().fg(Color::White);
        if i == app.list_cursor && focused {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            zone_dot(app, city),
            Span::styled(city.name.clone(), style),
            Span::styled(format!("  {}", city.region), dim()),
        ]));
    }

    if let Some(city) = &app.selected {
        let style = app.surface.registry().style(city.zone);
        lines.push(Line::default());
        lines.push(Line::styled(city.name.clone(), Style::default().add_modifier(Modifier::BOLD)));
        lines.push(Line::styled(city.region.clone(), dim()));
        lines.push(Line::styled(style.label, Style::default().fg(style.color)));
        if let Some(risk) = city.risk_index {
            lines.push(Line::from(format!("Crime Index: {risk:.1}")));
        }
        lines.push(Line::styled(
            format!("{:.4}, {:.4}", city.coord.lat, city.coord.lng),
            dim(),
        ));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn suggestion_lines(app: &App, input: &Autocomplete, focused: bool) -> Vec<Line<'static>> {
    if !focused {
        return Vec::new();
    }
    input
        .suggestions(&app.cities)
        .iter()
        .enumerate()
        .map(|(i, city)| {
            let mut style = Style::default().fg(Color::Gray);
            if i == input.cursor() {
                style = style.fg(Color::White).add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::raw("  "),
                zone_dot(app, city),
                Span::styled(city.name.clone(), style),
                Span::styled(format!(" {}", city.region), dim()),
            ])
        })
        .collect()
}

fn render_route_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Start | Focus::Destination);
    let block = sidebar_block(" Safe Route ", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    for (which, label, focus) in [
        (Endpoint::Start, "From: ", Focus::Start),
        (Endpoint::Destination, "To:   ", Focus::Destination),
    ] {
        let input = app.input(which);
        let has_focus = app.focus == focus;
        lines.push(input_line(label, input.text(), has_focus));
        lines.extend(suggestion_lines(app, input, has_focus));
    }
    lines.push(Line::default());

    if app.session.is_loading() {
        lines.push(Line::styled("Finding route…", Style::default().fg(Color::Yellow)));
    }
    if let Some(route) = app.session.route() {
        let registry = app.surface.registry();
        let (verdict, color) = if route.is_safe() {
            ("Safe route", registry.color(crate::model::Zone::Safe))
        } else {
            ("Passes high-risk areas", registry.color(crate::model::Zone::HighRisk))
        };
        lines.push(Line::styled(verdict, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        if let Some(distance) = &route.distance {
            lines.push(Line::from(format!("Distance: {distance}")));
        }
        if let Some(duration) = &route.duration {
            lines.push(Line::from(format!("Duration: {duration}")));
        }
        if let Some(score) = route.safety_score {
            lines.push(Line::from(format!("Safety score: {score:.0}/100")));
        }
        lines.push(Line::from(format!("Segments: {}", route.segments.len())));
    }

    lines.push(Line::default());
    for hint in ["Tab: edit endpoints", "Enter/f: find route", "x: swap  Del: clear"] {
        lines.push(Line::styled(hint, dim()));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match app.surface.render() {
        SurfaceView::Loading => {
            render_placeholder(frame, inner, "Loading cities…", Color::Yellow);
        }
        SurfaceView::Error(msg) => {
            render_placeholder(frame, inner, &msg, Color::Red);
        }
        SurfaceView::Map { layers, legend, popup } => {
            let empty = app.mode == Mode::Browse && app.surface.scene().marker_count() == 0;
            frame.render_widget(MapWidget { layers }, inner);
            if let Some(rows) = legend {
                render_legend(frame, inner, &rows);
            }
            if let Some(popup) = popup {
                render_popup(frame, inner, &popup);
            }
            if empty {
                render_placeholder(frame, inner, "No cities match", Color::DarkGray);
            }
        }
    }
}

fn render_placeholder(frame: &mut Frame, area: Rect, text: &str, color: Color) {
    let y = area.y + area.height / 2;
    let line = Rect::new(area.x, y.min(area.bottom().saturating_sub(1)), area.width, 1);
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(color))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, line);
}

fn render_legend(frame: &mut Frame, area: Rect, rows: &[(&'static str, Color)]) {
    let width = rows.iter().map(|(label, _)| label.len() as u16).max().unwrap_or(0) + 6;
    let height = rows.len() as u16 + 2;
    if area.width < width || area.height < height {
        return;
    }
    let rect = Rect::new(area.right() - width, area.bottom() - height, width, height);
    let lines: Vec<Line> = rows
        .iter()
        .map(|(label, color)| {
            Line::from(vec![
                Span::styled("● ", Style::default().fg(*color)),
                Span::styled(*label, Style::default().fg(Color::Gray)),
            ])
        })
        .collect();
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(dim())
                .title(Span::styled(" Zones ", dim())),
        ),
        rect,
    );
}

fn render_popup(frame: &mut Frame, area: Rect, popup: &PopupView) {
    let width = popup.lines.iter().map(|l| l.chars().count() as u16).max().unwrap_or(0) + 4;
    let height = popup.lines.len() as u16 + 2;
    if area.width < width || area.height < height {
        return;
    }
    // above-right of the anchor, clamped inside the map
    let x = (area.x + popup.col + 1).min(area.right() - width);
    let y = (area.y + popup.row).saturating_sub(height).max(area.y);
    let rect = Rect::new(x, y, width, height);

    let lines: Vec<Line> = popup
        .lines
        .iter()
        .enumerate()
        .map(|(i, text)| match i {
            0 => Line::styled(text.clone(), Style::default().add_modifier(Modifier::BOLD)),
            2 => Line::styled(text.clone(), Style::default().fg(popup.accent)),
            _ => Line::from(text.clone()),
        })
        .collect();
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(popup.accent)),
        ),
        rect,
    );
}

/// Custom widget that renders the colored braille map with text labels overlaid
struct MapWidget {
    layers: MapLayers,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (col, row, ch, ink) in self.layers.canvas.cells() {
            // Skip empty braille characters (U+2800)
            if ch == '\u{2800}' || col >= area.width || row >= area.height {
                continue;
            }
            buf[(area.x + col, area.y + row)]
                .set_char(ch)
                .set_fg(ink.unwrap_or(Color::White));
        }

        for label in &self.layers.labels {
            if label.row >= area.height || label.col >= area.width {
                continue;
            }
            let max_len = (area.width - label.col) as usize;
            let style = Style::default().fg(label.color);
            for (i, ch) in label.text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + label.col + i as u16, area.y + label.row)]
                    .set_char(ch)
                    .set_style(style);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.surface.settings;
    let toggle = |on: bool, on_text: &'static str, off_text: &'static str| {
        Span::styled(
            if on { on_text } else { off_text },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };
    let mode = match app.mode {
        Mode::Browse => " BROWSE ",
        Mode::Route => " ROUTE ",
    };

    let mut spans = vec![
        Span::styled(mode, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(" Zoom: ", dim()),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim()),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", dim()),
        toggle(settings.show_zone_circles, "[C]ircles ", "[c]ircles "),
        toggle(settings.show_legend, "[G]legend ", "[g]legend "),
        toggle(settings.show_labels, "[L]abels ", "[l]abels "),
        toggle(settings.show_basemap, "[B]asemap ", "[b]asemap "),
    ];

    match &app.toast {
        Some(toast) => {
            let color = if toast.is_error { Color::Red } else { Color::Green };
            spans.push(Span::styled(format!("| {}", toast.text), Style::default().fg(color)));
        }
        None if app.map_ready => spans.push(Span::styled(
            "| m:mode /:search z:zone hjkl:pan +/-:zoom q:quit",
            dim(),
        )),
        None => spans.push(Span::styled("| R:reload q:quit", dim())),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
