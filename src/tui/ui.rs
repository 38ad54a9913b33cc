use super::app::{App, FeedState};
use crate::status::{CLASS_ERROR, CLASS_OK, StatusBoard};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

pub fn render(frame: &mut Frame, app: &App) {
    let board = app.dispatcher().board();
    let table_height = status_table_height(board.len(), frame.area().height);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),            // Header (single line, no border)
            Constraint::Length(table_height), // Instance status
            Constraint::Min(8),               // Chart
            Constraint::Length(1),            // Footer (single line, no border)
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_status_table(frame, board, chunks[1]);
    render_chart(frame, app, chunks[2]);
    render_footer(frame, chunks[3]);
}

/// Rows plus header and borders, capped at a third of the screen.
fn status_table_height(rows: usize, area_height: u16) -> u16 {
    u16::try_from(rows)
        .unwrap_or(u16::MAX)
        .saturating_add(3)
        .min(area_height / 3 + 3)
        .max(4)
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let elapsed = app.elapsed();
    let hours = elapsed.as_secs() / 3600;
    let minutes = (elapsed.as_secs() % 3600) / 60;
    let seconds = elapsed.as_secs() % 60;
    let stats = app.stats();

    let badge = match app.feed_state() {
        FeedState::Live => Span::styled(" LIVE ", Style::default().bg(Color::Green).fg(Color::Black)),
        FeedState::Paused => {
            Span::styled(" PAUSED ", Style::default().bg(Color::Yellow).fg(Color::Black))
        }
        FeedState::Closed => Span::styled(" CLOSED ", Style::default().bg(Color::Red).fg(Color::White)),
    };

    let mut spans = vec![
        Span::styled("opsdash", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        badge,
        Span::raw(format!(
            " {:02}:{:02}:{:02} │ {} ticks │ {} malformed",
            hours,
            minutes,
            seconds,
            app.dispatcher().ticks(),
            stats.malformed
        )),
    ];

    if let Some(err) = &stats.last_error {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_table(frame: &mut Frame, board: &StatusBoard, area: Rect) {
    let block = Block::default()
        .title(" Instances ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    if board.is_empty() {
        let msg = Paragraph::new(" Waiting for topology...")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, area);
        return;
    }

    let header_cells = ["App", "Instance", "Status", "Since", "Uptime"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = board
        .rows()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.app.to_string()),
                Cell::from(row.addr.to_string()),
                Cell::from(row.status.text.clone())
                    .style(Style::default().fg(color_for_class(&row.status.class))),
                Cell::from(row.time.to_string()),
                Cell::from(row.duration.to_string()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Percentage(15),
        Constraint::Percentage(30),
        Constraint::Length(8),
        Constraint::Length(21),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    match app.dispatcher().session() {
        Some(session) => session.view().renderer().render(frame, area),
        None => {
            let block = Block::default()
                .title(format!(" {} ", app.dispatcher().options().title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray));
            let msg = Paragraph::new(" Waiting for first sample...")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
        }
    }
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let spans = vec![
        Span::styled(" q ", Style::default().bg(Color::DarkGray)),
        Span::raw(" quit "),
        Span::styled(" p ", Style::default().bg(Color::DarkGray)),
        Span::raw(" pause "),
    ];

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn color_for_class(class: &str) -> Color {
    match class {
        CLASS_OK => Color::Green,
        CLASS_ERROR => Color::Red,
        _ => Color::Yellow,
    }
}
