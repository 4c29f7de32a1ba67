use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use healthoss_core::{ChatRole, SessionState};
use crate::app::App;

const TAGLINE: &str = "Your Multi-Agent Wellness Partner";
const INPUT_PLACEHOLDER: &str = "Log spend, ask about fitness, or check sleep...";
const BULLET: &str = "• ";

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping (doesn't break mid-word)
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            // First word on line
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            // Word fits on current line
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            // Word doesn't fit, start new line
            lines.push(current_line);
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    // Don't forget the last line
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Parse a line of text with basic markdown formatting (**bold**)
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next(); // consume second *
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Render one line of assistant content, wrapped to `width`.
/// Headings become bold, `-`/`*` list items get a bullet and a hanging indent.
fn render_content_line(line: &str, width: usize, out: &mut Vec<Line<'static>>) {
    let trimmed = line.trim_start();

    if trimmed.starts_with('#') {
        let heading = trimmed.trim_start_matches('#').trim();
        for wrapped in wrap_text_to_width(heading, width) {
            out.push(Line::from(Span::styled(
                wrapped,
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
        }
        return;
    }

    let item = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "));

    match item {
        Some(item) => {
            let indent = BULLET.chars().count();
            let wrapped = wrap_text_to_width(item, width.saturating_sub(indent));
            for (i, piece) in wrapped.into_iter().enumerate() {
                let prefix = if i == 0 { BULLET.to_string() } else { " ".repeat(indent) };
                let mut spans = vec![Span::styled(prefix, Style::default().fg(Color::Green))];
                spans.extend(parse_markdown_line(&piece).spans);
                out.push(Line::from(spans));
            }
        }
        None => {
            for piece in wrap_text_to_width(line, width) {
                out.push(parse_markdown_line(&piece));
            }
        }
    }
}

/// Build the chat transcript as pre-wrapped lines.
/// Also used by the app to work out how far it can scroll.
pub fn chat_lines(state: &SessionState, animation_frame: u8, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in state.transcript() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    for piece in wrap_text_to_width(line, width) {
                        lines.push(Line::from(piece));
                    }
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistant:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    render_content_line(line, width, &mut lines);
                }
            }
        }
        lines.push(Line::default());
    }

    if state.is_pending() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" HealthOSS ", Style::default().fg(Color::Green).bold()),
        Span::styled(TAGLINE, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    let width_changed = app.chat_width != area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    app.chat_area = Some(area);

    // Rewrapping changes the line count; keep the bottom in view
    if width_changed {
        app.scroll_to_bottom();
    }

    let lines = chat_lines(&app.view, app.animation_frame, app.chat_width as usize);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Chat ");

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.view.is_pending();
    let (border_color, title) = if pending {
        (Color::DarkGray, " Message (waiting for reply...) ")
    } else {
        (Color::Cyan, " Message ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let draft = app.view.draft();

    let (offset, cursor_col) = input_window(app.cursor, inner_width);

    let content = if draft.is_empty() {
        Line::from(Span::styled(
            INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(draft.chars().skip(offset).take(inner_width).collect::<String>())
    };

    frame.render_widget(Paragraph::new(content).block(block), area);

    let cursor_x = area.x.saturating_add(1).saturating_add(cursor_col);
    frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
}

/// Slide the draft left when it overflows so the cursor stays visible.
/// Returns the first visible char and the cursor column inside the box.
fn input_window(cursor: usize, inner_width: usize) -> (usize, u16) {
    if inner_width == 0 {
        return (cursor, 0);
    }
    let offset = cursor.saturating_sub(inner_width - 1);
    let column = (cursor - offset).min(inner_width - 1);
    (offset, u16::try_from(column).unwrap_or(u16::MAX))
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = [
        ("Enter", "send"),
        ("↑↓", "scroll"),
        ("PgUp/PgDn", "page"),
        ("Esc", "quit"),
    ];

    let mut spans = vec![Span::styled(
        if app.view.is_pending() { " WAITING " } else { " CHAT " },
        Style::default().bg(Color::Green).fg(Color::Black).bold(),
    )];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
