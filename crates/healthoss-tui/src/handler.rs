use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Session => app.sync_session(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit(),

        // Draft editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.insert_char(c),

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);

    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_LINES),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_LINES),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use healthoss_core::{ChatMessage, HttpTransport, Session};
    use std::sync::Arc;

    fn new_app() -> App {
        App::new(Session::new(Arc::new(HttpTransport::new("http://127.0.0.1:9/chat"))))
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_keystrokes_edit_draft() {
        let mut app = new_app();
        for c in "water".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Backspace));
        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));

        assert_eq!(app.session.view_state().draft(), "ate");
    }

    #[tokio::test]
    async fn test_enter_submits_draft() {
        // Held open so the request never resolves during the test.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut app = App::new(Session::new(Arc::new(HttpTransport::new(&format!(
            "http://{}/chat",
            addr
        )))));

        for c in "Is coffee ok?".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Enter));

        let state = app.session.view_state();
        assert_eq!(state.transcript().len(), 2);
        assert_eq!(
            state.transcript().last(),
            Some(&ChatMessage::user("Is coffee ok?"))
        );
        assert!(state.is_pending());
        assert_eq!(state.draft(), "");
        assert_eq!(app.cursor, 0);

        // A second Enter while waiting adds nothing.
        handle_event(&mut app, key(KeyCode::Char('?')));
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.view_state().transcript().len(), 2);
        assert_eq!(app.session.view_state().draft(), "?");
        drop(listener);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = new_app();
        handle_event(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);

        let mut app = new_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
        assert_eq!(app.view.draft(), "");
    }

    #[test]
    fn test_wheel_scrolls_only_inside_chat() {
        let mut app = new_app();
        app.chat_height = 1;
        app.chat_width = 10;
        app.chat_area = Some(Rect::new(0, 1, 12, 3));

        handle_event(&mut app, mouse(MouseEventKind::ScrollDown, 40, 40));
        assert_eq!(app.chat_scroll, 0);

        handle_event(&mut app, mouse(MouseEventKind::ScrollDown, 2, 2));
        assert_eq!(app.chat_scroll, WHEEL_LINES);

        handle_event(&mut app, mouse(MouseEventKind::ScrollUp, 2, 2));
        assert_eq!(app.chat_scroll, 0);
    }
}
