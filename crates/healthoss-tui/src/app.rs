use ratatui::layout::Rect;
use healthoss_core::{Session, SessionState};

use crate::ui;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub session: Session,
    /// Last snapshot pulled from the session; what the UI draws.
    pub view: SessionState,

    // Draft editing
    pub cursor: usize, // cursor position in the draft, in chars

    // Chat window state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>, // For mouse hit-testing (updated during render)

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(session: Session) -> Self {
        let view = session.view_state();
        Self {
            should_quit: false,
            session,
            view,
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
        }
    }

    /// Pull the latest session state. Scrolls to the newest message when the
    /// transcript grew.
    pub fn sync_session(&mut self) {
        let previous_len = self.view.transcript().len();
        let was_pending = self.view.is_pending();
        self.view = self.session.view_state();

        if self.view.is_pending() && !was_pending {
            self.animation_frame = 0;
        }

        self.cursor = self.cursor.min(self.view.draft().chars().count());

        if self.view.transcript().len() > previous_len {
            self.scroll_to_bottom();
        }
    }

    /// Accept the draft right away so the next keystroke starts a fresh
    /// draft, then run the request in the background.
    pub fn submit(&mut self) {
        if let Ok(dispatch) = self.session.accept() {
            tokio::spawn(dispatch.run());
        }
        self.sync_session();
    }

    /// The session's draft as it is now, not as of the last notification.
    fn current_draft(&mut self) -> String {
        self.sync_session();
        self.view.draft().to_string()
    }

    fn set_draft(&mut self, draft: String) {
        self.session.update_draft(draft);
        self.sync_session();
    }

    pub fn insert_char(&mut self, c: char) {
        let mut draft = self.current_draft();
        let byte_pos = char_to_byte_index(&draft, self.cursor);
        draft.insert(byte_pos, c);
        self.cursor += 1;
        self.set_draft(draft);
    }

    pub fn backspace(&mut self) {
        let mut draft = self.current_draft();
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&draft, self.cursor);
            draft.remove(byte_pos);
            self.set_draft(draft);
        }
    }

    pub fn delete(&mut self) {
        let mut draft = self.current_draft();
        if self.cursor < draft.chars().count() {
            let byte_pos = char_to_byte_index(&draft, self.cursor);
            draft.remove(byte_pos);
            self.set_draft(draft);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.current_draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.current_draft().chars().count();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.view.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_scroll(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let total_lines = ui::chat_lines(&self.view, self.animation_frame, wrap_width).len();
        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        total_lines.saturating_sub(self.visible_height())
    }

    /// Scroll chat to bottom so the latest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.visible_height().saturating_sub(1).max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.visible_height().saturating_sub(1).max(1));
    }
}
