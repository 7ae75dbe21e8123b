use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Handle key event and update app state
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.quit(),
            KeyCode::Char('d') => app.console_mut().scroll_half_page_down(),
            KeyCode::Char('u') => {
                app.console_mut().set_auto_scroll(false);
                app.console_mut().scroll_half_page_up();
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),

        // Kill the running job; the main loop performs the actual stop
        KeyCode::Char('s') => app.request_stop(),

        // Horizontal scroll (h/l/0)
        KeyCode::Char('h') | KeyCode::Left => app.console_mut().scroll_left(),
        KeyCode::Char('l') | KeyCode::Right => app.console_mut().scroll_right(),
        KeyCode::Char('0') => app.console_mut().scroll_to_left(),

        // Vertical scroll (j/k); moving up stops following new output
        KeyCode::Char('j') | KeyCode::Down => app.console_mut().scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => {
            app.console_mut().set_auto_scroll(false);
            app.console_mut().scroll_up();
        }

        // Jump to top/bottom
        KeyCode::Char('g') | KeyCode::Home => {
            app.console_mut().set_auto_scroll(false);
            app.console_mut().scroll_to_top();
        }
        KeyCode::Char('G') | KeyCode::End => app.console_mut().scroll_to_bottom(),

        // Toggle auto-scroll
        KeyCode::Char('f') => app.console_mut().toggle_auto_scroll(),

        _ => {}
    }
}
