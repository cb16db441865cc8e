//! Single-line text input popup (InputBox).

use std::path::PathBuf;

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::layout::centered_popup;

/// InputBox editing state.
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// Prompt shown above the field.
    pub prompt: String,
    /// Extra line under the field, e.g. the accepted extensions.
    pub hint: Option<String>,
    pub value: String,
    /// Cursor position in characters.
    pub cursor: usize,
    /// What to do with the value on confirm.
    pub callback_id: InputCallbackId,
}

/// Where a confirmed value goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    /// Replace the GSTIN.
    Gstin,
    /// Replace the pending selection with these paths.
    FilePaths,
}

impl InputBoxState {
    /// Open a box pre-filled with `value`, cursor at the end.
    pub fn new(prompt: impl Into<String>, value: &str, callback_id: InputCallbackId) -> Self {
        Self {
            prompt: prompt.into(),
            hint: None,
            value: value.to_string(),
            cursor: value.chars().count(),
            callback_id,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Insert at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Remove the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Split a typed or pasted list of paths. Whitespace separates entries and
/// quotes keep spaces inside one path. Outside quotes a backslash escapes the
/// next character, as terminals write dropped files, except on Windows where
/// it is the path separator.
pub fn split_paths(input: &str) -> Vec<PathBuf> {
    split_path_list(input, !cfg!(windows))
}

fn split_path_list(input: &str, backslash_escapes: bool) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            // Inside quotes everything is literal up to the closing quote.
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => quote = Some(c),
            (None, '\\') if backslash_escapes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            // Unquoted whitespace ends the current path.
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    out.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(PathBuf::from(current));
    }
    out
}

/// Draw the InputBox as a popup over the current screen.
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 8);

    // Clear what is underneath.
    f.render_widget(Clear, popup_area);

    // Frame.

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    // One row each inside the frame.
    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // prompt
            Constraint::Length(1), // field
            Constraint::Length(1), // hint
            Constraint::Length(1), // blank
            Constraint::Length(1), // help
        ])
        .split(popup_area);

    // Prompt.
    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner_layout[0]);

    // Scroll horizontally once the cursor runs past the field.
    let display_width = inner_layout[1].width as usize;
    let scroll_offset = state
        .cursor
        .saturating_sub(display_width.saturating_sub(2));

    // Visible slice of the value.
    let chars: Vec<char> = state.value.chars().collect();
    let visible: Vec<char> = chars
        .iter()
        .skip(scroll_offset)
        .take(display_width)
        .copied()
        .collect();

    // Cursor drawn as a bar between characters.
    let cursor_in_visible = state.cursor.saturating_sub(scroll_offset).min(visible.len());
    let before: String = visible[..cursor_in_visible].iter().collect();
    let after: String = visible[cursor_in_visible..].iter().collect();

    let input_widget =
        Paragraph::new(format!("{before}|{after}")).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner_layout[1]);

    // Hint under the field.
    if let Some(hint) = &state.hint {
        let hint_widget = Paragraph::new(hint.clone()).style(Style::default().fg(Color::Yellow));
        f.render_widget(hint_widget, inner_layout[2]);
    }

    // Key help.
    let help = Paragraph::new("Enter=confirm | Esc=cancel | Ctrl+U=clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner_layout[4]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_handles_multibyte_text() {
        let mut s = InputBoxState::new("GSTIN:", "ab", InputCallbackId::Gstin);
        s.move_left();
        s.insert_char('é');
        assert_eq!(s.value, "aéb");
        s.backspace();
        assert_eq!(s.value, "ab");
        s.move_home();
        s.delete();
        assert_eq!(s.value, "b");
        s.move_end();
        assert_eq!(s.cursor, 1);
        s.clear_line();
        assert!(s.value.is_empty());
    }

    #[test]
    fn paths_split_on_whitespace_with_quotes_and_escapes() {
        let got = split_path_list(
            r#"/tmp/a.xlsx  '/tmp/my file.xlsx' "/tmp/b c.pdf" /tmp/d\ e.xls"#,
            true,
        );
        assert_eq!(
            got,
            vec![
                PathBuf::from("/tmp/a.xlsx"),
                PathBuf::from("/tmp/my file.xlsx"),
                PathBuf::from("/tmp/b c.pdf"),
                PathBuf::from("/tmp/d e.xls"),
            ]
        );
        assert!(split_paths("   ").is_empty());
    }

    #[test]
    fn windows_paths_keep_their_separators() {
        let got = split_path_list(
            r#"C:\Users\me\gstr1.xlsx "D:\GST Files\b.xls" \\server\share\c.pdf"#,
            false,
        );
        assert_eq!(
            got,
            vec![
                PathBuf::from(r"C:\Users\me\gstr1.xlsx"),
                PathBuf::from(r"D:\GST Files\b.xls"),
                PathBuf::from(r"\\server\share\c.pdf"),
            ]
        );
    }
}
