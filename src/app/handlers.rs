//! Key handlers.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::{
    events::{Pane, Screen},
    input::{self, InputBoxState, InputCallbackId},
    session::NoticeLevel,
    shortcuts::matches_shortcut,
    validator::CandidateFile,
};

use super::App;

/// Handle one key press; returns true when the app should exit.
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // Windows reports releases too.
    if k.kind == KeyEventKind::Release {
        return Ok(false);
    }

    // The input box and the confirmation dialog are modal.
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }
    if app.session.confirmation().is_some() {
        handle_confirm_key(app, k).await?;
        return Ok(false);
    }

    // Otherwise the active screen takes the key.
    match app.screen() {
        Screen::Main => handle_main_key(app, k).await,
        Screen::Preview => {
            handle_preview_key(app, k);
            Ok(false)
        }
    }
}

/// Whether this is Ctrl+C.
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// Main screen keys.
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // Bindings and list lengths for selection moves.
    let sc = app.shortcuts.main.clone();
    let files_len = app.session.files().entries().len();
    let reports_len = app.session.reports().entries().len();

    if matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if matches_shortcut(&k, &sc.dismiss) {
        // Clear the toast and fold the log away.
        app.session.dismiss_notice();
        app.ui.show_log = false;
    } else if matches_shortcut(&k, &sc.gstin) {
        // Edit the GSTIN starting from what was typed before.
        app.input_box = Some(InputBoxState::new(
            "GSTIN:",
            &app.session.tenant().gstin_input,
            InputCallbackId::Gstin,
        ));
    } else if matches_shortcut(&k, &sc.add_files) {
        // Ask for paths, showing what the category accepts.
        let category = app.session.tenant().category;
        app.input_box = Some(
            InputBoxState::new("Files to upload:", "", InputCallbackId::FilePaths).with_hint(
                format!(
                    "{category} accepts {}",
                    category.format_rule().accept_hint()
                ),
            ),
        );
    } else if matches_shortcut(&k, &sc.clear_files) {
        // Drop the pending selection.
        app.session.choose_files(Vec::new());
    } else if matches_shortcut(&k, &sc.next_category) {
        // Switch category and re-list its files.
        let next = app.session.tenant().category.next();
        let cmds = app.session.select_category(next);
        app.ui.file_selected = 0;
        app.dispatch(cmds).await?;
    } else if matches_shortcut(&k, &sc.prev_category) {
        let prev = app.session.tenant().category.prev();
        let cmds = app.session.select_category(prev);
        app.ui.file_selected = 0;
        app.dispatch(cmds).await?;
    } else if matches_shortcut(&k, &sc.upload) {
        // Send the pending selection.
        let cmds = app.session.upload();
        app.dispatch(cmds).await?;
    } else if matches_shortcut(&k, &sc.generate) {
        // Start the conflict check, then generation.
        let cmds = app.session.generate();
        app.dispatch(cmds).await?;
    } else if matches_shortcut(&k, &sc.refresh) {
        // Re-fetch both listings.
        let cmds = app.session.refresh();
        app.dispatch(cmds).await?;
    } else if matches_shortcut(&k, &sc.toggle_log) {
        app.ui.show_log = !app.ui.show_log;
    } else if matches_shortcut(&k, &sc.switch_pane) {
        // Move focus between files and reports.
        app.ui.pane = app.ui.pane.toggle();
    } else if matches_shortcut(&k, &sc.down) {
        app.ui.step(true, files_len, reports_len);
    } else if matches_shortcut(&k, &sc.up) {
        app.ui.step(false, files_len, reports_len);
    } else if matches_shortcut(&k, &sc.delete) && app.ui.pane == Pane::Files {
        // Deleting goes through a confirmation first.
        if let Some(name) = selected_name(app, Pane::Files) {
            app.session.request_delete(&name);
        }
    } else if matches_shortcut(&k, &sc.preview) && app.ui.pane == Pane::Reports {
        // Fetch and open the selected report.
        if let Some(name) = selected_name(app, Pane::Reports) {
            let cmds = app.session.open_preview(&name);
            app.dispatch(cmds).await?;
        }
    }

    Ok(false)
}

fn selected_name(app: &App, pane: Pane) -> Option<String> {
    let (entries, idx) = match pane {
        Pane::Files => (app.session.files().entries(), app.ui.file_selected),
        Pane::Reports => (app.session.reports().entries(), app.ui.report_selected),
    };
    entries.get(idx).map(|a| a.name.clone())
}

/// Keys while a confirmation dialog is open.
async fn handle_confirm_key(app: &mut App, k: KeyEvent) -> Result<()> {
    let sc = &app.shortcuts.confirm;
    if matches_shortcut(&k, &sc.accept) {
        let cmds = app.session.confirm();
        app.dispatch(cmds).await?;
    } else if matches_shortcut(&k, &sc.cancel) {
        app.session.dismiss_confirmation();
    }
    Ok(())
}

/// Preview screen keys.
fn handle_preview_key(app: &mut App, k: KeyEvent) {
    let sc = app.shortcuts.preview.clone();
    if matches_shortcut(&k, &sc.close) {
        app.session.close_preview();
        return;
    }
    // Still loading: only closing does anything.
    let Some(preview) = app.session.preview_mut() else {
        return;
    };
    // Row and page movement.
    if matches_shortcut(&k, &sc.down) {
        preview.scroll(1);
    } else if matches_shortcut(&k, &sc.up) {
        preview.scroll(-1);
    } else if matches_shortcut(&k, &sc.page_down) {
        preview.page_down();
    } else if matches_shortcut(&k, &sc.page_up) {
        preview.page_up();
    } else if matches_shortcut(&k, &sc.top) {
        preview.home();
    } else if matches_shortcut(&k, &sc.bottom) {
        preview.end();
    } else if matches_shortcut(&k, &sc.left) {
        // Column movement.
        preview.scroll_columns(-1);
    } else if matches_shortcut(&k, &sc.right) {
        preview.scroll_columns(1);
    } else if matches_shortcut(&k, &sc.next_sheet) {
        // Sheet tabs.
        preview.next_sheet();
    } else if matches_shortcut(&k, &sc.prev_sheet) {
        preview.prev_sheet();
    }
}

/// Editing keys for the open InputBox.
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if matches_shortcut(&k, &sc.confirm) {
        // Take the value before closing the box.
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id;
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if matches_shortcut(&k, &sc.cancel) {
        // Close without applying.
        app.input_box = None;
    } else if matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        // Anything else printable is typed.
        input_state.insert_char(c);
    }

    Ok(false)
}

/// Hand a confirmed InputBox value to its target.
async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::Gstin => {
            // New GSTIN: selections reset, listings follow.
            let cmds = app.session.set_gstin(&value);
            app.ui.clamp(0, 0);
            app.dispatch(cmds).await?;
        }
        InputCallbackId::FilePaths => {
            // Every path must be readable before validation runs.
            let mut files = Vec::new();
            for path in input::split_paths(&value) {
                match CandidateFile::from_path(&path) {
                    Ok(f) => files.push(f),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "cannot read selected file: {e}");
                        app.session.notify(
                            NoticeLevel::Error,
                            "Cannot read selected file.",
                            Some(format!("{}: {e}", path.display())),
                        );
                        return Ok(());
                    }
                }
            }
            app.session.choose_files(files);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        session::Session,
        shortcuts::Shortcuts,
        tenant::{ReturnCategory, TenantContext},
        worker::{WorkerCmd, WorkerEvent},
    };
    use tokio::sync::mpsc;

    fn app(gstin: &str) -> (App, mpsc::Receiver<WorkerCmd>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(16);
        let (_tx_ev, rx_ev) = mpsc::channel(16);
        let (session, _) = Session::new(TenantContext::new(gstin, ReturnCategory::Gstr1));
        (
            App::new(Config::default(), Shortcuts::default(), session, tx_cmd, rx_ev),
            rx_cmd,
        )
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
    }

    #[tokio::test]
    async fn typing_a_gstin_relists() {
        let (mut app, mut rx) = app("");
        handle_key(&mut app, key('g')).await.unwrap();
        assert!(app.input_box.is_some());
        for c in "22abcde1234f1z5".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::empty()))
            .await
            .unwrap();

        assert!(app.input_box.is_none());
        assert_eq!(app.session.tenant().gstin_input, "22ABCDE1234F1Z5");
        assert!(matches!(rx.try_recv().unwrap(), WorkerCmd::ListFiles { .. }));
        assert!(matches!(rx.try_recv().unwrap(), WorkerCmd::ListReports { .. }));
    }

    #[tokio::test]
    async fn category_keys_cycle() {
        let (mut app, _rx) = app("22ABCDE1234F1Z5");
        handle_key(&mut app, key('c')).await.unwrap();
        assert_eq!(app.session.tenant().category, ReturnCategory::Gstr2a);
        handle_key(&mut app, key('[')).await.unwrap();
        handle_key(&mut app, key('[')).await.unwrap();
        assert_eq!(app.session.tenant().category, ReturnCategory::Recon);
    }

    #[tokio::test]
    async fn unreadable_path_raises_notice() {
        let (mut app, _rx) = app("22ABCDE1234F1Z5");
        apply_input_callback(&mut app, InputCallbackId::FilePaths, "/no/such/file.xlsx".into())
            .await
            .unwrap();
        assert_eq!(app.session.toast().unwrap().title, "Cannot read selected file.");
        assert!(app.session.pending().is_empty());
    }

    #[tokio::test]
    async fn quit_key_exits() {
        let (mut app, _rx) = app("");
        assert!(handle_key(&mut app, key('q')).await.unwrap());
    }

    #[tokio::test]
    async fn preview_screen_follows_the_preview_slot() {
        let (mut app, mut rx) = app("22ABCDE1234F1Z5");
        app.session.handle_worker_event(WorkerEvent::ReportsListed {
            gstin: crate::tenant::Gstin::parse("22ABCDE1234F1Z5").unwrap(),
            seq: 1,
            result: Ok(vec!["master.xlsx".into()]),
        });
        assert_eq!(app.screen(), Screen::Main);

        app.ui.pane = Pane::Reports;
        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::empty()))
            .await
            .unwrap();
        assert_eq!(app.screen(), Screen::Preview);
        assert!(matches!(rx.try_recv().unwrap(), WorkerCmd::FetchPreview { .. }));

        handle_key(&mut app, KeyEvent::new(KeyCode::Esc, KeyModifiers::empty()))
            .await
            .unwrap();
        assert_eq!(app.screen(), Screen::Main);
    }
}
