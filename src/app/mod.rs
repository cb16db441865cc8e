//! TUI event loop, input dispatch and app state.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    backend::{Backend, HttpBackend},
    config::Config,
    events::{Screen, UiState},
    input::InputBoxState,
    session::{PreviewSlot, Session},
    shortcuts::Shortcuts,
    tenant::TenantContext,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// State shared by the input handlers and the renderer.
pub struct App {
    pub cfg: Config,
    /// Tenant, selections, listings and workflow status.
    pub session: Session,
    /// Selection and pane focus; nothing here reaches the backend.
    pub ui: UiState,
    /// Commands to the worker.
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Results from the worker.
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    /// Open text input, if any.
    pub input_box: Option<InputBoxState>,
    pub shortcuts: Shortcuts,
}

impl App {
    pub fn new(
        cfg: Config,
        shortcuts: Shortcuts,
        session: Session,
        worker_tx: mpsc::Sender<WorkerCmd>,
        worker_rx: mpsc::Receiver<WorkerEvent>,
    ) -> Self {
        Self {
            cfg,
            session,
            ui: UiState::default(),
            worker_tx,
            worker_rx,
            input_box: None,
            shortcuts,
        }
    }

    /// The preview takes over the screen while one is loading or open.
    pub fn screen(&self) -> Screen {
        match self.session.preview() {
            PreviewSlot::Closed => Screen::Main,
            PreviewSlot::Loading(_) | PreviewSlot::Open(_) => Screen::Preview,
        }
    }

    /// Hand session commands to the worker.
    pub async fn dispatch(&mut self, cmds: Vec<WorkerCmd>) -> Result<()> {
        for cmd in cmds {
            tracing::debug!(?cmd, "dispatch");
            self.worker_tx.send(cmd).await?;
        }
        Ok(())
    }

    /// Apply a worker result and run whatever it triggers.
    pub async fn on_worker_event(&mut self, ev: WorkerEvent) -> Result<()> {
        let follow_up = self.session.handle_worker_event(ev);
        self.ui.clamp(
            self.session.files().entries().len(),
            self.session.reports().entries().len(),
        );
        self.dispatch(follow_up).await
    }
}

/// Run the TUI until the user quits.
pub async fn run_app(terminal: &mut Tui, cfg: Config) -> Result<()> {
    // Key bindings (defaults when the file is absent).
    let shortcuts = Shortcuts::load_or_default(PathBuf::from("shortcut.toml"))?;

    // Command/event channels for the worker.
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    // HTTP client for the configured backend, driven by the worker.
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(
        &cfg.backend.base_url,
        cfg.backend.timeout(),
    )?);
    tracing::info!(url = %cfg.backend.base_url, "backend configured");
    tokio::spawn(worker::run(rx_cmd, tx_ev, backend));

    // Session seeded with the configured GSTIN and category.
    let tenant = TenantContext::new(
        cfg.session.gstin.as_deref().unwrap_or_default(),
        cfg.session.default_category,
    );
    let (session, initial) = Session::new(tenant);
    let mut app = App::new(cfg, shortcuts, session, tx_cmd, rx_ev);
    // Initial listings for a pre-configured GSTIN.
    app.dispatch(initial).await?;

    loop {
        // Redraw every pass.
        terminal.draw(|f| draw(f, &app))?;

        // Drain worker results before reading keys.
        while let Ok(ev) = app.worker_rx.try_recv() {
            app.on_worker_event(ev).await?;
        }

        // Short poll keeps the UI responsive while calls are in flight.
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // Ctrl+C always quits, whatever is open.
            if is_ctrl_c(&k) {
                break;
            }
            // The handler says when to quit.
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}
