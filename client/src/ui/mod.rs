pub mod devices;
pub mod preview;

mod utils;

use crate::app::{App, UserAction, discard_queued, status_handler};
use common::{Severity, Status};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use lumacam::{CaptureController, MediaDevices, SessionState, lock};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use std::error::Error;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tracing::info;
use utils::severity_color;

/// How often the camera list is re-enumerated to pick up plugged and
/// unplugged cameras
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Map a key press to what the user wants
pub fn key_action(code: KeyCode) -> UserAction {
    match code {
        KeyCode::Char('s') | KeyCode::Enter => UserAction::Start,
        KeyCode::Char('x') => UserAction::Stop,
        KeyCode::Char('p') => UserAction::Snapshot,
        KeyCode::Down => UserAction::NextDevice,
        KeyCode::Up => UserAction::PreviousDevice,
        KeyCode::Char('r') => UserAction::RefreshDevices,
        KeyCode::Char('q') | KeyCode::Esc => UserAction::Quit,
        _ => UserAction::None,
    }
}

/// Run the terminal host until the user quits. The camera is stopped on
/// the way out.
pub async fn run_ui<D: MediaDevices>(
    mut controller: CaptureController<D>,
    mut app: App,
) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Cleanup guard to restore terminal always
    struct CleanupGuard;
    impl Drop for CleanupGuard {
        fn drop(&mut self) {
            let _ = disable_raw_mode();
            let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
            let _ = Terminal::new(CrosstermBackend::new(std::io::stdout()))
                .and_then(|mut term| term.show_cursor());
        }
    }
    let _cleanup_guard = CleanupGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // replaced on every start, so readings from an earlier session never arrive
    let (_, mut status_rx) = mpsc::unbounded_channel::<Status>();
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(controller.config().frame_period());
    let mut device_poll = tokio::time::interval(DEVICE_POLL_INTERVAL);
    device_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal.draw(|f| draw(f, &mut app, &controller))?;

        let action = tokio::select! {
            _ = redraw.tick() => UserAction::None,
            _ = device_poll.tick() => UserAction::RefreshDevices,
            Some(status) = status_rx.recv() => {
                app.status = status;
                UserAction::None
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => key_action(key.code),
                // resizes are picked up by the next draw
                Some(Ok(_)) => UserAction::None,
                Some(Err(e)) => return Err(e.into()),
                None => UserAction::Quit,
            },
        };

        match action {
            UserAction::Start => {
                if app.starting || controller.state() == SessionState::Running {
                    continue;
                }
                app.starting = true;
                app.status = Status::info("Starting camera...");
                terminal.draw(|f| draw(f, &mut app, &controller))?;
                start_selected(&mut app, &mut controller, &mut status_rx).await;
            }
            UserAction::Stop => {
                controller.stop().await;
                discard_queued(&mut status_rx);
                app.status = Status::stopped();
            }
            UserAction::Snapshot => match controller.snapshot() {
                Ok(Some(path)) => app.status = Status::snapshot_saved(&path),
                Ok(None) => {}
                Err(e) => app.status = Status::new(format!("Snapshot failed: {}", e), Severity::Error),
            },
            UserAction::NextDevice | UserAction::PreviousDevice => {
                if action == UserAction::NextDevice {
                    app.next_device();
                } else {
                    app.previous_device();
                }
                // changing the camera while running restarts on the new one
                if controller.state() == SessionState::Running
                    && controller.current_device() != app.selected_device_id()
                {
                    start_selected(&mut app, &mut controller, &mut status_rx).await;
                }
            }
            UserAction::RefreshDevices => {
                let listed = controller.refresh_devices().await;
                app.refresh_devices(listed);
            }
            UserAction::Quit => break,
            UserAction::None => {}
        }
    }

    controller.stop().await;
    info!("terminal host closed");
    Ok(())
}

/// Start (or restart) the camera on the requested or selected device, or
/// the default camera when nothing is listed. Statuses of the new session
/// arrive on a fresh `status_rx`.
async fn start_selected<D: MediaDevices>(
    app: &mut App,
    controller: &mut CaptureController<D>,
    status_rx: &mut UnboundedReceiver<Status>,
) {
    let device = app.take_start_device();
    let (status_tx, session_rx) = mpsc::unbounded_channel::<Status>();
    let handler = status_handler(status_tx, controller.config().low_light_threshold);
    let interval = controller.config().sample_interval;

    let started = controller.switch_device(device.as_deref(), handler, interval).await;
    // the previous session is gone either way
    *status_rx = session_rx;

    match started {
        Ok(()) => {
            app.status = Status::info("Camera started.");
            // labels can appear only once access has been granted
            let listed = controller.refresh_devices().await;
            app.refresh_devices(listed);
        }
        Err(e) => app.status = Status::start_failed(&e),
    }
    app.starting = false;
}

fn draw<D: MediaDevices>(f: &mut Frame, app: &mut App, controller: &CaptureController<D>) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Devices + preview
            Constraint::Length(3), // Status bar
            Constraint::Length(1), // Key help
        ])
        .split(size);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(10)])
        .split(chunks[0]);

    devices::render_device_list(f, app, top[0], controller.current_device());

    // Preview container
    let preview_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Preview ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    let preview_area = preview_block.inner(top[1]);
    f.render_widget(preview_block, top[1]);

    // keep the overlay's pixels matching the pane it is shown in
    let (w, h) = preview::overlay_size(preview_area.width, preview_area.height);
    controller.resize_overlay(w, h);

    let frame = controller.latest_frame();
    let lines = {
        let overlay = controller.overlay();
        let overlay = lock(&overlay);
        preview::render_preview(
            frame.as_deref(),
            &overlay,
            preview_area.width,
            preview_area.height,
        )
    };
    f.render_widget(Paragraph::new(lines), preview_area);

    // Status bar
    let state = match controller.state() {
        SessionState::Idle if app.starting => "Starting",
        SessionState::Idle => "Idle",
        SessionState::Starting => "Starting",
        SessionState::Running => "Running",
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" Camera: ", Style::default().fg(Color::White)),
        Span::styled(
            state,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            app.status.message.clone(),
            Style::default()
                .fg(severity_color(app.status.severity))
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Left)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, chunks[1]);

    // Key help
    let running = controller.state() == SessionState::Running;
    let key = |k: &'static str, enabled: bool| {
        let color = if enabled { Color::Yellow } else { Color::DarkGray };
        Span::styled(k, Style::default().fg(color))
    };
    let help = Line::from(vec![
        key(" s", !running && !app.starting),
        Span::raw(" start | "),
        key("x", running),
        Span::raw(" stop | "),
        key("p", running),
        Span::raw(" snapshot | "),
        key("↑↓", true),
        Span::raw(" camera | "),
        key("r", true),
        Span::raw(" refresh | "),
        key("q", true),
        Span::raw(" quit"),
    ]);
    f.render_widget(Paragraph::new(help), chunks[2]);
}
