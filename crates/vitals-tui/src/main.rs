use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    symbols,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap},
    Frame, Terminal,
};
use vitals_lib::{
    io::text as text_io,
    monitor::{Monitor, SessionId},
    scheduler::TickScheduler,
    viewport::Frame as PlaybackFrame,
};

fn main() -> Result<()> {
    env_logger::init();
    let mut app = App::from_args()?;
    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, &mut app);
    restore_terminal()?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("initializing terminal")
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| draw(f, app))?;
        let now = Instant::now();
        let deadline = app.scheduler.next_deadline(&app.monitor);
        let timeout = deadline
            .saturating_duration_since(now)
            .min(Duration::from_millis(150));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }
        for event in app.scheduler.poll(&mut app.monitor, Instant::now()) {
            app.last_frames[event.session.index()] = Some(event.frame);
        }
    }
    Ok(())
}

struct App {
    monitor: Monitor,
    scheduler: TickScheduler,
    last_frames: [Option<PlaybackFrame>; 2],
    /// Synthesized raw slider values fed to the engine surface.
    rate_raw: [u8; 2],
    scroll_raw: [i64; 2],
    selected_channel: usize,
    status: String,
    should_quit: bool,
}

impl App {
    /// `vitals-tui <lane-a files...> [-- <lane-b files...>]`, each file
    /// newline-delimited samples.
    fn from_args() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            anyhow::bail!("usage: vitals-tui <lane-a files...> [-- <lane-b files...>]");
        }
        let mut lanes: [Vec<PathBuf>; 2] = [Vec::new(), Vec::new()];
        let mut lane = 0;
        for arg in args {
            if arg == "--" {
                lane = 1;
                continue;
            }
            lanes[lane].push(PathBuf::from(arg));
        }

        let mut monitor = Monitor::default();
        for (paths, session) in lanes.iter().zip(SessionId::ALL) {
            for path in paths {
                let buffer = text_io::read_f64_series(path)?;
                let name = format!("Channel {}", monitor.session(session).channels().len() + 1);
                monitor
                    .load_channel(session, buffer, name)
                    .with_context(|| format!("failed to load {}", path.display()))?;
            }
        }
        monitor.select(Some(SessionId::A));

        let scheduler = TickScheduler::new(&monitor, Instant::now());
        Ok(Self {
            monitor,
            scheduler,
            last_frames: [None, None],
            rate_raw: [50, 50],
            scroll_raw: [100, 100],
            selected_channel: 0,
            status: "1/2 lane · space play · r rewind · +/- zoom · arrows scroll · [/] speed · \
                     tab channel · h hide · m move · l link · q quit"
                .into(),
            should_quit: false,
        })
    }

    fn active(&mut self) -> Option<SessionId> {
        match self.monitor.active() {
            Ok(id) => Some(id),
            Err(err) => {
                self.status = err.to_string();
                None
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => {
                self.monitor.select(Some(SessionId::A));
                self.selected_channel = 0;
            }
            KeyCode::Char('2') => {
                self.monitor.select(Some(SessionId::B));
                self.selected_channel = 0;
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.active() {
                    self.monitor.toggle_playing(id);
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = self.active() {
                    self.monitor.rewind(id);
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                if let Some(id) = self.active() {
                    self.monitor.zoom_in(id);
                }
            }
            KeyCode::Char('-') => {
                if let Some(id) = self.active() {
                    self.monitor.zoom_out(id);
                }
            }
            KeyCode::Char('[') => self.nudge_rate(-5),
            KeyCode::Char(']') => self.nudge_rate(5),
            KeyCode::Left => self.nudge_scroll(-5),
            KeyCode::Right => self.nudge_scroll(5),
            KeyCode::Char('l') => {
                let linked = !self.monitor.linked();
                self.monitor.set_linked(linked);
                if linked {
                    // Both lanes restart from zero; drop the stale frames.
                    self.last_frames = [None, None];
                    self.status = "graphs linked: Graph A drives both lanes".into();
                } else {
                    self.status = "graphs unlinked".into();
                }
            }
            KeyCode::Tab => {
                if let Some(id) = self.active() {
                    let count = self.monitor.session(id).channels().len();
                    if count > 0 {
                        self.selected_channel = (self.selected_channel + 1) % count;
                    }
                }
            }
            KeyCode::Char('h') => self.toggle_hidden(),
            KeyCode::Char('m') => self.move_selected(),
            _ => {}
        }
    }

    fn nudge_rate(&mut self, delta: i16) {
        if let Some(id) = self.active() {
            let slot = id.index();
            let raw = (i16::from(self.rate_raw[slot]) + delta).clamp(0, 100) as u8;
            self.rate_raw[slot] = raw;
            self.monitor.set_rate_slider(id, raw);
            self.status = format!("{} speed slider: {}", id.label(), raw);
        }
    }

    fn nudge_scroll(&mut self, delta: i64) {
        if let Some(id) = self.active() {
            let slot = id.index();
            self.scroll_raw[slot] += delta;
            let raw = self.scroll_raw[slot];
            self.monitor.scroll(id, raw);
            // Redraw the paused lane at its new pan position.
            self.refresh_paused(id);
        }
    }

    fn toggle_hidden(&mut self) {
        if let Some(id) = self.active() {
            let target = self
                .monitor
                .session(id)
                .channels()
                .get(self.selected_channel)
                .map(|c| (c.id, c.hidden, c.name.clone()));
            if let Some((channel, hidden, name)) = target {
                match self.monitor.set_hidden(id, channel, !hidden) {
                    Ok(()) => {
                        self.status = format!(
                            "{} {}",
                            name,
                            if hidden { "visible" } else { "hidden" }
                        );
                        self.refresh_paused(id);
                    }
                    Err(err) => self.status = err.to_string(),
                }
            }
        }
    }

    fn move_selected(&mut self) {
        if let Some(from) = self.active() {
            let target = self
                .monitor
                .session(from)
                .channels()
                .get(self.selected_channel)
                .map(|c| (c.id, c.name.clone()));
            if let Some((channel, name)) = target {
                let to = from.other();
                match self.monitor.move_channel(channel, from, to) {
                    Ok(()) => {
                        self.status = format!("moved {} to {}", name, to.label());
                        self.selected_channel = 0;
                        self.refresh_paused(from);
                        self.refresh_paused(to);
                    }
                    Err(err) => self.status = err.to_string(),
                }
            }
        }
    }

    /// Paused lanes get no tick frames, so recompute one after edits
    /// that change what should be on screen.
    fn refresh_paused(&mut self, id: SessionId) {
        if !self.monitor.session(id).is_playing() {
            let frame = self.monitor.frame(id);
            debug!("{}: refreshed paused frame", id.label());
            self.last_frames[id.index()] = Some(frame);
        }
    }
}

fn draw(f: &mut Frame<'_>, app: &App) {
    let size = f.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(42),
            Constraint::Percentage(42),
            Constraint::Min(4),
        ])
        .split(size);
    draw_lane(f, layout[0], app, SessionId::A);
    draw_lane(f, layout[1], app, SessionId::B);
    draw_status(f, layout[2], app);
}

fn draw_lane(f: &mut Frame<'_>, area: Rect, app: &App, id: SessionId) {
    let session = app.monitor.session(id);
    let selected = app.monitor.selected() == Some(id);

    let mut title = format!(
        "{} · {} · {:.2}x",
        id.label(),
        if session.is_playing() { "playing" } else { "paused" },
        session.rate(),
    );
    if app.monitor.linked() {
        title.push_str(" · linked");
    }
    if app.monitor.controls_locked(id) {
        title.push_str(" (controls locked)");
    }
    let border_style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    let Some(frame) = &app.last_frames[id.index()] else {
        let placeholder = Paragraph::new("no frames yet: load a channel and press space")
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(placeholder, area);
        return;
    };

    let series: Vec<(String, Color, Vec<(f64, f64)>)> = frame
        .slices
        .iter()
        .map(|slice| {
            let (r, g, b) = slice.color.rgb();
            let points = slice
                .samples
                .iter()
                .enumerate()
                .map(|(i, &v)| ((slice.start + i) as f64, v))
                .collect();
            (slice.name.clone(), Color::Rgb(r, g, b), points)
        })
        .collect();
    let datasets: Vec<Dataset> = series
        .iter()
        .map(|(name, color, points)| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(Axis::default().bounds([frame.x_range.start, frame.x_range.end]))
        .y_axis(Axis::default().bounds([frame.y_range.start, frame.y_range.end]));
    f.render_widget(chart, area);
}

fn draw_status(f: &mut Frame<'_>, area: Rect, app: &App) {
    let mut lines = vec![Line::from(app.status.as_str())];
    if let Some(id) = app.monitor.selected() {
        let session = app.monitor.session(id);
        let channels: Vec<String> = session
            .channels()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let marker = if i == app.selected_channel { ">" } else { " " };
                let visibility = if c.hidden { " (hidden)" } else { "" };
                format!("{}{}{}", marker, c.name, visibility)
            })
            .collect();
        lines.push(Line::from(format!(
            "{} channels: {}",
            id.label(),
            if channels.is_empty() {
                "none".to_string()
            } else {
                channels.join("  ")
            }
        )));
        lines.push(Line::from(format!(
            "cursor {} · zoom {:.3} · view {:.0}..{:.0}",
            session.cursor(),
            session.zoom_factor(),
            session.view().start,
            session.view().end,
        )));
    }
    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}
