use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use roster_stats::bands::PrestigeBand;
use roster_stats::clock::{Clock, SystemClock};
use roster_stats::collab::{ChannelSink, FeatureGate, StaticGate};
use roster_stats::config::Settings;
use roster_stats::fake_feed;
use roster_stats::format::FormattedLabel;
use roster_stats::metrics::MonospaceMetrics;
use roster_stats::pipeline::{RenderedRow, RosterEntry, RosterPipeline};
use roster_stats::state::{AppState, Delta, ProviderCommand, apply_delta};
use roster_stats::stats_cache::{self, StatsCache};
use roster_stats::throttle::FetchThrottle;

type Pipeline =
    RosterPipeline<Arc<StaticGate>, Arc<StatsCache>, ChannelSink<ProviderCommand>, MonospaceMetrics>;

struct App {
    state: AppState,
    pipeline: Pipeline,
    gate: Arc<StaticGate>,
    clock: SystemClock,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    snapshot_path: Option<PathBuf>,
    should_quit: bool,
}

struct FrameRow {
    entry: RosterEntry,
    rendered: RenderedRow,
    prestige_level: Option<i64>,
    last_attempt_ms: Option<u64>,
}

impl App {
    fn new(settings: &Settings, cmd_tx: mpsc::Sender<ProviderCommand>) -> Self {
        let cache = Arc::new(StatsCache::new(
            settings.stats_cache_max,
            settings.stats_cache_ttl_ms(),
        ));
        let snapshot_path = stats_cache::default_snapshot_path();
        let restored = snapshot_path
            .as_deref()
            .map(|path| cache.load_snapshot(path))
            .unwrap_or(0);

        let gate = Arc::new(StaticGate::new(settings.tab_stats_enabled, true));
        let throttle = Arc::new(FetchThrottle::new(settings.throttle));
        let sink = ChannelSink::new(cmd_tx.clone(), ProviderCommand::fetch);
        let mut state = AppState::new(cache.clone());
        let pipeline = RosterPipeline::new(
            gate.clone(),
            cache,
            sink,
            throttle,
            MonospaceMetrics,
            state.kind,
        )
        .with_refresh_after(settings.stats_cache_ttl_ms());

        if restored > 0 {
            state.push_log(format!("[INFO] Restored {restored} cached stat entries"));
        }

        Self {
            state,
            pipeline,
            gate,
            clock: SystemClock,
            cmd_tx,
            snapshot_path,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.state.paused = !self.state.paused;
                if self.cmd_tx.send(ProviderCommand::SetPaused(self.state.paused)).is_err() {
                    self.state.push_log("[WARN] Provider unavailable");
                }
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.state.cache.clear();
                self.state.push_log("[INFO] Stats cache cleared");
            }
            KeyCode::Char('g') | KeyCode::Char('G') => {
                let enabled = !self.gate.is_feature_enabled();
                self.gate.set_enabled(enabled);
                self.state.push_log(format!(
                    "[INFO] Tab stats {}",
                    if enabled { "enabled" } else { "disabled" }
                ));
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn render_rows(&mut self) -> Vec<FrameRow> {
        let now = self.clock.now_ms();
        let mut rows = Vec::with_capacity(self.state.roster.len());
        for entry in &self.state.roster {
            let rendered = self.pipeline.render_row(entry, now);
            let last_attempt_ms = entry
                .id
                .and_then(|id| self.pipeline.throttle().last_attempt(&id));
            let prestige_level = entry
                .id
                .and_then(|id| self.state.cache.get(id, self.state.kind))
                .and_then(|cached| cached.stat.prestige_level);
            rows.push(FrameRow {
                entry: entry.clone(),
                rendered,
                prestige_level,
                last_attempt_ms,
            });
        }
        rows
    }

    fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(ProviderCommand::Shutdown);
        if let Some(path) = self.snapshot_path.as_deref()
            && let Err(err) = self.state.cache.save_snapshot(path)
        {
            eprintln!("[WARN] Failed to save stats snapshot: {err:#}");
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let settings = Settings::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = fake_feed::spawn_fake_provider(settings.clone(), tx, cmd_rx);

    let mut app = App::new(&settings, cmd_tx);
    let res = run_app(&mut terminal, &mut app, rx);
    app.shutdown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    let _ = provider.join();

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        let rows = app.render_rows();
        terminal.draw(|f| ui(f, app, &rows))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App, rows: &[FrameRow]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(8),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_roster(frame, chunks[1], app, rows);

    let console = Paragraph::new(console_text(&app.state, chunks[2].height.saturating_sub(2)))
        .block(Block::default().title("Console").borders(Borders::ALL))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(app))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let gate = if app.gate.is_feature_enabled() { "ON" } else { "OFF" };
    let churn = if app.state.paused { "paused" } else { "live" };
    format!(
        "ROSTER STATS | Mode: {} | Tab stats: {gate} | Churn: {churn} | Players: {}",
        app.state.kind.type_id(),
        app.state.roster.len()
    )
}

fn footer_text(app: &App) -> String {
    let throttle = app.pipeline.throttle().snapshot();
    let misses = app.state.cache.misses();
    format!(
        "Tracked {} | Fetch allowed {} blocked {} | Sweeps {} evicted {} | Cache {} (cold {} expired {}) | Resolved {} failed {} | ? help",
        throttle.tracked,
        throttle.allowed,
        throttle.blocked,
        throttle.sweeps,
        throttle.evicted,
        app.state.cache.len(),
        misses.cold,
        misses.expired,
        app.state.fetches_resolved,
        app.state.fetches_failed,
    )
}

fn render_roster(frame: &mut Frame, area: Rect, app: &App, rows: &[FrameRow]) {
    // The name column is sized from the padded names, the way a host that only
    // measures plain text would size it.
    let name_width = rows
        .iter()
        .map(|row| row.rendered.padded_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Player".len())
        + 2;
    let now = app.clock.now_ms();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(Line::from(Span::styled(
        format!("{:<name_width$}{:<18}{}", "Player", "Prestige", "Last fetch"),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    for (idx, row) in rows.iter().enumerate() {
        let selected = idx == app.state.selected;
        let base = if selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut spans = match row.rendered.label.as_ref() {
            Some(label) => label_spans(label, base),
            None => vec![Span::styled(row.entry.name.clone(), base)],
        };
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        spans.push(Span::styled(" ".repeat(name_width.saturating_sub(used)), base));
        spans.push(Span::styled(format!("{:<18}", prestige_title(row)), base));
        spans.push(Span::styled(
            last_fetch_text(row.last_attempt_ms, now),
            base.fg(Color::DarkGray),
        ));
        lines.push(Line::from(spans));
    }

    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.state.selected.saturating_sub(visible.saturating_sub(2));
    let body: Vec<Line> = lines
        .iter()
        .take(1)
        .cloned()
        .chain(lines.iter().skip(1 + skip).cloned())
        .collect();

    let roster = Paragraph::new(body).block(Block::default().title("Tab").borders(Borders::ALL));
    frame.render_widget(roster, area);
}

fn label_spans(label: &FormattedLabel, base: Style) -> Vec<Span<'static>> {
    label
        .segments
        .iter()
        .map(|segment| {
            let style = match segment.color {
                Some(color) => base.fg(color.to_ratatui()),
                None => base,
            };
            Span::styled(segment.text.clone(), style)
        })
        .collect()
}

fn prestige_title(row: &FrameRow) -> String {
    match row.prestige_level {
        Some(level) if row.rendered.label.is_some() => PrestigeBand::for_level(level).title(),
        _ => "-".to_string(),
    }
}

fn last_fetch_text(last_attempt_ms: Option<u64>, now: u64) -> String {
    match last_attempt_ms {
        Some(at) => format!("{:.1}s ago", now.saturating_sub(at) as f64 / 1000.0),
        None => "-".to_string(),
    }
}

fn console_text(state: &AppState, lines: u16) -> String {
    let take = lines as usize;
    let skip = state.logs.len().saturating_sub(take);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Roster Stats - Help",
        "",
        "  j/k or ↑/↓   Move selection",
        "  p            Pause/resume roster churn",
        "  c            Clear stats cache",
        "  g            Toggle tab stats",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
