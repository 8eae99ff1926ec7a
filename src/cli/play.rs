//! Play command implementation - interactive TUI.

// Terminal geometry fits comfortably in u16
#![allow(clippy::cast_possible_truncation, clippy::needless_pass_by_value)]

use super::store::ObservationStore;
use super::{CliError, clock_seed, load_settings};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use nle_bridge::obs::blstats::{
    NLE_BL_DEPTH, NLE_BL_HP, NLE_BL_HPMAX, NLE_BL_HUNGER, NLE_BL_SCORE, NLE_BL_TIME,
};
use nle_bridge::obs::{BLSTATS, MESSAGE, NLE_TERM_CO, TTY_CHARS, TTY_COLORS};
use nle_bridge::sim::demo::DemoLoader;
use nle_bridge::{Seeds, Session};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

/// Execute the play command.
///
/// # Errors
///
/// Returns an error if the session or the terminal fails.
pub(crate) fn execute(
    module: PathBuf,
    seed: Option<u64>,
    settings: Option<PathBuf>,
    trace: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut settings = load_settings(settings.as_deref())?;
    let core = seed.unwrap_or_else(clock_seed);
    settings.initial_seeds = Some(Seeds::new(core, core.wrapping_add(1), false));

    let mut store = ObservationStore::new();
    let mut session = Session::new(&module, &DemoLoader, settings)?;
    session.set_buffers(store.bind_all()?)?;
    session.start(trace.as_deref())?;

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend).map_err(|e| CliError::new(e.to_string()))?;

    let mut app = App {
        session,
        next_seed: core.wrapping_add(2),
        error: None,
    };
    let result = run_tui(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result?;
    app.session.end()?;
    Ok(())
}

/// App state for the TUI.
struct App<'b> {
    session: Session<'b>,
    next_seed: u64,
    error: Option<String>,
}

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Action(i32),
    Reset,
    Exit,
}

/// Map a key press to an action.
///
/// Arrow keys move; ctrl-c leaves the TUI. Once the episode is over `r`
/// starts a new one and anything else exits.
fn translate(code: KeyCode, modifiers: KeyModifiers, done: bool) -> Option<Input> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Some(Input::Exit);
    }
    if done {
        return Some(match code {
            KeyCode::Char('r') => Input::Reset,
            _ => Input::Exit,
        });
    }
    let key = match code {
        KeyCode::Up => b'k',
        KeyCode::Down => b'j',
        KeyCode::Left => b'h',
        KeyCode::Right => b'l',
        KeyCode::Esc => 27,
        KeyCode::Enter => b'\r',
        KeyCode::Char(c) if c.is_ascii() => c as u8,
        _ => return None,
    };
    Some(Input::Action(i32::from(key)))
}

fn run_tui(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App<'_>,
) -> Result<(), CliError> {
    loop {
        terminal
            .draw(|f| ui(f, app))
            .map_err(|e| CliError::new(e.to_string()))?;

        if !event::poll(Duration::from_millis(100)).map_err(|e| CliError::new(e.to_string()))? {
            continue;
        }
        let Event::Key(key) = event::read().map_err(|e| CliError::new(e.to_string()))? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match translate(key.code, key.modifiers, app.session.done()) {
            Some(Input::Exit) => return Ok(()),
            Some(Input::Reset) => {
                let seed = app.next_seed;
                app.next_seed = app.next_seed.wrapping_add(2);
                app.session
                    .set_initial_seeds(Seeds::new(seed, seed.wrapping_add(1), false))?;
                app.session.reset(None)?;
                app.error = None;
            }
            Some(Input::Action(action)) => {
                if let Err(e) = app.session.step(action) {
                    app.error = Some(e.to_string());
                }
            }
            None => {}
        }
    }
}

fn ui(f: &mut Frame, app: &App<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(26),   // Terminal and stats
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    render_header(f, chunks[0], app);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(NLE_TERM_CO as u16 + 2), Constraint::Min(24)])
        .split(chunks[1]);

    render_screen(f, main_chunks[0], app);
    render_stats(f, main_chunks[1], app);
    render_footer(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App<'_>) {
    let session = &app.session;
    let status = match session.how_done() {
        Some(how) => format!("OVER ({how})"),
        None if session.in_normal_game() => "PLAYING".to_string(),
        None => "PROMPT".to_string(),
    };
    let title = format!(
        " NLE Bridge | Episode {} | Step {} | {} ",
        session.episodes(),
        session.steps(),
        status
    );

    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn render_screen(f: &mut Frame, area: Rect, app: &App<'_>) {
    let session = &app.session;
    let lines: Vec<Line> = match (session.observation(TTY_CHARS), session.observation(TTY_COLORS)) {
        (Some(chars), Some(colors)) => chars
            .chunks_exact(NLE_TERM_CO)
            .zip(colors.chunks_exact(NLE_TERM_CO))
            .map(|(row, row_colors)| {
                Line::from(
                    row.iter()
                        .zip(row_colors)
                        .map(|(&ch, &color)| {
                            Span::styled(
                                char::from(ch).to_string(),
                                Style::default().fg(tty_color(color)),
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect(),
        _ => Vec::new(),
    };

    let screen = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Screen "));
    f.render_widget(screen, area);
}

fn tty_color(color: i8) -> Color {
    match color {
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        7 => Color::Gray,
        9 => Color::LightRed,
        10 => Color::LightGreen,
        11 => Color::LightYellow,
        12 => Color::LightBlue,
        13 => Color::LightMagenta,
        14 => Color::LightCyan,
        15 => Color::White,
        _ => Color::DarkGray,
    }
}

fn render_stats(f: &mut Frame, area: Rect, app: &App<'_>) {
    let session = &app.session;
    let stat = |i: usize| {
        session
            .observation(BLSTATS)
            .and_then(|s| s.get(i).copied())
            .unwrap_or(0)
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(format!("  HP:    {}/{}", stat(NLE_BL_HP), stat(NLE_BL_HPMAX))),
        Line::from(format!("  Depth: {}", stat(NLE_BL_DEPTH))),
        Line::from(format!("  Turn:  {}", stat(NLE_BL_TIME))),
        Line::from(format!("  Score: {}", stat(NLE_BL_SCORE))),
    ];
    if stat(NLE_BL_HUNGER) > 0 {
        lines.push(Line::from(Span::styled(
            "  Hungry",
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(""));
    if let Ok(seeds) = session.get_seeds() {
        lines.push(Line::from(format!("  Core seed: {}", seeds.core)));
        lines.push(Line::from(format!("  Disp seed: {}", seeds.disp)));
    }
    if let Some(message) = session.observation(MESSAGE) {
        let end = message.iter().position(|&b| b == 0).unwrap_or(message.len());
        lines.push(Line::from(""));
        lines.push(Line::from(String::from_utf8_lossy(&message[..end]).to_string()));
    }
    if let Some(error) = &app.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let stats = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Status "))
        .wrap(Wrap { trim: false });
    f.render_widget(stats, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App<'_>) {
    let controls = if app.session.done() {
        " [r] New episode  [any key] Quit "
    } else {
        " [hjklyubn/arrows] Move  [s] Search  [>] Descend  [Q] Quit game  [Ctrl-C] Exit "
    };

    let footer = Paragraph::new(controls)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_arrows_to_vi_keys() {
        assert_eq!(
            translate(KeyCode::Left, KeyModifiers::NONE, false),
            Some(Input::Action(i32::from(b'h')))
        );
        assert_eq!(
            translate(KeyCode::Esc, KeyModifiers::NONE, false),
            Some(Input::Action(27))
        );
    }

    #[test]
    fn test_translate_after_done() {
        assert_eq!(
            translate(KeyCode::Char('r'), KeyModifiers::NONE, true),
            Some(Input::Reset)
        );
        assert_eq!(
            translate(KeyCode::Char('k'), KeyModifiers::NONE, true),
            Some(Input::Exit)
        );
    }

    #[test]
    fn test_ctrl_c_exits() {
        assert_eq!(
            translate(KeyCode::Char('c'), KeyModifiers::CONTROL, false),
            Some(Input::Exit)
        );
    }

    #[test]
    fn test_tty_color_defaults_to_gray() {
        assert_eq!(tty_color(0), Color::DarkGray);
        assert_eq!(tty_color(1), Color::Red);
    }
}
