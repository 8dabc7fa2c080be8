// TUI Module - Terminal console: panels, content sidebar, bound tree and event log
use anyhow::Result;
use crossterm::event::{poll, read, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::ConsoleConfig;
use crate::controller::{Console, Effect, Event, Focus};
use crate::runtime::Runtime;
use crate::types::Mode;

const KEY_HELP: &str = "Tab focus | ↑↓ move | 1-9 action | Enter edit | c/d/p mode | r refresh | h host | i info | q quit";

/// What a key press asks of the loop
#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Continue(Vec<Effect>),
    ToggleInfo,
    Quit,
}

/// Map a key press onto console transitions
pub fn handle_key(console: &mut Console, key: KeyEvent) -> KeyOutcome {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyOutcome::Quit;
    }

    if console.focus() == Focus::Host {
        return match key.code {
            KeyCode::Enter => KeyOutcome::Continue(console.accept_host()),
            KeyCode::Esc => {
                console.cancel_host();
                KeyOutcome::Continue(Vec::new())
            }
            KeyCode::Backspace => {
                console.host_backspace();
                KeyOutcome::Continue(Vec::new())
            }
            KeyCode::Char(c) => {
                console.host_input(c);
                KeyOutcome::Continue(Vec::new())
            }
            _ => KeyOutcome::Continue(Vec::new()),
        };
    }

    if console.is_editing() {
        match key.code {
            KeyCode::Enter => console.commit_edit(),
            KeyCode::Esc => console.cancel_edit(),
            KeyCode::Backspace => console.edit_backspace(),
            KeyCode::Char(c) => console.edit_input(c),
            _ => {}
        }
        return KeyOutcome::Continue(Vec::new());
    }

    let effects = match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return KeyOutcome::Quit,
        KeyCode::Char('i') => return KeyOutcome::ToggleInfo,
        KeyCode::Tab => {
            console.cycle_focus();
            Vec::new()
        }
        KeyCode::Up | KeyCode::Char('k') => console.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => console.move_cursor(1),
        KeyCode::PageUp => console.move_cursor(-10),
        KeyCode::PageDown => console.move_cursor(10),
        KeyCode::Enter | KeyCode::Char('e') if console.focus() == Focus::Table => {
            console.begin_edit();
            Vec::new()
        }
        KeyCode::Char(c @ '1'..='9') => console.invoke(c as usize - '1' as usize),
        KeyCode::Char('r') => console.refresh(),
        KeyCode::Char('c') => console.request_mode(Mode::Config),
        KeyCode::Char('d') => console.request_mode(Mode::Direct),
        KeyCode::Char('p') => console.request_mode(Mode::Program),
        KeyCode::Char('h') => {
            console.open_host_form();
            Vec::new()
        }
        _ => Vec::new(),
    };
    KeyOutcome::Continue(effects)
}

/// Run the interactive console until the operator quits
pub fn run_console(
    runtime: &mut Runtime,
    events: &mut UnboundedReceiver<Event>,
    mut config: ConsoleConfig,
) -> Result<()> {
    let host = config.host_address()?;
    let mut console = Console::new(&config, host);
    runtime.start_status_poll(console.status_interval());
    runtime.execute(console.start());

    // Setup terminal for TUI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, runtime, events, &mut console, &mut config);

    // Cleanup terminal
    terminal.show_cursor()?;
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    runtime.shutdown();
    println!("\n👋 Console closed.\n");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &mut Runtime,
    events: &mut UnboundedReceiver<Event>,
    console: &mut Console,
    config: &mut ConsoleConfig,
) -> Result<()> {
    let mut show_config_info = false;

    loop {
        // Drain everything the runtime delivered since the last frame
        while let Ok(event) = events.try_recv() {
            if let Event::ConfigReloaded(new_config) = &event {
                runtime.update_settings(new_config);
                *config = (**new_config).clone();
            }
            let effects = console.handle(event);
            runtime.execute(effects);
        }

        terminal.draw(|f| draw(f, console, config, show_config_info))?;

        if poll(Duration::from_millis(50))? {
            if let TermEvent::Key(key) = read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(console, key) {
                    KeyOutcome::Quit => return Ok(()),
                    KeyOutcome::ToggleInfo => show_config_info = !show_config_info,
                    KeyOutcome::Continue(effects) => runtime.execute(effects),
                }
            }
        }
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title)
}

fn selected_style(selected: bool, focused: bool) -> Style {
    match (selected, focused) {
        (true, true) => Style::default().fg(Color::Black).bg(Color::Yellow),
        (true, false) => Style::default().add_modifier(Modifier::BOLD),
        _ => Style::default(),
    }
}

fn draw(f: &mut Frame, console: &Console, config: &ConsoleConfig, show_config_info: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(10),    // Main content
            Constraint::Length(3),  // Footer
        ])
        .split(f.size());

    // Header - mode and host with controls on right
    let header_width = chunks[0].width.saturating_sub(2) as usize;
    let machine_status = console.status().map(|s| s.status_text.as_str()).unwrap_or("?");
    let left_text = format!(
        "🎾 TT-Robby | Mode: {} | Machine: {} | Host: {}",
        console.mode(),
        machine_status,
        console.host_form().current()
    );
    let spacing = header_width.saturating_sub(left_text.chars().count() + KEY_HELP.chars().count());
    let header_line = Line::from(vec![
        Span::styled(left_text, Style::default().fg(Color::Cyan)),
        Span::raw(" ".repeat(spacing)),
        Span::raw(KEY_HELP),
    ]);
    f.render_widget(Paragraph::new(header_line).block(Block::default().borders(Borders::ALL)), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Length(26), Constraint::Min(30)])
        .split(chunks[1]);

    draw_navigation(f, console, body[0]);
    draw_content(f, console, body[1]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3), Constraint::Length(8)])
        .split(body[2]);

    if show_config_info {
        let info = Paragraph::new(config_info_lines(config)).block(pane_block("Configuration (Press 'i' to hide)", false));
        f.render_widget(info, main[0]);
    } else {
        draw_table(f, console, main[0]);
    }
    draw_action_bar(f, console, main[1]);

    let log_height = main[2].height.saturating_sub(2) as usize;
    let log_lines: Vec<Line> = console.log().tail(log_height).map(|s| Line::from(s.as_str())).collect();
    let log_title = format!("Events ({})", console.log().len());
    f.render_widget(Paragraph::new(log_lines).block(pane_block(&log_title, false)), main[2]);

    // Footer - status line
    let footer = Paragraph::new(console.status_line().to_string()).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_navigation(f: &mut Frame, console: &Console, area: Rect) {
    let focused = console.focus() == Focus::Navigation;
    let lines: Vec<Line> = console
        .panels()
        .iter()
        .enumerate()
        .map(|(i, panel)| {
            let selected = i == console.selected_panel();
            let marker = if selected && !console.panel_actions().is_empty() { " ⚡" } else { "" };
            Line::styled(format!("{}{}", panel.title, marker), selected_style(selected, focused))
        })
        .collect();
    let title = format!("{} mode", console.mode());
    f.render_widget(Paragraph::new(lines).block(pane_block(&title, focused)), area);
}

fn draw_content(f: &mut Frame, console: &Console, area: Rect) {
    let focused = console.focus() == Focus::Content;
    let lines: Vec<Line> = console
        .sidebar()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let marker = if entry.actions.is_empty() { "" } else { " ⚡" };
            Line::styled(format!("{}{}", entry.key, marker), selected_style(i == console.selected_entry(), focused))
        })
        .collect();
    let title = console.current_panel().map(|p| p.title.clone()).unwrap_or_default();
    f.render_widget(Paragraph::new(lines).block(pane_block(&title, focused)), area);
}

fn draw_table(f: &mut Frame, console: &Console, area: Rect) {
    let focused = console.focus() == Focus::Table;
    let Some(tree) = console.tree() else {
        let empty = Paragraph::new("No data").block(pane_block("Values", focused));
        f.render_widget(empty, area);
        return;
    };

    let lines: Vec<Line> = tree
        .iter()
        .map(|(id, node)| {
            let indent = "  ".repeat(node.depth);
            let mut spans = vec![
                Span::raw(format!("{}{}", indent, node.label)),
                Span::raw(": "),
            ];
            let value_style = if node.is_editing() {
                Style::default().fg(Color::Green).add_modifier(Modifier::UNDERLINED)
            } else if node.is_leaf() {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(node.display_value(), value_style));
            if !node.actions.is_empty() {
                let labels: Vec<&str> = node.actions.iter().map(|a| a.routine.label.as_str()).collect();
                spans.push(Span::styled(format!("  ⚡ {}", labels.join(" | ")), Style::default().fg(Color::Magenta)));
            }
            let row_style = selected_style(id == console.selected_row(), focused);
            Line::from(
                spans
                    .into_iter()
                    .map(|s| {
                        let style = s.style.patch(row_style);
                        Span::styled(s.content, style)
                    })
                    .collect::<Vec<Span>>(),
            )
        })
        .collect();

    // Keep the cursor row visible
    let visible = area.height.saturating_sub(2) as usize;
    let offset = console.selected_row().saturating_sub(visible.saturating_sub(1));
    let title = tree.root().path.concrete.to_string();
    let table = Paragraph::new(lines)
        .block(pane_block(&title, focused))
        .scroll((offset as u16, 0));
    f.render_widget(table, area);
}

fn draw_action_bar(f: &mut Frame, console: &Console, area: Rect) {
    if console.focus() == Focus::Host {
        let form = console.host_form();
        let (hint, color) = if form.can_accept() {
            ("Enter accept", Color::Green)
        } else if form.is_dirty() {
            ("scheme://host:port expected", Color::Red)
        } else {
            ("unchanged", Color::DarkGray)
        };
        let cancel = if form.can_cancel() { " | Esc cancel" } else { " | Esc close" };
        let line = Line::from(vec![
            Span::raw(form.input().to_string()),
            Span::raw("  "),
            Span::styled(hint, Style::default().fg(color)),
            Span::raw(cancel),
        ]);
        f.render_widget(Paragraph::new(line).block(pane_block("Host address", true)), area);
        return;
    }

    let spans: Vec<Span> = console
        .focused_actions()
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, a)| Span::raw(format!("[{}] {}  ", i + 1, a.routine.label)))
        .collect();
    let text = if spans.is_empty() { Line::from("no actions") } else { Line::from(spans) };
    f.render_widget(Paragraph::new(text).block(pane_block("Actions", false)), area);
}

fn config_info_lines(config: &ConsoleConfig) -> Vec<Line<'static>> {
    let path = config
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    let row = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{}: ", name), Style::default().fg(Color::Cyan)),
            Span::raw(value),
        ])
    };
    vec![
        row("Config file", path),
        row("Host", config.host.clone()),
        row("Base path", config.base_path.clone()),
        row("Status interval", format!("{} ms", config.status_interval_ms)),
        row("Direct refresh", format!("{} ms", config.direct_interval_ms)),
        row("Program refresh", format!("{} ms", config.program_interval_ms)),
        row("Request timeout", format!("{} ms", config.request_timeout_ms)),
        row("Max tree depth", config.max_tree_depth.to_string()),
        row("Routine patterns", config.routine_table().len().to_string()),
    ]
}
