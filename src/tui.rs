use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use whisper::report::{render_report, save_report, save_results};
use whisper::{PromptChainResult, TemplateStrategy, Whisperer};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const HELP: &str =
    "Enter: Generate | Tab: Strategy | Ctrl+S: Save | Ctrl+O: Switch panel | Up/Down/PgUp/PgDn/Home/End: Scroll | Esc: Quit";

/// Take over the terminal until the user quits.
pub async fn run(whisperer: Whisperer) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(whisperer);
    let res = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// A scrollable, word-wrapped text panel.
#[derive(Debug, Default)]
struct Pane {
    text: Option<String>,
    scroll: usize,
    lines: usize,
    height: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scroll {
    Up(usize),
    Down(usize),
    Top,
    Bottom,
}

impl Pane {
    fn show(&mut self, text: String) {
        self.text = Some(text);
        self.scroll = 0;
    }

    fn clear(&mut self) {
        self.text = None;
        self.scroll = 0;
    }

    fn max_scroll(&self) -> usize {
        self.lines.saturating_sub(self.height)
    }

    fn apply(&mut self, scroll: Scroll) {
        self.scroll = match scroll {
            Scroll::Up(n) => self.scroll.saturating_sub(n),
            Scroll::Down(n) => (self.scroll + n).min(self.max_scroll()),
            Scroll::Top => 0,
            Scroll::Bottom => self.max_scroll(),
        };
    }

    /// Record the area the pane was drawn into and keep the offset in range.
    fn fit(&mut self, text: &str, area: Rect) {
        let width = area.width.saturating_sub(2) as usize;
        self.height = area.height.saturating_sub(2) as usize;
        self.lines = wrapped_lines(text, width);
        self.scroll = self.scroll.min(self.max_scroll());
    }
}

enum Response {
    Chain(Result<(PromptChainResult, Option<String>), String>),
    Saved(Result<(PathBuf, PathBuf), String>),
}

struct App {
    whisperer: Whisperer,
    strategy: TemplateStrategy,
    input: String,
    // in chars, not bytes
    cursor: usize,
    context: Pane,
    template: Pane,
    context_focused: bool,
    status: Option<String>,
    last_result: Option<PromptChainResult>,
    pending: bool,
    spinner: usize,
}

impl App {
    fn new(whisperer: Whisperer) -> Self {
        let strategy = whisperer.config().template;
        Self {
            whisperer,
            strategy,
            input: String::new(),
            cursor: 0,
            context: Pane::default(),
            template: Pane::default(),
            context_focused: false,
            status: None,
            last_result: None,
            pending: false,
            spinner: 0,
        }
    }

    fn focused(&mut self) -> &mut Pane {
        if self.context_focused {
            &mut self.context
        } else {
            &mut self.template
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn insert_char(&mut self, c: char) {
        let idx = self.byte_index();
        self.input.insert(idx, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index();
        self.input.remove(idx);
    }

    fn submit(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.input.trim().is_empty() || self.pending {
            return;
        }

        let request = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.pending = true;
        self.context.clear();
        self.template.clear();
        self.status = None;

        let whisperer = self.whisperer.clone();
        let strategy = self.strategy;
        tokio::task::spawn_blocking(move || {
            let result = whisperer
                .execute_with_context(strategy, &request)
                .map(|(result, ctx)| {
                    let context = ctx.map(|c| {
                        format!(
                            "{} similar example(s), context quality {:.3}\n\n{}",
                            c.hits.len(),
                            c.quality,
                            c.text
                        )
                    });
                    (result, context)
                })
                .map_err(|err| err.to_string());
            let _ = tx.send(Response::Chain(result));
        });
    }

    fn save(&mut self, tx: mpsc::UnboundedSender<Response>) {
        let Some(result) = self.last_result.clone() else {
            self.status = Some("Nothing to save yet.".to_string());
            return;
        };
        let output_dir = self.whisperer.config().output_dir.clone();
        tokio::task::spawn_blocking(move || {
            let saved = save_results(&output_dir, &result)
                .and_then(|json| save_report(&output_dir, &render_report(&result)).map(|txt| (json, txt)))
                .map_err(|err| err.to_string());
            let _ = tx.send(Response::Saved(saved));
        });
    }

    fn receive(&mut self, response: Response) {
        match response {
            Response::Chain(outcome) => {
                self.pending = false;
                match outcome {
                    Ok((result, context)) => {
                        self.context.show(context.unwrap_or_else(|| {
                            format!(
                                "The {} strategy does not retrieve examples. Press Tab for context-augmented.",
                                self.strategy
                            )
                        }));
                        self.template
                            .show(result.final_output().unwrap_or_default().to_string());
                        self.status = Some("Ctrl+S saves this result.".to_string());
                        self.last_result = Some(result);
                    }
                    Err(err) => self.template.show(format!("Error: {}", err)),
                }
            }
            Response::Saved(Ok((json, report))) => {
                self.status = Some(format!("Saved {} and {}", json.display(), report.display()));
            }
            Response::Saved(Err(err)) => {
                self.status = Some(format!("Save failed: {}", err));
            }
        }
    }

    /// Returns `false` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent, tx: &mpsc::UnboundedSender<Response>) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let page = self.focused().height.max(1);
        match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('c') if ctrl => return false,
            KeyCode::Char('s') if ctrl => self.save(tx.clone()),
            KeyCode::Char('o') if ctrl => self.context_focused = !self.context_focused,
            KeyCode::Enter => self.submit(tx.clone()),
            KeyCode::Tab => {
                self.strategy = self.strategy.next();
                self.status = Some(format!("Template strategy: {}", self.strategy));
            }
            KeyCode::Up => self.focused().apply(Scroll::Up(1)),
            KeyCode::Down => self.focused().apply(Scroll::Down(1)),
            KeyCode::PageUp => self.focused().apply(Scroll::Up(page)),
            KeyCode::PageDown => self.focused().apply(Scroll::Down(page)),
            KeyCode::Home => self.focused().apply(Scroll::Top),
            KeyCode::End => self.focused().apply(Scroll::Bottom),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.input.chars().count()),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Char(ch) => self.insert_char(ch),
            _ => {}
        }
        true
    }
}

/// Rows `text` occupies once wrapped to `width` columns (at least one).
fn wrapped_lines(text: &str, width: usize) -> usize {
    let width = width.max(1);
    let rows: usize = text
        .lines()
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum();
    rows.max(1)
}

/// Window of `input` around `cursor` (both in chars) that fits `max_width`, and the cursor's column in it.
fn input_window(input: &str, cursor: usize, max_width: usize) -> (String, usize) {
    if max_width == 0 {
        return (String::new(), 0);
    }
    let len = input.chars().count();
    let cursor = cursor.min(len);
    if len <= max_width {
        return (input.to_string(), cursor);
    }
    let mut start = cursor.saturating_sub(max_width / 2);
    if start + max_width > len {
        start = len - max_width;
    }
    let view = input.chars().skip(start).take(max_width).collect();
    (view, (cursor - start).min(max_width))
}

fn block(title: String, border: Color) -> Block<'static> {
    Block::bordered()
        .title(title)
        .title_style(Style::default().fg(Color::Black).add_modifier(Modifier::BOLD))
        .border_style(Style::default().fg(border))
}

fn draw_pane(frame: &mut Frame, area: Rect, pane: &mut Pane, title: String, placeholder: &str) {
    let text = pane.text.clone().unwrap_or_else(|| placeholder.to_string());
    pane.fit(&text, area);

    let body = Paragraph::new(text)
        .style(Style::default().fg(Color::Blue))
        .scroll((pane.scroll as u16, 0))
        .wrap(Wrap { trim: false })
        .block(block(title, Color::Black));
    frame.render_widget(body, area);

    let mut state = ScrollbarState::new(pane.lines).position(pane.scroll);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue)),
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut state,
    );
}

fn draw(frame: &mut Frame, app: &mut App) {
    let [output, input_area, help_area] = Layout::vertical([
        Constraint::Min(8),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(frame.area());
    let [context_area, template_area] =
        Layout::vertical([Constraint::Percentage(30), Constraint::Percentage(70)]).areas(output);

    let mark = |focused: bool| if focused { " *" } else { "" };
    let context_title = format!("Context{}", mark(app.context_focused));
    let template_title = if app.pending {
        format!("Template {}{}", SPINNER[app.spinner], mark(!app.context_focused))
    } else {
        format!("Template{}", mark(!app.context_focused))
    };
    let template_placeholder = if app.pending {
        "Generating..."
    } else {
        "Describe what you want a prompt template for and press Enter."
    };

    draw_pane(
        frame,
        context_area,
        &mut app.context,
        context_title,
        "Retrieved examples appear here for the context-augmented strategy.",
    );
    draw_pane(frame, template_area, &mut app.template, template_title, template_placeholder);

    let width = input_area.width.saturating_sub(2) as usize;
    let (visible, cursor_x) = input_window(&app.input, app.cursor, width);
    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::DarkGray))
        .block(block(format!("Request [{}]", app.strategy), Color::DarkGray));
    frame.render_widget(input, input_area);
    frame.set_cursor_position((input_area.x + 1 + cursor_x as u16, input_area.y + 1));

    let status = app.status.clone().unwrap_or_else(|| "Controls".to_string());
    let help = Paragraph::new(HELP)
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true })
        .block(block(status, Color::DarkGray));
    frame.render_widget(help, help_area);
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    terminal.draw(|frame| draw(frame, app))?;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if !app.pending {
                    continue;
                }
                app.spinner = (app.spinner + 1) % SPINNER.len();
            }
            Some(response) = rx.recv() => app.receive(response),
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if !app.handle_key(key, &tx) {
                        return Ok(());
                    }
                }
                Some(Ok(_)) | Some(Err(_)) => continue,
                None => return Ok(()),
            },
        }
        terminal.draw(|frame| draw(frame, app))?;
    }
}
