use anyhow::{Result, bail};
use blockline_config::{Config, HighlightSettings};
use blockline_engine::highlight::{
    ContentFallback, ContentScorer, HighlightError, HighlightResult, Highlighter, LineRange,
    MatchTuning,
};
use blockline_engine::workspace::{BlockId, OutlineItem, Workspace, WorkspaceEvent};
use blockline_engine::{PythonGenerator, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

type AppHighlighter = Highlighter<PythonGenerator, ContentScorer>;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    workspace_path: Option<PathBuf>,
    click: Option<BlockId>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--click" => match rest.next() {
                Some(id) => parsed.click = Some(BlockId::from(id.as_str())),
                None => return Err("--click needs a block id".to_string()),
            },
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path if parsed.workspace_path.is_none() => {
                parsed.workspace_path = Some(PathBuf::from(path));
            }
            extra => return Err(format!("unexpected argument {extra}")),
        }
    }
    Ok(parsed)
}

fn build_highlighter(settings: &HighlightSettings) -> AppHighlighter {
    let fallback = if settings.content_fallback {
        ContentFallback::Nearest {
            max_distance: settings.fallback_max_distance,
        }
    } else {
        ContentFallback::Disabled
    };

    Highlighter::new(PythonGenerator::default())
        .with_scorer(ContentScorer {
            exact: settings.exact_score,
            contained: settings.contained_score,
        })
        .with_tuning(MatchTuning {
            max_compared_lines: settings.max_compared_lines,
            fallback,
        })
}

struct App {
    workspace: Workspace,
    highlighter: AppHighlighter,
    outline: Vec<OutlineItem>,
    block_list_state: ListState,
    code_lines: Vec<String>,
    highlighted: Option<LineRange>,
    status: String,
}

impl App {
    fn new(workspace: Workspace, highlighter: AppHighlighter) -> Self {
        let outline = workspace.outline();

        let mut app = Self {
            workspace,
            highlighter,
            outline,
            block_list_state: ListState::default(),
            code_lines: Vec::new(),
            highlighted: None,
            status: String::new(),
        };

        match app.highlighter.workspace_code(&app.workspace) {
            Ok(code) => app.code_lines = code.lines().map(str::to_string).collect(),
            Err(e) => app.status = format!("Error generating code: {e}"),
        }

        // Select first block if available
        if !app.outline.is_empty() {
            app.block_list_state.select(Some(0));
        }

        app
    }

    fn next_block(&mut self) {
        if self.outline.is_empty() {
            return;
        }
        let i = match self.block_list_state.selected() {
            Some(i) => (i + 1) % self.outline.len(),
            None => 0,
        };
        self.block_list_state.select(Some(i));
    }

    fn previous_block(&mut self) {
        if self.outline.is_empty() {
            return;
        }
        let i = match self.block_list_state.selected() {
            Some(0) | None => self.outline.len() - 1,
            Some(i) => i - 1,
        };
        self.block_list_state.select(Some(i));
    }

    fn click_selected_block(&mut self) {
        if let Some(index) = self.block_list_state.selected()
            && let Some(item) = self.outline.get(index)
        {
            let event = WorkspaceEvent::click(item.id.clone());
            self.dispatch(&event);
        }
    }

    fn click_canvas(&mut self) {
        self.dispatch(&WorkspaceEvent::canvas_click());
    }

    fn dispatch(&mut self, event: &WorkspaceEvent) {
        let mut success: Option<HighlightResult> = None;
        let mut failure: Option<HighlightError> = None;
        self.highlighter.handle_block_click(
            event,
            &self.workspace,
            |result| success = Some(result),
            |err| failure = Some(err),
        );

        if let Some(e) = failure {
            self.highlighted = None;
            self.status = format!("Error: {e}");
            return;
        }
        match success {
            Some(result) if result.clear => {
                self.highlighted = None;
                self.status = "Highlight cleared".to_string();
            }
            Some(result) => {
                self.code_lines = result
                    .workspace_code
                    .lines()
                    .map(str::to_string)
                    .collect();
                self.highlighted = result.range;
                self.status = match result.range {
                    Some(range) => format!("Lines {}-{}", range.start + 1, range.end + 1),
                    None => "Block not found in generated code".to_string(),
                };
            }
            None => {}
        }
    }
}

/// Print the payload of a single click as JSON
fn run_click(highlighter: &AppHighlighter, workspace: &Workspace, block_id: BlockId) -> Result<()> {
    let mut payload = None;
    let mut failure = None;
    {
        let mut listener = highlighter.block_click_listener(
            workspace,
            |result| payload = Some(result.to_payload()),
            |err| failure = Some(err),
        );
        listener(&WorkspaceEvent::click(block_id.clone()));
    }

    if let Some(err) = failure {
        return Err(err.into());
    }
    match payload {
        Some(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        None => bail!("No block with id '{block_id}' in workspace"),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let usage = format!("Usage: {} [workspace.json] [--click <block-id>]", args[0]);
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{usage}");
            process::exit(1);
        }
    };

    let config_path = Config::config_path();
    log::info!("Config path: {}", config_path.display());
    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let (workspace_path, from_config) = match (cli.workspace_path, config.workspace_path) {
        (Some(path), _) => (path, false),
        (None, Some(path)) => (path, true),
        (None, None) => {
            eprintln!("Error: No workspace file provided and none configured");
            eprintln!("{usage}");
            eprintln!(
                "Or set workspace_path in a config file at {}",
                config_path.display()
            );
            process::exit(1);
        }
    };

    if let Err(e) = io::validate_workspace_file(&workspace_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Workspace file '{}'{} is invalid: {e}",
            workspace_path.display(),
            source
        );
        process::exit(1);
    }

    let workspace = io::load_workspace(&workspace_path)?;
    log::info!(
        "Loaded {} blocks from {}",
        workspace.len(),
        workspace_path.display()
    );
    let highlighter = build_highlighter(&config.highlight);

    if let Some(block_id) = cli.click {
        return run_click(&highlighter, &workspace, block_id);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(workspace, highlighter);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_block(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_block(),
                KeyCode::Enter | KeyCode::Char(' ') => app.click_selected_block(),
                KeyCode::Esc => app.click_canvas(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(rows[0]);

    // Block outline panel
    let block_items: Vec<ListItem> = app
        .outline
        .iter()
        .map(|item| {
            let indent = "  ".repeat(item.depth);
            let display_text = format!("{}{} ({})", indent, item.kind, item.id);
            ListItem::new(vec![Line::from(vec![Span::raw(display_text)])])
        })
        .collect();

    let blocks_list = List::new(block_items)
        .block(Block::default().borders(Borders::ALL).title("Blocks"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(blocks_list, chunks[0], &mut app.block_list_state);

    // Generated code panel
    let number_width = app.code_lines.len().to_string().len();
    let code_text: Vec<Line> = if app.code_lines.is_empty() {
        vec![Line::from("No code generated")]
    } else {
        app.code_lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let style = match app.highlighted {
                    Some(range) if range.contains(index) => {
                        Style::default().bg(Color::Yellow).fg(Color::Black)
                    }
                    _ => Style::default(),
                };
                Line::from(vec![
                    Span::styled(
                        format!("{:>number_width$} ", index + 1),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(line.clone(), style),
                ])
            })
            .collect()
    };

    let code = Paragraph::new(code_text)
        .block(Block::default().borders(Borders::ALL).title("Python"));

    f.render_widget(code, chunks[1]);

    // Status and instructions
    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k: Previous | "),
        Span::raw("↓/j: Next | "),
        Span::raw("Enter/Space: Click block | Esc: Click canvas"),
    ]);
    let status_text = Line::from(Span::raw(app.status.clone()));

    let help = Paragraph::new(vec![status_text, help_text]).block(Block::default());

    f.render_widget(help, rows[1]);
}
