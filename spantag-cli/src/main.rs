//! Spantag CLI - Terminal span labelling tool

mod app;
mod config;
mod store;
mod ui;

use std::fs;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as TermEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spantag_core::session::{Direction, LeaveDecision};
use spantag_core::{DocumentId, EntityClass, Event, Mode, Project, ProjectId, Session};

use app::{App, Screen};
use store::FileStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "spantag: label spans of text documents", long_about = None)]
struct Cli {
    /// Project directory (defaults to `store_dir` from the config, then `.`)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a project with its entity classes
    Init {
        /// Project name
        name: String,
        /// Entity class as NAME=#rrggbb; repeat in display order
        #[arg(long = "class", value_parser = parse_class, required = true)]
        classes: Vec<EntityClass>,
    },
    /// Add text files to the project as documents
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Open the annotator
    Annotate {
        /// Save the current document before moving to another
        #[arg(long)]
        autosave: bool,
        /// Document to open instead of the project listing
        document: Option<String>,
    },
    /// Print the project's documents and annotations as JSON
    Export,
}

fn parse_class(arg: &str) -> Result<EntityClass, String> {
    let (name, color) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=#rrggbb, got `{arg}`"))?;
    if name.trim().is_empty() {
        return Err("class name is empty".to_string());
    }
    if ui::parse_color(color).is_none() {
        return Err(format!("`{color}` is not a #rrggbb color"));
    }
    Ok(EntityClass::new(name.trim(), color.to_lowercase()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config()?;
    init_tracing();

    let root = cli
        .store
        .clone()
        .or_else(|| config.store_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Init { name, classes } => {
            let project = Project::new(ProjectId::generate(), name, classes);
            FileStore::init(&root, project)
                .with_context(|| format!("Failed to create project in {}", root.display()))?;
            println!("Created project in {}", root.display());
        }
        Commands::Import { files } => {
            let mut store = open_store(&root)?;
            for path in files {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read file: {}", path.display()))?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string());
                let id = store
                    .import(name, text)
                    .with_context(|| format!("Failed to import {}", path.display()))?;
                println!("{id}  {}", path.display());
            }
        }
        Commands::Annotate { autosave, document } => {
            let store = open_store(&root)?;
            let mut session_config = config.session();
            session_config.autosave |= autosave;
            run_annotator(App::new(Session::new(session_config), store), document)?;
        }
        Commands::Export => {
            let store = open_store(&root)?;
            let documents = store.documents().context("Failed to read documents")?;
            let json = serde_json::to_string_pretty(&documents)
                .context("Failed to serialize documents")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn open_store(root: &Path) -> Result<FileStore> {
    FileStore::open(root).with_context(|| format!("No project found in {}", root.display()))
}

/// Log to `~/.spantag/spantag.log`; the terminal belongs to the UI.
fn init_tracing() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let dir = home.join(".spantag");
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("spantag.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_env("SPANTAG_LOG")
        .unwrap_or_else(|_| EnvFilter::new("spantag=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
}

fn run_annotator(mut app: App, document: Option<String>) -> Result<()> {
    if let Some(id) = document {
        let id = DocumentId::new(id);
        if !app.store().document_ids().contains(&id) {
            bail!("No document {id} in this project");
        }
        app.open(id);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(project = %app.store().project().id, "annotator started");
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app))?;

        if let TermEvent::Key(key) = event::read()? {
            // Clear status on any key
            app.clear_status();

            match (app.screen, app.session.mode()) {
                (_, Mode::ConfirmLeave) => handle_confirm(app, key.code),
                (Screen::Project, _) => handle_project_keys(app, key.code),
                (_, Mode::Popover) => handle_popover(app, key.code),
                _ if app.anchor.is_some() => handle_visual_mode(app, key.code),
                _ => handle_normal_mode(app, key.code),
            }
        }
    }
    Ok(())
}

fn handle_project_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.next_listed(),
        KeyCode::Char('k') | KeyCode::Up => app.prev_listed(),
        KeyCode::Enter => app.open_selected(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.back(),

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.cursor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor.move_up(),
        KeyCode::Char('h') | KeyCode::Left => app.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => app.cursor.move_right(),
        KeyCode::Char('w') => app.cursor.move_word_forward(),
        KeyCode::Char('b') => app.cursor.move_word_back(),
        KeyCode::Char('0') => app.cursor.move_to_start(),
        KeyCode::Char('$') => app.cursor.move_to_end(),
        KeyCode::Char('g') => app.cursor.move_to_top(),
        KeyCode::Char('G') => app.cursor.move_to_bottom(),

        // Entities
        KeyCode::Char(digit @ '1'..='9') => app.dispatch(Event::Key(digit)),
        KeyCode::Char('v') => app.enter_visual_mode(),
        KeyCode::Char(']') => app.focus_next(),
        KeyCode::Char('[') => app.focus_prev(),
        KeyCode::Enter => app.open_popover(),
        KeyCode::Char('x') => app.dismiss_focused(),

        // Documents
        KeyCode::Char('n') => app.dispatch(Event::Navigate(Direction::Next)),
        KeyCode::Char('p') => app.dispatch(Event::Navigate(Direction::Previous)),
        KeyCode::Char('s') => {
            app.dispatch(Event::Save);
            if app.status_message.is_none() {
                app.set_status("No unsaved changes");
            }
        }
        KeyCode::Char('S') => app.dispatch(Event::SaveAll),
        KeyCode::Char('c') => app.dispatch(Event::ToggleComplete),
        KeyCode::Char('A') => app.toggle_autosave(),

        _ => {}
    }
}

fn handle_visual_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.exit_visual_mode(),
        KeyCode::Char('j') | KeyCode::Down => app.cursor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor.move_up(),
        KeyCode::Char('h') | KeyCode::Left => app.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => app.cursor.move_right(),
        KeyCode::Char('w') => app.cursor.move_word_forward(),
        KeyCode::Char('b') => app.cursor.move_word_back(),
        KeyCode::Char('0') => app.cursor.move_to_start(),
        KeyCode::Char('$') => app.cursor.move_to_end(),
        KeyCode::Char('g') => app.cursor.move_to_top(),
        KeyCode::Char('G') => app.cursor.move_to_bottom(),
        KeyCode::Char(digit @ '1'..='9') => app.dispatch(Event::Key(digit)),
        KeyCode::Char('a') | KeyCode::Enter => app.add_selection(),
        _ => {}
    }
}

fn handle_popover(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.dispatch(Event::ClosePopover),
        KeyCode::Enter => app.pick_class(),
        KeyCode::Down | KeyCode::Tab => app.popover_next(),
        KeyCode::Up | KeyCode::BackTab => app.popover_prev(),
        KeyCode::Backspace => app.popover_input(None),
        KeyCode::Char(ch) => app.popover_input(Some(ch)),
        _ => {}
    }
}

fn handle_confirm(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('y') => app.decide(LeaveDecision::SaveAndLeave),
        KeyCode::Char('d') => app.decide(LeaveDecision::DiscardAndLeave),
        KeyCode::Char('n') | KeyCode::Esc => app.decide(LeaveDecision::Cancel),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class() {
        let class = parse_class("PERSON=#FF0000").unwrap();
        assert_eq!(class, EntityClass::new("PERSON", "#ff0000"));
    }

    #[test]
    fn test_parse_class_rejects_bad_input() {
        assert!(parse_class("PERSON").is_err());
        assert!(parse_class("=#ff0000").is_err());
        assert!(parse_class("PERSON=red").is_err());
    }

    #[test]
    fn test_cli_parses_classes() {
        let cli = Cli::try_parse_from([
            "spantag", "--store", "news", "init", "News", "--class", "PERSON=#ff0000", "--class",
            "CITY=#0000ff",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(PathBuf::from("news")));
        let Commands::Init { name, classes } = cli.command else {
            panic!("expected init");
        };
        assert_eq!(name, "News");
        assert_eq!(classes.len(), 2);
    }
}
