//! `roster`: terminal console for administering platform user accounts.
//!
//! # Usage
//!
//! ```text
//! roster --url http://localhost:8000/api --session ~/.config/roster/session.json
//! roster --config ~/.config/roster/config.toml --log-file roster.log
//! ```

mod app;
mod client;
mod ui;

use std::{
  fs::File,
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use roster_core::session::{CurrentActorResolver, FileSession, SessionSource};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8000/api";
const DEFAULT_SESSION: &str = "~/.config/roster/session.json";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", about = "Terminal console for managing user accounts")]
struct Args {
  /// Path to a TOML config file (url, session).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the backend API (default: http://localhost:8000/api).
  #[arg(long, env = "ROSTER_URL")]
  url: Option<String>,

  /// Session file written at sign-in: `{"token": "...", "user": {"id": ...}}`.
  #[arg(long, env = "ROSTER_SESSION", value_name = "FILE")]
  session: Option<PathBuf>,

  /// Write logs to this file. The terminal is owned by the UI, so nothing is
  /// logged unless this is set.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug, PartialEq, Eq)]
struct ConfigFile {
  #[serde(default)]
  url:     String,
  #[serde(default)]
  session: String,
}

/// Settings after merging flags, config file and defaults.
#[derive(Debug, PartialEq, Eq)]
struct Settings {
  url:     String,
  session: PathBuf,
}

impl Settings {
  /// CLI flags override the config file, which overrides defaults.
  fn merge(args: &Args, file: ConfigFile) -> Self {
    let url = args
      .url
      .clone()
      .or_else(|| (!file.url.is_empty()).then_some(file.url))
      .unwrap_or_else(|| DEFAULT_URL.to_string());
    let session = args
      .session
      .clone()
      .or_else(|| (!file.session.is_empty()).then(|| PathBuf::from(&file.session)))
      .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION));
    Self {
      url,
      session: expand_tilde(&session),
    }
  }
}

fn load_config_file(path: Option<&Path>) -> Result<ConfigFile> {
  let Some(path) = path else {
    return Ok(ConfigFile::default());
  };
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading config file {}", path.display()))?;
  toml::from_str(&raw).context("parsing config file")
}

fn init_logging(path: &Path) -> Result<()> {
  let file = File::create(path)
    .with_context(|| format!("creating log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_ansi(false)
    .with_writer(Mutex::new(file))
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log_file {
    init_logging(path)?;
  }

  let file_cfg = load_config_file(args.config.as_deref())?;
  let settings = Settings::merge(&args, file_cfg);
  tracing::info!(url = %settings.url, session = %settings.session.display(), "starting");

  let resolver = CurrentActorResolver::new(FileSession::new(&settings.session));
  let client = ApiClient::new(ApiConfig {
    base_url: settings.url,
    token:    resolver.token(),
  })?;
  let mut app = App::new(client, resolver);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Initial load runs in the background; the table fills in when it lands.
  app.start_refresh();

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop<S: SessionSource>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<ApiClient, S>,
) -> Result<()> {
  loop {
    app.tick();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    match maybe_event {
      Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
        if !app.handle_key(key) {
          break;
        }
      }
      // Resize and everything else: redraw on the next iteration.
      _ => {}
    }
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  /// Built directly so `ROSTER_URL`/`ROSTER_SESSION` in the environment
  /// cannot leak into the merge.
  fn no_flags() -> Args {
    Args {
      config:   None,
      url:      None,
      session:  None,
      log_file: None,
    }
  }

  #[test]
  fn defaults_apply_without_flags_or_file() {
    let s = Settings::merge(&no_flags(), ConfigFile::default());
    assert_eq!(s.url, DEFAULT_URL);
    assert!(s.session.ends_with(".config/roster/session.json"));
  }

  #[test]
  fn flags_override_file() {
    let file = ConfigFile {
      url:     "http://file:1".into(),
      session: "/from/file.json".into(),
    };
    let flags = Args {
      url: Some("http://flag:2".into()),
      ..no_flags()
    };
    let s = Settings::merge(&flags, file);
    assert_eq!(s.url, "http://flag:2");
    assert_eq!(s.session, PathBuf::from("/from/file.json"));
  }

  #[test]
  fn flags_parse_from_the_command_line() {
    let parsed = Args::try_parse_from([
      "roster",
      "--url",
      "http://cli:3/api",
      "--session",
      "/tmp/cli.json",
    ])
    .unwrap();
    assert_eq!(parsed.url.as_deref(), Some("http://cli:3/api"));
    assert_eq!(parsed.session, Some(PathBuf::from("/tmp/cli.json")));
  }

  #[test]
  fn config_file_is_parsed() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "url = \"http://admin.local/api\"\nsession = \"/tmp/s.json\"").unwrap();

    let cfg = load_config_file(Some(f.path())).unwrap();
    assert_eq!(cfg, ConfigFile {
      url:     "http://admin.local/api".into(),
      session: "/tmp/s.json".into(),
    });
    assert_eq!(load_config_file(None).unwrap(), ConfigFile::default());
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(expand_tilde(Path::new("~/x.json")), PathBuf::from(home).join("x.json"));
    assert_eq!(expand_tilde(Path::new("/abs/x.json")), PathBuf::from("/abs/x.json"));
  }
}
