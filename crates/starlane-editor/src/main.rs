//! Starlane command-line editor entry point.
//!
//! Every editing command opens a fresh session from the configured store,
//! applies one change to the working copy and saves it through the normal
//! save-with-token flow, so the server stays the source of truth.
//!
//! # Usage
//!
//! ```text
//! starlane show [--filter TEXT] [--html]
//! starlane export --out FILE
//! starlane import --file FILE [--save]
//! starlane settings [--title T] [--theme auto] [--background-file bg.png]
//! starlane group add|rename|delete|move ...
//! starlane item add|edit|delete|move ...
//! starlane logout
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Description                               |
//! |-----------------------|-------------------------------------------|
//! | `STARLANE_CONFIG`     | Settings file path                        |
//! | `STARLANE_BASE_URL`   | Server base URL                           |
//! | `STARLANE_SAVE_TOKEN` | Save token; bypasses the cache and prompt |
//! | `RUST_LOG`            | Log filter; overrides `general.log_level` |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use starlane_core::domain::dashboard::{render_html, render_text};
use starlane_core::{BackgroundType, DashboardPage, Item, Theme};
use starlane_editor::application::group_order::{DeleteOutcome, DropTarget, RenameOutcome};
use starlane_editor::application::session::ImportOutcome;
use starlane_editor::application::sync::{SaveReport, TokenStore};
use starlane_editor::application::working_copy::ItemId;
use starlane_editor::infrastructure::console::Console;
use starlane_editor::infrastructure::files::{
    background_from_file, export_to_file, import_from_file,
};
use starlane_editor::infrastructure::settings::{
    load_settings_from, settings_file_path, AppSettings, StorageMode,
};
use starlane_editor::infrastructure::store::open_store;
use starlane_editor::infrastructure::token_cache::{OverrideToken, TokenCache};
use starlane_editor::{load_dashboard, save_session, ConfigStore, EditorSession};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Edit and view a Starlane link dashboard.
#[derive(Debug, Parser)]
#[command(name = "starlane", version)]
struct Cli {
    /// Settings file.  Defaults to the platform config directory.
    #[arg(long, env = "STARLANE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Server base URL, overriding `remote.base_url`.
    #[arg(long, env = "STARLANE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Storage mode, overriding `storage.mode`.
    #[arg(long, value_enum, global = true)]
    mode: Option<StorageMode>,

    /// Data directory for the token cache and local mode.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Save token.  Skips the cache and the prompt.
    #[arg(long, env = "STARLANE_SAVE_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Answer yes to every confirmation.
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the dashboard.
    Show {
        /// Only show items whose name contains TEXT (case-insensitive).
        #[arg(long, default_value = "")]
        filter: String,
        /// Render HTML instead of text.
        #[arg(long)]
        html: bool,
    },
    /// Write the configuration to a file.
    Export {
        /// Target file, or a directory to write `config.json` into.
        #[arg(long)]
        out: PathBuf,
    },
    /// Stage a configuration file; persisted only with `--save`.
    Import {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        save: bool,
    },
    /// Change page title, theme or background.
    Settings(SettingsArgs),
    /// Manage groups.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage items.
    #[command(subcommand)]
    Item(ItemCommand),
    /// Forget the cached save token.
    Logout,
}

#[derive(Debug, Args)]
struct SettingsArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,
    #[arg(long, value_enum)]
    background_type: Option<BackgroundArg>,
    /// `#rrggbb` colour.
    #[arg(long)]
    background_color: Option<String>,
    /// Image URL.
    #[arg(long, conflicts_with = "background_file")]
    background_image: Option<String>,
    /// Local image embedded as a data URL.
    #[arg(long)]
    background_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    Add {
        name: String,
    },
    Rename {
        old: String,
        new: String,
    },
    /// Delete a group; its items move to the first remaining group.
    Delete {
        name: String,
    },
    /// Move a group before another one, or to the end.
    Move {
        name: String,
        #[arg(long, conflicts_with = "end", required_unless_present = "end")]
        before: Option<String>,
        #[arg(long)]
        end: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    Add {
        group: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        icon: String,
    },
    /// Edit the first item called NAME in GROUP.
    Edit {
        group: String,
        name: String,
        #[arg(long = "name")]
        new_name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    Delete {
        group: String,
        name: String,
    },
    /// Move an item to another group (or within its group).
    Move {
        group: String,
        name: String,
        #[arg(long)]
        to: String,
        /// Position in the target group; defaults to the end.
        #[arg(long)]
        index: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    Auto,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Auto => Theme::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackgroundArg {
    Color,
    Image,
}

impl From<BackgroundArg> for BackgroundType {
    fn from(arg: BackgroundArg) -> Self {
        match arg {
            BackgroundArg::Color => BackgroundType::Color,
            BackgroundArg::Image => BackgroundType::Image,
        }
    }
}

impl Cli {
    /// Loads the settings file and applies command-line overrides.
    fn settings(&self) -> anyhow::Result<AppSettings> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => settings_file_path().ok(),
        };
        let mut settings = match &path {
            Some(path) => load_settings_from(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => AppSettings::default(),
        };
        if let Some(base_url) = &self.base_url {
            settings.remote.base_url = base_url.clone();
        }
        if let Some(mode) = self.mode {
            settings.storage.mode = mode;
        }
        if let Some(dir) = &self.data_dir {
            settings.storage.data_dir = Some(dir.clone());
        }
        Ok(settings)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.general.log_level)),
        )
        .init();

    let data_dir = settings
        .storage
        .resolved_data_dir()
        .context("resolving data directory")?;
    let tokens: Box<dyn TokenStore> = match &cli.token {
        Some(token) => Box::new(OverrideToken::new(token.clone())),
        None => Box::new(TokenCache::standard(&data_dir)),
    };
    let store = open_store(&settings).context("opening configuration store")?;
    let app = App {
        store,
        tokens,
        console: Console::stdio(cli.yes),
    };
    run(cli.command, &app).await
}

/// Collaborators shared by every command.
struct App {
    store: Arc<dyn ConfigStore>,
    tokens: Box<dyn TokenStore>,
    console: Console<std::io::BufReader<std::io::Stdin>, std::io::Stderr>,
}

impl App {
    async fn open(&self) -> anyhow::Result<EditorSession> {
        EditorSession::open(self.store.as_ref())
            .await
            .with_context(|| format!("loading configuration from {}", self.store.describe()))
    }

    async fn save(&self, session: &mut EditorSession) -> anyhow::Result<SaveReport> {
        let report = save_session(
            session,
            self.store.as_ref(),
            self.tokens.as_ref(),
            &self.console,
        )
        .await?;
        println!("Saved: {} groups, {} items.", report.groups, report.items);
        Ok(report)
    }
}

async fn run(command: Command, app: &App) -> anyhow::Result<()> {
    match command {
        Command::Show { filter, html } => {
            let page = load_dashboard(app.store.as_ref()).await;
            let output = if html {
                render_html(&page, &filter)
            } else {
                render_text(&page, &filter)
            };
            println!("{output}");
            if let DashboardPage::Error { message } = page {
                bail!(message);
            }
        }
        Command::Export { out } => {
            let session = app.open().await?;
            let path = export_to_file(&session, &out)?;
            println!("Exported to {}.", path.display());
        }
        Command::Import { file, save } => {
            let mut session = app.open().await?;
            match import_from_file(&mut session, &file, &app.console)? {
                ImportOutcome::Declined => println!("Import cancelled."),
                ImportOutcome::Staged { groups, items } => {
                    println!("Staged {groups} groups, {items} items.");
                    if save {
                        app.save(&mut session).await?;
                    } else {
                        println!("Not saved; run again with --save to persist.");
                    }
                }
            }
        }
        Command::Settings(args) => {
            let mut session = app.open().await?;
            apply_settings(&mut session, args)?;
            app.save(&mut session).await?;
        }
        Command::Group(command) => {
            let mut session = app.open().await?;
            if apply_group(&mut session, command, app)? {
                app.save(&mut session).await?;
            }
        }
        Command::Item(command) => {
            let mut session = app.open().await?;
            apply_item(&mut session, command)?;
            app.save(&mut session).await?;
        }
        Command::Logout => {
            app.tokens.forget();
            println!("Save token forgotten.");
        }
    }
    Ok(())
}

fn apply_settings(session: &mut EditorSession, args: SettingsArgs) -> anyhow::Result<()> {
    if let Some(title) = args.title {
        session.set_page_title(&title);
    }
    if let Some(theme) = args.theme {
        session.set_theme(theme.into());
    }
    if let Some(color) = args.background_color {
        session.set_background_color(&color)?;
    }
    if let Some(image) = args.background_image {
        session.set_background_image(image);
    }
    if let Some(file) = args.background_file {
        session.set_background_image(background_from_file(&file)?);
    }
    if let Some(kind) = args.background_type {
        session.set_background_kind(kind.into());
    }
    Ok(())
}

/// Returns `false` when nothing changed and no save is needed.
fn apply_group(
    session: &mut EditorSession,
    command: GroupCommand,
    app: &App,
) -> anyhow::Result<bool> {
    let mut groups = session.groups();
    match command {
        GroupCommand::Add { name } => {
            let name = groups.add_group(&name)?;
            info!(group = %name, "group added");
        }
        GroupCommand::Rename { old, new } => {
            if groups.rename_group(&old, &new)? == RenameOutcome::Unchanged {
                println!("Name unchanged.");
                return Ok(false);
            }
        }
        GroupCommand::Delete { name } => match groups.delete_group(&name, &app.console)? {
            DeleteOutcome::Cancelled => {
                println!("Delete cancelled.");
                return Ok(false);
            }
            DeleteOutcome::Deleted {
                moved,
                rebound_to: Some(first),
            } => println!("Deleted \"{name}\"; {moved} items moved to \"{first}\"."),
            DeleteOutcome::Deleted {
                moved,
                rebound_to: None,
            } => {
                if moved > 0 {
                    warn!(moved, "no group left; items will be dropped on save");
                }
                println!("Deleted \"{name}\".");
            }
        },
        GroupCommand::Move { name, before, end } => {
            let target = match before {
                Some(before) if !end => DropTarget::Before(before),
                _ => DropTarget::End,
            };
            groups.reorder(&name, &target)?;
        }
    }
    Ok(true)
}

fn find(session: &EditorSession, group: &str, name: &str) -> anyhow::Result<ItemId> {
    session
        .working_copy()
        .find_item(group, name)
        .with_context(|| format!("no item \"{name}\" in group \"{group}\""))
}

fn apply_item(session: &mut EditorSession, command: ItemCommand) -> anyhow::Result<()> {
    match command {
        ItemCommand::Add {
            group,
            name,
            url,
            icon,
        } => {
            let mut items = session.items();
            items.begin_add(&group)?;
            items.commit(Item { name, url, icon })?;
        }
        ItemCommand::Edit {
            group,
            name,
            new_name,
            url,
            icon,
        } => {
            let id = find(session, &group, &name)?;
            let mut items = session.items();
            let current = items.begin_edit(id)?;
            items.commit(Item {
                name: new_name.unwrap_or(current.name),
                url: url.unwrap_or(current.url),
                icon: icon.unwrap_or(current.icon),
            })?;
        }
        ItemCommand::Delete { group, name } => {
            let id = find(session, &group, &name)?;
            session.items().delete(id)?;
        }
        ItemCommand::Move {
            group,
            name,
            to,
            index,
        } => {
            let id = find(session, &group, &name)?;
            session
                .items()
                .move_across_groups(id, &group, &to, index.unwrap_or(usize::MAX))?;
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use starlane_core::{ConfigModel, Group};

    #[test]
    fn test_cli_parses_group_rename() {
        let cli = Cli::parse_from(["starlane", "group", "rename", "Media", "Home"]);

        assert!(matches!(
            cli.command,
            Command::Group(GroupCommand::Rename { ref old, ref new }) if old == "Media" && new == "Home"
        ));
    }

    #[test]
    fn test_cli_global_overrides_after_subcommand() {
        let cli = Cli::parse_from([
            "starlane",
            "show",
            "--mode",
            "local",
            "--data-dir",
            "/tmp/x",
        ]);

        assert_eq!(cli.mode, Some(StorageMode::Local));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_cli_group_move_requires_target() {
        let result = Cli::try_parse_from(["starlane", "group", "move", "Media"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_apply_on_top_of_file() {
        let cli = Cli::parse_from([
            "starlane",
            "--config",
            "/nonexistent/starlane/settings.toml",
            "--base-url",
            "http://nas.local:8899",
            "--mode",
            "local",
            "logout",
        ]);

        let settings = cli.settings().unwrap();

        assert_eq!(settings.remote.base_url, "http://nas.local:8899");
        assert_eq!(settings.storage.mode, StorageMode::Local);
    }

    #[test]
    fn test_apply_settings_updates_page() {
        let mut session = EditorSession::new(&ConfigModel::default());
        let args = SettingsArgs {
            title: Some("Lab".into()),
            theme: Some(ThemeArg::Dark),
            background_type: None,
            background_color: Some("#000000".into()),
            background_image: None,
            background_file: None,
        };

        apply_settings(&mut session, args).unwrap();

        let model = session.snapshot();
        assert_eq!(model.page_title, "Lab");
        assert_eq!(model.theme, Theme::Dark);
        assert_eq!(model.background.color, "#000000");
    }

    #[test]
    fn test_apply_item_move_defaults_to_end() {
        let mut session = EditorSession::new(&ConfigModel {
            groups: vec![
                Group {
                    name: "A".into(),
                    items: vec![Item {
                        name: "x".into(),
                        url: "https://x.test".into(),
                        icon: String::new(),
                    }],
                },
                Group {
                    name: "B".into(),
                    items: vec![Item {
                        name: "y".into(),
                        url: "https://y.test".into(),
                        icon: String::new(),
                    }],
                },
            ],
            ..ConfigModel::default()
        });

        apply_item(
            &mut session,
            ItemCommand::Move {
                group: "A".into(),
                name: "x".into(),
                to: "B".into(),
                index: None,
            },
        )
        .unwrap();

        let b: Vec<_> = session.snapshot().groups[1]
            .items
            .iter()
            .map(|i| i.name.clone())
            .collect();
        assert_eq!(b, vec!["y", "x"]);
    }
}
