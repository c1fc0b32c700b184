use crate::cli::{Cli, Command, ThemeAction};
use crate::config::Settings;
use crate::http::HttpNoteStore;
use crate::logging::init_logging;
use crate::model::{Note, NoteDraft};
use crate::storage::{load_settings, AppDirs};
use crate::sync::SyncController;
use crate::theme::ThemePreference;
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use log::info;

pub async fn run(cli: Cli) -> Result<()> {
    let dirs = AppDirs::locate(cli.home.as_deref())?;
    let mut settings = load_settings(&dirs)?;
    if let Some(url) = cli.api_url {
        settings.api.base_url = url;
    }
    let _logger = init_logging(&settings.logging.level, &dirs.log_dir)?;
    let command = cli.command.unwrap_or(Command::Tui);
    info!("event=command name={}", command_name(&command));

    match command {
        Command::Theme { action } => theme(&dirs, action),
        Command::List => list(&settings).await,
        Command::Show { id } => show(&settings, id).await,
        Command::Add { title, content } => add(&settings, title, content).await,
        Command::Edit { id, title, content } => edit(&settings, id, title, content).await,
        Command::Delete { id } => delete(&settings, id).await,
        Command::Tui => tui(&settings, &dirs).await,
    }
}

fn theme(dirs: &AppDirs, action: Option<ThemeAction>) -> Result<()> {
    let mut pref = ThemePreference::load(dirs.theme_path());
    match action.unwrap_or(ThemeAction::Show) {
        ThemeAction::Show => {}
        ThemeAction::Toggle => {
            pref.toggle()?;
        }
        ThemeAction::Set { theme } => pref.set(theme)?,
    }
    println!("{}", pref.theme());
    Ok(())
}

async fn list(settings: &Settings) -> Result<()> {
    let controller = loaded_controller(settings).await?;
    if controller.notes().is_empty() {
        println!("No notes. Create the first one!");
    }
    for note in controller.notes().iter() {
        println!("  {}: {}", note.id, note.display_title());
    }
    Ok(())
}

async fn show(settings: &Settings, id: String) -> Result<()> {
    let controller = loaded_controller(settings).await?;
    let note = find(&controller, &id)?;
    print_note(note);
    Ok(())
}

async fn add(settings: &Settings, title: String, content: Option<String>) -> Result<()> {
    let draft = NoteDraft::new(title.trim(), content.unwrap_or_default());
    draft.validate()?;
    let mut controller = loaded_controller(settings).await?;
    controller.open_create();
    if !controller.save(draft).await {
        bail!(failure_message(&controller));
    }
    let Some(created) = controller.selected_note() else {
        if controller.notice().is_some_and(|n| n.is_error()) {
            bail!(failure_message(&controller));
        }
        bail!("note was saved but is missing from the reloaded list");
    };
    println!("Created note {}", created.id);
    Ok(())
}

async fn edit(
    settings: &Settings,
    id: String,
    title: Option<String>,
    content: Option<String>,
) -> Result<()> {
    if title.is_none() && content.is_none() {
        bail!("nothing to change (pass --title and/or --content)");
    }
    let mut controller = loaded_controller(settings).await?;
    let note = find(&controller, &id)?.clone();
    let draft = NoteDraft::new(
        title.map(|t| t.trim().to_string()).unwrap_or_else(|| note.title.clone()),
        content.unwrap_or_else(|| note.content.clone()),
    );
    draft.validate()?;
    controller.open_edit(note);
    if !controller.save(draft).await {
        bail!(failure_message(&controller));
    }
    println!("Updated note {}", id);
    Ok(())
}

async fn delete(settings: &Settings, id: String) -> Result<()> {
    let mut controller = loaded_controller(settings).await?;
    let note = find(&controller, &id)?.clone();
    controller.open_delete(note);
    if !controller.confirm_delete().await {
        bail!(failure_message(&controller));
    }
    println!("Deleted note {}", id);
    Ok(())
}

async fn tui(settings: &Settings, dirs: &AppDirs) -> Result<()> {
    let base = settings.api.resolve_base_url()?;
    let store = HttpNoteStore::new(base.clone(), settings.api.timeout())
        .context("creating notes client")?;
    let theme = ThemePreference::load(dirs.theme_path());
    ui::run(SyncController::new(store), theme, base.to_string()).await
}

/// One-shot commands share the interactive startup: build the store and run
/// the initial load. A failed load is an error here rather than an empty list.
async fn loaded_controller(settings: &Settings) -> Result<SyncController<HttpNoteStore>> {
    let base = settings.api.resolve_base_url()?;
    let store =
        HttpNoteStore::new(base, settings.api.timeout()).context("creating notes client")?;
    let mut controller = SyncController::new(store);
    if !controller.load().await {
        bail!(failure_message(&controller));
    }
    Ok(controller)
}

fn find<'a>(controller: &'a SyncController<HttpNoteStore>, id: &str) -> Result<&'a Note> {
    controller
        .notes()
        .find_by_label(id)
        .ok_or_else(|| anyhow!("note {} not found", id))
}

fn failure_message(controller: &SyncController<HttpNoteStore>) -> String {
    controller
        .notice()
        .map(|n| n.message.clone())
        .unwrap_or_else(|| "request failed".to_string())
}

fn print_note(note: &Note) {
    println!("{} ({})", note.display_title(), note.id);
    println!();
    if note.content.is_empty() {
        println!("(No content)");
    } else {
        println!("{}", note.content);
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List => "list",
        Command::Show { .. } => "show",
        Command::Add { .. } => "add",
        Command::Edit { .. } => "edit",
        Command::Delete { .. } => "delete",
        Command::Theme { .. } => "theme",
        Command::Tui => "tui",
    }
}
