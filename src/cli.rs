use crate::theme::Theme;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notedesk", version, about = "Terminal client for a remote notes service")]
pub struct Cli {
    /// Base URL of the notes API (absolute, or a path under the configured origin)
    #[arg(long, env = "NOTES_API_URL", global = true)]
    pub api_url: Option<String>,
    /// Directory holding config, theme and logs instead of the platform defaults
    #[arg(long, env = "NOTEDESK_HOME", global = true)]
    pub home: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all notes
    List,
    /// Print a single note
    Show {
        /// Note id
        id: String,
    },
    /// Create a note
    Add {
        /// Title of the note
        title: String,
        /// Note content
        #[arg(long)]
        content: Option<String>,
    },
    /// Replace the title and/or content of a note
    Edit {
        /// Note id to edit
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note id to delete
        id: String,
    },
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum ThemeAction {
    /// Print the current theme
    Show,
    /// Switch between light and dark
    Toggle,
    /// Set the theme explicitly
    Set {
        #[arg(value_enum)]
        theme: Theme,
    },
}
