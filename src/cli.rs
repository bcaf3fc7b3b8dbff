use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    commands,
    presentation::{format_duration, NoteListView, SettingsScreen},
    recorder::RecordingOutcome,
    AppState,
};

const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(author, version, about = "Record, browse and play back voice notes")]
pub struct Args {
    /// Directory holding the database and recordings (default: platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep notes and settings in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a new voice note
    Record {
        /// Stop after this many seconds instead of waiting for Enter
        #[arg(short, long)]
        seconds: Option<u64>,

        /// Title to use instead of the generated one
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List saved voice notes, newest first
    List {
        /// Only show notes whose title contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Play a voice note until it ends or Ctrl-C
    Play { id: String },
    /// Change the title of a voice note
    Rename { id: String, title: String },
    /// Delete a voice note and its audio file
    Delete { id: String },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    /// e.g. `set playback-speed 1.5` or `set theme light`
    Set { field: String, value: String },
}

pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Record { seconds, title } => record(state, seconds, title).await,
        Command::List { search } => {
            let view = commands::list_notes(state, search).await.map_err(|e| anyhow!(e))?;
            print_notes(&view);
            Ok(())
        }
        Command::Play { id } => play(state, id).await,
        Command::Rename { id, title } => {
            let note = commands::rename_note(state, id, title)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("Renamed {} to \"{}\"", note.id, note.title);
            Ok(())
        }
        Command::Delete { id } => {
            if commands::delete_note(state, id.clone())
                .await
                .map_err(|e| anyhow!(e))?
            {
                println!("Deleted {id}");
            } else {
                println!("No voice note with id {id}");
            }
            Ok(())
        }
        Command::Settings { action } => {
            match action {
                SettingsAction::Show => {}
                SettingsAction::Set { field, value } => {
                    commands::update_setting(state, field, value)
                        .await
                        .map_err(|e| anyhow!(e))?;
                }
            }
            let screen = commands::get_settings(state).await.map_err(|e| anyhow!(e))?;
            print_settings(&screen);
            Ok(())
        }
    }
}

async fn record(state: &AppState, seconds: Option<u64>, title: Option<String>) -> Result<()> {
    commands::start_recording(state)
        .await
        .map_err(|e| anyhow!(e))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match seconds {
        Some(secs) => {
            println!("Recording for {secs}s...");
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
        None => {
            println!("Recording... press Enter to stop");
            lines.next_line().await?;
        }
    }

    let outcome = commands::stop_recording(state)
        .await
        .map_err(|e| anyhow!(e))?;

    let saved = match outcome {
        RecordingOutcome::Saved(note) => match title {
            Some(title) => commands::rename_note(state, note.id, title)
                .await
                .map_err(|e| anyhow!(e))?,
            None => note,
        },
        RecordingOutcome::Pending(note) => {
            println!(
                "Recorded {} ({}). Keep it? [Y/n]",
                note.title,
                format_duration(note.duration)
            );
            let answer = lines.next_line().await?.unwrap_or_default();
            if answer.trim().eq_ignore_ascii_case("n") {
                commands::discard_pending_recording(state)
                    .await
                    .map_err(|e| anyhow!(e))?;
                println!("Recording discarded");
                return Ok(());
            }
            commands::save_pending_recording(state, title)
                .await
                .map_err(|e| anyhow!(e))?
        }
    };

    println!("Saved {} \"{}\"", saved.id, saved.title);
    Ok(())
}

async fn play(state: &AppState, id: String) -> Result<()> {
    let playback = commands::play_note(state, id).await.map_err(|e| anyhow!(e))?;
    if let Some(rate) = playback.rate {
        println!("Playing at {rate}x, Ctrl-C to stop");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                commands::stop_playback(state).await.map_err(|e| anyhow!(e))?;
                break;
            }
            _ = tokio::time::sleep(PLAYBACK_POLL_INTERVAL) => {
                if !state.controller.is_playing().await {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn print_notes(view: &NoteListView) {
    if let Some(message) = &view.empty_message {
        println!("{message}");
        return;
    }

    for row in &view.rows {
        println!(
            "{:<15} {:<40} {:<22} {:>6} {:>9}",
            row.id, row.title, row.date, row.duration, row.size
        );
    }
}

fn print_settings(screen: &SettingsScreen) {
    fn marked(label: &str, selected: bool) -> String {
        if selected {
            format!("[{label}]")
        } else {
            label.to_string()
        }
    }

    let line = |items: Vec<String>| items.join("  ");
    println!(
        "Recording quality: {}",
        line(screen.qualities.iter().map(|o| marked(o.label, o.selected)).collect())
    );
    println!(
        "Playback speed:    {}",
        line(screen.speeds.iter().map(|o| marked(o.label, o.selected)).collect())
    );
    println!("Auto-save:         {}", if screen.auto_save { "on" } else { "off" });
    println!(
        "Theme:             {}",
        line(screen.themes.iter().map(|o| marked(o.label, o.selected)).collect())
    );
}
