use chrono::Utc;
use clap::Subcommand;
use dawnlock_core::cache::{Reminder, ReminderKind};
use dawnlock_core::CacheStore;

use super::CliResult;

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Add a task or note
    Add {
        /// Reminder text
        content: String,
        /// task or note
        #[arg(long, default_value = "task")]
        kind: ReminderKind,
    },
    /// List reminders
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove all reminders
    Clear,
}

pub fn run(action: ReminderAction) -> CliResult {
    let store = CacheStore::open_default()?;
    match action {
        ReminderAction::Add { content, kind } => {
            let content = content.trim().to_string();
            if content.is_empty() {
                return Err("reminder text is empty".into());
            }
            let now = Utc::now();
            let record = store.append_reminder(
                Reminder {
                    kind,
                    content,
                    added_at: Some(now),
                },
                now,
            )?;
            println!("{kind} added ({} total)", record.payload.items.len());
        }
        ReminderAction::List { json } => {
            let reminders = store.reminders()?.map(|r| r.payload).unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(&reminders.items)?);
            } else if reminders.items.is_empty() {
                println!("No reminders.");
            } else {
                for (i, r) in reminders.items.iter().enumerate() {
                    println!("{:>3}. [{}] {}", i + 1, r.kind, r.content);
                }
            }
        }
        ReminderAction::Clear => {
            store.clear_reminders(Utc::now())?;
            println!("reminders cleared");
        }
    }
    Ok(())
}
