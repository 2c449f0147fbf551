//! Terminal rendering of reconciled history

use std::io::{self, Write};

use chrono::{Local, TimeZone};
use clippy_core::{ChatEntry, Message, MessageKind, Origin, Priority, Reconciler, Transition};
use colored::Colorize;

/// Erase the current terminal line and return the cursor to column 0
const CLEAR_LINE: &str = "\r\x1b[2K";

/// `HH:MM:SS` in local time
pub fn format_time(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Uncolored body of a history row
pub fn entry_text(message: &Message) -> String {
    match &message.kind {
        MessageKind::Typing { .. } if message.text.is_empty() => "typing…".to_string(),
        MessageKind::Typing { .. } => format!("{}…", message.text),
        MessageKind::Message {
            priority: Some(Priority::High),
        } => format!("! {}", message.text),
        MessageKind::Command { .. } | MessageKind::Error { .. } => {
            format!("{}  ({})", message.text, message.detail())
        }
        _ => message.text.clone(),
    }
}

fn colored_text(message: &Message) -> String {
    let text = entry_text(message);
    match &message.kind {
        MessageKind::Typing { .. } => text.dimmed().italic().to_string(),
        MessageKind::Command { .. } => text.yellow().to_string(),
        MessageKind::Error { .. } => text.red().to_string(),
        MessageKind::Message {
            priority: Some(Priority::High),
        } => text.bold().to_string(),
        MessageKind::Message {
            priority: Some(Priority::Low),
        } => text.dimmed().to_string(),
        _ => text,
    }
}

/// One finalized row, prefixed with its time and sender
pub fn print_entry(entry: &ChatEntry) {
    let who = match entry.origin {
        Origin::Local => "You:".cyan().bold(),
        Origin::Remote => "Web:".green().bold(),
    };
    println!(
        "{} {} {}",
        format_time(Some(entry.timestamp)).dimmed(),
        who,
        colored_text(&entry.message)
    );
}

/// A message this client just published, with the relay's delivery count
pub fn print_sent(message: &Message, connections: usize) {
    println!(
        "{} {} {} {}",
        format_time(message.timestamp).dimmed(),
        "You:".cyan().bold(),
        colored_text(message),
        format!("({})", delivered(connections)).dimmed()
    );
}

/// Human wording of a publish acknowledgement
pub fn delivered(connections: usize) -> String {
    match connections {
        0 => "no browser connected".to_string(),
        1 => "delivered to 1 browser".to_string(),
        n => format!("delivered to {} browsers", n),
    }
}

/// Print what `transition` changed in `reconciler`
///
/// Finalized rows are printed once. The in-flight typing row is kept on a
/// single line that is rewritten in place until it is replaced or cleared.
pub fn show_transition(reconciler: &Reconciler, transition: Transition) -> io::Result<()> {
    let mut stdout = io::stdout();

    match transition {
        Transition::StatusOnly => {
            print!("{}", CLEAR_LINE);
            println!("{}", reconciler.status().to_string().dimmed());
        }
        Transition::Cleared { removed } => {
            print!("{}", CLEAR_LINE);
            if removed > 0 {
                println!("{}", format!("🧹 Cleared {} entries", removed).dimmed());
            }
        }
        Transition::Appended | Transition::Replaced => {
            let Some(last) = reconciler.history().last() else {
                return Ok(());
            };
            print!("{}", CLEAR_LINE);
            if last.is_typing() {
                print!(
                    "{} {} {}",
                    format_time(last.timestamp).dimmed(),
                    "Web:".green(),
                    colored_text(last)
                );
            } else {
                println!(
                    "{} {} {}",
                    format_time(last.timestamp).dimmed(),
                    "Web:".green().bold(),
                    colored_text(last)
                );
            }
        }
    }

    stdout.flush()
}
