use crate::export::ExportedFile;
use anyhow::{anyhow, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

// Clipboard worker channel, started on first copy.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Export timestamp as local wall-clock time, falling back to UTC when the
/// local offset cannot be determined.
pub fn local_time(exported_at: &str) -> String {
    let Ok(utc) = OffsetDateTime::parse(exported_at, &Rfc3339) else {
        return exported_at.to_string();
    };
    let (dt, zone) = match UtcOffset::current_local_offset() {
        Ok(offset) => (utc.to_offset(offset), ""),
        Err(_) => (utc, " UTC"),
    };
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    match dt.format(fmt) {
        Ok(s) => format!("{s}{zone}"),
        Err(_) => exported_at.to_string(),
    }
}

/// Status line after files were written.
pub fn exported_message(files: &[ExportedFile]) -> String {
    match files {
        [] => "Nothing to save.".to_string(),
        [one] => format!(
            "Saved {} at {} (press 'y' to copy path)",
            one.path.display(),
            local_time(&one.exported_at)
        ),
        many => format!(
            "Saved {} files, last {} (press 'y' to copy path)",
            many.len(),
            many[many.len() - 1].path.display()
        ),
    }
}

/// Start the clipboard worker if needed. Each clipboard instance is kept
/// alive for a while so clipboard managers on Linux can read it.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });
        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unparseable_timestamp_is_shown_verbatim() {
        assert_eq!(local_time("yesterday"), "yesterday");
        assert!(local_time("2024-05-01T10:00:00Z").starts_with("2024-"));
    }

    #[test]
    fn message_mentions_the_single_saved_path() {
        let file = ExportedFile {
            path: PathBuf::from("/tmp/ml_data_app_results.csv"),
            bytes: 10,
            content_type: "text/csv",
            exported_at: "2024-05-01T10:00:00Z".into(),
        };
        assert!(exported_message(&[file]).contains("ml_data_app_results.csv"));
        assert_eq!(exported_message(&[]), "Nothing to save.");
    }
}
