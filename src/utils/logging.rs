use crate::core::message::{Message, Role};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Plain-text transcript of the conversation, appended as messages land.
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        let is_active = log_file.is_some();
        Self {
            file_path: log_file,
            is_active,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Point the log at `path` and resume logging.
    pub fn set_log_file(&mut self, path: PathBuf) -> io::Result<String> {
        OpenOptions::new().create(true).append(true).open(&path)?;

        let message = format!("Logging enabled to: {}", path.display());
        self.file_path = Some(path);
        self.is_active = true;
        Ok(message)
    }

    pub fn toggle(&mut self) -> Result<String, String> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Logging resumed to: {}", path.display()))
                } else {
                    Ok(format!("Logging paused (file: {})", path.display()))
                }
            }
            None => Err("No log file specified. Use /log <filename> first.".to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn log_message(&self, message: &Message) -> io::Result<()> {
        let Some(path) = self.active_path() else {
            return Ok(());
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        write_entry(&mut writer, message)?;
        writer.flush()
    }

    /// Replace the log contents with the full timeline in one atomic rename.
    pub fn rewrite<'a>(&self, messages: impl IntoIterator<Item = &'a Message>) -> io::Result<()> {
        let Some(path) = self.active_path() else {
            return Ok(());
        };

        let parent = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent)?;
        for message in messages {
            write_entry(&mut temp_file, message)?;
        }
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    pub fn status(&self) -> String {
        let name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", name(path)),
            (Some(path), false) => format!("paused ({})", name(path)),
        }
    }

    fn active_path(&self) -> Option<&Path> {
        if self.is_active {
            self.file_path.as_deref()
        } else {
            None
        }
    }
}

fn write_entry(writer: &mut impl Write, message: &Message) -> io::Result<()> {
    let prefix = match message.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    for line in format!("{prefix}: {}", message.content).lines() {
        writeln!(writer, "{line}")?;
    }
    for source in message.sources() {
        match source.page {
            Some(page) => writeln!(writer, "  [{} p.{page}]", source.filename)?,
            None => writeln!(writer, "  [{}]", source.filename)?,
        }
    }
    writeln!(writer)
}
