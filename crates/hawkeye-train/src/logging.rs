use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Message templates of the per-batch log lines.
///
/// The placeholders `{epoch}`, `{batch}`, `{cla}`, `{loc}` and `{total}` are replaced
/// by their values; losses are printed with six decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTemplates {
    /// Both losses are present.
    pub both: String,
    /// Only the classification loss is present.
    pub classification_only: String,
    /// No loss, the optimization step was skipped.
    pub skipped: String,
}

impl Default for LogTemplates {
    fn default() -> Self {
        Self {
            both: "epoch: {epoch}, batch: {batch}, cla loss: {cla}, loc loss: {loc}, total loss: {total}\n"
                .to_string(),
            classification_only:
                "epoch: {epoch}, batch: {batch}, cla loss: {cla}, loc loss: none, total loss: {total}\n"
                    .to_string(),
            skipped: "epoch: {epoch}, batch: {batch}, no anchors to score, step skipped\n"
                .to_string(),
        }
    }
}

/// Fill a template with the values of one batch.
pub fn render(
    template: &str,
    epoch: usize,
    batch: usize,
    cla: Option<f32>,
    loc: Option<f32>,
    total: Option<f32>,
) -> String {
    let fmt = |v: Option<f32>| v.map_or_else(|| "none".to_string(), |v| format!("{v:.6}"));
    template
        .replace("{epoch}", &epoch.to_string())
        .replace("{batch}", &batch.to_string())
        .replace("{cla}", &fmt(cla))
        .replace("{loc}", &fmt(loc))
        .replace("{total}", &fmt(total))
}

/// An append-only text log.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    /// Open `path` for appending, creating it and its parent directories if needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// The log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` verbatim and flush it.
    pub fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()
    }
}
