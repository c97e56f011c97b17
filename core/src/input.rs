use crate::error::{GhostlinkError, Result};
use log::{error, warn};
use std::fs;
use std::path::{Path, PathBuf};

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "log"];

/// Where payloads come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A literal message
    Text(String),
    /// One file, encoded as raw bytes
    File(PathBuf),
    /// Every text file directly inside a directory
    Dir(PathBuf),
}

/// One payload ready for encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    /// Used for output naming and the dedup record's input reference
    pub name_hint: String,
    pub bytes: Vec<u8>,
}

impl InputSource {
    pub fn mode(&self) -> &'static str {
        match self {
            InputSource::Text(_) => "text",
            InputSource::File(_) => "file",
            InputSource::Dir(_) => "dir",
        }
    }

    /// An explicit output filename only makes sense for a single payload
    pub fn allows_out_name(&self) -> bool {
        !matches!(self, InputSource::Dir(_))
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            InputSource::Text(_) => Ok(()),
            InputSource::File(path) | InputSource::Dir(path) => {
                if path.exists() {
                    Ok(())
                } else {
                    Err(GhostlinkError::Configuration(format!(
                        "input path does not exist: {}",
                        path.display()
                    )))
                }
            }
        }
    }

    /// Collect payloads, skipping (and logging) anything unreadable
    pub fn items(&self) -> Vec<InputItem> {
        match self {
            InputSource::Text(text) => vec![InputItem {
                name_hint: "msg".to_string(),
                bytes: text.as_bytes().to_vec(),
            }],
            InputSource::File(path) => read_item(path).into_iter().collect(),
            InputSource::Dir(dir) => {
                let files = match list_text_files(dir) {
                    Ok(files) => files,
                    Err(e) => {
                        error!("Failed to list directory '{}': {}", dir.display(), e);
                        return Vec::new();
                    }
                };
                if files.is_empty() {
                    warn!("No text files found to encode in {}", dir.display());
                }
                files.iter().filter_map(|path| read_item(path)).collect()
            }
        }
    }
}

fn read_item(path: &Path) -> Option<InputItem> {
    match read_input_file(path) {
        Ok(bytes) => Some(InputItem {
            name_hint: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes,
        }),
        Err(e) => {
            error!("Skipping '{}': {}", path.display(), e);
            None
        }
    }
}

/// Read a file as bytes; invalid UTF-8 is encoded anyway, with a warning
pub fn read_input_file(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path)?;
    if std::str::from_utf8(&data).is_err() {
        warn!("Input '{}' is not valid UTF-8; encoding raw bytes anyway", path.display());
    }
    Ok(data)
}

/// `.txt`, `.md` and `.log` files directly inside `dir`, sorted by path
pub fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)));
        if path.is_file() && is_text {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
