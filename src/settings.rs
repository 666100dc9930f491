use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const SETTINGS_ENV: &str = "ROADTONES_SETTINGS";
pub const DEBUG_ENV: &str = "ROADTONES_DEBUG";

/// Locations of the content documents the study is built from, relative to
/// `content_dir` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentPaths {
    pub content_dir: PathBuf,
    pub instructions: PathBuf,
    pub quiz: PathBuf,
    pub study: PathBuf,
    pub questions: PathBuf,
    pub definitions: PathBuf,
    pub intro_video: PathBuf,
}

impl Default for ContentPaths {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("."),
            instructions: PathBuf::from("instructions.json"),
            quiz: PathBuf::from("quiz_data.json"),
            study: PathBuf::from("study_data.json"),
            questions: PathBuf::from("questions.json"),
            definitions: PathBuf::from("definitions.json"),
            intro_video: PathBuf::from("media/start_video_slower.mp4"),
        }
    }
}

impl ContentPaths {
    pub fn rooted_at(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            ..Self::default()
        }
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.content_dir.join(relative)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StudySettings {
    pub content: ContentPaths,
    /// SQLite file backing the primary response sheet.
    pub responses_db: PathBuf,
    /// Line-delimited JSON file used when the sheet cannot be written.
    pub backup_file: PathBuf,
    /// Pause between words while the video summary is revealed.
    pub summary_word_delay_ms: u64,
    pub allow_debug_skip: bool,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            content: ContentPaths::default(),
            responses_db: PathBuf::from("responses.sqlite3"),
            backup_file: PathBuf::from("responses_backup.jsonl"),
            summary_word_delay_ms: 80,
            allow_debug_skip: false,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<StudySettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data: StudySettings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            StudySettings::default()
        };

        let debug_mode = std::env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            data.allow_debug_skip = true;
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Settings path from `ROADTONES_SETTINGS`, falling back to `settings.json`
    /// in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> StudySettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
