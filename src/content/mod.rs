//! Read-only study content, loaded once at startup.

pub mod media;
pub mod models;

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{error::ContentError, settings::ContentPaths};

pub use media::{video_metadata, Orientation, VideoMetadata};
pub use models::{
    AnswerKey, Caption, ComparisonItem, ControlScores, Definitions, IntensityChangeItem,
    MediaFields, QuestionTemplate, QuestionTemplates, QuizPart, QuizPartKind, QuizSample,
    StudyContent, SubQuestion, VideoRatingItem,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    intro_video: PathBuf,
    instructions: Map<String, Value>,
    quiz: Vec<QuizPart>,
    study: StudyContent,
    questions: QuestionTemplates,
    definitions: HashMap<String, String>,
}

impl ContentStore {
    /// Loads all five documents and probes every referenced video.
    ///
    /// A missing document or intro video is fatal. Missing item videos only
    /// fall back to default metadata.
    pub fn load(paths: &ContentPaths) -> Result<Self, ContentError> {
        let instructions: Map<String, Value> = read_json(&paths.resolve(&paths.instructions))?;
        let quiz_doc: Map<String, Value> = read_json(&paths.resolve(&paths.quiz))?;
        let mut study: StudyContent = read_json(&paths.resolve(&paths.study))?;
        let questions: QuestionTemplates = read_json(&paths.resolve(&paths.questions))?;
        let definitions: Definitions = read_json(&paths.resolve(&paths.definitions))?;

        let intro_video = paths.resolve(&paths.intro_video);
        if !intro_video.exists() {
            return Err(ContentError::MissingFile(intro_video));
        }

        let quiz_path = paths.resolve(&paths.quiz);
        let mut quiz = Vec::with_capacity(quiz_doc.len());
        for (name, samples) in quiz_doc {
            let samples: Vec<QuizSample> =
                serde_json::from_value(samples).map_err(|source| ContentError::Parse {
                    path: quiz_path.clone(),
                    source,
                })?;
            quiz.push(QuizPart {
                kind: QuizPartKind::from_part_name(&name),
                name,
                samples,
            });
        }

        for item in &mut study.part1_ratings {
            attach_metadata(paths, &mut item.media);
        }
        for item in &mut study.part2_intensity_change {
            attach_metadata(paths, &mut item.media);
        }
        for item in &mut study.part3_comparisons {
            attach_metadata(paths, &mut item.media);
        }
        for part in &mut quiz {
            for sample in &mut part.samples {
                attach_metadata(paths, &mut sample.media);
            }
        }

        crate::log_info!(
            "Loaded study content: {} quiz parts, {} rating videos, {} intensity changes, {} comparisons",
            quiz.len(),
            study.part1_ratings.len(),
            study.part2_intensity_change.len(),
            study.part3_comparisons.len()
        );

        Ok(Self {
            root: paths.content_dir.clone(),
            intro_video,
            instructions,
            quiz,
            study,
            questions,
            definitions: flatten_definitions(definitions),
        })
    }

    pub fn intro_video(&self) -> &Path {
        &self.intro_video
    }

    pub fn instructions(&self, key: &str) -> Option<&Value> {
        self.instructions.get(key)
    }

    pub fn quiz_parts(&self) -> &[QuizPart] {
        &self.quiz
    }

    pub fn quiz_part(&self, index: usize) -> Option<&QuizPart> {
        self.quiz.get(index)
    }

    pub fn quiz_sample(&self, part: usize, sample: usize) -> Option<&QuizSample> {
        self.quiz.get(part).and_then(|p| p.samples.get(sample))
    }

    pub fn total_scorable_questions(&self) -> usize {
        self.quiz.iter().map(QuizPart::scorable_questions).sum()
    }

    pub fn rating_videos(&self) -> &[VideoRatingItem] {
        &self.study.part1_ratings
    }

    pub fn intensity_changes(&self) -> &[IntensityChangeItem] {
        &self.study.part2_intensity_change
    }

    pub fn comparisons(&self) -> &[ComparisonItem] {
        &self.study.part3_comparisons
    }

    pub fn questions(&self) -> &QuestionTemplates {
        &self.questions
    }

    /// Glossary lookup across tones, writing styles and applications.
    pub fn definition(&self, term: &str) -> Option<&str> {
        self.definitions.get(term).map(String::as_str)
    }

    /// Resolves a content-relative media path for the presentation layer.
    pub fn media_path(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.root.join(relative)
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    if !path.exists() {
        return Err(ContentError::MissingFile(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn attach_metadata(paths: &ContentPaths, media: &mut MediaFields) {
    let path = paths.resolve(&media.video_path);
    media.metadata = if path.exists() {
        video_metadata(&path)
    } else {
        crate::log_debug!("Video {} missing; using default metadata", path.display());
        VideoMetadata::default()
    };
}

/// Later categories overwrite earlier ones on a shared term.
fn flatten_definitions(definitions: Definitions) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    flat.extend(definitions.tones);
    flat.extend(definitions.writing_styles);
    flat.extend(definitions.applications);
    flat
}
