//! Shapes of the JSON content documents.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::media::VideoMetadata;

/// Trait scores keyed by trait name, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlScores {
    #[serde(default)]
    pub tone: Map<String, Value>,
    #[serde(default)]
    pub writing_style: Map<String, Value>,
}

impl ControlScores {
    pub fn tone_traits(&self) -> Vec<&str> {
        self.tone.keys().map(String::as_str).collect()
    }

    pub fn style_traits(&self) -> Vec<&str> {
        self.writing_style.keys().map(String::as_str).collect()
    }
}

/// Everything needed to run the watch/summary/comprehension gate.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFields {
    pub video_path: PathBuf,
    #[serde(default)]
    pub video_summary: Option<String>,
    pub road_event_answer: String,
    #[serde(default)]
    pub distractor_answers: Vec<String>,
    #[serde(skip)]
    pub metadata: VideoMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Caption {
    pub caption_id: String,
    pub text: String,
    #[serde(default)]
    pub control_scores: ControlScores,
    #[serde(default)]
    pub application: Option<String>,
}

/// Study part 1: one video rated once per caption.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRatingItem {
    pub video_id: String,
    #[serde(flatten)]
    pub media: MediaFields,
    pub captions: Vec<Caption>,
}

/// Study part 2: a caption pair where one trait's intensity was changed.
#[derive(Debug, Clone, Deserialize)]
pub struct IntensityChangeItem {
    pub change_id: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(flatten)]
    pub media: MediaFields,
    /// Single entry: trait kind (`tone` / `writing_style`) to trait name.
    pub field_to_change: Map<String, Value>,
    pub change_type: String,
    #[serde(rename = "caption_A")]
    pub caption_a: String,
    #[serde(rename = "caption_B")]
    pub caption_b: String,
}

/// Study part 3: two captions compared side by side.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonItem {
    pub comparison_id: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(flatten)]
    pub media: MediaFields,
    #[serde(default)]
    pub control_scores: ControlScores,
    #[serde(rename = "caption_A")]
    pub caption_a: String,
    #[serde(rename = "caption_B")]
    pub caption_b: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudyContent {
    pub part1_ratings: Vec<VideoRatingItem>,
    pub part2_intensity_change: Vec<IntensityChangeItem>,
    pub part3_comparisons: Vec<ComparisonItem>,
}

/// A correct answer is either one option or a set of options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerKey {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: AnswerKey,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizSample {
    #[serde(default)]
    pub sample_id: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(flatten)]
    pub media: MediaFields,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<AnswerKey>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, rename = "caption_A")]
    pub caption_a: Option<String>,
    #[serde(default, rename = "caption_B")]
    pub caption_b: Option<String>,
    #[serde(default)]
    pub tone_to_compare: Option<String>,
    #[serde(default)]
    pub comparison_type: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    /// Caption-quality samples ask several questions about one caption.
    #[serde(default)]
    pub questions: Vec<SubQuestion>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuizPartKind {
    ToneIdentification,
    ToneControllability,
    CaptionQuality,
}

impl QuizPartKind {
    pub fn from_part_name(name: &str) -> Self {
        if name.contains("Caption Quality") {
            QuizPartKind::CaptionQuality
        } else if name.contains("Tone Controllability") {
            QuizPartKind::ToneControllability
        } else {
            QuizPartKind::ToneIdentification
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizPart {
    pub name: String,
    pub kind: QuizPartKind,
    pub samples: Vec<QuizSample>,
}

impl QuizPart {
    /// Number of graded questions this part contributes to the score.
    pub fn scorable_questions(&self) -> usize {
        match self.kind {
            QuizPartKind::CaptionQuality => self.samples.iter().map(|s| s.questions.len()).sum(),
            _ => self.samples.len(),
        }
    }

    /// Graded questions asked for one sample. Caption-quality samples without
    /// sub-questions ask nothing and are skipped.
    pub fn sub_questions(&self, sample: usize) -> usize {
        match (self.kind, self.samples.get(sample)) {
            (_, None) => 0,
            (QuizPartKind::CaptionQuality, Some(s)) => s.questions.len(),
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StyleOverride {
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionTemplate {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub default_text: Option<String>,
    #[serde(default)]
    pub default_options: Option<Vec<String>>,
    #[serde(default)]
    pub overrides: HashMap<String, StyleOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionTemplates {
    pub part1_questions: Vec<QuestionTemplate>,
    /// Keyed by trait kind label (`Tone`, `Writing Style`).
    pub part2_questions: HashMap<String, String>,
    pub part3_questions: Vec<QuestionTemplate>,
}

impl QuestionTemplates {
    pub fn part1(&self, id: &str) -> Option<&QuestionTemplate> {
        self.part1_questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub tones: HashMap<String, String>,
    #[serde(default)]
    pub writing_styles: HashMap<String, String>,
    #[serde(default)]
    pub applications: HashMap<String, String>,
}
