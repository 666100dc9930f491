//! The content item under the cursor, resolved against the content store.

use serde::Serialize;

use super::questions::QuestionSet;
use crate::{
    content::{AnswerKey, MediaFields},
    error::StudyError,
    models::StudyPhase,
    session::{ItemKey, ItemStep, MediaId, WatchedSet},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionView {
    pub label: &'static str,
    pub text: String,
}

impl CaptionView {
    pub fn single(text: &str) -> Vec<CaptionView> {
        vec![CaptionView {
            label: "Caption",
            text: text.to_string(),
        }]
    }

    pub fn pair(a: &str, b: &str) -> Vec<CaptionView> {
        vec![
            CaptionView {
                label: "Caption A",
                text: a.to_string(),
            },
            CaptionView {
                label: "Caption B",
                text: b.to_string(),
            },
        ]
    }
}

/// Identifiers written alongside every answer for this item.
#[derive(Debug, Clone, Copy)]
pub struct RecordTarget<'a> {
    pub phase: StudyPhase,
    pub video_id: Option<&'a str>,
    pub sample_id: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct QuizGrading {
    pub answer: AnswerKey,
    pub explanation: Option<String>,
    pub recorded_text: String,
    pub multi: bool,
    pub options: Vec<String>,
    /// "Finish Quiz" on the very last question, "Next Question" otherwise.
    pub next_label: &'static str,
}

pub struct CurrentItem<'a> {
    pub key: ItemKey,
    pub title: String,
    pub media: &'a MediaFields,
    pub media_id: Option<MediaId>,
    pub captions: Vec<CaptionView>,
    /// Step a fresh view state starts at.
    pub entry: ItemStep,
    pub target: RecordTarget<'a>,
    /// Deferred so a malformed template only blocks the question step.
    pub questions: Result<QuestionSet, String>,
    pub grading: Option<QuizGrading>,
}

impl<'a> CurrentItem<'a> {
    pub fn question_set(&self) -> Result<&QuestionSet, StudyError> {
        self.questions
            .as_ref()
            .map_err(|message| StudyError::Content(message.clone()))
    }

    pub fn grading(&self) -> Result<&QuizGrading, StudyError> {
        match (&self.grading, &self.questions) {
            (Some(grading), _) => Ok(grading),
            (None, Err(message)) => Err(StudyError::Content(message.clone())),
            (None, Ok(_)) => Err(StudyError::Content(format!(
                "{:?} is not a graded item",
                self.key
            ))),
        }
    }

    /// Comprehension options: distractors followed by the correct answer.
    /// Shuffled by the caller once per view state.
    pub fn comprehension_options(&self) -> Vec<String> {
        let mut options = self.media.distractor_answers.clone();
        options.push(self.media.road_event_answer.clone());
        options
    }
}

/// Keeps the message of a content error for `CurrentItem::questions`.
pub fn deferred(err: StudyError) -> String {
    match err {
        StudyError::Content(message) => message,
        other => other.to_string(),
    }
}

/// Media already passed through comprehension skip straight to the content.
pub fn gate_or_skip(media_id: Option<&MediaId>, watched: &WatchedSet) -> ItemStep {
    match media_id {
        Some(id) if watched.contains(id) => ItemStep::Content,
        _ => ItemStep::Watching,
    }
}
