//! Read-only snapshot of what the presentation layer should render.

use std::{collections::BTreeMap, path::PathBuf};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{
    item::{CaptionView, CurrentItem},
    questions::{Question, Reveal},
    quiz::{self, PASSING_SCORE},
    validation::answer_options,
};
use crate::{
    content::{ContentStore, Orientation},
    models::{
        participant::{GENDER_OPTIONS, MAX_AGE, MIN_AGE},
        Participant,
    },
    session::{
        ComprehensionResult, ItemKey, ItemStep, ItemViewState, Page, QuizCursor, SessionState,
        StudyCursor, StudyPart,
    },
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub session_id: Uuid,
    pub page: Page,
    pub participant: Option<Participant>,
    pub body: PageBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageBody {
    #[serde(rename_all = "camelCase")]
    Demographics {
        age_options: Vec<u8>,
        gender_options: Vec<&'static str>,
        debug_skip_available: bool,
    },
    #[serde(rename_all = "camelCase")]
    IntroVideo { video: PathBuf },
    #[serde(rename_all = "camelCase")]
    Tutorial {
        instructions: Option<Value>,
        can_go_back: bool,
        next_label: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Quiz {
        sections: Vec<String>,
        position: QuizCursor,
        item: ItemView,
    },
    #[serde(rename_all = "camelCase")]
    QuizResults {
        score: u32,
        total: usize,
        passing_score: u32,
        passed: bool,
        /// "Passed" or "Failed", as shown to the participant.
        status: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Study {
        sections: Vec<StudySection>,
        position: StudyCursor,
        item: ItemView,
    },
    FinalThankYou,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySection {
    pub number: usize,
    pub title: &'static str,
    /// Item ids offered in the jump list of the current part.
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub path: PathBuf,
    pub orientation: Orientation,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub text: String,
    /// Reveal word by word; false once it has been shown.
    pub animate: bool,
    pub word_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionView {
    pub question: &'static str,
    pub options: Vec<String>,
    pub result: Option<ComprehensionResult>,
    /// Revealed only with the result.
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryEntry {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizFeedbackView {
    pub chosen: Vec<String>,
    pub correct: bool,
    pub correct_answer: Vec<String>,
    pub explanation: Option<String>,
    pub next_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub key: ItemKey,
    pub title: String,
    pub video: VideoView,
    pub step: ItemStep,
    pub step_number: usize,
    pub watch_complete: bool,
    pub summary: Option<SummaryView>,
    pub comprehension: Option<ComprehensionView>,
    pub captions: Vec<CaptionView>,
    pub questions: Vec<Question>,
    pub reveal: Option<Reveal>,
    pub answers: BTreeMap<String, String>,
    pub can_submit: bool,
    pub reference: Vec<GlossaryEntry>,
    pub quiz_feedback: Option<QuizFeedbackView>,
    pub question_error: Option<String>,
}

const COMPREHENSION_QUESTION: &str =
    "Based on the video and summary, describe what is happening in the video";

pub(crate) fn item_view(
    content: &ContentStore,
    word_delay_ms: u64,
    item: &CurrentItem<'_>,
    state: &ItemViewState,
) -> ItemView {
    let step = state.step;

    let summary = match (&item.media.video_summary, step.summary_visible()) {
        (Some(text), true) => Some(SummaryView {
            text: text.clone(),
            animate: !state.summary_revealed,
            word_delay_ms,
        }),
        _ => None,
    };

    let comprehension = matches!(step, ItemStep::Comprehension | ItemStep::ComprehensionFeedback)
        .then(|| ComprehensionView {
            question: COMPREHENSION_QUESTION,
            options: state.comprehension_options.clone(),
            result: state.comprehension_result.clone(),
            correct_answer: state
                .comprehension_result
                .as_ref()
                .map(|_| item.media.road_event_answer.clone()),
        });

    let mut questions = Vec::new();
    let mut reveal = None;
    let mut reference = Vec::new();
    let mut question_error = None;
    let mut can_submit = false;
    if let ItemStep::Questions { revealed } = step {
        match &item.questions {
            Ok(set) => {
                questions = set.questions.iter().take(revealed).cloned().collect();
                reveal = Some(set.reveal);
                reference = set
                    .terms
                    .iter()
                    .filter_map(|term| {
                        content.definition(term).map(|definition| GlossaryEntry {
                            term: term.clone(),
                            definition: definition.to_string(),
                        })
                    })
                    .collect();
                can_submit = match &item.grading {
                    Some(_) => state.quiz_feedback.is_none(),
                    None => set
                        .questions
                        .iter()
                        .all(|q| state.interacted_questions.contains(&q.id)),
                };
            }
            Err(message) => question_error = Some(message.clone()),
        }
    }

    let quiz_feedback = match (&state.quiz_feedback, &item.grading) {
        (Some(feedback), Some(grading)) => Some(QuizFeedbackView {
            chosen: feedback.chosen.clone(),
            correct: feedback.correct,
            correct_answer: answer_options(&grading.answer),
            explanation: grading.explanation.clone(),
            next_label: grading.next_label,
        }),
        _ => None,
    };

    ItemView {
        key: item.key,
        title: item.title.clone(),
        video: VideoView {
            path: content.media_path(&item.media.video_path),
            orientation: item.media.metadata.orientation,
            duration_secs: item.media.metadata.duration_secs,
        },
        step,
        step_number: step.number(),
        watch_complete: state.watch_complete,
        summary,
        comprehension,
        captions: if step.content_visible() {
            item.captions.clone()
        } else {
            Vec::new()
        },
        questions,
        reveal,
        answers: state.answers.clone(),
        can_submit,
        reference,
        quiz_feedback,
        question_error,
    }
}

fn study_sections(content: &ContentStore, current: StudyPart) -> Vec<StudySection> {
    StudyPart::ALL
        .iter()
        .map(|part| StudySection {
            number: part.number(),
            title: part.title(),
            items: if *part == current {
                match part {
                    StudyPart::Ratings => content
                        .rating_videos()
                        .iter()
                        .map(|v| v.video_id.clone())
                        .collect(),
                    StudyPart::IntensityChange => content
                        .intensity_changes()
                        .iter()
                        .map(|c| c.change_id.clone())
                        .collect(),
                    StudyPart::Comparison => content
                        .comparisons()
                        .iter()
                        .map(|c| c.comparison_id.clone())
                        .collect(),
                }
            } else {
                Vec::new()
            },
        })
        .collect()
}

/// Builds the view for pages without a current item. Item pages go through
/// `item_page`.
pub(crate) fn page_body(
    content: &ContentStore,
    state: &SessionState,
    debug_skip_available: bool,
) -> Option<PageBody> {
    let body = match state.page {
        Page::Demographics => PageBody::Demographics {
            age_options: (MIN_AGE..=MAX_AGE).collect(),
            gender_options: GENDER_OPTIONS.to_vec(),
            debug_skip_available,
        },
        Page::IntroVideo => PageBody::IntroVideo {
            video: content.intro_video().to_path_buf(),
        },
        Page::WhatIsTone => PageBody::Tutorial {
            instructions: content.instructions(state.page.as_str()).cloned(),
            can_go_back: true,
            next_label: "Next",
        },
        Page::FactualInfo => PageBody::Tutorial {
            instructions: content.instructions(state.page.as_str()).cloned(),
            can_go_back: true,
            next_label: "Start Quiz",
        },
        Page::QuizResults => PageBody::QuizResults {
            score: state.score,
            total: content.total_scorable_questions(),
            passing_score: PASSING_SCORE,
            passed: quiz::passed(state.score),
            status: if quiz::passed(state.score) {
                "Passed"
            } else {
                "Failed"
            },
        },
        Page::FinalThankYou => PageBody::FinalThankYou,
        Page::Quiz | Page::UserStudyMain => return None,
    };
    Some(body)
}

pub(crate) fn item_page(content: &ContentStore, state: &SessionState, item: ItemView) -> PageBody {
    match state.page {
        Page::Quiz => PageBody::Quiz {
            sections: content.quiz_parts().iter().map(|p| p.name.clone()).collect(),
            position: state.quiz,
            item,
        },
        _ => PageBody::Study {
            sections: study_sections(content, state.study.part),
            position: state.study,
            item,
        },
    }
}

pub(crate) fn wizard_view(state: &SessionState, body: PageBody) -> WizardView {
    WizardView {
        session_id: state.session_id,
        page: state.page,
        participant: state.participant.clone(),
        body,
    }
}
