use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ItemStep;
use crate::models::Participant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Demographics,
    IntroVideo,
    WhatIsTone,
    FactualInfo,
    Quiz,
    QuizResults,
    UserStudyMain,
    FinalThankYou,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Demographics => "demographics",
            Page::IntroVideo => "intro_video",
            Page::WhatIsTone => "what_is_tone",
            Page::FactualInfo => "factual_info",
            Page::Quiz => "quiz",
            Page::QuizResults => "quiz_results",
            Page::UserStudyMain => "user_study_main",
            Page::FinalThankYou => "final_thank_you",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum StudyPart {
    Ratings,
    IntensityChange,
    Comparison,
}

impl StudyPart {
    pub const ALL: [StudyPart; 3] = [
        StudyPart::Ratings,
        StudyPart::IntensityChange,
        StudyPart::Comparison,
    ];

    /// 1-based number shown to participants.
    pub fn number(&self) -> usize {
        match self {
            StudyPart::Ratings => 1,
            StudyPart::IntensityChange => 2,
            StudyPart::Comparison => 3,
        }
    }

    pub fn from_number(number: usize) -> Option<Self> {
        Self::ALL.get(number.checked_sub(1)?).copied()
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn title(&self) -> &'static str {
        match self {
            StudyPart::Ratings => "Part 1: Caption Rating",
            StudyPart::IntensityChange => "Part 2: Tone Intensity Change",
            StudyPart::Comparison => "Part 3: Caption Comparison",
        }
    }
}

/// Position inside the quiz: part, sample within the part, sub-question
/// within the sample.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizCursor {
    pub part: usize,
    pub item: usize,
    pub sub_question: usize,
}

/// Position inside the main study. For ratings `sub_question` is the caption
/// index of the current video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudyCursor {
    pub part: StudyPart,
    pub item: usize,
    pub sub_question: usize,
}

impl Default for StudyCursor {
    fn default() -> Self {
        Self {
            part: StudyPart::Ratings,
            item: 0,
            sub_question: 0,
        }
    }
}

/// Identity of one content item visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemKey {
    Quiz {
        part: usize,
        sample: usize,
        sub_question: usize,
    },
    Rating {
        video: usize,
        caption: usize,
    },
    IntensityChange {
        change: usize,
    },
    Comparison {
        comparison: usize,
    },
}

impl ItemKey {
    pub fn is_quiz(&self) -> bool {
        matches!(self, ItemKey::Quiz { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl From<&str> for MediaId {
    fn from(value: &str) -> Self {
        MediaId(value.to_string())
    }
}

/// Media whose comprehension check has been passed this session. Append-only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WatchedSet(HashSet<MediaId>);

impl WatchedSet {
    pub fn insert(&mut self, id: MediaId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionResult {
    pub choice: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizFeedback {
    pub chosen: Vec<String>,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemViewState {
    pub step: ItemStep,
    pub watch_complete: bool,
    pub summary_revealed: bool,
    /// Comprehension options, shuffled once for the item's lifetime.
    pub comprehension_options: Vec<String>,
    pub comprehension_result: Option<ComprehensionResult>,
    pub interacted_questions: BTreeSet<String>,
    pub answers: BTreeMap<String, String>,
    pub quiz_feedback: Option<QuizFeedback>,
}

impl ItemViewState {
    pub fn new(step: ItemStep, comprehension_options: Vec<String>) -> Self {
        let skipped_gate = step != ItemStep::Watching;
        Self {
            step,
            watch_complete: skipped_gate,
            summary_revealed: skipped_gate,
            comprehension_options,
            comprehension_result: None,
            interacted_questions: BTreeSet::new(),
            answers: BTreeMap::new(),
            quiz_feedback: None,
        }
    }

    /// Moves to `next` if the step table allows it.
    pub fn try_advance(&mut self, next: ItemStep) -> bool {
        if self.step.allows(&next) {
            self.step = next;
            true
        } else {
            false
        }
    }
}

/// Everything the wizard knows about one participant's visit.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub page: Page,
    pub participant: Option<Participant>,
    pub quiz: QuizCursor,
    pub study: StudyCursor,
    pub score: u32,
    pub watched: WatchedSet,
    pub views: HashMap<ItemKey, ItemViewState>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            page: Page::Demographics,
            participant: None,
            quiz: QuizCursor::default(),
            study: StudyCursor::default(),
            score: 0,
            watched: WatchedSet::default(),
            views: HashMap::new(),
        }
    }

    /// Drops every quiz view state; study view states are untouched.
    pub fn clear_quiz_views(&mut self) {
        self.views.retain(|key, _| !key.is_quiz());
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
