#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use roadtones_lib::{
    content::{AnswerKey, ContentStore},
    models::{DemographicsForm, ResponseEvent},
    recorder::ResponseChannel,
    session::{ItemStep, QuizCursor},
    settings::{ContentPaths, StudySettings},
    wizard::{questions::quiz_question, ItemView, PageBody, Selection, StudyController, WizardView},
};

pub fn content_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/content")
}

pub fn content() -> Arc<ContentStore> {
    Arc::new(ContentStore::load(&ContentPaths::rooted_at(content_dir())).unwrap())
}

/// Settings reading the fixture content and writing responses under `dir`.
pub fn settings(dir: &Path) -> StudySettings {
    StudySettings {
        content: ContentPaths::rooted_at(content_dir()),
        responses_db: dir.join("responses.sqlite3"),
        backup_file: dir.join("responses_backup.jsonl"),
        summary_word_delay_ms: 0,
        allow_debug_skip: true,
    }
}

/// Response channel that can be taken offline.
#[derive(Default)]
pub struct FlakyChannel {
    events: Mutex<Vec<ResponseEvent>>,
    offline: AtomicBool,
}

impl FlakyChannel {
    pub fn offline() -> Self {
        let channel = Self::default();
        channel.set_offline(true);
        channel
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ResponseEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseChannel for FlakyChannel {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn append(&self, events: &[ResponseEvent]) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

pub fn item_of(view: &WizardView) -> &ItemView {
    match &view.body {
        PageBody::Quiz { item, .. } | PageBody::Study { item, .. } => item,
        other => panic!("no item on {other:?}"),
    }
}

pub async fn register(controller: &StudyController) -> WizardView {
    controller
        .submit_demographics(DemographicsForm {
            email: Some("a@b.com".into()),
            age: Some(25),
            gender: Some("Other / Prefer not to say".into()),
            consent: Some(true),
        })
        .await
        .unwrap()
}

/// Demographics plus the three tutorial pages.
pub async fn reach_quiz(controller: &StudyController) -> WizardView {
    register(controller).await;
    for _ in 0..2 {
        controller.next_page().await.unwrap();
    }
    controller.next_page().await.unwrap()
}

/// Takes the current item through whatever gate steps remain.
pub async fn open_questions(controller: &StudyController) {
    loop {
        let view = controller.snapshot().await.unwrap();
        let item = item_of(&view);
        let choice = item
            .comprehension
            .as_ref()
            .and_then(|comprehension| comprehension.options.first().cloned());
        let result = match item.step {
            ItemStep::Watching if !item.watch_complete => controller.watch_video().await,
            ItemStep::Watching => controller.proceed_to_summary().await,
            ItemStep::Summary => controller.proceed_to_comprehension().await,
            ItemStep::Comprehension => controller.submit_comprehension(choice).await,
            ItemStep::ComprehensionFeedback => controller.proceed_to_content().await,
            ItemStep::Content => controller.show_questions().await,
            ItemStep::Questions { .. } => return,
        };
        result.unwrap();
    }
}

fn selection_for(content: &ContentStore, cursor: QuizCursor, correct: bool) -> Selection {
    let part = content.quiz_part(cursor.part).unwrap();
    let question = quiz_question(part, &part.samples[cursor.item], cursor.sub_question).unwrap();
    let options = question.question.options;
    match (question.answer, correct) {
        (AnswerKey::One(answer), true) => Selection::Single(answer),
        (AnswerKey::One(answer), false) => {
            Selection::Single(options.into_iter().find(|o| *o != answer).unwrap())
        }
        (AnswerKey::Many(answers), true) => Selection::Multi(answers),
        (AnswerKey::Many(answers), false) => Selection::Multi(
            options
                .into_iter()
                .filter(|o| !answers.contains(o))
                .take(2)
                .collect(),
        ),
    }
}

/// Answers every quiz question; `correct[i]` decides question `i`.
pub async fn take_quiz(
    controller: &StudyController,
    content: &ContentStore,
    correct: &[bool],
) -> WizardView {
    let mut view = controller.snapshot().await.unwrap();
    for answer_correctly in correct {
        open_questions(controller).await;
        let cursor = controller.state().await.quiz;
        controller
            .submit_quiz_answer(Some(selection_for(content, cursor, *answer_correctly)))
            .await
            .unwrap();
        view = controller.next_quiz_question().await.unwrap();
    }
    view
}

/// Answers every question of the current study item with its first option.
pub async fn answer_everything(controller: &StudyController) {
    loop {
        let view = controller.snapshot().await.unwrap();
        let item = item_of(&view);
        let Some(question) = item
            .questions
            .iter()
            .find(|q| !item.answers.contains_key(&q.id))
        else {
            return;
        };
        controller
            .answer_question(question.id.clone(), question.options[0].clone())
            .await
            .unwrap();
    }
}
