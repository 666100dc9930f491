use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Local;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokio::{sync::Mutex, time};

use super::{
    item::CurrentItem,
    questions::Reveal,
    quiz, study,
    validation::{check_selection, is_correct, Selection},
    view::{self, WizardView},
};
use crate::{
    content::ContentStore,
    error::{StudyError, StudyResult, ValidationError},
    models::{DemographicsForm, Participant, ResponseDraft, ResponseEvent},
    recorder::ResponseRecorder,
    session::{
        ComprehensionResult, ItemKey, ItemStep, ItemViewState, Page, QuizCursor, QuizFeedback,
        SessionState, StudyCursor, StudyPart,
    },
    settings::StudySettings,
};

const ENABLE_LOGS: bool = true;

/// Drives one participant's session. Every operation runs to completion under
/// the session lock, so actions never interleave.
#[derive(Clone)]
pub struct StudyController {
    content: Arc<ContentStore>,
    recorder: ResponseRecorder,
    settings: StudySettings,
    state: Arc<Mutex<SessionState>>,
    rng: Arc<std::sync::Mutex<StdRng>>,
}

fn current_item<'a>(
    action: &'static str,
    content: &'a ContentStore,
    state: &SessionState,
) -> StudyResult<CurrentItem<'a>> {
    match state.page {
        Page::Quiz => quiz::resolve(content, state.quiz, &state.watched),
        Page::UserStudyMain => study::resolve(content, state.study, &state.watched),
        page => Err(StudyError::invalid(action, page, "there is no item on this page")),
    }
}

fn go_to(state: &mut SessionState, page: Page) {
    if state.page != page {
        crate::log_info!(
            "Session {}: {} -> {}",
            state.session_id,
            state.page.as_str(),
            page.as_str()
        );
        state.page = page;
    }
}

fn require_page(action: &'static str, state: &SessionState, page: Page) -> StudyResult<()> {
    if state.page == page {
        Ok(())
    } else {
        Err(StudyError::invalid(
            action,
            state.page,
            format!("only available on {}", page.as_str()),
        ))
    }
}

fn participant_of(action: &'static str, state: &SessionState) -> StudyResult<Participant> {
    state
        .participant
        .clone()
        .ok_or_else(|| StudyError::invalid(action, state.page, "no participant registered"))
}

impl StudyController {
    pub fn new(content: Arc<ContentStore>, recorder: ResponseRecorder, settings: StudySettings) -> Self {
        Self::with_rng(content, recorder, settings, StdRng::from_entropy())
    }

    /// Deterministic comprehension shuffles, for tests and replays.
    pub fn with_seed(
        content: Arc<ContentStore>,
        recorder: ResponseRecorder,
        settings: StudySettings,
        seed: u64,
    ) -> Self {
        Self::with_rng(content, recorder, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        content: Arc<ContentStore>,
        recorder: ResponseRecorder,
        settings: StudySettings,
        rng: StdRng,
    ) -> Self {
        let state = SessionState::new();
        crate::log_info!("Session {} started", state.session_id);
        Self {
            content,
            recorder,
            settings,
            state: Arc::new(Mutex::new(state)),
            rng: Arc::new(std::sync::Mutex::new(rng)),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn snapshot(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        self.render(&mut state)
    }

    // ---- pages ----

    pub async fn submit_demographics(&self, form: DemographicsForm) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("submit_demographics", &state, Page::Demographics)?;

        let participant = Participant::from_form(&form)?;
        state.participant = Some(participant);
        go_to(&mut state, Page::IntroVideo);
        self.render(&mut state)
    }

    pub async fn debug_skip(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("debug_skip", &state, Page::Demographics)?;
        if !self.settings.allow_debug_skip {
            return Err(StudyError::invalid("debug_skip", state.page, "debug skip is disabled"));
        }

        crate::log_warn!("Session {}: debug skip into the main study", state.session_id);
        state.participant = Some(Participant::debug());
        self.enter_study(&mut state);
        self.render(&mut state)
    }

    pub async fn next_page(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        match state.page {
            Page::IntroVideo => go_to(&mut state, Page::WhatIsTone),
            Page::WhatIsTone => go_to(&mut state, Page::FactualInfo),
            Page::FactualInfo => self.enter_quiz(&mut state),
            page => {
                return Err(StudyError::invalid(
                    "next_page",
                    page,
                    "this page has its own way forward",
                ))
            }
        }
        self.render(&mut state)
    }

    pub async fn previous_page(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        match state.page {
            Page::WhatIsTone => go_to(&mut state, Page::IntroVideo),
            Page::FactualInfo => go_to(&mut state, Page::WhatIsTone),
            page => {
                return Err(StudyError::invalid(
                    "previous_page",
                    page,
                    "only tutorial pages can go back",
                ))
            }
        }
        self.render(&mut state)
    }

    pub async fn proceed_to_study(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("proceed_to_study", &state, Page::QuizResults)?;
        if !quiz::passed(state.score) {
            return Err(StudyError::invalid(
                "proceed_to_study",
                state.page,
                format!("score {} is below {}", state.score, quiz::PASSING_SCORE),
            ));
        }
        self.enter_study(&mut state);
        self.render(&mut state)
    }

    pub async fn restart_quiz(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("restart_quiz", &state, Page::QuizResults)?;
        if quiz::passed(state.score) {
            return Err(StudyError::invalid("restart_quiz", state.page, "the quiz was passed"));
        }

        crate::log_info!(
            "Session {}: restarting quiz after scoring {}",
            state.session_id,
            state.score
        );
        state.score = 0;
        state.quiz = QuizCursor::default();
        state.clear_quiz_views();
        self.enter_quiz(&mut state);
        self.render(&mut state)
    }

    pub async fn jump_to_quiz_part(&self, part: usize) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("jump_to_quiz_part", &state, Page::Quiz)?;
        if part >= self.content.quiz_parts().len() {
            return Err(StudyError::invalid(
                "jump_to_quiz_part",
                state.page,
                format!("quiz part {part} does not exist"),
            ));
        }
        state.quiz = QuizCursor {
            part,
            item: 0,
            sub_question: 0,
        };
        self.enter_quiz(&mut state);
        self.render(&mut state)
    }

    pub async fn jump_to_study_part(&self, number: usize) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("jump_to_study_part", &state, Page::UserStudyMain)?;
        let part = StudyPart::from_number(number).ok_or_else(|| {
            StudyError::invalid(
                "jump_to_study_part",
                state.page,
                format!("study part {number} does not exist"),
            )
        })?;
        state.study = StudyCursor {
            part,
            item: 0,
            sub_question: 0,
        };
        self.enter_study(&mut state);
        self.render(&mut state)
    }

    pub async fn jump_to_study_item(&self, number: usize, item: usize) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("jump_to_study_item", &state, Page::UserStudyMain)?;
        let part = StudyPart::from_number(number)
            .filter(|part| item < study::part_len(&self.content, *part))
            .ok_or_else(|| {
                StudyError::invalid(
                    "jump_to_study_item",
                    state.page,
                    format!("no item {item} in study part {number}"),
                )
            })?;
        state.study = StudyCursor {
            part,
            item,
            sub_question: 0,
        };
        self.enter_study(&mut state);
        self.render(&mut state)
    }

    // ---- item steps ----

    /// Blocks for the video's duration, then unlocks "proceed to summary".
    pub async fn watch_video(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        let page = state.page;
        let item = current_item("watch_video", &self.content, &state)?;
        let view = self.view_entry(&mut state.views, &item);
        if view.step != ItemStep::Watching || view.watch_complete {
            return Err(StudyError::invalid(
                "watch_video",
                page,
                "the video gate is not active",
            ));
        }

        let duration = item.media.metadata.duration_secs;
        time::sleep(Duration::from_secs(duration)).await;
        view.watch_complete = true;
        crate::log_debug!("Watched {:?} for {duration}s", item.key);
        self.render(&mut state)
    }

    pub async fn proceed_to_summary(&self) -> StudyResult<WizardView> {
        self.step_action("proceed_to_summary", |page, view, _item, _state| {
            if view.step != ItemStep::Watching || !view.watch_complete {
                return Err(StudyError::invalid(
                    "proceed_to_summary",
                    page,
                    "the video has not finished playing",
                ));
            }
            view.try_advance(ItemStep::Summary);
            Ok(())
        })
        .await
    }

    /// Marks the summary animation as played so it is shown statically.
    pub async fn mark_summary_revealed(&self) -> StudyResult<WizardView> {
        self.step_action("mark_summary_revealed", |page, view, _item, _state| {
            if !view.step.summary_visible() {
                return Err(StudyError::invalid(
                    "mark_summary_revealed",
                    page,
                    "the summary is not shown yet",
                ));
            }
            view.summary_revealed = true;
            Ok(())
        })
        .await
    }

    pub async fn proceed_to_comprehension(&self) -> StudyResult<WizardView> {
        self.step_action("proceed_to_comprehension", |page, view, _item, _state| {
            if view.step != ItemStep::Summary {
                return Err(StudyError::invalid(
                    "proceed_to_comprehension",
                    page,
                    "the summary step is not active",
                ));
            }
            view.summary_revealed = true;
            view.try_advance(ItemStep::Comprehension);
            Ok(())
        })
        .await
    }

    /// Grades the comprehension answer. Nothing is recorded.
    pub async fn submit_comprehension(&self, choice: Option<String>) -> StudyResult<WizardView> {
        self.step_action("submit_comprehension", |page, view, item, _state| {
            if view.step != ItemStep::Comprehension {
                return Err(StudyError::invalid(
                    "submit_comprehension",
                    page,
                    "the comprehension check is not active",
                ));
            }
            let choice = choice
                .filter(|c| !c.trim().is_empty())
                .ok_or(ValidationError::SelectionRequired)?;
            if !view.comprehension_options.contains(&choice) {
                return Err(ValidationError::UnknownOption(choice).into());
            }

            let correct = choice == item.media.road_event_answer;
            view.comprehension_result = Some(ComprehensionResult { choice, correct });
            view.try_advance(ItemStep::ComprehensionFeedback);
            Ok(())
        })
        .await
    }

    /// Leaves the comprehension feedback and remembers the media as watched.
    pub async fn proceed_to_content(&self) -> StudyResult<WizardView> {
        self.step_action("proceed_to_content", |page, view, item, state| {
            if view.step != ItemStep::ComprehensionFeedback {
                return Err(StudyError::invalid(
                    "proceed_to_content",
                    page,
                    "the comprehension check has not been answered",
                ));
            }
            view.try_advance(ItemStep::Content);
            if let Some(media_id) = &item.media_id {
                if state.watched.insert(media_id.clone()) {
                    crate::log_debug!("Media {} added to watched set", media_id.0);
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn show_questions(&self) -> StudyResult<WizardView> {
        self.step_action("show_questions", |page, view, item, _state| {
            if view.step != ItemStep::Content {
                return Err(StudyError::invalid(
                    "show_questions",
                    page,
                    "the captions are not shown yet",
                ));
            }
            let set = item.question_set()?;
            view.try_advance(ItemStep::Questions {
                revealed: set.initially_revealed(),
            });
            Ok(())
        })
        .await
    }

    /// Records an interaction with one study question. Incremental question
    /// sets reveal the next question once the visible ones are all touched.
    pub async fn answer_question(&self, question_id: String, value: String) -> StudyResult<WizardView> {
        self.step_action("answer_question", |page, view, item, _state| {
            if page != Page::UserStudyMain {
                return Err(StudyError::invalid(
                    "answer_question",
                    page,
                    "quiz questions are answered with submit_quiz_answer",
                ));
            }
            let ItemStep::Questions { revealed } = view.step else {
                return Err(StudyError::invalid(
                    "answer_question",
                    page,
                    "the questions are not shown yet",
                ));
            };
            let set = item.question_set()?;
            let index = set.position(&question_id).ok_or_else(|| {
                StudyError::invalid(
                    "answer_question",
                    page,
                    format!("unknown question '{question_id}'"),
                )
            })?;
            if index >= revealed {
                return Err(ValidationError::QuestionHidden(question_id).into());
            }
            if !set.questions[index].options.contains(&value) {
                return Err(ValidationError::UnknownOption(value).into());
            }

            view.answers.insert(question_id.clone(), value);
            view.interacted_questions.insert(question_id);
            if set.reveal == Reveal::Incremental {
                let next = (view.interacted_questions.len() + 1).min(set.questions.len());
                view.try_advance(ItemStep::Questions { revealed: next });
            }
            Ok(())
        })
        .await
    }

    /// Records every answer of the current study item and moves on. The cursor
    /// only moves once the recorder accepted the answers.
    pub async fn submit_ratings(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("submit_ratings", &state, Page::UserStudyMain)?;
        let participant = participant_of("submit_ratings", &state)?;
        let item = current_item("submit_ratings", &self.content, &state)?;
        let set = item.question_set()?;

        let view = self.view_entry(&mut state.views, &item);
        if !matches!(view.step, ItemStep::Questions { .. }) {
            return Err(StudyError::invalid(
                "submit_ratings",
                Page::UserStudyMain,
                "the questions are not shown yet",
            ));
        }
        let missing: Vec<usize> = set
            .questions
            .iter()
            .filter(|q| !view.interacted_questions.contains(&q.id))
            .map(|q| q.number)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::UnansweredQuestions(missing).into());
        }

        let now = Local::now();
        let events: Vec<ResponseEvent> = set
            .questions
            .iter()
            .map(|q| {
                ResponseEvent::new(
                    &participant,
                    ResponseDraft {
                        phase: item.target.phase,
                        video_id: item.target.video_id,
                        sample_id: item.target.sample_id,
                        question_text: q.text.clone(),
                        user_choice: view.answers.get(&q.id).cloned().unwrap_or_default(),
                        was_correct: None,
                    },
                    now,
                )
            })
            .collect();

        let outcome = self.recorder.record(&events).await?;
        crate::log_info!(
            "Session {}: recorded {} answers for {:?} via {:?}",
            state.session_id,
            events.len(),
            item.key,
            outcome
        );

        state.views.remove(&item.key);
        if study::advance(&self.content, &mut state.study) {
            go_to(&mut state, Page::FinalThankYou);
        }
        self.render(&mut state)
    }

    /// Grades and records a quiz answer, then shows feedback.
    pub async fn submit_quiz_answer(&self, selection: Option<Selection>) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("submit_quiz_answer", &state, Page::Quiz)?;
        let participant = participant_of("submit_quiz_answer", &state)?;
        let item = current_item("submit_quiz_answer", &self.content, &state)?;
        let grading = item.grading()?;

        let view = self.view_entry(&mut state.views, &item);
        if !matches!(view.step, ItemStep::Questions { .. }) {
            return Err(StudyError::invalid(
                "submit_quiz_answer",
                Page::Quiz,
                "the question is not shown yet",
            ));
        }
        if view.quiz_feedback.is_some() {
            return Err(StudyError::invalid(
                "submit_quiz_answer",
                Page::Quiz,
                "this question was already answered",
            ));
        }

        let selection = check_selection(selection.as_ref(), &grading.options, grading.multi)?;
        let correct = is_correct(&selection, &grading.answer);
        let event = ResponseEvent::new(
            &participant,
            ResponseDraft {
                phase: item.target.phase,
                video_id: item.target.video_id,
                sample_id: item.target.sample_id,
                question_text: grading.recorded_text.clone(),
                user_choice: selection.to_cell(),
                was_correct: Some(correct),
            },
            Local::now(),
        );
        self.recorder.record(std::slice::from_ref(&event)).await?;

        if correct {
            state.score += 1;
        }
        if let Some(view) = state.views.get_mut(&item.key) {
            let chosen: Vec<String> = selection.choices().into_iter().map(String::from).collect();
            if let Ok(set) = item.question_set() {
                for question in &set.questions {
                    view.interacted_questions.insert(question.id.clone());
                    view.answers.insert(question.id.clone(), event.user_choice.clone());
                }
            }
            view.quiz_feedback = Some(QuizFeedback { chosen, correct });
        }
        crate::log_info!(
            "Session {}: quiz {:?} answered ({}), score {}",
            state.session_id,
            item.key,
            if correct { "correct" } else { "incorrect" },
            state.score
        );
        self.render(&mut state)
    }

    /// Leaves the feedback of the current quiz question.
    pub async fn next_quiz_question(&self) -> StudyResult<WizardView> {
        let mut state = self.state.lock().await;
        require_page("next_quiz_question", &state, Page::Quiz)?;
        let key = current_item("next_quiz_question", &self.content, &state)?.key;
        let answered = state
            .views
            .get(&key)
            .is_some_and(|view| view.quiz_feedback.is_some());
        if !answered {
            return Err(StudyError::invalid(
                "next_quiz_question",
                Page::Quiz,
                "answer the current question first",
            ));
        }

        state.views.remove(&key);
        if quiz::advance(&self.content, &mut state.quiz) {
            crate::log_info!(
                "Session {}: quiz finished with {} / {}",
                state.session_id,
                state.score,
                self.content.total_scorable_questions()
            );
            go_to(&mut state, Page::QuizResults);
        }
        self.render(&mut state)
    }

    // ---- internals ----

    fn enter_quiz(&self, state: &mut SessionState) {
        if quiz::normalize(&self.content, &mut state.quiz) {
            go_to(state, Page::QuizResults);
        } else {
            go_to(state, Page::Quiz);
        }
    }

    fn enter_study(&self, state: &mut SessionState) {
        if study::normalize(&self.content, &mut state.study) {
            go_to(state, Page::FinalThankYou);
        } else {
            go_to(state, Page::UserStudyMain);
        }
    }

    fn shuffle(&self, options: &mut [String]) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        options.shuffle(&mut *rng);
    }

    /// View state of `item`, created at its entry step on first visit.
    fn view_entry<'s>(
        &self,
        views: &'s mut HashMap<ItemKey, ItemViewState>,
        item: &CurrentItem<'_>,
    ) -> &'s mut ItemViewState {
        views.entry(item.key).or_insert_with(|| {
            let mut options = item.comprehension_options();
            self.shuffle(&mut options);
            crate::log_debug!("Entering {:?} at {:?}", item.key, item.entry);
            ItemViewState::new(item.entry, options)
        })
    }

    /// Runs a synchronous step change against the current item's view state.
    /// `apply` must validate before mutating.
    async fn step_action<F>(&self, action: &'static str, apply: F) -> StudyResult<WizardView>
    where
        F: FnOnce(Page, &mut ItemViewState, &CurrentItem<'_>, &mut SessionState) -> StudyResult<()>,
    {
        let mut state = self.state.lock().await;
        let page = state.page;
        let item = current_item(action, &self.content, &state)?;

        let mut view = self.view_entry(&mut state.views, &item).clone();
        apply(page, &mut view, &item, &mut *state)?;
        state.views.insert(item.key, view);

        self.render(&mut state)
    }

    fn render(&self, state: &mut SessionState) -> StudyResult<WizardView> {
        if let Some(body) = view::page_body(&self.content, state, self.settings.allow_debug_skip) {
            return Ok(view::wizard_view(state, body));
        }

        let item = current_item("render", &self.content, state)?;
        let item_state = self.view_entry(&mut state.views, &item);
        let item_view = view::item_view(
            &self.content,
            self.settings.summary_word_delay_ms,
            &item,
            item_state,
        );
        let body = view::item_page(&self.content, state, item_view);
        Ok(view::wizard_view(state, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::AnswerKey,
        models::DemographicsForm,
        recorder::tests::MemoryChannel,
        wizard::{
            fixtures,
            questions::quiz_question,
            view::{ItemView, PageBody},
        },
    };

    struct Harness {
        controller: StudyController,
        content: Arc<ContentStore>,
        primary: Arc<MemoryChannel>,
        fallback: Arc<MemoryChannel>,
    }

    fn harness_with(settings: StudySettings) -> Harness {
        let content = fixtures::content();
        let primary = Arc::new(MemoryChannel::default());
        let fallback = Arc::new(MemoryChannel::default());
        let recorder = ResponseRecorder::new(Some(primary.clone()), fallback.clone());
        Harness {
            controller: StudyController::with_seed(content.clone(), recorder, settings, 7),
            content,
            primary,
            fallback,
        }
    }

    fn harness() -> Harness {
        harness_with(StudySettings {
            allow_debug_skip: true,
            ..StudySettings::default()
        })
    }

    fn item_of(view: &WizardView) -> &ItemView {
        match &view.body {
            PageBody::Quiz { item, .. } | PageBody::Study { item, .. } => item,
            other => panic!("no item on {other:?}"),
        }
    }

    async fn current_step(c: &StudyController) -> ItemStep {
        item_of(&c.snapshot().await.unwrap()).step
    }

    async fn reach_quiz(c: &StudyController) -> WizardView {
        c.submit_demographics(DemographicsForm {
            email: Some("a@b.com".into()),
            age: Some(25),
            gender: Some("Other / Prefer not to say".into()),
            consent: Some(true),
        })
        .await
        .unwrap();
        c.next_page().await.unwrap();
        c.next_page().await.unwrap();
        c.next_page().await.unwrap()
    }

    /// Walks the current item through its gate until the questions show.
    async fn open_questions(c: &StudyController) {
        loop {
            let view = c.snapshot().await.unwrap();
            let item = item_of(&view);
            let first_option = item
                .comprehension
                .as_ref()
                .and_then(|comprehension| comprehension.options.first().cloned());
            let result = match item.step {
                ItemStep::Watching if !item.watch_complete => c.watch_video().await,
                ItemStep::Watching => c.proceed_to_summary().await,
                ItemStep::Summary => c.proceed_to_comprehension().await,
                ItemStep::Comprehension => c.submit_comprehension(first_option).await,
                ItemStep::ComprehensionFeedback => c.proceed_to_content().await,
                ItemStep::Content => c.show_questions().await,
                ItemStep::Questions { .. } => return,
            };
            result.unwrap();
        }
    }

    fn quiz_selection(content: &ContentStore, cursor: QuizCursor, correct: bool) -> Selection {
        let part = content.quiz_part(cursor.part).unwrap();
        let question = quiz_question(part, &part.samples[cursor.item], cursor.sub_question).unwrap();
        let options = &question.question.options;
        match (question.answer, correct) {
            (AnswerKey::One(answer), true) => Selection::Single(answer),
            (AnswerKey::One(answer), false) => {
                Selection::Single(options.iter().find(|o| **o != answer).unwrap().clone())
            }
            (AnswerKey::Many(answers), true) => Selection::Multi(answers),
            (AnswerKey::Many(answers), false) => Selection::Multi(
                options
                    .iter()
                    .filter(|o| !answers.contains(o))
                    .take(2)
                    .cloned()
                    .collect(),
            ),
        }
    }

    async fn answer_quiz_item(h: &Harness, correct: bool) -> WizardView {
        open_questions(&h.controller).await;
        let cursor = h.controller.state().await.quiz;
        h.controller
            .submit_quiz_answer(Some(quiz_selection(&h.content, cursor, correct)))
            .await
            .unwrap();
        h.controller.next_quiz_question().await.unwrap()
    }

    /// Answers the whole quiz, the first `correct` questions correctly.
    async fn finish_quiz(h: &Harness, correct: usize) -> WizardView {
        let total = h.content.total_scorable_questions();
        let mut view = h.controller.snapshot().await.unwrap();
        for index in 0..total {
            view = answer_quiz_item(h, index < correct).await;
        }
        view
    }

    /// Answers every question of the current study item with its first option.
    async fn answer_all(c: &StudyController) {
        loop {
            let view = c.snapshot().await.unwrap();
            let item = item_of(&view);
            let Some(question) = item.questions.iter().find(|q| !item.answers.contains_key(&q.id))
            else {
                return;
            };
            c.answer_question(question.id.clone(), question.options[0].clone())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn fresh_session_starts_at_demographics() {
        let h = harness();
        let view = h.controller.snapshot().await.unwrap();
        assert_eq!(view.page, Page::Demographics);
        match view.body {
            PageBody::Demographics {
                age_options,
                debug_skip_available,
                ..
            } => {
                assert_eq!(age_options.first(), Some(&18));
                assert_eq!(age_options.last(), Some(&60));
                assert!(debug_skip_available);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_demographics_keep_the_page() {
        let h = harness();
        let err = h
            .controller
            .submit_demographics(DemographicsForm {
                email: Some("not-an-email".into()),
                age: Some(25),
                gender: Some("Male".into()),
                consent: Some(true),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::Validation(ValidationError::InvalidEmail)));
        assert_eq!(h.controller.state().await.page, Page::Demographics);
    }

    #[tokio::test]
    async fn demographics_without_consent_keep_the_page() {
        let h = harness();
        let err = h
            .controller
            .submit_demographics(DemographicsForm {
                email: Some("a@b.com".into()),
                age: Some(25),
                gender: Some("Male".into()),
                consent: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::Validation(ValidationError::ConsentRequired)));
        let state = h.controller.state().await;
        assert_eq!(state.page, Page::Demographics);
        assert!(state.participant.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn tutorial_pages_lead_to_first_quiz_item_at_gate() {
        let h = harness();
        let c = &h.controller;
        c.submit_demographics(DemographicsForm {
            email: Some("a@b.com".into()),
            age: Some(25),
            gender: Some("Other / Prefer not to say".into()),
            consent: Some(true),
        })
        .await
        .unwrap();
        assert_eq!(c.next_page().await.unwrap().page, Page::WhatIsTone);
        assert_eq!(c.previous_page().await.unwrap().page, Page::IntroVideo);
        c.next_page().await.unwrap();
        assert_eq!(c.next_page().await.unwrap().page, Page::FactualInfo);

        let view = c.next_page().await.unwrap();
        assert_eq!(view.page, Page::Quiz);
        assert_eq!(c.state().await.quiz, QuizCursor::default());
        assert_eq!(item_of(&view).step_number, 1);

        assert!(matches!(
            c.previous_page().await,
            Err(StudyError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn summary_waits_for_the_video() {
        let h = harness();
        reach_quiz(&h.controller).await;

        let err = h.controller.proceed_to_summary().await.unwrap_err();
        assert!(matches!(err, StudyError::InvalidTransition { .. }));

        let before = time::Instant::now();
        let view = h.controller.watch_video().await.unwrap();
        assert!(item_of(&view).watch_complete);
        assert!(before.elapsed() >= Duration::from_secs(10));

        let view = h.controller.proceed_to_summary().await.unwrap();
        let summary = item_of(&view).summary.clone().unwrap();
        assert!(summary.animate);
        assert!(h.controller.watch_video().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn comprehension_needs_an_offered_choice() {
        let h = harness();
        let c = &h.controller;
        reach_quiz(c).await;
        c.watch_video().await.unwrap();
        c.proceed_to_summary().await.unwrap();
        let view = c.proceed_to_comprehension().await.unwrap();
        let options = item_of(&view).comprehension.clone().unwrap().options;
        assert_eq!(options.len(), 3);

        assert!(matches!(
            c.submit_comprehension(None).await,
            Err(StudyError::Validation(ValidationError::SelectionRequired))
        ));
        assert!(matches!(
            c.submit_comprehension(Some("A tram derails".into())).await,
            Err(StudyError::Validation(ValidationError::UnknownOption(_)))
        ));
        assert_eq!(current_step(c).await, ItemStep::Comprehension);

        let view = c
            .submit_comprehension(Some("A cyclist swerves around a parked van".into()))
            .await
            .unwrap();
        let comprehension = item_of(&view).comprehension.clone().unwrap();
        assert!(comprehension.result.unwrap().correct);
        assert_eq!(comprehension.options, options);
        // Nothing is recorded for comprehension checks.
        assert_eq!(h.primary.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn item_steps_only_move_forward() {
        let h = harness();
        let c = &h.controller;
        reach_quiz(c).await;

        let mut numbers = vec![item_of(&c.snapshot().await.unwrap()).step_number];
        c.watch_video().await.unwrap();
        for _ in 0..5 {
            let view = match current_step(c).await {
                ItemStep::Watching => c.proceed_to_summary().await,
                ItemStep::Summary => c.proceed_to_comprehension().await,
                ItemStep::Comprehension => {
                    c.submit_comprehension(Some("A bus pulls out of a stop".into())).await
                }
                ItemStep::ComprehensionFeedback => c.proceed_to_content().await,
                ItemStep::Content => c.show_questions().await,
                ItemStep::Questions { .. } => break,
            }
            .unwrap();
            numbers.push(item_of(&view).step_number);
        }
        assert_eq!(numbers, [1, 2, 3, 4, 5, 6]);

        for backwards in [
            c.proceed_to_summary().await,
            c.proceed_to_comprehension().await,
            c.proceed_to_content().await,
            c.show_questions().await,
        ] {
            assert!(matches!(backwards, Err(StudyError::InvalidTransition { .. })));
        }
        assert_eq!(current_step(c).await, ItemStep::FIRST_QUESTION);
    }

    #[tokio::test(start_paused = true)]
    async fn watched_media_skips_the_gate() {
        let h = harness();
        reach_quiz(&h.controller).await;
        let view = answer_quiz_item(&h, true).await;

        assert_eq!(h.controller.state().await.quiz.item, 1);
        let item = item_of(&view);
        assert_eq!(item.step, ItemStep::Content);
        assert!(!item.captions.is_empty());
        assert!(!item.summary.as_ref().unwrap().animate);
    }

    #[tokio::test(start_paused = true)]
    async fn controllability_opener_starts_at_content() {
        let h = harness();
        reach_quiz(&h.controller).await;
        let view = h.controller.jump_to_quiz_part(1).await.unwrap();
        let item = item_of(&view);
        assert_eq!(item.step_number, 5);
        assert_eq!(item.captions.len(), 2);
        assert!(h.controller.jump_to_quiz_part(9).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn multi_select_needs_exactly_two() {
        let h = harness();
        reach_quiz(&h.controller).await;
        for _ in 0..3 {
            answer_quiz_item(&h, true).await;
        }
        open_questions(&h.controller).await;
        let score = h.controller.state().await.score;

        for choices in [vec!["Angry"], vec!["Angry", "Sarcastic", "Calm"]] {
            let selection = Selection::Multi(choices.into_iter().map(String::from).collect());
            let err = h.controller.submit_quiz_answer(Some(selection)).await.unwrap_err();
            assert!(matches!(
                err,
                StudyError::Validation(ValidationError::WrongSelectionCount { expected: 2, .. })
            ));
        }

        let wrong = Selection::Multi(vec!["Calm".into(), "Formal".into()]);
        let view = h.controller.submit_quiz_answer(Some(wrong)).await.unwrap();
        let feedback = item_of(&view).quiz_feedback.clone().unwrap();
        assert!(!feedback.correct);
        assert_eq!(feedback.correct_answer, ["Angry", "Sarcastic"]);
        assert_eq!(h.controller.state().await.score, score);

        let recorded = h.primary.events.lock().unwrap().last().cloned().unwrap();
        assert_eq!(recorded.user_choice, "Calm, Formal");
        assert_eq!(recorded.was_correct, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn five_correct_answers_pass() {
        let h = harness();
        reach_quiz(&h.controller).await;
        let view = finish_quiz(&h, 5).await;

        assert_eq!(view.page, Page::QuizResults);
        match view.body {
            PageBody::QuizResults { score, total, passed, status, .. } => {
                assert_eq!((score, total, passed), (5, 10, true));
                assert_eq!(status, "Passed");
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert!(h.controller.restart_quiz().await.is_err());
        let view = h.controller.proceed_to_study().await.unwrap();
        assert_eq!(view.page, Page::UserStudyMain);
    }

    #[tokio::test(start_paused = true)]
    async fn four_correct_answers_fail_and_restart_resets() {
        let h = harness();
        reach_quiz(&h.controller).await;
        let view = finish_quiz(&h, 4).await;

        assert!(matches!(
            view.body,
            PageBody::QuizResults { score: 4, passed: false, status: "Failed", .. }
        ));
        assert!(h.controller.proceed_to_study().await.is_err());
        assert_eq!(h.primary.len(), 10);

        let view = h.controller.restart_quiz().await.unwrap();
        assert_eq!(view.page, Page::Quiz);
        let state = h.controller.state().await;
        assert_eq!(state.score, 0);
        assert_eq!(state.quiz, QuizCursor::default());
        // qv1 stays in the watched set across the restart.
        assert_eq!(item_of(&view).step, ItemStep::Content);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_quiz_save_keeps_score_and_question() {
        let h = harness();
        reach_quiz(&h.controller).await;
        open_questions(&h.controller).await;
        h.primary.set_failing(true);
        h.fallback.set_failing(true);

        let answer = quiz_selection(&h.content, QuizCursor::default(), true);
        let err = h.controller.submit_quiz_answer(Some(answer.clone())).await.unwrap_err();
        assert!(matches!(err, StudyError::Persistence(_)));
        let state = h.controller.state().await;
        assert_eq!(state.score, 0);
        assert!(h.controller.next_quiz_question().await.is_err());

        h.fallback.set_failing(false);
        h.controller.submit_quiz_answer(Some(answer)).await.unwrap();
        assert_eq!(h.controller.state().await.score, 1);
        assert_eq!(h.fallback.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rating_questions_reveal_one_at_a_time() {
        let h = harness();
        let c = &h.controller;
        c.debug_skip().await.unwrap();
        open_questions(c).await;

        let view = c.snapshot().await.unwrap();
        let item = item_of(&view);
        assert_eq!(item.questions.len(), 1);
        assert!(!item.can_submit);

        assert!(matches!(
            c.answer_question("usefulness".into(), "Very".into()).await,
            Err(StudyError::Validation(ValidationError::QuestionHidden(_)))
        ));
        assert!(matches!(
            c.answer_question("tone_relevance".into(), "Loud".into()).await,
            Err(StudyError::Validation(ValidationError::UnknownOption(_)))
        ));
        assert!(matches!(
            c.submit_ratings().await,
            Err(StudyError::Validation(ValidationError::UnansweredQuestions(ref missing)))
                if missing == &[1, 2, 3, 4, 5]
        ));

        let view = c
            .answer_question("tone_relevance".into(), "Strong".into())
            .await
            .unwrap();
        assert_eq!(item_of(&view).questions.len(), 2);
        assert_eq!(item_of(&view).step_number, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_rating_save_changes_nothing_and_retry_advances_once() {
        let h = harness();
        let c = &h.controller;
        c.debug_skip().await.unwrap();
        open_questions(c).await;
        answer_all(c).await;

        h.primary.set_failing(true);
        h.fallback.set_failing(true);
        let before = c.state().await;
        let step_before = current_step(c).await;
        assert!(matches!(c.submit_ratings().await, Err(StudyError::Persistence(_))));
        let after = c.state().await;
        assert_eq!(after.study, before.study);
        assert_eq!(current_step(c).await, step_before);

        h.primary.set_failing(false);
        c.submit_ratings().await.unwrap();
        let state = c.state().await;
        assert_eq!(
            state.study,
            StudyCursor {
                part: StudyPart::Ratings,
                item: 0,
                sub_question: 1
            }
        );
        assert_eq!(h.primary.len(), 5);
        assert_eq!(h.fallback.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_caption_of_a_watched_video_enters_at_content() {
        let h = harness();
        let c = &h.controller;
        c.debug_skip().await.unwrap();
        open_questions(c).await;
        answer_all(c).await;
        let view = c.submit_ratings().await.unwrap();

        let item = item_of(&view);
        assert_eq!(item.step_number, 5);
        assert!(item.summary.is_some());
        assert_eq!(c.state().await.study.sub_question, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn study_runs_through_to_the_end() {
        let h = harness();
        let c = &h.controller;
        c.debug_skip().await.unwrap();

        let mut page = Page::UserStudyMain;
        let mut submissions = 0;
        while page == Page::UserStudyMain {
            open_questions(c).await;
            answer_all(c).await;
            page = c.submit_ratings().await.unwrap().page;
            submissions += 1;
        }
        assert_eq!(page, Page::FinalThankYou);
        // 3 captions, 1 intensity change, 1 comparison.
        assert_eq!(submissions, 5);
        assert_eq!(h.primary.len(), 3 * 5 + 2 + 4);
    }

    #[tokio::test(start_paused = true)]
    async fn study_jumps_are_bounds_checked() {
        let h = harness();
        let c = &h.controller;
        c.debug_skip().await.unwrap();

        let view = c.jump_to_study_item(2, 0).await.unwrap();
        assert!(matches!(view.body, PageBody::Study { .. }));
        assert_eq!(c.state().await.study.part, StudyPart::IntensityChange);

        assert!(c.jump_to_study_item(1, 2).await.is_err());
        assert!(c.jump_to_study_part(4).await.is_err());

        c.jump_to_study_part(3).await.unwrap();
        assert_eq!(current_step(c).await, ItemStep::Watching);
    }

    #[tokio::test]
    async fn debug_skip_requires_the_setting() {
        let h = harness_with(StudySettings::default());
        assert!(matches!(
            h.controller.debug_skip().await,
            Err(StudyError::InvalidTransition { .. })
        ));
    }
}
