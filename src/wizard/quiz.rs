use super::{
    item::{deferred, gate_or_skip, CaptionView, CurrentItem, QuizGrading, RecordTarget},
    questions::{quiz_question, quiz_title, QuestionInput},
};
use crate::{
    content::{ContentStore, QuizPartKind},
    error::StudyError,
    models::StudyPhase,
    session::{ItemKey, ItemStep, MediaId, QuizCursor, WatchedSet},
};

pub const PASSING_SCORE: u32 = 5;

/// The one quiz part whose first sample opens on the captions directly.
pub const CAPTIONS_FIRST_PART: &str = "Part 2: Tone Controllability Evaluation";

/// Moves the cursor past exhausted samples and parts. Returns `true` once the
/// cursor has passed the last part.
pub fn normalize(content: &ContentStore, cursor: &mut QuizCursor) -> bool {
    loop {
        let Some(part) = content.quiz_part(cursor.part) else {
            return true;
        };
        if cursor.item >= part.samples.len() {
            *cursor = QuizCursor {
                part: cursor.part + 1,
                item: 0,
                sub_question: 0,
            };
            continue;
        }
        if cursor.sub_question >= part.sub_questions(cursor.item) {
            cursor.item += 1;
            cursor.sub_question = 0;
            continue;
        }
        return false;
    }
}

/// Sub-question first, then sample, then part.
pub fn advance(content: &ContentStore, cursor: &mut QuizCursor) -> bool {
    cursor.sub_question += 1;
    normalize(content, cursor)
}

/// True when answering `cursor` ends the quiz. Trailing samples and parts that
/// ask nothing do not count as further questions.
pub fn is_last_question(content: &ContentStore, cursor: QuizCursor) -> bool {
    let asks_something = content
        .quiz_part(cursor.part)
        .is_some_and(|part| cursor.sub_question < part.sub_questions(cursor.item));
    let mut next = cursor;
    asks_something && advance(content, &mut next)
}

pub fn passed(score: u32) -> bool {
    score >= PASSING_SCORE
}

pub fn resolve<'a>(
    content: &'a ContentStore,
    cursor: QuizCursor,
    watched: &WatchedSet,
) -> Result<CurrentItem<'a>, StudyError> {
    let part = content.quiz_part(cursor.part).ok_or_else(|| {
        StudyError::Content(format!("quiz part {} does not exist", cursor.part))
    })?;
    let sample = part.samples.get(cursor.item).ok_or_else(|| {
        StudyError::Content(format!("quiz sample {} missing in '{}'", cursor.item, part.name))
    })?;

    let media_id = sample.video_id.as_deref().map(MediaId::from);
    let entry = if part.kind == QuizPartKind::CaptionQuality && cursor.sub_question > 0 {
        ItemStep::FIRST_QUESTION
    } else if part.name == CAPTIONS_FIRST_PART && cursor.item == 0 {
        ItemStep::Content
    } else {
        gate_or_skip(media_id.as_ref(), watched)
    };

    let captions = match part.kind {
        QuizPartKind::ToneControllability => CaptionView::pair(
            sample.caption_a.as_deref().unwrap_or_default(),
            sample.caption_b.as_deref().unwrap_or_default(),
        ),
        _ => CaptionView::single(sample.caption.as_deref().unwrap_or_default()),
    };

    let next_label = if is_last_question(content, cursor) {
        "Finish Quiz"
    } else {
        "Next Question"
    };

    let (questions, grading) = match quiz_question(part, sample, cursor.sub_question) {
        Ok(question) => {
            let grading = QuizGrading {
                answer: question.answer.clone(),
                explanation: question.explanation.clone(),
                recorded_text: question.recorded_text.clone(),
                multi: matches!(question.question.input, QuestionInput::Multi { .. }),
                options: question.question.options.clone(),
                next_label,
            };
            (Ok(question.into_set()), Some(grading))
        }
        Err(err) => (Err(deferred(err)), None),
    };

    Ok(CurrentItem {
        key: ItemKey::Quiz {
            part: cursor.part,
            sample: cursor.item,
            sub_question: cursor.sub_question,
        },
        title: quiz_title(part, sample),
        media: &sample.media,
        media_id,
        captions,
        entry,
        target: RecordTarget {
            phase: StudyPhase::Quiz,
            video_id: sample.video_id.as_deref(),
            sample_id: sample.sample_id.as_deref(),
        },
        questions,
        grading,
    })
}
