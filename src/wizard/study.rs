use super::{
    item::{deferred, gate_or_skip, CaptionView, CurrentItem, RecordTarget},
    questions::{comparison_questions, intensity_questions, rating_questions},
};
use crate::{
    content::ContentStore,
    error::StudyError,
    models::StudyPhase,
    session::{ItemKey, ItemStep, MediaId, StudyCursor, StudyPart, WatchedSet},
};

pub fn part_len(content: &ContentStore, part: StudyPart) -> usize {
    match part {
        StudyPart::Ratings => content.rating_videos().len(),
        StudyPart::IntensityChange => content.intensity_changes().len(),
        StudyPart::Comparison => content.comparisons().len(),
    }
}

/// Rolls the cursor over exhausted videos and parts. Returns `true` once the
/// last part is done.
pub fn normalize(content: &ContentStore, cursor: &mut StudyCursor) -> bool {
    loop {
        if cursor.item >= part_len(content, cursor.part) {
            match cursor.part.next() {
                Some(next) => {
                    *cursor = StudyCursor {
                        part: next,
                        item: 0,
                        sub_question: 0,
                    };
                    continue;
                }
                None => return true,
            }
        }
        if cursor.part == StudyPart::Ratings {
            let captions = content.rating_videos()[cursor.item].captions.len();
            if cursor.sub_question >= captions {
                cursor.item += 1;
                cursor.sub_question = 0;
                continue;
            }
        }
        return false;
    }
}

/// Next caption of the same video in part 1, next item elsewhere.
pub fn advance(content: &ContentStore, cursor: &mut StudyCursor) -> bool {
    match cursor.part {
        StudyPart::Ratings => cursor.sub_question += 1,
        _ => cursor.item += 1,
    }
    normalize(content, cursor)
}

pub fn resolve<'a>(
    content: &'a ContentStore,
    cursor: StudyCursor,
    watched: &WatchedSet,
) -> Result<CurrentItem<'a>, StudyError> {
    let out_of_range = || {
        StudyError::Content(format!(
            "no item {} in {}",
            cursor.item,
            cursor.part.title()
        ))
    };
    let templates = content.questions();

    match cursor.part {
        StudyPart::Ratings => {
            let video = content.rating_videos().get(cursor.item).ok_or_else(out_of_range)?;
            let caption = video.captions.get(cursor.sub_question).ok_or_else(out_of_range)?;
            let media_id = Some(MediaId::from(video.video_id.as_str()));
            let entry = if cursor.sub_question > 0 {
                ItemStep::Content
            } else {
                gate_or_skip(media_id.as_ref(), watched)
            };
            Ok(CurrentItem {
                key: ItemKey::Rating {
                    video: cursor.item,
                    caption: cursor.sub_question,
                },
                title: "Caption Quality Rating".to_string(),
                media: &video.media,
                media_id,
                captions: CaptionView::single(&caption.text),
                entry,
                target: RecordTarget {
                    phase: StudyPhase::UserStudyPart1,
                    video_id: Some(video.video_id.as_str()),
                    sample_id: Some(caption.caption_id.as_str()),
                },
                questions: Ok(rating_questions(templates, caption)),
                grading: None,
            })
        }
        StudyPart::IntensityChange => {
            let change = content.intensity_changes().get(cursor.item).ok_or_else(out_of_range)?;
            let media_id = change.video_id.as_deref().map(MediaId::from);
            Ok(CurrentItem {
                key: ItemKey::IntensityChange {
                    change: cursor.item,
                },
                title: "Tone Intensity Change".to_string(),
                media: &change.media,
                entry: gate_or_skip(media_id.as_ref(), watched),
                media_id,
                captions: CaptionView::pair(&change.caption_a, &change.caption_b),
                target: RecordTarget {
                    phase: StudyPhase::UserStudyPart2,
                    video_id: change.video_id.as_deref(),
                    sample_id: Some(change.change_id.as_str()),
                },
                questions: intensity_questions(templates, change).map_err(deferred),
                grading: None,
            })
        }
        StudyPart::Comparison => {
            let comparison = content.comparisons().get(cursor.item).ok_or_else(out_of_range)?;
            let media_id = comparison.video_id.as_deref().map(MediaId::from);
            Ok(CurrentItem {
                key: ItemKey::Comparison {
                    comparison: cursor.item,
                },
                title: "Caption Comparison".to_string(),
                media: &comparison.media,
                entry: gate_or_skip(media_id.as_ref(), watched),
                media_id,
                captions: CaptionView::pair(&comparison.caption_a, &comparison.caption_b),
                target: RecordTarget {
                    phase: StudyPhase::UserStudyPart3,
                    video_id: comparison.video_id.as_deref(),
                    sample_id: Some(comparison.comparison_id.as_str()),
                },
                questions: Ok(comparison_questions(templates, comparison)),
                grading: None,
            })
        }
    }
}
