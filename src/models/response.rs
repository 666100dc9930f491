//! Response events as they are written to the response sheet.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::Participant;

const NOT_APPLICABLE: &str = "N/A";

/// Sheet columns, in order. Written as the first row of an empty sheet.
pub const RESPONSE_HEADER: [&str; 11] = [
    "email",
    "age",
    "gender",
    "timestamp",
    "study_phase",
    "video_id",
    "sample_id",
    "question_text",
    "user_choice",
    "was_correct",
    "attempts_taken",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StudyPhase {
    Quiz,
    UserStudyPart1,
    UserStudyPart2,
    UserStudyPart3,
}

impl StudyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyPhase::Quiz => "quiz",
            StudyPhase::UserStudyPart1 => "user_study_part1",
            StudyPhase::UserStudyPart2 => "user_study_part2",
            StudyPhase::UserStudyPart3 => "user_study_part3",
        }
    }
}

/// One answer, created at the moment a submission validates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEvent {
    pub email: String,
    pub age: u8,
    pub gender: String,
    pub timestamp: String,
    pub study_phase: StudyPhase,
    pub video_id: Option<String>,
    pub sample_id: Option<String>,
    pub question_text: String,
    pub user_choice: String,
    pub was_correct: Option<bool>,
    pub attempts_taken: Option<u32>,
}

pub struct ResponseDraft<'a> {
    pub phase: StudyPhase,
    pub video_id: Option<&'a str>,
    pub sample_id: Option<&'a str>,
    pub question_text: String,
    pub user_choice: String,
    pub was_correct: Option<bool>,
}

impl ResponseEvent {
    pub fn new(participant: &Participant, draft: ResponseDraft<'_>, at: DateTime<Local>) -> Self {
        Self {
            email: participant.email().to_string(),
            age: participant.age(),
            gender: participant.gender().to_string(),
            timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            study_phase: draft.phase,
            video_id: draft.video_id.map(String::from),
            sample_id: draft.sample_id.map(String::from),
            question_text: draft.question_text,
            user_choice: draft.user_choice,
            was_correct: draft.was_correct,
            attempts_taken: (draft.phase == StudyPhase::Quiz).then_some(1),
        }
    }

    /// Cell values in `RESPONSE_HEADER` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.email.clone(),
            self.age.to_string(),
            self.gender.clone(),
            self.timestamp.clone(),
            self.study_phase.as_str().to_string(),
            self.video_id.clone().unwrap_or_else(|| NOT_APPLICABLE.into()),
            self.sample_id.clone().unwrap_or_else(|| NOT_APPLICABLE.into()),
            self.question_text.clone(),
            self.user_choice.clone(),
            self.was_correct
                .map(|correct| correct.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.into()),
            self.attempts_taken
                .map(|attempts| attempts.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.into()),
        ]
    }
}

pub fn header_row() -> Vec<String> {
    RESPONSE_HEADER.iter().map(|column| column.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DemographicsForm;
    use chrono::TimeZone;

    fn participant() -> Participant {
        Participant::from_form(&DemographicsForm {
            email: Some("a@b.com".into()),
            age: Some(25),
            gender: Some("Female".into()),
            consent: Some(true),
        })
        .unwrap()
    }

    #[test]
    fn quiz_row_carries_correctness_and_attempts() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let event = ResponseEvent::new(
            &participant(),
            ResponseDraft {
                phase: StudyPhase::Quiz,
                video_id: None,
                sample_id: Some("quiz_s1"),
                question_text: "Identify dominant tone".into(),
                user_choice: "Sarcastic".into(),
                was_correct: Some(true),
            },
            at,
        );

        let row = event.to_row();
        assert_eq!(row.len(), RESPONSE_HEADER.len());
        assert_eq!(row[3], "2024-05-01 09:30:00");
        assert_eq!(row[4], "quiz");
        assert_eq!(row[5], "N/A");
        assert_eq!(row[6], "quiz_s1");
        assert_eq!(row[9], "true");
        assert_eq!(row[10], "1");
    }

    #[test]
    fn study_row_marks_ungraded_fields_not_applicable() {
        let event = ResponseEvent::new(
            &participant(),
            ResponseDraft {
                phase: StudyPhase::UserStudyPart3,
                video_id: Some("v9"),
                sample_id: Some("cmp_3"),
                question_text: "Which caption sounds more caring?".into(),
                user_choice: "Caption A".into(),
                was_correct: None,
            },
            Local::now(),
        );

        let row = event.to_row();
        assert_eq!(row[4], "user_study_part3");
        assert_eq!(row[5], "v9");
        assert_eq!(row[9], "N/A");
        assert_eq!(row[10], "N/A");
    }
}
