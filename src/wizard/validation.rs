use serde::{Deserialize, Serialize};

use crate::{content::AnswerKey, error::ValidationError};

/// Number of options a multi-select question must have ticked.
pub const MULTI_SELECT_COUNT: usize = 2;

/// What the participant submitted for a graded question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Selection {
    Single(String),
    Multi(Vec<String>),
}

impl Selection {
    pub fn choices(&self) -> Vec<&str> {
        match self {
            Selection::Single(choice) => vec![choice.as_str()],
            Selection::Multi(choices) => choices.iter().map(String::as_str).collect(),
        }
    }

    /// Cell text for the response sheet; multi answers are comma separated.
    pub fn to_cell(&self) -> String {
        match self {
            Selection::Single(choice) => choice.clone(),
            Selection::Multi(choices) => choices.join(", "),
        }
    }
}

/// Rejects empty selections, the wrong number of multi-select choices and
/// anything not among `options`.
pub fn check_selection(
    selection: Option<&Selection>,
    options: &[String],
    multi: bool,
) -> Result<Selection, ValidationError> {
    let selection = match selection {
        None => return Err(ValidationError::SelectionRequired),
        Some(Selection::Single(choice)) if choice.trim().is_empty() => {
            return Err(ValidationError::SelectionRequired)
        }
        Some(Selection::Multi(choices)) if choices.is_empty() => {
            return Err(ValidationError::SelectionRequired)
        }
        Some(selection) => selection,
    };

    let normalized = match (multi, selection) {
        (true, Selection::Multi(choices)) => {
            let mut unique: Vec<String> = Vec::with_capacity(choices.len());
            for choice in choices {
                if !unique.contains(choice) {
                    unique.push(choice.clone());
                }
            }
            if unique.len() != MULTI_SELECT_COUNT {
                return Err(ValidationError::WrongSelectionCount {
                    expected: MULTI_SELECT_COUNT,
                    actual: unique.len(),
                });
            }
            Selection::Multi(unique)
        }
        (true, Selection::Single(_)) => {
            return Err(ValidationError::WrongSelectionCount {
                expected: MULTI_SELECT_COUNT,
                actual: 1,
            })
        }
        (false, Selection::Single(choice)) => Selection::Single(choice.clone()),
        (false, Selection::Multi(choices)) => match choices.as_slice() {
            [only] => Selection::Single(only.clone()),
            _ => {
                return Err(ValidationError::WrongSelectionCount {
                    expected: 1,
                    actual: choices.len(),
                })
            }
        },
    };

    if let Some(unknown) = normalized
        .choices()
        .into_iter()
        .find(|choice| !options.iter().any(|option| option == choice))
    {
        return Err(ValidationError::UnknownOption(unknown.to_string()));
    }

    Ok(normalized)
}

/// Set equality against a list key, plain equality against a single key.
pub fn is_correct(selection: &Selection, key: &AnswerKey) -> bool {
    match key {
        AnswerKey::Many(expected) => {
            let chosen = selection.choices();
            chosen.len() == expected.len()
                && chosen.iter().all(|c| expected.iter().any(|e| e == c))
                && expected.iter().all(|e| chosen.contains(&e.as_str()))
        }
        AnswerKey::One(expected) => match selection {
            Selection::Single(choice) => choice == expected,
            Selection::Multi(_) => false,
        },
    }
}

pub fn answer_options(key: &AnswerKey) -> Vec<String> {
    match key {
        AnswerKey::One(answer) => vec![answer.clone()],
        AnswerKey::Many(answers) => answers.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tones() -> Vec<String> {
        ["Sarcastic", "Angry", "Caring", "Humorous"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn multi(choices: &[&str]) -> Selection {
        Selection::Multi(choices.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn missing_selection_is_required() {
        assert_eq!(
            check_selection(None, &tones(), false),
            Err(ValidationError::SelectionRequired)
        );
        assert_eq!(
            check_selection(Some(&multi(&[])), &tones(), true),
            Err(ValidationError::SelectionRequired)
        );
    }

    #[test]
    fn multi_select_needs_exactly_two() {
        assert_eq!(
            check_selection(Some(&multi(&["Angry"])), &tones(), true),
            Err(ValidationError::WrongSelectionCount { expected: 2, actual: 1 })
        );
        assert_eq!(
            check_selection(Some(&multi(&["Angry", "Caring", "Humorous"])), &tones(), true),
            Err(ValidationError::WrongSelectionCount { expected: 2, actual: 3 })
        );
        assert!(check_selection(Some(&multi(&["Angry", "Caring"])), &tones(), true).is_ok());
    }

    #[test]
    fn duplicate_choices_do_not_count_twice() {
        assert_eq!(
            check_selection(Some(&multi(&["Angry", "Angry"])), &tones(), true),
            Err(ValidationError::WrongSelectionCount { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn choices_must_be_offered() {
        assert_eq!(
            check_selection(Some(&Selection::Single("Bored".into())), &tones(), false),
            Err(ValidationError::UnknownOption("Bored".into()))
        );
    }

    #[test]
    fn multi_correctness_ignores_order() {
        let key = AnswerKey::Many(vec!["Sarcastic".into(), "Humorous".into()]);
        assert!(is_correct(&multi(&["Humorous", "Sarcastic"]), &key));
        assert!(!is_correct(&multi(&["Humorous", "Angry"]), &key));
    }

    #[test]
    fn single_correctness_is_equality() {
        let key = AnswerKey::One("Caring".into());
        assert!(is_correct(&Selection::Single("Caring".into()), &key));
        assert!(!is_correct(&Selection::Single("Angry".into()), &key));
    }

    #[test]
    fn multi_cell_joins_choices() {
        assert_eq!(multi(&["Angry", "Caring"]).to_cell(), "Angry, Caring");
    }
}
