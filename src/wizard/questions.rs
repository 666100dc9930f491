//! Builds the question sets shown for each kind of item.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::{
    content::{
        AnswerKey, Caption, ComparisonItem, IntensityChangeItem, QuestionTemplates, QuizPart,
        QuizPartKind, QuizSample,
    },
    error::StudyError,
};

const RELEVANCE_SCALE: [&str; 5] = ["Not at all", "Weak", "Moderate", "Strong", "Very Strong"];
const FACTUAL_SCALE: [&str; 5] = ["Contradicts", "Inaccurate", "Partially", "Mostly Accurate", "Accurate"];
const USEFULNESS_SCALE: [&str; 5] = ["Not at all", "Slightly", "Moderately", "Very", "Extremely"];
const HUMAN_LIKENESS_SCALE: [&str; 5] = ["Robotic", "Unnatural", "Moderate", "Very Human-like", "Natural"];
const YES_NO: [&str; 2] = ["Yes", "No"];
const COMPARISON_OPTIONS: [&str; 4] = ["Caption A", "Caption B", "Both A and B", "Neither A nor B"];

const TONE_TEMPLATE: &str = "How {} does the caption sound?";
const STYLE_TEMPLATE: &str = "How {} is the caption's style?";
const FACTUAL_TEMPLATE: &str = "How factually accurate is the caption?";
const USEFULNESS_TEMPLATE: &str = "How useful is this caption for {}?";
const HUMAN_LIKENESS_TEMPLATE: &str = "How human-like does this caption sound?";
const COMPARISON_STYLE_TEMPLATE: &str = "Which caption's style is more {}?";
const FACTUAL_CONSISTENCY_QUESTION: &str =
    "Is the core factual content consistent across both captions?";
const DEFAULT_APPLICATION: &str = "the intended application";

/// Rated in this order; `overall_relevance` is never asked.
const PART1_ORDER: [&str; 5] = [
    "tone_relevance",
    "style_relevance",
    "factual_consistency",
    "usefulness",
    "human_likeness",
];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuestionInput {
    /// Slider positioned on the first option until moved.
    Scale,
    Single,
    Multi { select: usize },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub number: usize,
    pub text: String,
    pub options: Vec<String>,
    pub input: QuestionInput,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Reveal {
    /// One question at a time, the next after the previous was answered.
    Incremental,
    AllAtOnce,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
    pub reveal: Reveal,
    /// Terms highlighted in the questions, for the reference glossary.
    pub terms: BTreeSet<String>,
}

impl QuestionSet {
    /// Questions visible on entering the question step.
    pub fn initially_revealed(&self) -> usize {
        match self.reveal {
            Reveal::Incremental => 1,
            Reveal::AllAtOnce => self.questions.len().max(1),
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }
}

/// Grading data for the single question a quiz item asks.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub question: Question,
    pub answer: AnswerKey,
    pub explanation: Option<String>,
    /// Text written to the response sheet, which differs from the display text.
    pub recorded_text: String,
    pub terms: BTreeSet<String>,
}

impl QuizQuestion {
    pub fn into_set(self) -> QuestionSet {
        QuestionSet {
            questions: vec![self.question],
            reveal: Reveal::Incremental,
            terms: self.terms,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Substitutes the first positional `{}`.
fn fill(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}

fn join_traits(traits: &[&str]) -> String {
    traits.join(" and ")
}

fn numbered(questions: Vec<(String, String, Vec<String>)>, input: QuestionInput) -> Vec<Question> {
    questions
        .into_iter()
        .enumerate()
        .map(|(index, (id, text, options))| Question {
            id,
            number: index + 1,
            text,
            options,
            input,
        })
        .collect()
}

/// Caption rating: five scaled questions about one caption.
pub fn rating_questions(templates: &QuestionTemplates, caption: &Caption) -> QuestionSet {
    let tone_traits: Vec<&str> = caption.control_scores.tone_traits().into_iter().take(2).collect();
    let style_traits: Vec<&str> = caption.control_scores.style_traits().into_iter().take(2).collect();
    let application = caption.application.as_deref().unwrap_or(DEFAULT_APPLICATION);

    let mut terms: BTreeSet<String> = tone_traits.iter().map(|t| t.to_string()).collect();
    terms.insert(application.to_string());

    let text_of = |id: &str, fallback: &'static str| -> String {
        templates
            .part1(id)
            .and_then(|t| t.text.clone())
            .unwrap_or_else(|| fallback.to_string())
    };

    let style_template = templates.part1("style_relevance");
    let style_override = style_template.and_then(|template| {
        style_traits
            .iter()
            .find_map(|t| template.overrides.get(*t).map(|o| (*t, o)))
    });
    let (style_text, style_options) = match style_override {
        Some((style_trait, found)) => {
            terms.insert(style_trait.to_string());
            (found.text.clone(), found.options.clone())
        }
        None => {
            terms.extend(style_traits.iter().map(|t| t.to_string()));
            let text = style_template
                .and_then(|t| t.default_text.as_deref())
                .unwrap_or(STYLE_TEMPLATE);
            let options = style_template
                .and_then(|t| t.default_options.clone())
                .unwrap_or_else(|| strings(&RELEVANCE_SCALE));
            (fill(text, &join_traits(&style_traits)), options)
        }
    };

    let mut rows = Vec::with_capacity(PART1_ORDER.len());
    for id in PART1_ORDER {
        let (text, options) = match id {
            "tone_relevance" => (
                fill(&text_of(id, TONE_TEMPLATE), &join_traits(&tone_traits)),
                strings(&RELEVANCE_SCALE),
            ),
            "style_relevance" => (style_text.clone(), style_options.clone()),
            "factual_consistency" => (text_of(id, FACTUAL_TEMPLATE), strings(&FACTUAL_SCALE)),
            "usefulness" => (
                fill(&text_of(id, USEFULNESS_TEMPLATE), application),
                strings(&USEFULNESS_SCALE),
            ),
            _ => (text_of(id, HUMAN_LIKENESS_TEMPLATE), strings(&HUMAN_LIKENESS_SCALE)),
        };
        rows.push((id.to_string(), text, options));
    }

    QuestionSet {
        questions: numbered(rows, QuestionInput::Scale),
        reveal: Reveal::Incremental,
        terms,
    }
}

/// Intensity change: did the trait move as described, and do the facts agree.
pub fn intensity_questions(
    templates: &QuestionTemplates,
    item: &IntensityChangeItem,
) -> Result<QuestionSet, StudyError> {
    let (field_type, trait_value) = item.field_to_change.iter().next().ok_or_else(|| {
        StudyError::Content(format!("{} has an empty field_to_change", item.change_id))
    })?;
    let trait_name = trait_value.as_str().ok_or_else(|| {
        StudyError::Content(format!("{}: field_to_change value is not text", item.change_id))
    })?;

    let template_key = match field_type.as_str() {
        "tone" => "Tone",
        "writing_style" => "Writing Style",
        other => {
            return Err(StudyError::Content(format!(
                "unknown field type for question template: {other}"
            )))
        }
    };
    let template = templates.part2_questions.get(template_key).ok_or_else(|| {
        StudyError::Content(format!(
            "question template key '{template_key}' not found in questions"
        ))
    })?;

    let first = fill(template, trait_name).replace("{change_type}", &item.change_type);
    let rows = vec![
        ("q1".to_string(), first, strings(&YES_NO)),
        (
            "q2".to_string(),
            FACTUAL_CONSISTENCY_QUESTION.to_string(),
            strings(&YES_NO),
        ),
    ];

    Ok(QuestionSet {
        questions: numbered(rows, QuestionInput::Single),
        reveal: Reveal::AllAtOnce,
        terms: BTreeSet::from([trait_name.to_string()]),
    })
}

/// Caption comparison: every template becomes an A/B question.
pub fn comparison_questions(templates: &QuestionTemplates, item: &ComparisonItem) -> QuestionSet {
    let tone_traits = item.control_scores.tone_traits();
    let style_traits = item.control_scores.style_traits();
    let mut terms: BTreeSet<String> = tone_traits.iter().map(|t| t.to_string()).collect();

    let rows = templates
        .part3_questions
        .iter()
        .map(|template| {
            let text = match template.id.as_str() {
                "q2_style" => {
                    let found = style_traits
                        .iter()
                        .find_map(|t| template.overrides.get(*t).map(|o| (*t, o)));
                    match found {
                        Some((style_trait, o)) => {
                            terms.insert(style_trait.to_string());
                            o.text.clone()
                        }
                        None => {
                            terms.extend(style_traits.iter().map(|t| t.to_string()));
                            let text = template
                                .default_text
                                .as_deref()
                                .unwrap_or(COMPARISON_STYLE_TEMPLATE);
                            fill(text, &join_traits(&style_traits))
                        }
                    }
                }
                "q1_tone" => fill(
                    template.text.as_deref().unwrap_or_default(),
                    &join_traits(&tone_traits),
                ),
                _ => template.text.clone().unwrap_or_default(),
            };
            (template.id.clone(), text, strings(&COMPARISON_OPTIONS))
        })
        .collect();

    QuestionSet {
        questions: numbered(rows, QuestionInput::Single),
        reveal: Reveal::Incremental,
        terms,
    }
}

fn part_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"Part \d+: ").expect("part prefix pattern compiles"))
}

/// "writing style" -> "Writing Style".
fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Heading shown above a quiz item's captions.
pub fn quiz_title(part: &QuizPart, sample: &QuizSample) -> String {
    let category = sample.category.as_deref().unwrap_or("Tone");
    match part.kind {
        QuizPartKind::ToneIdentification if part.name.contains("Tone Identification") => {
            format!("{} Identification", title_case(category))
        }
        QuizPartKind::ToneControllability => format!("{} Comparison", title_case(category)),
        _ => part_prefix().replace_all(&part.name, "").into_owned(),
    }
}

/// The graded question for quiz position (`part`, `sample`, `sub_question`).
pub fn quiz_question(
    part: &QuizPart,
    sample: &QuizSample,
    sub_question: usize,
) -> Result<QuizQuestion, StudyError> {
    let missing = |field: &str| {
        StudyError::Content(format!(
            "quiz sample {} in '{}' has no {field}",
            sample.sample_id.as_deref().unwrap_or("?"),
            part.name
        ))
    };

    let mut terms = BTreeSet::new();
    let (id, text, recorded_text, options, multi, answer, explanation) = match part.kind {
        QuizPartKind::CaptionQuality => {
            let sub = sample
                .questions
                .get(sub_question)
                .ok_or_else(|| missing("such sub-question"))?;
            if let Some(application) = &sample.application {
                terms.insert(application.clone());
            }
            (
                format!("q{}", sub_question + 1),
                sub.question_text.clone(),
                sub.question_text.clone(),
                sub.options.clone(),
                sub.question_type.as_deref() == Some("multi"),
                sub.correct_answer.clone(),
                sub.explanation.clone(),
            )
        }
        QuizPartKind::ToneControllability => {
            let trait_name = sample.tone_to_compare.as_deref().ok_or_else(|| missing("tone_to_compare"))?;
            let change = sample.comparison_type.as_deref().ok_or_else(|| missing("comparison_type"))?;
            terms.insert(trait_name.to_string());
            (
                "q1".to_string(),
                format!("From Caption A to B, has the level of {trait_name} {change}?"),
                format!("Intensity of '{trait_name}' has {change}"),
                sample.options.clone(),
                sample.question_type.as_deref() == Some("multi"),
                sample.correct_answer.clone().ok_or_else(|| missing("correct_answer"))?,
                sample.explanation.clone(),
            )
        }
        QuizPartKind::ToneIdentification => {
            let multi = sample.question_type.as_deref() == Some("multi");
            let category = sample.category.as_deref().unwrap_or("tone").to_lowercase();
            let text = if multi {
                "Identify the 2 most dominant tones in the caption".to_string()
            } else {
                match category.as_str() {
                    "tone" => "What is the most dominant tone in the caption?".to_string(),
                    "writing style" => {
                        "What is the most dominant writing style in the caption?".to_string()
                    }
                    other => format!("Identify the most dominant {other} in the caption"),
                }
            };
            let recorded = format!(
                "Identify dominant {}",
                sample
                    .category
                    .as_deref()
                    .unwrap_or("tone")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("/")
            );
            terms.extend(sample.options.iter().cloned());
            (
                "q1".to_string(),
                text,
                recorded,
                sample.options.clone(),
                multi,
                sample.correct_answer.clone().ok_or_else(|| missing("correct_answer"))?,
                sample.explanation.clone(),
            )
        }
    };

    let input = if multi {
        QuestionInput::Multi { select: super::validation::MULTI_SELECT_COUNT }
    } else {
        QuestionInput::Single
    };

    Ok(QuizQuestion {
        question: Question {
            id,
            number: sub_question + 1,
            text,
            options,
            input,
        },
        answer,
        explanation,
        recorded_text,
        terms,
    })
}
