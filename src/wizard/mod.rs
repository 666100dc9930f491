//! The participant-facing wizard: page flow, per-item steps, quiz grading and
//! study recording.

pub mod controller;
pub mod item;
pub mod questions;
pub mod quiz;
pub mod study;
pub mod validation;
pub mod view;

pub use controller::StudyController;
pub use questions::{Question, QuestionInput, QuestionSet, Reveal};
pub use quiz::PASSING_SCORE;
pub use validation::{Selection, MULTI_SELECT_COUNT};
pub use view::{ItemView, PageBody, WizardView};
