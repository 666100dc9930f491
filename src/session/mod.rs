pub mod state;
pub mod step;

pub use state::{
    ComprehensionResult, ItemKey, ItemViewState, MediaId, Page, QuizCursor, QuizFeedback,
    SessionState, StudyCursor, StudyPart, WatchedSet,
};
pub use step::ItemStep;
