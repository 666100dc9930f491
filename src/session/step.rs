//! Per-item step machine.
//!
//! ```text
//! Watching ──(timer elapsed)──▶ Summary ──▶ Comprehension ──(answer)──▶ ComprehensionFeedback
//!    │                                                                      │
//!    └──────────────(media already comprehended)──────────▶ Content ◀───────┘
//!                                                              │
//!                                                              ▼
//!                                                   Questions { revealed: 1.. }
//! ```
//! Steps only move forward. An item leaves the machine when its answers are
//! recorded and the cursor moves past it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ItemStep {
    Watching,
    Summary,
    Comprehension,
    ComprehensionFeedback,
    Content,
    /// `revealed` questions are visible; the next one appears once the last
    /// visible one has been answered.
    Questions { revealed: usize },
}

impl ItemStep {
    pub const FIRST_QUESTION: ItemStep = ItemStep::Questions { revealed: 1 };

    /// Numbered position: 1 gate, 2 summary, 3–4 comprehension, 5 content,
    /// 6 and up for questions.
    pub fn number(&self) -> usize {
        match self {
            ItemStep::Watching => 1,
            ItemStep::Summary => 2,
            ItemStep::Comprehension => 3,
            ItemStep::ComprehensionFeedback => 4,
            ItemStep::Content => 5,
            ItemStep::Questions { revealed } => 5 + revealed,
        }
    }

    pub fn allows(&self, next: &ItemStep) -> bool {
        use ItemStep::*;
        match (self, next) {
            (Watching, Summary)
            | (Summary, Comprehension)
            | (Comprehension, ComprehensionFeedback)
            | (ComprehensionFeedback, Content) => true,
            (Content, Questions { revealed }) => *revealed >= 1,
            (Questions { revealed: from }, Questions { revealed: to }) => to > from,
            _ => false,
        }
    }

    pub fn content_visible(&self) -> bool {
        self.number() >= ItemStep::Content.number()
    }

    pub fn summary_visible(&self) -> bool {
        self.number() >= ItemStep::Summary.number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_matches_gate_layout() {
        assert_eq!(ItemStep::Watching.number(), 1);
        assert_eq!(ItemStep::ComprehensionFeedback.number(), 4);
        assert_eq!(ItemStep::Content.number(), 5);
        assert_eq!(ItemStep::FIRST_QUESTION.number(), 6);
        assert_eq!(ItemStep::Questions { revealed: 3 }.number(), 8);
    }

    #[test]
    fn transitions_only_move_forward() {
        let chain = [
            ItemStep::Watching,
            ItemStep::Summary,
            ItemStep::Comprehension,
            ItemStep::ComprehensionFeedback,
            ItemStep::Content,
            ItemStep::FIRST_QUESTION,
            ItemStep::Questions { revealed: 2 },
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].allows(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
            assert!(!pair[1].allows(&pair[0]), "{:?} -> {:?}", pair[1], pair[0]);
            assert!(pair[0].number() < pair[1].number());
        }
    }

    #[test]
    fn gate_steps_cannot_be_skipped_by_transition() {
        assert!(!ItemStep::Watching.allows(&ItemStep::Content));
        assert!(!ItemStep::Summary.allows(&ItemStep::ComprehensionFeedback));
        assert!(!ItemStep::Content.allows(&ItemStep::Questions { revealed: 0 }));
        assert!(!ItemStep::FIRST_QUESTION.allows(&ItemStep::FIRST_QUESTION));
    }
}
