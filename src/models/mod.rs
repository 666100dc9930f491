pub mod participant;
pub mod response;

pub use participant::{DemographicsForm, Participant};
pub use response::{header_row, ResponseDraft, ResponseEvent, StudyPhase, RESPONSE_HEADER};
