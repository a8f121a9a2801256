pub mod anamnesis;
pub mod note;
pub mod exam;
pub mod prescription;
pub mod record;

pub use anamnesis::AnamnesisService;
pub use note::NoteService;
pub use exam::ExamService;
pub use prescription::PrescriptionService;
pub use record::RecordService;
