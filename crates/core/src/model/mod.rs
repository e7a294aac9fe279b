mod ids;
pub(crate) mod question;
mod session;
mod settings;
mod snapshot;

pub use ids::{OptionLabel, SubjectId};
pub use question::{Question, QuestionError};
pub use session::{Phase, QuestionView, QuizProgress, QuizResult, ReviewItem, Session};
pub use settings::{
    QUESTIONS_PER_TEST, QuizSettings, SNAPSHOT_EVERY_SECS, SNAPSHOT_TTL_HOURS, SettingsError,
    TIME_LIMIT_SECS,
};
pub use snapshot::{Snapshot, SnapshotError};
