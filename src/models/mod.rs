pub mod loaders;
pub mod model_config;
pub mod question;
pub mod record;

pub use loaders::{load_question_bank, parse_question_records};
pub use model_config::{ModelConfig, SizeClass};
pub use question::{
    build_prompt, prepare_questions, ChoiceSet, Difficulty, Letter, PreparedQuestion, Question,
};
pub use record::{AnswerOutcome, DifficultyStats, EvaluationRecord, FailureKind, ModelSummary};
