pub mod aggregator;
pub mod extractor;
pub mod ollama;
pub mod report_writer;

pub use aggregator::{summarize, verify_consistency};
pub use extractor::{AnswerExtractor, MatchStrategy};
pub use ollama::{AskReply, ModelInfo, OllamaClient};
pub use report_writer::ReportWriter;
