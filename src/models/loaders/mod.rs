pub mod csv_loader;

pub use csv_loader::{load_question_bank, parse_question_records};
