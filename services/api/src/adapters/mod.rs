pub mod completion_llm;
pub mod crf;
pub mod db;

pub use completion_llm::OpenAiCompletionAdapter;
pub use crf::{CrfModelError, CrfTagger};
pub use db::DbAdapter;
