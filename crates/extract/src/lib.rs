pub mod backend;
pub mod gemini;
pub mod parse;
pub mod pipeline;
pub mod prepare;

pub use backend::{BackendError, ExtractionBackend, MockBackend};
pub use gemini::{GeminiBackend, EXTRACTION_PROMPT};
pub use parse::{parse_reply, ParseError, RawRecord};
pub use pipeline::{BatchExtraction, ExtractionPipeline, PipelineError};
pub use prepare::{prepare_for_extraction, PrepareError, PreparedImage, MAX_DIMENSION};
