//! Image understanding: vision-model providers and the OCR extractor that
//! drives them under a deadline.

pub mod extractor;
pub mod vision;

pub use extractor::{OCR_PROMPT, TextExtractor};
pub use vision::{GeminiVision, OpenAiVision};
