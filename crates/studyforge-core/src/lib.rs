//! studyforge-core — Question-generation pipeline, data model and traits.
//!
//! Course content flows through the prompt builder, the generation client and
//! the response parser; the assembler drives that pipeline per Bloom level and
//! the evaluator asks the model to judge submitted answers.

pub mod assembler;
pub mod blueprint;
pub mod client;
pub mod content;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod prompt;
pub mod response;
pub mod traits;
