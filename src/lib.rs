//! Split large text files into overlapping chunks, optionally rewrite each
//! chunk through an LLM API, and stitch the chunks back into one text.

pub mod llm;
pub mod manifest;
pub mod measure;
pub mod merge;
pub mod process;
pub mod split;
pub mod telemetry;
