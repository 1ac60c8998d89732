// src/output/mod.rs

//! Result files.
//!
//! One file per completed connector run, named
//! `{output_dir}/{connector}-{timestamp}.json`, holding either the success
//! payload or a diagnostic JSON string.

pub mod writer;

pub use writer::{result_file_path, ResultWriter, RESULT_TIMESTAMP_FORMAT};
