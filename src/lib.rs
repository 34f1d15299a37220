//! Offline shader cross-compiler and reflection pipeline.
//!
//! One compilation takes GLSL source plus a [`options::SourceOptions`]
//! record, turns it into a backend-neutral IR, cross-compiles that IR into
//! the target platform's shading language, reflects uniform/struct/input
//! layout metadata, and serializes the result as a versioned runtime stage
//! record. [`bundle`] repeats the whole pipeline across many named shaders
//! and many target backends and packs the results into one artifact.

pub mod backend;
pub mod bundle;
pub mod error;
pub mod frontend;
pub mod includer;
pub mod options;
pub mod pipeline;
pub mod reflect;
pub mod runtime_stage;
pub mod uniform_sort;

pub use error::{CompileError, Result};
pub use options::{ShaderStage, SourceLanguage, SourceOptions, TargetPlatform};
