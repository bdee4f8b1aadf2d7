//! Bootstrap for the media pipeline.
//!
//! Embedding applications load a [`PipelineConfig`], call [`init_tracing`]
//! once, and hand their track store to [`build_pipeline`].

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::init_tracing;
pub use pipeline::build_pipeline;
