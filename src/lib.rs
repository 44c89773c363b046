pub mod chunk;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod subtitle;
pub mod timeline;
pub mod transcribe;

pub use config::Config;
pub use error::{Result, VelosubError};
pub use pipeline::{
    generate_subtitles, generate_subtitles_with_cancel, print_summary, PipelineOptions,
    PipelineResult, PipelineStats,
};
