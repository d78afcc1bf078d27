//! Core domain logic for Shopscribe.
//!
//! Product selection, article generation and interpretation, assembly,
//! and the end-to-end pipeline that ties them to the collaborator traits
//! from `shopscribe-shared`.

pub mod assembler;
pub mod clock;
pub mod generator;
pub mod html;
pub mod interpret;
pub mod keywords;
pub mod pipeline;
pub mod season;
pub mod selector;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use keywords::SeedKeywords;
pub use pipeline::{
    Collaborators, PipelineConfig, ProgressReporter, PublishOutcome, RunResult, SilentProgress, run,
};
pub use season::SeasonCalendar;
