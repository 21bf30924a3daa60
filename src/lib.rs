#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod base;
pub mod coords;
pub mod engine;
pub mod metadata;
pub mod pipeline;

#[cfg(test)]
mod testing;

use base::ConfigError;
use coords::ConvertError;
use engine::EngineError;
use pipeline::PipelineError;
use thiserror::Error;

/// Generic container type for errors.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DelayCompError {
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("conversion error")]
    Convert(#[from] ConvertError),
    #[error("engine error")]
    Engine(#[from] EngineError),
    #[error("pipeline error")]
    Pipeline(#[from] PipelineError),
}
