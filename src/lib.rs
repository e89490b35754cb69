#![allow(clippy::cargo_common_metadata, clippy::module_name_repetitions)]

pub mod bundler;
pub mod config;
pub mod fmt;


pub use crate::bundler::{
    BundleError, BundleResult, BundleStats, Bundler, ResolutionMode, ResolutionPolicy,
    TrustedMirror,
};
pub use crate::config::BundlerConfig;
