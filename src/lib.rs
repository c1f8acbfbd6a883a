pub mod cli;
pub mod core;
pub mod jobs;
pub mod microsoft;
pub mod parse;
pub mod provider;
pub mod sync;
