pub mod graph;
pub mod oauth;

pub use graph::GraphProvider;
