pub mod graph;
pub mod seed;
