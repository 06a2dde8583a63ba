pub mod graph_utils;
pub mod gui;
pub mod interaction;
pub mod layout;
pub mod persistence;
pub mod render;
pub mod sources;
