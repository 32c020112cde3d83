pub mod apply;
pub mod inputs;
pub mod render;
