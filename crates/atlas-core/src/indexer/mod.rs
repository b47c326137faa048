pub mod changes;
pub mod filesystem;
pub mod golang;
pub mod parser;
pub mod pipeline;
pub mod python;
