// Library root for the terminal front end: command parsing, the interactive
// session loop and text rendering. `main.rs` only wires these together.

pub mod protocol;
pub mod render;
pub mod repl;
