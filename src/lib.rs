//! brrtfetch — animated GIFs as terminal art next to system info.
//!
//! Pipeline: `engine` composites GIF frames, `renderer` turns them into
//! half-block glyph text in parallel, `cache` keeps the result on disk and
//! `player` loops it in the terminal.

pub mod cache;
pub mod config;
pub mod engine;
pub mod info;
pub mod player;
pub mod renderer;
pub mod types;
