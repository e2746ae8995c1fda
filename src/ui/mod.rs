// src/ui/mod.rs

//! Terminal output. Deliberately thin: plain status lines, no animation.

pub mod renderer;

pub use renderer::Renderer;
