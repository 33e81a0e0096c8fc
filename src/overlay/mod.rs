//! Burned-in text overlays: layout math, the text engine and the per-run compositor.

pub mod compositor;
pub mod layout;
pub mod text;
