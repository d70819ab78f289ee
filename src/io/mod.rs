//! File I/O for gate-level layouts.

pub mod fgl;

pub use fgl::{read_fgl_layout, write_fgl_layout};
