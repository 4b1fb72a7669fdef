//! Low-level buffer and encode/decode plumbing shared by every element type.

mod buf;
mod coding;

pub use buf::*;
pub use coding::*;
