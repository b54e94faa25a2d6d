//! The TOON/BT0N tokenized document codec.
//!
//! [`TOONDocument`] is the in-memory token stream. [`toon`] marshals it to
//! JSON (compact or pretty). [`bton`] marshals it to the length-prefixed,
//! CRC-checked binary form.

pub mod bton;
pub mod token;
pub mod toon;
mod varint;

pub use token::{Token, TOONDocument};
pub use toon::{marshal_lite, marshal_lite_pretty};
pub use bton::{marshal as marshal_bton, unmarshal as unmarshal_bton};
