pub mod packing;
pub mod poseidon;

pub use packing::{pack, unpack, PACKED_WIDTH};
pub use poseidon::*;
