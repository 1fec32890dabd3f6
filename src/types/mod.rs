mod commitment;

pub use commitment::*;
