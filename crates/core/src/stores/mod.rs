pub mod flat_l2;

pub use flat_l2::FlatL2Index;
