pub mod ir_to_pretty;
pub mod ir_to_rust;
