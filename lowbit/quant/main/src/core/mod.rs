pub mod matrix;
pub mod sym_int4;
