pub mod collect;
pub mod digest;
