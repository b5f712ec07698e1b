pub mod analysis;
pub mod rfp;
