pub mod reduction;
pub mod transforms;
