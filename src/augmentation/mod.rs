pub mod axis;
pub mod parameter_space;
