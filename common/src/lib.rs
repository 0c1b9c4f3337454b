pub mod capability;
pub mod math;
pub mod robot;
