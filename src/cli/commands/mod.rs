pub mod config;
pub mod evidence;
pub mod generate;
pub mod status;
pub mod validate;
