pub mod analysis;
pub mod cost;
pub mod evidence;
pub mod progress;
pub mod sanitize;
pub mod status;
