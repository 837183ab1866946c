pub mod classifier;
pub mod client;
pub mod direction;
pub mod recommendations;
pub mod window;
