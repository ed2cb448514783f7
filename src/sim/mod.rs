pub mod event;
pub mod stats;
pub mod step;
pub mod world;
