//! Pure per-tick rules. Nothing here touches a device, a clock or the
//! terminal; every function takes its inputs explicitly.

pub mod combat;
pub mod dodge;
pub mod fsm;
pub mod geom;
pub mod input;
pub mod physics;
pub mod player;
pub mod push;
pub mod stage;
