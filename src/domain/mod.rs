//! Domain types and the two pure state machines.

pub mod effect;
pub mod funding;
pub mod money;
pub mod payment;
pub mod ports;
pub mod scan;
pub mod session;
