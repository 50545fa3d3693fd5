pub mod common;
pub mod distance;
pub mod mpx;
pub mod stamp;
pub mod stomp;
pub mod stompi;
