pub mod tick;

pub use tick::{TickConfig, TickHandler, TickLoop};
