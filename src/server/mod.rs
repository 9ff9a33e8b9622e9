pub mod builder;
pub mod listener;
pub mod policy;

pub use builder::ServerBuilder;
pub use policy::{AcceptPolicy, Unbounded};
