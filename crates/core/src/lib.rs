pub mod audit;
pub mod config;
pub mod document;
pub mod error;
pub mod resolve;
pub mod runner;
pub mod schema;
pub mod store;
pub mod workflow;

pub mod prelude {
    pub use crate::document::*;
    pub use crate::error::*;
    pub use crate::resolve::{Assignment, Outcome, RepresentativeResolver, Resolution};
}
