//! Interactive browse-session logic: facet filtering and the coordinator
//! that decides where the displayed set comes from.

pub mod coordinator;
pub mod facet;

pub use coordinator::{FetchKind, FetchRequest, SearchCoordinator};
