pub mod python;
pub mod signals;
pub mod summary;

pub use python::{walk, LineCategory, LineCategoryMap, StructuralWalk};
pub use signals::{NodeRef, Signal, SignalSite};
pub use summary::{RecursionShape, StructuralSummary};
