//! Rank fusion: combine ranked retrieval lists into one.

mod multi;
mod rrf;

pub use multi::{multi_query_fuse, SubQueryFusedResults};
pub use rrf::rrf_fuse;
