pub mod analysis;
pub mod dashboard;
pub mod matching;
pub mod pipeline;
pub mod stats;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
