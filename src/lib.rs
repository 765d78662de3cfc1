pub mod completion;
pub mod dense;
pub mod error;
pub mod evaluation;
pub mod mask;
pub mod svd;

pub use completion::{
    complete, Completion, IterationRecord, LowRankImputer, LowRankImputerBuilder, Termination,
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE,
};
pub use error::CompletionError;
pub use mask::MissingMask;
