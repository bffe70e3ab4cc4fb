pub mod accumulator;
pub mod evaluator;

pub use accumulator::{accumulate, EvalMetrics};
pub use evaluator::evaluate;
