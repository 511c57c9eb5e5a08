pub mod evaluator;
pub mod extractor;
pub mod pipeline;
