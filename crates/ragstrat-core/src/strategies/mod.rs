//! Retrieval-augmented answering strategies

mod chunking;
pub mod decomposition;
pub mod hyde;
pub mod map_reduce;
pub mod refine;

pub use chunking::split_into_chunks;
pub use decomposition::{
    parse_decomposition, DecompositionResult, QueryDecompositionRunner, SubAnswer, SubQuery,
    SUB_QUERY_ERROR_PREFIX,
};
pub use hyde::{heuristic_prompt_type, BaselineComparison, HydeResult, HydeRunner, HypothesisCache};
pub use map_reduce::{split_context, MapReduceResult, MapReduceRunner, SplitStats};
pub use refine::{RefineResult, RefineRunner};
