pub mod acquire_response;
pub mod puzzle;
pub mod query;

pub use acquire_response::AcquireResponse;
pub use puzzle::{Puzzle, RawPuzzle};
pub use query::{ColorFilter, Partition, PuzzleQuery, SolverColor};
