//! SQL statement synthesis for record-shaped operations

mod statement;

pub use statement::Statement;
