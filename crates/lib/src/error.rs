use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parser error: {0}")]
    ParserError(#[from] crate::interchange::ParserError),
    #[error("Category tree error: {0}")]
    CategoryError(#[from] crate::category::CategoryError),
    #[error("Projection error: {0}")]
    ProjectionError(#[from] crate::currency::ProjectionError),
    #[error("Aggregation error: {0}")]
    AggregationError(#[from] crate::ledger::AggregationError),
    #[error("Rollup error: {0}")]
    RollupError(#[from] crate::rollup::RollupError),
    #[error(transparent)]
    CsvError(#[from] csv::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
