/// Propagation pool misuse.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool overflow: capacity {capacity}, no engine is checked out")]
    Overflow { capacity: usize },

    #[error("engine is bound to a different clique tree")]
    ForeignEngine,

    #[error("{checked_out} engines still checked out")]
    EnginesCheckedOut { checked_out: usize },

    #[error("pool capacity must be between 1 and {max}, got {capacity}")]
    InvalidCapacity { capacity: usize, max: usize },
}
