#[derive(Debug)]
pub enum FindError {
    NotFound,
    Internal,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WriteError {
    /// The row, or a row it references, doesn't exist.
    NotFound,
    /// A uniqueness constraint was violated.
    Conflict,
    /// Deletion refused, other rows still reference this one.
    HasDependents,
    Internal,
}

mod backend_sql;
pub use backend_sql::*;
