//! Query specifications and composition.

mod composer;
mod spec;

pub use composer::{compose, count_query, paginate, validate, wrap_raw_query};
pub use spec::{JoinCondition, JoinType, QuerySpec};
