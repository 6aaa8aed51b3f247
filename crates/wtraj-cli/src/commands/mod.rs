//! Command implementations

pub(crate) mod collect;
pub(crate) mod inspect;
pub(crate) mod steps;
pub(crate) mod visualize;
