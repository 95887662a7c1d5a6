//! Small shared helpers.

pub mod clock;
