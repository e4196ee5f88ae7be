//! This is the `goprop` library.
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]

pub mod algos;
pub mod ancestors;
pub mod common;
pub mod io;
pub mod propagate;

mod error;

pub use crate::error::*;
