//! Application services layer.

pub mod access;
pub mod entries;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod repos;
pub mod syndication;
