//! Clone a git repository, run a security scanner over it and summarize
//! the report for the terminal or a web page.

pub mod app;
pub mod core;
pub mod scanner;
pub mod web;
