//! Minimal Unix file utilities (`pwd`, `echo`, `cat`, `mkdir`, `mv`, `ln`,
//! `rmdir`, `rm`, `ls`, `cp`, `touch`, `chmod`) dispatched by command name.

pub mod cli;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod fsops;
pub mod listing;
pub mod logging;
pub mod mode;
pub mod model;
pub mod reporter;
pub mod text;
