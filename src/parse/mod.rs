pub mod command;
pub mod date;

pub use command::{Command, CommandParser};
pub use date::{format_timestamp, parse_timestamp};
