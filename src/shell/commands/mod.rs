use anyhow::Result;
use async_trait::async_trait;

pub mod article;
pub mod geo;
pub mod info;
pub mod math;
pub mod prefix;
pub mod title;

use super::ShellState;

/// Print with `BrokenPipe` handling (with newline); returns `Ok(())` early
/// if the pipe has gone away (e.g. output piped into `head`).
#[macro_export]
macro_rules! print_line {
    ($($arg:tt)*) => {{
        use std::io::Write;
        let result = writeln!(std::io::stdout(), $($arg)*);
        match result {
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

/// Print with `BrokenPipe` handling (no newline).
#[macro_export]
macro_rules! print_str {
    ($($arg:tt)*) => {{
        use std::io::Write;
        let result = write!(std::io::stdout(), $($arg)*);
        match result {
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }};
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn usage(&self) -> &str;
    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()>;
}
