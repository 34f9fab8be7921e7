use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::*;
use humansize::{format_size, BINARY};

use super::{Command, ShellState};
use crate::print_line;

pub struct MathCommand;

#[async_trait]
impl Command for MathCommand {
    fn name(&self) -> &str {
        "math"
    }

    fn usage(&self) -> &str {
        "math HEXHASH - look up a math-rendering image by content hash"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let hash = args.first().ok_or_else(|| anyhow!("usage: {}", self.usage()))?;
        let bytes = state.archive().load_math_image(hash).await?;
        print_line!(
            "{} {}",
            "found image:".green().bold(),
            format_size(bytes.len() as u64, BINARY)
        );
        Ok(())
    }
}
