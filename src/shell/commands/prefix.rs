use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::*;

use super::{Command, ShellState};
use crate::print_line;

pub struct PrefixCommand;

#[async_trait]
impl Command for PrefixCommand {
    fn name(&self) -> &str {
        "prefix"
    }

    fn usage(&self) -> &str {
        "prefix PREFIX [MAX] - list titles starting with PREFIX"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("usage: {}", self.usage()));
        }

        let trailing_count = if args.len() > 1 {
            args.last().and_then(|s| s.parse::<usize>().ok())
        } else {
            None
        };
        let (prefix_words, max) = match trailing_count {
            Some(n) => (&args[..args.len() - 1], n),
            None => (args, 20),
        };
        let prefix = prefix_words.join(" ");

        let titles = state.archive().find_titles_with_prefix(&prefix, max).await?;
        if titles.is_empty() {
            print_line!("{}", "no matches".yellow());
        }
        for t in titles {
            print_line!("  {}", t.name());
        }
        Ok(())
    }
}
