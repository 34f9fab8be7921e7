use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::*;

use super::{Command, ShellState};
use crate::{print_line, print_str};

pub struct TitleCommand;

#[async_trait]
impl Command for TitleCommand {
    fn name(&self) -> &str {
        "title"
    }

    fn usage(&self) -> &str {
        "title NAME - look up an article by exact title"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("usage: {}", self.usage()));
        }
        let name = args.join(" ");

        match state.archive().get_title_by_name(&name).await? {
            Some(t) => {
                print_str!("{} ", "found:".green().bold());
                print_line!("{}{}", t.name(), if t.is_redirect() { " (redirect)" } else { "" });
            }
            None => print_line!("{}", "no such title".yellow()),
        }
        Ok(())
    }
}
