use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use super::{Command, ShellState};
use crate::print_line;

pub struct ArticleCommand;

#[async_trait]
impl Command for ArticleCommand {
    fn name(&self) -> &str {
        "article"
    }

    fn usage(&self) -> &str {
        "article NAME - decompress and print an article's body"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("usage: {}", self.usage()));
        }
        let name = args.join(" ");

        let title = state
            .archive()
            .get_title_by_name(&name)
            .await?
            .ok_or_else(|| anyhow!("no such title: {name}"))?;

        let title = state.archive().resolve_redirect(&title).await?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner} decompressing...")?);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));

        let body = state.archive().read_article(&title).await;
        spinner.finish_and_clear();

        let body = body?;
        print_line!("{}", format!("--- {} ---", title.name()).cyan().bold());
        print_line!("{body}");
        Ok(())
    }
}
