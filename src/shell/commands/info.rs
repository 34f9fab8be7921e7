use anyhow::Result;
use async_trait::async_trait;
use colored::*;

use super::{Command, ShellState};
use crate::print_line;

pub struct InfoCommand;

#[async_trait]
impl Command for InfoCommand {
    fn name(&self) -> &str {
        "info"
    }

    fn usage(&self) -> &str {
        "info - show archive metadata and readiness"
    }

    async fn execute(&self, state: &mut ShellState, _args: &[String]) -> Result<()> {
        let archive = state.archive();
        let meta = archive.metadata();

        if state.json_output() {
            let payload = serde_json::json!({
                "ready": archive.is_ready(),
                "language": meta.language,
                "date": meta.date,
                "normalized_titles": meta.normalized_titles,
            });
            print_line!("{payload}");
            return Ok(());
        }

        print_line!("{}", "archive".bold());
        print_line!("  ready:             {}", archive.is_ready());
        print_line!("  language:          {}", meta.language);
        print_line!("  date:              {}", meta.date);
        print_line!("  normalized titles: {}", meta.normalized_titles);
        Ok(())
    }
}

pub struct RandomCommand;

#[async_trait]
impl Command for RandomCommand {
    fn name(&self) -> &str {
        "random"
    }

    fn usage(&self) -> &str {
        "random - jump to a random title"
    }

    async fn execute(&self, state: &mut ShellState, _args: &[String]) -> Result<()> {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let title = state.archive().get_random_title(seed).await?;
        print_line!("{}", title.name());
        Ok(())
    }
}
