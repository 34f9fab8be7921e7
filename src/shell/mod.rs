pub mod commands;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use colored::*;

use evopedia::Archive;

use commands::Command;

/// REPL state: owns the archive and dispatches typed commands over it. This
/// is the thin demonstration harness a complete repo ships alongside its
/// library — exercising the five archive operations interactively, the way
/// a hosting application would, without being part of the tested library
/// surface.
pub struct ShellState {
    archive: Arc<Archive>,
    commands: HashMap<String, Arc<dyn Command>>,
    json_output: bool,
}

impl ShellState {
    pub fn new(archive: Archive, json_output: bool) -> Self {
        let mut state = ShellState {
            archive: Arc::new(archive),
            commands: HashMap::new(),
            json_output,
        };

        state.register(Arc::new(commands::title::TitleCommand));
        state.register(Arc::new(commands::prefix::PrefixCommand));
        state.register(Arc::new(commands::article::ArticleCommand));
        state.register(Arc::new(commands::geo::GeoCommand));
        state.register(Arc::new(commands::math::MathCommand));
        state.register(Arc::new(commands::info::InfoCommand));
        state.register(Arc::new(commands::info::RandomCommand));

        state
    }

    fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_string(), command);
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn json_output(&self) -> bool {
        self.json_output
    }

    pub async fn execute(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
        let cmd_name = &parts[0];
        let args = &parts[1..];

        match cmd_name.as_str() {
            "exit" | "quit" => return Err(anyhow!("exit")),
            "help" => {
                self.print_help();
                return Ok(());
            }
            _ => {}
        }

        if let Some(command) = self.commands.get(cmd_name) {
            let cmd = Arc::clone(command);
            cmd.execute(self, args).await
        } else {
            Err(anyhow!("unknown command: {cmd_name} (try 'help')"))
        }
    }

    fn print_help(&self) {
        println!("{}", "available commands".bold());
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        for name in names {
            println!("  {}", self.commands[name].usage());
        }
        println!("  help               - show this help");
        println!("  exit/quit          - exit the shell");
    }

    pub fn prompt(&self) -> String {
        format!("evopedia[{}]> ", self.archive.metadata().language)
    }
}
