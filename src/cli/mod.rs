//! CLI module - command-line interface
//!
//! Argument definitions and the commands they dispatch to.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::{CallContext, Config, Result};

/// Delegate - run LLM agents that can delegate to each other
#[derive(Parser, Debug)]
#[command(name = "delegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/delegate/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding agent definitions
    #[arg(long, global = true)]
    pub agents_dir: Option<PathBuf>,

    /// Maximum sub-agent nesting depth
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Default timeout in seconds for each agent run
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a configured agent on a task
    Run {
        /// Agent name
        agent: String,
        /// Task for the agent
        task: String,
        /// Extra context sent along with the task
        #[arg(long, short = 'c')]
        context: Option<String>,
    },

    /// Send a single prompt to a model, without tools
    Ask {
        /// Model as provider/model, e.g. ollama/llama3.2
        #[arg(long, short = 'm')]
        model: String,
        /// System prompt
        #[arg(long, short = 's')]
        system: Option<String>,
        #[arg(long, short = 't')]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        prompt: String,
    },

    /// List configured agents
    Agents,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.agents_dir {
            config.agents_dir = dir.clone();
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(secs) = self.timeout {
            config.sub_agent_timeout_secs = Some(secs);
        }
        if self.verbose {
            config.verbose = true;
        }
    }

    /// Run the selected command and return what it prints
    pub async fn dispatch(&self, ctx: &CallContext, config: &Config) -> Result<String> {
        match &self.command {
            Command::Run {
                agent,
                task,
                context,
            } => commands::run(ctx, config, agent, task, context.as_deref().unwrap_or("")).await,
            Command::Ask {
                model,
                system,
                temperature,
                max_tokens,
                prompt,
            } => {
                let ask = commands::AskOptions {
                    model: model.clone(),
                    system: system.clone().unwrap_or_default(),
                    temperature: temperature.unwrap_or_default(),
                    max_tokens: max_tokens.unwrap_or_default(),
                };
                commands::ask(ctx, config, &ask, prompt).await
            }
            Command::Agents => commands::agents(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "delegate",
            "run",
            "helper",
            "say hello",
            "--context",
            "be brief",
            "--max-depth",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.max_depth, Some(2));
        match cli.command {
            Command::Run {
                agent,
                task,
                context,
            } => {
                assert_eq!(agent, "helper");
                assert_eq!(task, "say hello");
                assert_eq!(context.as_deref(), Some("be brief"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_ask_requires_model() {
        assert!(Cli::try_parse_from(["delegate", "ask", "hi"]).is_err());
        let cli = Cli::try_parse_from(["delegate", "ask", "-m", "ollama/llama3.2", "hi"]).unwrap();
        assert!(matches!(cli.command, Command::Ask { .. }));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "delegate",
            "--agents-dir",
            "/srv/agents",
            "--timeout",
            "30",
            "-v",
            "agents",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.agents_dir, PathBuf::from("/srv/agents"));
        assert_eq!(config.sub_agent_timeout_secs, Some(30));
        assert!(config.verbose);
    }
}
