//! CLI commands

use crate::agent::definition::parse_model_ref;
use crate::agent::{CallOptions, Conversation, SubAgentExecutor};
use crate::core::{CallContext, Config, Message, Request, Result};
use crate::tools::ToolRegistry;

/// Settings for a one-off prompt
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// `"provider/model"`
    pub model: String,
    pub system: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Run a configured agent as the top-level conversation
pub async fn run(
    ctx: &CallContext,
    config: &Config,
    agent: &str,
    task: &str,
    context: &str,
) -> Result<String> {
    let executor = SubAgentExecutor::from_config(config);
    let options = CallOptions {
        depth: 0,
        max_depth: config.max_depth,
        allowed_agents: Vec::new(),
        verbose: config.verbose,
        timeout: config.sub_agent_timeout(),
    };

    let response = executor.run_agent(ctx, agent, task, context, &options).await?;
    tracing::debug!(
        model = %response.model,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        stop_reason = %response.stop_reason,
        "agent finished"
    );
    Ok(response.content)
}

/// Send a single tool-free prompt
pub async fn ask(
    ctx: &CallContext,
    config: &Config,
    options: &AskOptions,
    prompt: &str,
) -> Result<String> {
    let (provider_name, model) = parse_model_ref(&options.model)?;
    let provider = SubAgentExecutor::from_config(config).provider(provider_name)?;

    let mut request = Request::new(model);
    request.system = options.system.clone();
    request.temperature = options.temperature;
    request.max_tokens = options.max_tokens;
    request.messages.push(Message::user(prompt));

    let ctx = match config.sub_agent_timeout() {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx.child(),
    };
    let response = Conversation::new(provider, ToolRegistry::new())
        .run(&ctx, &mut request)
        .await?;
    Ok(response.content)
}

/// One line per agent definition in the agents directory
pub fn agents(config: &Config) -> Result<String> {
    let executor = SubAgentExecutor::from_config(config);
    let source = executor.agents();
    let names = source.list()?;
    if names.is_empty() {
        return Ok(format!("No agents in {}", config.agents_dir.display()));
    }

    let lines: Vec<String> = names
        .iter()
        .map(|name| match source.load(name) {
            Ok(def) => {
                let mut line = format!("{:<20} {}", name, def.model);
                if !def.description.is_empty() {
                    line.push_str(&format!("  {}", def.description));
                }
                if !def.sub_agents.is_empty() {
                    line.push_str(&format!(" [delegates to: {}]", def.sub_agents.join(", ")));
                }
                line
            }
            Err(e) => format!("{:<20} (invalid: {})", name, single_line(&e.to_string())),
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Fold a multi-line error (toml reports carry a source excerpt) onto one line
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
