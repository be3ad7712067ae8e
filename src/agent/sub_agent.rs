//! Sub-agent delegation
//!
//! The `call_agent` tool lets a model hand a task to another configured agent.
//! The nested agent runs its own conversation one level deeper; whatever goes
//! wrong inside it comes back to the caller as an error tool result so the
//! parent conversation can carry on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::conversation::Conversation;
use crate::agent::definition::{
    build_system_prompt, parse_model_ref, resolve_files, resolve_skill, resolve_workdir,
    AgentDefinition, AgentSource, DirectoryAgentSource,
};
use crate::agent::memory::{JsonlMemoryStore, MemoryStore};
use crate::core::{
    CallContext, Config, CredentialResolver, DelegateError, Message, Request, Response, Result,
    Tool, ToolCall, ToolParam, ToolResult,
};
use crate::llm::provider::requires_api_key;
use crate::llm::{DefaultProviderFactory, Provider, ProviderFactory};
use crate::tools::{ToolHandler, ToolRegistry};

/// Name of the delegation tool
pub const CALL_AGENT_TOOL: &str = "call_agent";

/// Appended to every post-validation failure
pub const RETRY_HINT: &str = "You may retry or proceed without this result.";

/// Declaration of the `call_agent` tool
pub fn call_agent_tool() -> Tool {
    Tool::new(
        CALL_AGENT_TOOL,
        "Delegate a task to another agent and return its answer.",
    )
    .param(
        "agent",
        ToolParam::string("Name of the agent to delegate to", true),
    )
    .param("task", ToolParam::string("The task for the agent to perform", true))
    .param(
        "context",
        ToolParam::string("Optional background information for the task", false),
    )
}

/// Per-call delegation settings
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Nesting level of the conversation issuing the call
    pub depth: usize,
    pub max_depth: usize,
    /// Agents the caller may delegate to
    pub allowed_agents: Vec<String>,
    /// Surface swallowed failures as warnings
    pub verbose: bool,
    /// Timeout for sub-agents that do not set their own
    pub timeout: Option<Duration>,
}

/// Runs agents, either at the top level or on behalf of a `call_agent` tool call
#[derive(Clone)]
pub struct SubAgentExecutor {
    agents: Arc<dyn AgentSource>,
    memory: Arc<dyn MemoryStore>,
    credentials: Arc<dyn CredentialResolver>,
    providers: Arc<dyn ProviderFactory>,
    memory_dir: PathBuf,
}

/// Builder for creating a SubAgentExecutor
pub struct SubAgentExecutorBuilder {
    agents: Arc<dyn AgentSource>,
    memory: Option<Arc<dyn MemoryStore>>,
    credentials: Option<Arc<dyn CredentialResolver>>,
    providers: Option<Arc<dyn ProviderFactory>>,
    memory_dir: Option<PathBuf>,
}

impl SubAgentExecutorBuilder {
    /// Create a new builder over an agent source
    pub fn new(agents: Arc<dyn AgentSource>) -> Self {
        Self {
            agents,
            memory: None,
            credentials: None,
            providers: None,
            memory_dir: None,
        }
    }

    /// Set the memory store
    pub fn memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set the credential resolver
    pub fn credentials(mut self, credentials: Arc<dyn CredentialResolver>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the provider factory
    pub fn providers(mut self, providers: Arc<dyn ProviderFactory>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Set the default memory directory
    pub fn memory_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.memory_dir = Some(dir.into());
        self
    }

    /// Build the executor, filling unset parts from the default configuration
    pub fn build(self) -> SubAgentExecutor {
        let config = Config::default();
        SubAgentExecutor {
            agents: self.agents,
            memory: self
                .memory
                .unwrap_or_else(|| Arc::new(JsonlMemoryStore::default())),
            memory_dir: self.memory_dir.unwrap_or_else(|| config.memory_dir.clone()),
            credentials: self.credentials.unwrap_or_else(|| Arc::new(config)),
            providers: self
                .providers
                .unwrap_or_else(|| Arc::new(DefaultProviderFactory)),
        }
    }
}

impl SubAgentExecutor {
    /// Create a builder for more control
    pub fn builder(agents: Arc<dyn AgentSource>) -> SubAgentExecutorBuilder {
        SubAgentExecutorBuilder::new(agents)
    }

    /// Executor reading agents from `config.agents_dir`
    pub fn from_config(config: &Config) -> Self {
        Self::builder(Arc::new(DirectoryAgentSource::new(&config.agents_dir)))
            .memory_dir(&config.memory_dir)
            .credentials(Arc::new(config.clone()))
            .build()
    }

    pub fn agents(&self) -> &dyn AgentSource {
        self.agents.as_ref()
    }

    /// Provider client with resolved credentials.
    ///
    /// A provider that needs an API key and has none fails here, before any
    /// request is made.
    pub fn provider(&self, name: &str) -> Result<Arc<dyn Provider>> {
        let api_key = self.credentials.resolve_api_key(name);
        if requires_api_key(name) && api_key.is_empty() {
            let var = self
                .credentials
                .api_key_env_var(name)
                .unwrap_or("the provider's API key variable");
            return Err(DelegateError::config(format!(
                "no API key for provider \"{}\" (set {})",
                name, var
            )));
        }
        let base_url = self.credentials.resolve_base_url(name);
        self.providers.create(name, &api_key, &base_url)
    }

    /// Handle one `call_agent` tool call. Never fails: every problem becomes
    /// an error result.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        call: &ToolCall,
        options: &CallOptions,
    ) -> ToolResult {
        let Some(agent) = call.get_string("agent") else {
            return ToolResult::error(
                &call.id,
                "call_agent error: missing required argument \"agent\"",
            );
        };
        let Some(task) = call.get_string("task") else {
            return ToolResult::error(
                &call.id,
                "call_agent error: missing required argument \"task\"",
            );
        };
        if !options.allowed_agents.iter().any(|a| a == agent) {
            return ToolResult::error(
                &call.id,
                format!(
                    "call_agent error: agent \"{}\" is not in this agent's sub_agents list",
                    agent
                ),
            );
        }
        if options.depth >= options.max_depth {
            return ToolResult::error(
                &call.id,
                format!(
                    "call_agent error: maximum sub-agent depth ({}) reached",
                    options.max_depth
                ),
            );
        }

        let context = call.get_string("context").unwrap_or_default();
        let nested = CallOptions {
            depth: options.depth + 1,
            ..options.clone()
        };

        tracing::info!(agent, depth = nested.depth, "delegating to sub-agent");
        match self.run_agent(ctx, agent, task, context, &nested).await {
            Ok(response) => ToolResult::success(&call.id, response.content),
            Err(e) => {
                tracing::warn!(agent, depth = nested.depth, error = %e, "sub-agent failed");
                ToolResult::error(
                    &call.id,
                    format!("sub-agent \"{}\" failed: {}. {}", agent, e, RETRY_HINT),
                )
            }
        }
    }

    /// Run `name` on `task` as a conversation at `options.depth`
    pub async fn run_agent(
        &self,
        ctx: &CallContext,
        name: &str,
        task: &str,
        context: &str,
        options: &CallOptions,
    ) -> Result<Response> {
        let definition = self.agents.load(name)?;

        let workdir = resolve_workdir(&definition)?;
        let files = resolve_files(&definition, &workdir)?;
        let skill = resolve_skill(&definition)?;
        let mut system = build_system_prompt(&definition, &workdir, &files, skill.as_deref());

        if definition.memory.enabled {
            let path = definition.memory_path(&self.memory_dir);
            match self
                .memory
                .load_entries(&definition.name, &path, definition.memory.last_n)
            {
                Ok(entries) if !entries.is_empty() => {
                    system.push_str("\n\n## Memory\n");
                    system.push_str(&entries);
                }
                Ok(_) => {}
                Err(e) if options.verbose => {
                    tracing::warn!(agent = name, error = %e, "could not load memory")
                }
                Err(e) => tracing::debug!(agent = name, error = %e, "could not load memory"),
            }
        }

        let (provider_name, model) = parse_model_ref(&definition.model)?;
        let provider = self.provider(provider_name)?;

        let mut request = Request::new(model);
        request.system = system;
        request.temperature = definition.temperature;
        request.max_tokens = definition.max_tokens;
        request.messages.push(Message::user(user_message(task, context)));

        let mut tools = ToolRegistry::new();
        if !definition.sub_agents.is_empty() && options.depth < options.max_depth {
            tools.register(Arc::new(CallAgentTool::new(
                self.clone(),
                CallOptions {
                    allowed_agents: definition.sub_agents.clone(),
                    ..options.clone()
                },
            )));
            request.tools = tools.definitions();
        }

        let ctx = match definition.timeout().or(options.timeout) {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.child(),
        };

        tracing::debug!(
            agent = name,
            provider = provider_name,
            model,
            depth = options.depth,
            tools = tools.len(),
            "running agent"
        );
        let response = Conversation::new(provider, tools)
            .run(&ctx, &mut request)
            .await?;

        if definition.memory.enabled {
            self.remember(&definition, task, &response.content, options.verbose);
        }
        Ok(response)
    }

    fn remember(&self, definition: &AgentDefinition, task: &str, result: &str, verbose: bool) {
        let path = definition.memory_path(&self.memory_dir);
        if let Err(e) = self.memory.append_entry(&path, task, result) {
            if verbose {
                tracing::warn!(agent = %definition.name, error = %e, "could not save memory");
            } else {
                tracing::debug!(agent = %definition.name, error = %e, "could not save memory");
            }
        }
    }
}

fn user_message(task: &str, context: &str) -> String {
    if context.is_empty() {
        task.to_string()
    } else {
        format!("Task: {}\n\nContext:\n{}", task, context)
    }
}

/// The `call_agent` handler bound to one conversation's delegation settings
#[derive(Clone)]
pub struct CallAgentTool {
    executor: SubAgentExecutor,
    options: CallOptions,
}

impl CallAgentTool {
    pub fn new(executor: SubAgentExecutor, options: CallOptions) -> Self {
        Self { executor, options }
    }
}

#[async_trait]
impl ToolHandler for CallAgentTool {
    fn definition(&self) -> Tool {
        call_agent_tool()
    }

    async fn execute(&self, ctx: &CallContext, call: &ToolCall) -> ToolResult {
        self.executor.execute(ctx, call, &self.options).await
    }
}
