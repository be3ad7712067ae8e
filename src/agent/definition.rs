//! Agent definitions
//!
//! Agents are described in TOML files (`<agents_dir>/<name>.toml`):
//!
//! ```toml
//! description = "Reviews Rust code"
//! model = "anthropic/claude-sonnet-4-20250514"
//! system_prompt = "You are a careful reviewer."
//! workdir = "../project"
//! files = ["Cargo.toml"]
//! skill = "skills/review.md"
//! sub_agents = ["researcher"]
//! timeout_secs = 300
//!
//! [memory]
//! enabled = true
//! last_n = 5
//! ```
//!
//! Relative `workdir`, `skill` and memory paths resolve against the directory
//! holding the definition; attached `files` resolve against the workdir.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DelegateError, Result};

fn default_last_n() -> usize {
    10
}

/// Persistent memory settings of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySettings {
    #[serde(default)]
    pub enabled: bool,
    /// Memory file; defaults to `<memory_dir>/<name>.jsonl`
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// How many recent entries to put in the system prompt
    #[serde(default = "default_last_n")]
    pub last_n: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            last_n: default_last_n(),
        }
    }
}

/// A configured agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Defaults to the file stem
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `"provider/model"`
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub skill: Option<PathBuf>,
    /// Agents this one may delegate to
    #[serde(default)]
    pub sub_agents: Vec<String>,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: u32,
    /// Per-call timeout when invoked as a sub-agent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub memory: MemorySettings,
    /// Directory the definition was loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// A file attached to an agent's system prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    /// Path as written in the definition
    pub path: PathBuf,
    pub contents: String,
}

impl AgentDefinition {
    /// Parse a TOML definition
    pub fn parse(name: &str, source: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut definition: AgentDefinition = toml::from_str(source).map_err(|e| {
            DelegateError::agent(format!("invalid definition for agent \"{}\": {}", name, e))
        })?;
        if definition.name.is_empty() {
            definition.name = name.to_string();
        }
        definition.base_dir = base_dir.into();
        Ok(definition)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Memory file for this agent, given the default memory directory
    pub fn memory_path(&self, memory_dir: &Path) -> PathBuf {
        match &self.memory.path {
            Some(path) => self.base().join(path),
            None => memory_dir.join(format!("{}.jsonl", self.name)),
        }
    }

    /// Directory relative paths resolve against
    fn base(&self) -> PathBuf {
        if self.base_dir.as_os_str().is_empty() {
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            self.base_dir.clone()
        }
    }
}

/// Where agent definitions come from
pub trait AgentSource: Send + Sync {
    /// Load a definition by name
    fn load(&self, name: &str) -> Result<AgentDefinition>;

    /// Names of every known agent, sorted
    fn list(&self) -> Result<Vec<String>>;
}

/// Loads `<dir>/<name>.toml`
#[derive(Debug, Clone)]
pub struct DirectoryAgentSource {
    dir: PathBuf,
}

impl DirectoryAgentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AgentSource for DirectoryAgentSource {
    fn load(&self, name: &str) -> Result<AgentDefinition> {
        if name.is_empty() || name.contains(&['/', '\\'][..]) || name.starts_with('.') {
            return Err(DelegateError::agent(format!("invalid agent name \"{}\"", name)));
        }

        let path = self.dir.join(format!("{}.toml", name));
        let source = fs::read_to_string(&path).map_err(|e| {
            DelegateError::agent(format!(
                "cannot load agent \"{}\" from {}: {}",
                name,
                path.display(),
                e
            ))
        })?;
        AgentDefinition::parse(name, &source, &self.dir)
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            DelegateError::agent(format!(
                "cannot read agents directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Definitions held in memory, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentSource {
    agents: BTreeMap<String, AgentDefinition>,
}

impl InMemoryAgentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition under its name
    pub fn with_agent(mut self, definition: AgentDefinition) -> Self {
        self.agents.insert(definition.name.clone(), definition);
        self
    }
}

impl AgentSource for InMemoryAgentSource {
    fn load(&self, name: &str) -> Result<AgentDefinition> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| DelegateError::agent(format!("agent \"{}\" not found", name)))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.agents.keys().cloned().collect())
    }
}

/// Split `"provider/model"` at the first slash
pub fn parse_model_ref(model: &str) -> Result<(&str, &str)> {
    match model.split_once('/') {
        Some((provider, name)) if !provider.is_empty() && !name.is_empty() => Ok((provider, name)),
        _ => Err(DelegateError::agent(format!(
            "invalid model \"{}\": expected \"provider/model\"",
            model
        ))),
    }
}

/// Working directory for the agent; must exist
pub fn resolve_workdir(definition: &AgentDefinition) -> Result<PathBuf> {
    let base = definition.base();
    let workdir = match &definition.workdir {
        Some(dir) => base.join(dir),
        None => base,
    };
    if !workdir.is_dir() {
        return Err(DelegateError::agent(format!(
            "working directory {} for agent \"{}\" does not exist",
            workdir.display(),
            definition.name
        )));
    }
    Ok(workdir)
}

/// Read every attached file relative to `workdir`
pub fn resolve_files(definition: &AgentDefinition, workdir: &Path) -> Result<Vec<AttachedFile>> {
    definition
        .files
        .iter()
        .map(|path| {
            let full = workdir.join(path);
            let contents = fs::read_to_string(&full).map_err(|e| {
                DelegateError::agent(format!(
                    "cannot read file {} for agent \"{}\": {}",
                    full.display(),
                    definition.name,
                    e
                ))
            })?;
            Ok(AttachedFile {
                path: path.clone(),
                contents,
            })
        })
        .collect()
}

/// Skill text, if the agent names a skill file
pub fn resolve_skill(definition: &AgentDefinition) -> Result<Option<String>> {
    let Some(skill) = &definition.skill else {
        return Ok(None);
    };
    let path = definition.base().join(skill);
    fs::read_to_string(&path).map(Some).map_err(|e| {
        DelegateError::agent(format!(
            "cannot read skill {} for agent \"{}\": {}",
            path.display(),
            definition.name,
            e
        ))
    })
}

/// Assemble the system prompt from the definition and its resolved pieces
pub fn build_system_prompt(
    definition: &AgentDefinition,
    workdir: &Path,
    files: &[AttachedFile],
    skill: Option<&str>,
) -> String {
    let mut sections = Vec::new();

    if !definition.system_prompt.trim().is_empty() {
        sections.push(definition.system_prompt.trim().to_string());
    }

    if let Some(skill) = skill.map(str::trim).filter(|s| !s.is_empty()) {
        sections.push(format!("## Skill\n{}", skill));
    }

    if definition.workdir.is_some() {
        sections.push(format!("## Working Directory\n{}", workdir.display()));
    }

    if !files.is_empty() {
        let mut attached = String::from("## Attached Files");
        for file in files {
            attached.push_str(&format!(
                "\n\n### {}\n```\n{}\n```",
                file.path.display(),
                file.contents.trim_end()
            ));
        }
        sections.push(attached);
    }

    sections.join("\n\n")
}
