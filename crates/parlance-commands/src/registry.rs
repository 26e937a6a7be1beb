//! The top-level command trie: registration and greedy resolution.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::command::{CommandNode, CommandSpec};
use crate::error::RegistrationError;
use crate::tokenizer::Token;

/// Owns the top-level command nodes and resolves token sequences to the
/// deepest matching node. Multiple independent registries may coexist.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    roots: Vec<CommandNode>,
    root_index: HashMap<String, usize>,
    case_insensitive: bool,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches command names and aliases case-insensitively.
    pub fn with_case_insensitive(mut self, flag: bool) -> Self {
        self.case_insensitive = flag;
        self
    }

    fn normalize(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Registers a command (or subcommand, when the spec carries a
    /// parent path). Duplicate names or aliases among siblings fail the
    /// registration without affecting other commands.
    pub fn register(&mut self, spec: CommandSpec) -> Result<(), RegistrationError> {
        let keys: Vec<String> = std::iter::once(&spec.name)
            .chain(spec.aliases.iter())
            .map(|n| self.normalize(n))
            .collect();

        if spec.parent_path.is_empty() {
            for key in &keys {
                if self.root_index.contains_key(key) {
                    return Err(RegistrationError::DuplicateName(key.clone()));
                }
            }
            let qualified = spec.name.clone();
            let node = CommandNode::from_spec(spec, qualified)?;
            info!(command = node.qualified_name(), "registered command");

            let index = self.roots.len();
            self.roots.push(node);
            for key in keys {
                self.root_index.insert(key, index);
            }
            return Ok(());
        }

        let path = spec.parent_path.clone();
        let parent = self
            .find_mut(&path)
            .ok_or_else(|| RegistrationError::UnknownParent(path.join(" ")))?;
        let qualified = format!("{} {}", parent.qualified_name(), spec.name);
        let node = CommandNode::from_spec(spec, qualified)?;
        info!(command = node.qualified_name(), "registered subcommand");
        parent.add_child(node, keys)
    }

    fn find_mut(&mut self, path: &[String]) -> Option<&mut CommandNode> {
        let case_insensitive = self.case_insensitive;
        let normalize = |name: &str| {
            if case_insensitive {
                name.to_lowercase()
            } else {
                name.to_string()
            }
        };

        let (first, rest) = path.split_first()?;
        let index = *self.root_index.get(&normalize(first))?;
        let mut node = &mut self.roots[index];
        for segment in rest {
            node = node.child_mut(&normalize(segment))?;
        }
        Some(node)
    }

    /// Resolves leading tokens to the deepest matching command node,
    /// greedily. Returns the node and the number of tokens consumed, or
    /// `None` when the first token matches no top-level command.
    pub fn resolve<'a>(&'a self, tokens: &[Token]) -> Option<(&'a CommandNode, usize)> {
        let first = tokens.first()?;
        let index = *self.root_index.get(&self.normalize(&first.text))?;
        let root = &self.roots[index];
        if !root.enabled() {
            return None;
        }

        let mut node = root;
        let mut consumed = 1;
        while let Some(token) = tokens.get(consumed) {
            match node.child(&self.normalize(&token.text)) {
                Some(child) if child.enabled() => {
                    node = child;
                    consumed += 1;
                }
                _ => break,
            }
        }

        debug!(command = node.qualified_name(), consumed, "resolved command");
        Some((node, consumed))
    }

    /// Gets a command by its space-separated qualified path.
    pub fn get(&self, path: &str) -> Option<&CommandNode> {
        let mut segments = path.split_whitespace();
        let first = segments.next()?;
        let index = *self.root_index.get(&self.normalize(first))?;
        let mut node = &self.roots[index];
        for segment in segments {
            node = node.child(&self.normalize(segment))?;
        }
        Some(node)
    }

    /// Removes a top-level command by name or alias. Removing by alias
    /// detaches only that alias; removing by name drops the command and
    /// all of its aliases.
    pub fn remove(&mut self, name: &str) {
        let key = self.normalize(name);
        let Some(index) = self.root_index.get(&key).copied() else {
            return;
        };

        if self.normalize(self.roots[index].name()) != key {
            // an alias: detach just that key
            self.root_index.remove(&key);
            return;
        }

        self.root_index.retain(|_, i| *i != index);
        self.roots.swap_remove(index);
        // the swapped-in node (previously last) keeps its keys pointing
        // at the old slot; repoint them
        let moved = self.roots.len();
        for value in self.root_index.values_mut() {
            if *value == moved {
                *value = index;
            }
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root_index.contains_key(&self.normalize(name))
    }

    /// Iterates the unique top-level commands, for help output.
    pub fn commands(&self) -> impl Iterator<Item = &CommandNode> {
        self.roots.iter()
    }

    /// Number of unique top-level commands.
    pub fn count(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
