//! The command registry: an immutable verb -> handler table.
//!
//! The table is built once at startup through [`RegistryBuilder`] and never
//! changes afterwards. Lookups lowercase the verb and match exactly; there is
//! no prefix or fuzzy matching and no fallback handler.

use std::collections::HashMap;

use crate::session::Session;
use crate::{Error, Result};

/// Uniform handler contract: the free-text remainder of the input line.
///
/// Handlers that need more input prompt for it through the session.
pub type Handler = fn(&mut Session<'_>, &str) -> Result<()>;

/// Groups used by the `help` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Core,
    System,
    Network,
    Internet,
    Files,
    Utilities,
    HelpTools,
    Fun,
    Ai,
}

impl Category {
    /// Display order for help output.
    pub const ALL: [Category; 9] = [
        Category::Core,
        Category::System,
        Category::Network,
        Category::Internet,
        Category::Files,
        Category::Utilities,
        Category::HelpTools,
        Category::Fun,
        Category::Ai,
    ];

    /// Heading shown in help output.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Core => "Core",
            Category::System => "System",
            Category::Network => "Network",
            Category::Internet => "Internet",
            Category::Files => "Files",
            Category::Utilities => "Utilities",
            Category::HelpTools => "Help Tools",
            Category::Fun => "Fun",
            Category::Ai => "AI",
        }
    }
}

/// One command: a canonical verb, its aliases and its handler.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: Category,
    /// One-line description for the `help` listing.
    pub summary: &'static str,
    pub explanation: &'static str,
    /// Explanations that replace `explanation` for a specific alias.
    pub alias_explanations: Vec<(&'static str, &'static str)>,
    pub handler: Handler,
}

impl CommandEntry {
    /// Create an entry with no aliases, summary or explanation.
    pub fn new(name: &'static str, category: Category, handler: Handler) -> Self {
        Self {
            name,
            aliases: &[],
            category,
            summary: "",
            explanation: "",
            alias_explanations: Vec::new(),
            handler,
        }
    }

    /// Set the aliases that resolve to this entry.
    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Set the help-listing description.
    pub fn summary(mut self, summary: &'static str) -> Self {
        self.summary = summary;
        self
    }

    /// Set the text shown by `explain <verb>` and `<verb> explain`.
    pub fn explain(mut self, explanation: &'static str) -> Self {
        self.explanation = explanation;
        self
    }

    /// Set the text shown for `alias` instead of the entry's explanation.
    pub fn explain_alias(mut self, alias: &'static str, explanation: &'static str) -> Self {
        self.alias_explanations.push((alias, explanation));
        self
    }

    /// Explanation for the verb `key`, which must already be lowercase.
    pub fn explanation_for(&self, key: &str) -> &'static str {
        self.alias_explanations
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(key))
            .map_or(self.explanation, |&(_, text)| text)
    }

    /// The canonical name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    /// Names joined for display, e.g. `ls/dir`.
    pub fn display_name(&self) -> String {
        self.names().collect::<Vec<_>>().join("/")
    }
}

/// Immutable verb table.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<CommandEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Find the entry for `verb`, case-insensitively.
    pub fn resolve(&self, verb: &str) -> Option<&CommandEntry> {
        self.index
            .get(&verb.to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    /// Explanation text for `key`, resolving aliases.
    ///
    /// An alias with its own text wins over the entry's explanation.
    /// `None` for unknown verbs and for entries without an explanation.
    pub fn explanation(&self, key: &str) -> Option<&'static str> {
        let key = key.trim().to_lowercase();
        self.resolve(&key)
            .map(|entry| entry.explanation_for(&key))
            .filter(|text| !text.is_empty())
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Entries belonging to `category`, in registration order.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &CommandEntry> + '_ {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Number of commands (not counting aliases).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder enforcing unique verbs.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<CommandEntry>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    /// Add `entry`, failing if its name or any alias is already taken.
    pub fn register(mut self, entry: CommandEntry) -> Result<Self> {
        let idx = self.entries.len();
        for name in entry.names() {
            let key = name.to_lowercase();
            if self.index.contains_key(&key) {
                return Err(Error::InvalidInput(format!(
                    "verb '{}' is registered twice",
                    key
                )));
            }
            self.index.insert(key, idx);
        }
        self.entries.push(entry);
        Ok(self)
    }

    /// Freeze the table.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            index: self.index,
        }
    }
}
