// crates/ethd-rpc/src/registry.rs
//
// Static catalog of supported legacy RPC methods.
//
// Each handler module declares its entries as plain data next to the
// translators. The registry is assembled once, on first use. Categories are
// listed in the order they first appear across the handler tables, methods
// in declaration order within a category. Lookups fail closed: an
// unregistered name is simply absent.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::handlers::{self, Handler};

/// API group a method is listed under in `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Blockchain,
    Control,
    Network,
    Util,
    Wallet,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Blockchain => "Blockchain",
            Category::Control => "Control",
            Category::Network => "Network",
            Category::Util => "Util",
            Category::Wallet => "Wallet",
        };
        f.write_str(name)
    }
}

/// One registry entry.
#[derive(Clone, Copy)]
pub struct MethodSpec {
    pub name: &'static str,
    pub category: Category,
    /// One-line call signature shown in the `help` listing.
    pub summary: &'static str,
    /// Full text returned by `help <name>`.
    pub doc: &'static str,
    /// Number of positional arguments that must be present.
    pub min_params: usize,
    /// Largest number of positional arguments accepted.
    pub max_params: usize,
    pub handler: Handler,
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("min_params", &self.min_params)
            .field("max_params", &self.max_params)
            .finish()
    }
}

/// The assembled catalog.
#[derive(Debug)]
pub struct Registry {
    categories: Vec<Category>,
    ordered: Vec<&'static MethodSpec>,
    by_name: HashMap<&'static str, &'static MethodSpec>,
}

impl Registry {
    fn build() -> Self {
        Self::from_tables(&[
            handlers::blockchain::METHODS,
            handlers::control::METHODS,
            handlers::network::METHODS,
            handlers::util::METHODS,
            handlers::wallet::METHODS,
        ])
    }

    /// Assemble a catalog from handler tables, taken in the given order.
    pub fn from_tables(tables: &[&'static [MethodSpec]]) -> Self {
        let mut categories = Vec::new();
        for spec in tables.iter().flat_map(|t| t.iter()) {
            if !categories.contains(&spec.category) {
                categories.push(spec.category);
            }
        }

        let mut ordered = Vec::new();
        let mut by_name = HashMap::new();
        for &category in &categories {
            for spec in tables.iter().flat_map(|t| t.iter()) {
                if spec.category != category {
                    continue;
                }
                if by_name.insert(spec.name, spec).is_some() {
                    tracing::warn!("Duplicate registration of RPC method {}", spec.name);
                    continue;
                }
                ordered.push(spec);
            }
        }
        tracing::debug!("Registered {} legacy RPC methods", ordered.len());

        Self {
            categories,
            ordered,
            by_name,
        }
    }

    /// Categories in listing order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, name: &str) -> Option<&'static MethodSpec> {
        self.by_name.get(name).copied()
    }

    /// Entries in listing order.
    pub fn methods(&self) -> impl Iterator<Item = &'static MethodSpec> + '_ {
        self.ordered.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Listing of every method grouped by category, or the full text for
    /// one method. Unknown names yield a marked message, never an error.
    pub fn help(&self, command: Option<&str>) -> String {
        match command {
            Some(name) => match self.get(name) {
                Some(spec) if !spec.doc.is_empty() => spec.doc.to_string(),
                Some(spec) => spec.name.to_string(),
                None => format!("help: unknown command: {}", name),
            },
            None => {
                let mut sections = Vec::new();
                for &category in &self.categories {
                    let lines: Vec<&str> = self
                        .methods()
                        .filter(|spec| spec.category == category)
                        .map(|spec| {
                            if spec.summary.is_empty() {
                                spec.name
                            } else {
                                spec.summary
                            }
                        })
                        .collect();
                    if lines.is_empty() {
                        continue;
                    }
                    sections.push(format!("== {} ==\n{}", category, lines.join("\n")));
                }
                sections.join("\n\n")
            }
        }
    }
}

/// The process-wide catalog.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::build)
}

/// Look up a method by name.
pub fn lookup(name: &str) -> Option<&'static MethodSpec> {
    registry().get(name)
}

/// Shorthand for `registry().help(command)`.
pub fn help(command: Option<&str>) -> String {
    registry().help(command)
}
