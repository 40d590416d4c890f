//! Tool catalog entries sent to a provider.
//!
//! The catalog is provider-agnostic: a callable function with a JSON Schema
//! parameter object, or the provider-native search capability. Each driver
//! reshapes entries into its own wire schema (and the universal driver drops
//! [`ToolDeclaration::Search`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the tool catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ToolDeclaration {
    /// A callable function.
    Function {
        /// Name the model calls the function by.
        name: String,
        /// Description shown to the model.
        description: String,
        /// JSON Schema of the arguments object.
        parameters: Value,
    },
    /// Provider-native web search.
    Search,
}

impl ToolDeclaration {
    /// Function name, or `None` for search.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Function { name, .. } => Some(name),
            Self::Search => None,
        }
    }

    /// Whether this is the search capability.
    #[must_use]
    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search)
    }
}
