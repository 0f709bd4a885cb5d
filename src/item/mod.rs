//! Item model
//!
//! Every discovered resource, whatever its backend, is normalized into an
//! [`Item`]: a type, a scope, an ordered attribute bag holding the raw
//! backend fields, the name of the attribute that identifies the item,
//! and the [`LinkedItemQuery`] edges pointing at related resources.
//!
//! Items are value objects. They are built once per query through
//! [`ItemBuilder`] and never mutated afterwards.

mod link;
mod query;

pub use link::{Coupling, LinkedItemQuery};
pub use query::{BlastPropagation, Query, QueryMethod};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Ordered attribute bag (insertion order is preserved).
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "type")]
    item_type: String,
    unique_attribute: String,
    attributes: Attributes,
    scope: String,
    #[serde(default)]
    linked_item_queries: Vec<LinkedItemQuery>,
}

impl Item {
    pub fn builder(item_type: impl Into<String>, unique_attribute: impl Into<String>) -> ItemBuilder {
        ItemBuilder::new(item_type, unique_attribute)
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn unique_attribute(&self) -> &str {
        &self.unique_attribute
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn linked_item_queries(&self) -> &[LinkedItemQuery] {
        &self.linked_item_queries
    }

    /// Look up an attribute by dot-notation path (`settings.ipConfiguration.privateNetwork`).
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.attributes.get(head)?;
        match rest {
            Some(rest) => lookup_path(value, rest),
            None => Some(value),
        }
    }

    /// The value of the unique attribute, rendered as a string.
    pub fn unique_attribute_value(&self) -> Option<String> {
        self.attributes
            .get(&self.unique_attribute)
            .and_then(key_string)
            .filter(|s| !s.is_empty())
    }

    /// `scope.type.value`, unique across every adapter and scope.
    pub fn global_unique_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.scope,
            self.item_type,
            self.unique_attribute_value().unwrap_or_default()
        )
    }

    /// Check the invariants every wrapper must uphold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.item_type.is_empty() {
            return Err(ValidationError::EmptyType);
        }
        if self.scope.is_empty() {
            return Err(ValidationError::EmptyScope {
                item_type: self.item_type.clone(),
            });
        }
        if self.unique_attribute.is_empty() {
            return Err(ValidationError::EmptyUniqueAttribute {
                item_type: self.item_type.clone(),
            });
        }
        if self.unique_attribute_value().is_none() {
            return Err(ValidationError::MissingUniqueAttributeValue {
                item_type: self.item_type.clone(),
                attribute: self.unique_attribute.clone(),
            });
        }

        for (index, link) in self.linked_item_queries.iter().enumerate() {
            let query = &link.query;
            if query.item_type.is_empty() {
                return Err(ValidationError::empty_link_field(&self.item_type, index, "type"));
            }
            if query.query.is_empty() {
                return Err(ValidationError::empty_link_field(&self.item_type, index, "query"));
            }
            if query.scope.is_empty() {
                return Err(ValidationError::empty_link_field(&self.item_type, index, "scope"));
            }
            if !query.method.is_linkable() {
                return Err(ValidationError::InvalidLinkMethod {
                    item_type: self.item_type.clone(),
                    index,
                    method: query.method,
                });
            }
        }

        Ok(())
    }
}

/// Builds an [`Item`], validating it on completion.
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    item_type: String,
    unique_attribute: String,
    scope: String,
    attributes: Attributes,
    linked_item_queries: Vec<LinkedItemQuery>,
}

impl ItemBuilder {
    pub fn new(item_type: impl Into<String>, unique_attribute: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            unique_attribute: unique_attribute.into(),
            scope: String::new(),
            attributes: Attributes::new(),
            linked_item_queries: Vec::new(),
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Replace the attribute bag. Non-object values are ignored.
    pub fn attributes_from(mut self, value: Value) -> Self {
        if let Value::Object(map) = value {
            self.attributes = map;
        }
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn link(mut self, link: LinkedItemQuery) -> Self {
        self.linked_item_queries.push(link);
        self
    }

    pub fn links(mut self, links: impl IntoIterator<Item = LinkedItemQuery>) -> Self {
        self.linked_item_queries.extend(links);
        self
    }

    pub fn build(self) -> Result<Item, ValidationError> {
        let item = Item {
            item_type: self.item_type,
            unique_attribute: self.unique_attribute,
            attributes: self.attributes,
            scope: self.scope,
            linked_item_queries: self.linked_item_queries,
        };
        item.validate()?;
        Ok(item)
    }
}

/// Walk a JSON value using a dot-notation path; numeric segments index arrays.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) if current.is_array() => current.get(idx)?,
            _ => current.get(part)?,
        };
    }

    Some(current)
}

/// Like [`lookup_path`] but only yields non-empty strings.
pub fn lookup_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    lookup_path(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
