//! Gremlin tokens used as step arguments

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scope of a reducing or windowing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Local,
}

/// Sort direction for `order().by(..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
    Shuffle,
}

/// Which labelled object `select` picks when a label occurs more than once in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pop {
    First,
    Last,
    All,
    Mixed,
}

/// Map column selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Keys,
    Values,
}

/// Vertex property cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    Single,
    List,
    Set,
}

/// Element structure tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum T {
    Id,
    Label,
    Key,
    Value,
}

impl Scope {
    pub fn name(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Local => "local",
        }
    }
}

impl Order {
    pub fn name(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
            Order::Shuffle => "shuffle",
        }
    }
}

impl Pop {
    pub fn name(&self) -> &'static str {
        match self {
            Pop::First => "first",
            Pop::Last => "last",
            Pop::All => "all",
            Pop::Mixed => "mixed",
        }
    }
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Keys => "keys",
            Column::Values => "values",
        }
    }
}

impl Cardinality {
    pub fn name(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::List => "list",
            Cardinality::Set => "set",
        }
    }
}

impl T {
    pub fn name(&self) -> &'static str {
        match self {
            T::Id => "id",
            T::Label => "label",
            T::Key => "key",
            T::Value => "value",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        )*
    };
}

display_by_name!(Scope, Order, Pop, Column, Cardinality, T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_names() {
        assert_eq!(Scope::Local.to_string(), "local");
        assert_eq!(Order::Desc.to_string(), "desc");
        assert_eq!(Pop::All.to_string(), "all");
        assert_eq!(Column::Values.to_string(), "values");
        assert_eq!(Cardinality::Single.to_string(), "single");
        assert_eq!(T::Label.to_string(), "label");
    }
}
