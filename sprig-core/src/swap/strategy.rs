use std::fmt;
use std::str::FromStr;

use crate::dom::AdjacentPosition;
use crate::error::SwapError;

/// How a fragment is applied to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapStrategy {
    /// Replace the target's children with the fragment's children.
    Inner,
    /// Replace the target with the fragment.
    #[default]
    Outer,
    /// Insert the fragment's children before the target.
    Before,
    /// Insert the fragment's children after the target.
    After,
    /// Insert the fragment's children as the target's first children.
    Prepend,
    /// Insert the fragment's children as the target's last children.
    Append,
}

impl SwapStrategy {
    /// Insertion position for the adjacent strategies.
    pub fn position(self) -> Option<AdjacentPosition> {
        match self {
            SwapStrategy::Before => Some(AdjacentPosition::BeforeBegin),
            SwapStrategy::After => Some(AdjacentPosition::AfterEnd),
            SwapStrategy::Prepend => Some(AdjacentPosition::AfterBegin),
            SwapStrategy::Append => Some(AdjacentPosition::BeforeEnd),
            SwapStrategy::Inner | SwapStrategy::Outer => None,
        }
    }
}

impl FromStr for SwapStrategy {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "outer" | "outerHTML" => Ok(SwapStrategy::Outer),
            "inner" | "innerHTML" => Ok(SwapStrategy::Inner),
            "before" | "beforebegin" => Ok(SwapStrategy::Before),
            "after" | "afterend" => Ok(SwapStrategy::After),
            "prepend" | "afterbegin" => Ok(SwapStrategy::Prepend),
            "append" | "beforeend" => Ok(SwapStrategy::Append),
            other => Err(SwapError::UnknownStrategy {
                strategy: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SwapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapStrategy::Inner => "inner",
            SwapStrategy::Outer => "outer",
            SwapStrategy::Before => "before",
            SwapStrategy::After => "after",
            SwapStrategy::Prepend => "prepend",
            SwapStrategy::Append => "append",
        };
        f.write_str(name)
    }
}
