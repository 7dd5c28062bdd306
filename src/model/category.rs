use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The fixed set of expense categories. Anything the model (or a sheet cell) calls something else
/// is filed under `Other`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Shopping,
    Entertainment,
    Healthcare,
    #[default]
    Other,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

impl Category {
    /// All categories, in the column order used by the `Monthly_Totals` sheet.
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Shopping,
        Category::Entertainment,
        Category::Healthcare,
        Category::Other,
    ];

    /// Parses a label leniently: surrounding whitespace and case are ignored, and unrecognized
    /// labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        label
            .trim()
            .to_lowercase()
            .parse()
            .unwrap_or(Category::Other)
    }

    /// The header used for this category's column in the `Monthly_Totals` sheet.
    pub fn header(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Utilities => "Utilities",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Other => "Other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Food => "🍔",
            Category::Transport => "🚗",
            Category::Utilities => "⚡",
            Category::Shopping => "🛍️",
            Category::Entertainment => "🎬",
            Category::Healthcare => "🏥",
            Category::Other => "📋",
        }
    }

    /// Position of this category in `ALL`.
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_exact() {
        assert_eq!(Category::from_label("food"), Category::Food);
        assert_eq!(Category::from_label("healthcare"), Category::Healthcare);
    }

    #[test]
    fn test_from_label_is_lenient() {
        assert_eq!(Category::from_label(" Transport "), Category::Transport);
        assert_eq!(Category::from_label("SHOPPING"), Category::Shopping);
    }

    #[test]
    fn test_from_label_unknown_is_other() {
        assert_eq!(Category::from_label("groceries"), Category::Other);
        assert_eq!(Category::from_label(""), Category::Other);
    }

    #[test]
    fn test_display() {
        assert_eq!(Category::Entertainment.to_string(), "entertainment");
    }

    #[test]
    fn test_index_matches_all() {
        for (ix, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), ix);
        }
    }
}
