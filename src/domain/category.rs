//! Canonical report categories and the mapping from source `Type of report`
//! labels onto them.
//!
//! Classification always looks at the original report type, never at the
//! translated text.

use crate::utils::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technical,
    Flight,
    GroundHandling,
    PassengerComplaint,
    Cleaning,
    Catering,
    Other,
}

impl Category {
    /// Document order.
    pub const ALL: [Category; 7] = [
        Category::Technical,
        Category::Flight,
        Category::GroundHandling,
        Category::PassengerComplaint,
        Category::Cleaning,
        Category::Catering,
        Category::Other,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Flight => "flight",
            Category::GroundHandling => "ground_handling",
            Category::PassengerComplaint => "passenger_complaint",
            Category::Cleaning => "cleaning",
            Category::Catering => "catering",
            Category::Other => "other",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Category::Technical => "Technical",
            Category::Flight => "Flight",
            Category::GroundHandling => "Ground Handling",
            Category::PassengerComplaint => "Passenger Complaint",
            Category::Cleaning => "Cleaning",
            Category::Catering => "Catering",
            Category::Other => "Other",
        }
    }

    /// Section title printed in the Armenian report.
    pub fn display_title(&self) -> &'static str {
        match self {
            Category::Technical => "Տեխնիկական զեկույցներ՝",
            Category::Flight => "Թռիչքային զեկույցներ՝",
            Category::GroundHandling => "Վերգետնյա սպասարկում/Նստեցման հետ կապված խնդիրներ՝",
            Category::PassengerComplaint => "Ուղևորների բողոքներ՝",
            Category::Cleaning => "Օդանավի աղտոտվածության վերաբերյալ զեկույցներ՝",
            Category::Catering => "Սննդի սպասարկման վերաբերյալ զեկույցներ՝",
            Category::Other => "Այլ խնդիրներ՝",
        }
    }

    /// Template placeholder for this category's section.
    pub fn anchor(&self) -> String {
        format!("{{{{{}}}}}", self.key())
    }

    pub fn from_key(value: &str) -> Option<Category> {
        let normalized = normalize_label(value).replace([' ', '-'], "_");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.key() == normalized)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.english_name())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

const DEFAULT_LABELS: &[(&str, Category)] = &[
    ("technical", Category::Technical),
    ("technical report", Category::Technical),
    ("technical issue", Category::Technical),
    ("maintenance", Category::Technical),
    ("flight", Category::Flight),
    ("flight report", Category::Flight),
    ("flight operations", Category::Flight),
    ("ground handling", Category::GroundHandling),
    ("ground handling/boarding", Category::GroundHandling),
    ("boarding", Category::GroundHandling),
    ("passenger complaint", Category::PassengerComplaint),
    ("passenger complaints", Category::PassengerComplaint),
    ("complaint", Category::PassengerComplaint),
    ("cleaning", Category::Cleaning),
    ("cabin cleanliness", Category::Cleaning),
    ("aircraft cleanliness", Category::Cleaning),
    ("catering", Category::Catering),
    ("other", Category::Other),
];

/// Explicit label → category table. Lookups are case-insensitive and
/// whitespace-normalized; unknown labels fall back to [`Category::Other`].
#[derive(Debug, Clone)]
pub struct CategoryMap {
    labels: HashMap<String, Category>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        let labels = DEFAULT_LABELS
            .iter()
            .map(|(label, category)| (label.to_string(), *category))
            .collect();
        Self { labels }
    }
}

impl CategoryMap {
    pub fn empty() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    pub fn insert(&mut self, label: &str, category: Category) {
        self.labels.insert(normalize_label(label), category);
    }

    /// Merges `label = "category_key"` overrides on top of the defaults.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut map = Self::default();
        for (label, key) in overrides {
            let category =
                Category::from_key(key).ok_or_else(|| ReportError::InvalidConfigValueError {
                    field: format!("categories.{}", label),
                    value: key.clone(),
                    reason: format!(
                        "Unknown category. Valid categories: {}",
                        Category::ALL
                            .iter()
                            .map(|c| c.key())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                })?;
            map.insert(label, category);
        }
        Ok(map)
    }

    pub fn lookup(&self, report_type: &str) -> Option<Category> {
        self.labels.get(&normalize_label(report_type)).copied()
    }

    pub fn classify(&self, report_type: &str) -> Category {
        match self.lookup(report_type) {
            Some(category) => category,
            None => {
                tracing::debug!(
                    "Report type '{}' has no category mapping, using {}",
                    report_type,
                    Category::Other
                );
                Category::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels_are_case_and_space_insensitive() {
        let map = CategoryMap::default();
        assert_eq!(map.classify("Technical"), Category::Technical);
        assert_eq!(map.classify("  GROUND   handling "), Category::GroundHandling);
        assert_eq!(map.classify("Catering"), Category::Catering);
        assert_eq!(map.classify("Cabin Cleanliness"), Category::Cleaning);
    }

    #[test]
    fn test_unknown_label_is_other() {
        let map = CategoryMap::default();
        assert_eq!(map.lookup("Bird strike"), None);
        assert_eq!(map.classify("Bird strike"), Category::Other);
    }

    #[test]
    fn test_translated_text_never_drives_classification() {
        // Armenian section keywords are not labels in the table
        let map = CategoryMap::default();
        assert_eq!(map.classify("Տեխնիկական"), Category::Other);
    }

    #[test]
    fn test_overrides_extend_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Bird strike".to_string(), "flight".to_string());
        overrides.insert("Lost baggage".to_string(), "Ground Handling".to_string());
        let map = CategoryMap::with_overrides(&overrides).unwrap();
        assert_eq!(map.classify("bird strike"), Category::Flight);
        assert_eq!(map.classify("Lost Baggage"), Category::GroundHandling);
        assert_eq!(map.classify("Technical"), Category::Technical);
    }

    #[test]
    fn test_override_with_unknown_category_fails() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Bird strike".to_string(), "wildlife".to_string());
        assert!(CategoryMap::with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_anchor_format() {
        assert_eq!(Category::GroundHandling.anchor(), "{{ground_handling}}");
        assert_eq!(Category::ALL.len(), 7);
        assert_eq!(Category::ALL[0], Category::Technical);
        assert_eq!(Category::ALL[6], Category::Other);
    }
}
