use serde::{Deserialize, Serialize};

/// How serious a deny-list category is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Mild language. Blocked by default but can be relaxed per deployment.
    Mild,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Violence,
    AdultContent,
    DangerousActivity,
    HateSpeech,
    Profanity,
}

impl ContentCategory {
    /// Categories in deny-list order. Flagged terms are reported in this order.
    pub const ALL: [ContentCategory; 5] = [
        ContentCategory::Violence,
        ContentCategory::AdultContent,
        ContentCategory::DangerousActivity,
        ContentCategory::HateSpeech,
        ContentCategory::Profanity,
    ];

    pub fn severity(&self) -> Severity {
        match self {
            ContentCategory::Profanity => Severity::Mild,
            _ => Severity::Severe,
        }
    }

    /// Lowercase terms matched as substrings of the lowercased input.
    pub fn terms(&self) -> &'static [&'static str] {
        match self {
            ContentCategory::Violence => &[
                "kill", "murder", "stab", "shoot", "gun", "weapon", "attack", "fight", "blood",
                "death", "die", "dead", "hurt", "injury", "injured", "violence", "violent",
            ],
            ContentCategory::AdultContent => &[
                "sex", "sexual", "nude", "naked", "adult", "porn", "xxx", "inappropriate",
                "abuse", "assault", "rape",
            ],
            ContentCategory::DangerousActivity => &[
                "drug", "drugs", "cocaine", "heroin", "meth", "alcohol", "drunk", "intoxicated",
                "suicide", "self-harm", "cutting", "overdose",
            ],
            ContentCategory::HateSpeech => &[
                "hate", "racist", "racism", "sexist", "sexism", "homophobic", "transphobic",
            ],
            ContentCategory::Profanity => &["damn", "hell", "crap"],
        }
    }
}

/// Outcome of a safety check. `reason` is present iff the text is unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_safe: bool,
    /// Matched deny-list terms, lowercase, in deny-list order.
    pub flagged_terms: Vec<String>,
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            flagged_terms: Vec::new(),
            reason: None,
        }
    }

    fn flagged(terms: Vec<String>) -> Self {
        let reason = format!("Content contains flagged terms: {}", terms.join(", "));
        Self {
            is_safe: false,
            flagged_terms: terms,
            reason: Some(reason),
        }
    }
}

/// Keyword classifier applied to generated text after the provider's own filter.
///
/// Runs purely on the returned text, so it still applies when the provider's
/// filter is missing or misconfigured. Matching is a case-insensitive substring
/// search and every matching term is reported.
#[derive(Debug, Clone)]
pub struct SafetyValidator {
    minimum_severity: Severity,
}

impl Default for SafetyValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyValidator {
    /// Validator that flags every category.
    pub fn new() -> Self {
        Self {
            minimum_severity: Severity::Mild,
        }
    }

    /// Validator that ignores categories below `minimum`.
    pub fn with_minimum_severity(minimum: Severity) -> Self {
        Self {
            minimum_severity: minimum,
        }
    }

    pub fn minimum_severity(&self) -> Severity {
        self.minimum_severity
    }

    pub fn validate(&self, content: &str) -> ValidationResult {
        // Per-char lowering has no context rules, so a substring of the input
        // always lowers to a substring of the lowered input.
        let lower: String = content.chars().flat_map(char::to_lowercase).collect();

        let flagged: Vec<String> = ContentCategory::ALL
            .iter()
            .filter(|category| category.severity() >= self.minimum_severity)
            .flat_map(|category| category.terms().iter())
            .filter(|term| lower.contains(*term))
            .map(|term| term.to_string())
            .collect();

        if flagged.is_empty() {
            ValidationResult::safe()
        } else {
            ValidationResult::flagged(flagged)
        }
    }

    /// Validate several pieces of text as one space-joined document.
    pub fn validate_items<I, S>(&self, items: I) -> ValidationResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = items
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.validate(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_text_is_safe() {
        let result = SafetyValidator::new()
            .validate("Oak Tree - Oaks can live for a thousand years in the park.");
        assert!(result.is_safe);
        assert!(result.flagged_terms.is_empty());
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_murder_is_flagged() {
        let result = SafetyValidator::new().validate("A famous MURDER mystery was written here");
        assert!(!result.is_safe);
        assert!(result.flagged_terms.contains(&"murder".to_string()));
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_every_match_collected_in_deny_list_order() {
        let result = SafetyValidator::new().validate("crap, a weapon and some alcohol");
        assert_eq!(result.flagged_terms, vec!["weapon", "alcohol", "crap"]);
        assert_eq!(
            result.reason.as_deref(),
            Some("Content contains flagged terms: weapon, alcohol, crap")
        );
    }

    #[test]
    fn test_overlapping_terms_both_reported() {
        let result = SafetyValidator::new().validate("drugs");
        assert_eq!(result.flagged_terms, vec!["drug", "drugs"]);
    }

    #[test]
    fn test_validate_items_joins_with_space() {
        let v = SafetyValidator::new();
        // "gun" only appears across the join boundary if items are concatenated
        // without a separator; with a space it must not match.
        assert!(v.validate_items(["Big", "un-fun"]).is_safe);
        assert!(!v.validate_items(["Swan", "Toy gun shop"]).is_safe);
    }

    #[test]
    fn test_minimum_severity_skips_mild_terms() {
        let relaxed = SafetyValidator::with_minimum_severity(Severity::Severe);
        assert!(relaxed.validate("What the hell is that?").is_safe);
        assert!(!relaxed.validate("a weapon").is_safe);
        assert!(!SafetyValidator::default().validate("What the hell is that?").is_safe);
    }

    #[test]
    fn test_substring_matching_is_flat() {
        // Flat substring contract: place names containing a term are flagged too.
        let result = SafetyValidator::new().validate("Shell Beach");
        assert_eq!(result.flagged_terms, vec!["hell"]);
    }

    #[test]
    fn test_all_terms_are_lowercase() {
        for category in ContentCategory::ALL {
            for term in category.terms() {
                assert_eq!(*term, term.to_lowercase());
            }
        }
    }

    fn all_terms() -> Vec<&'static str> {
        ContentCategory::ALL
            .iter()
            .flat_map(|category| category.terms().iter().copied())
            .collect()
    }

    proptest! {
        #[test]
        fn validate_is_total(text in any::<String>()) {
            let result = SafetyValidator::new().validate(&text);
            prop_assert_eq!(result.is_safe, result.reason.is_none());
            prop_assert_eq!(result.is_safe, result.flagged_terms.is_empty());
        }

        #[test]
        fn flagged_text_stays_flagged_when_embedded(
            prefix in any::<String>(),
            suffix in any::<String>(),
            term in prop::sample::select(all_terms()),
        ) {
            let v = SafetyValidator::new();
            let inner = term.to_uppercase();
            let inner_result = v.validate(&inner);
            prop_assert!(!inner_result.is_safe);
            prop_assert!(inner_result.flagged_terms.iter().any(|t| t == term));

            let outer = v.validate(&format!("{prefix}{inner}{suffix}"));
            prop_assert!(!outer.is_safe);
            for term in &inner_result.flagged_terms {
                prop_assert!(outer.flagged_terms.contains(term));
            }
        }
    }
}
