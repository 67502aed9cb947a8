//! Identity semantics for column names.
//!
//! A column may only serve as (or within) a key when its name carries an
//! identity marker. Uniqueness alone is never sufficient: a column of
//! all-distinct city names must never become a primary key.

/// Strong identity markers; unambiguous regardless of prefix.
const STRONG_PATTERNS: [&str; 8] = [
    "_id", "_key", "_code", "_ref", "_number", "sys_id", "uuid", "guid",
];

/// Moderate identity words, matched at word boundaries.
const MODERATE_PATTERNS: [&str; 5] = ["id", "key", "code", "ref", "number"];

/// Attribute names that must never become keys, even when unique.
///
/// Moderate-confidence identity markers do not override this list; strong
/// markers do (`product` alone is excluded, `product_code` qualifies).
const EXCLUDED_PATTERNS: [&str; 45] = [
    // Contact
    "email", "phone", "mobile", "fax", "contact",
    // Monetary / quantitative
    "price", "amount", "cost", "total", "subtotal", "tax", "discount", "quantity", "qty",
    "count", "balance", "payment", "salary", "wage",
    // Temporal
    "date", "time", "timestamp", "created", "updated", "modified",
    // Descriptive
    "name", "description", "desc", "title", "label", "comment", "note",
    // Categorical
    "status", "state", "type", "category", "class", "level", "priority",
    // Location
    "address", "street", "city", "zip", "postal", "country",
];

/// Confidence that a column name carries identity semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentityConfidence {
    None,
    Moderate,
    High,
}

/// Result of the identity-semantics check.
#[derive(Debug, Clone)]
pub struct IdentityCheck {
    /// Detected confidence level.
    pub confidence: IdentityConfidence,

    /// Why the check passed or failed.
    pub reason: String,
}

/// Check whether a column name carries identity semantics.
pub fn identity_semantics(name: &str) -> IdentityCheck {
    let lower = name.to_ascii_lowercase();

    for pattern in STRONG_PATTERNS {
        if lower.contains(pattern) {
            return IdentityCheck {
                confidence: IdentityConfidence::High,
                reason: format!("contains identity pattern '{}'", pattern),
            };
        }
    }

    let parts: Vec<&str> = lower.split('_').collect();
    for pattern in MODERATE_PATTERNS {
        if parts.contains(&pattern) {
            return IdentityCheck {
                confidence: IdentityConfidence::Moderate,
                reason: format!("contains identity word '{}'", pattern),
            };
        }
    }

    for pattern in MODERATE_PATTERNS {
        if lower.starts_with(pattern) || lower.ends_with(pattern) {
            return IdentityCheck {
                confidence: IdentityConfidence::Moderate,
                reason: format!("starts/ends with identity pattern '{}'", pattern),
            };
        }
    }

    IdentityCheck {
        confidence: IdentityConfidence::None,
        reason: "no identity semantic markers".to_string(),
    }
}

/// Whether the name matches the exclusion list of known non-identity roles.
///
/// Returns the matched pattern, honoring the high-confidence override.
pub fn excluded_role(name: &str, confidence: IdentityConfidence) -> Option<&'static str> {
    if confidence == IdentityConfidence::High {
        return None;
    }
    let lower = name.to_ascii_lowercase();
    EXCLUDED_PATTERNS.iter().copied().find(|p| lower.contains(p))
}

/// Full eligibility gate: identity semantics present and the name is not an
/// excluded attribute role.
#[derive(Debug, Clone)]
pub struct KeyEligibility {
    /// Whether the column may be considered for key candidacy.
    pub eligible: bool,

    /// Detected identity confidence.
    pub confidence: IdentityConfidence,

    /// Why the gate passed or failed.
    pub reason: String,
}

/// Evaluate the identity gate and exclusion list for a column name.
pub fn key_eligibility(name: &str) -> KeyEligibility {
    let check = identity_semantics(name);
    if check.confidence == IdentityConfidence::None {
        return KeyEligibility {
            eligible: false,
            confidence: IdentityConfidence::None,
            reason: check.reason,
        };
    }
    if let Some(pattern) = excluded_role(name, check.confidence) {
        return KeyEligibility {
            eligible: false,
            confidence: check.confidence,
            reason: format!("excluded attribute role '{}'", pattern),
        };
    }
    KeyEligibility {
        eligible: true,
        confidence: check.confidence,
        reason: check.reason,
    }
}
