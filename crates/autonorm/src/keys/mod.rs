//! Identity semantics and primary key selection.

mod identity;
mod selector;

pub use identity::{
    excluded_role, identity_semantics, key_eligibility, IdentityCheck, IdentityConfidence,
    KeyEligibility,
};
pub use selector::{
    find_presumptive_key, is_own_key_name, is_repeating_foreign_key, select_primary_key,
    singular_forms, surrogate_key_name, KeyDecision, KeyKind, KeySelection,
};
