//! The privilege tier policy.
//!
//! Privileges form a ladder ordered by `privilege_rank`. A nickname may only ever climb: buying the same
//! privilege twice or buying one at or below the highest rank the nickname already holds is rejected before any
//! money moves. An upgrade carries the full price of the highest owned privilege as a trade-in credit.

use dpg_common::Rubles;

use crate::db_types::{OwnedPrivilege, Product, ProductCategory};

/// The outcome of checking a candidate privilege purchase against what the nickname already owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierCheck {
    /// Not a privilege, or the nickname holds nothing comparable. No credit applies.
    NotApplicable,
    /// A legal upgrade. The credit is the list price of the highest-ranked privilege already owned.
    Upgrade { credit: Rubles, traded_in: String },
    /// The nickname has already completed an order for this exact product.
    DuplicatePrivilege { product: String },
    /// The candidate ranks at or below the highest privilege already owned.
    Downgrade { candidate: String, owned: String },
}

impl TierCheck {
    /// The trade-in credit, if the check produced one.
    pub fn credit(&self) -> Option<Rubles> {
        match self {
            TierCheck::Upgrade { credit, .. } => Some(*credit),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, TierCheck::DuplicatePrivilege { .. } | TierCheck::Downgrade { .. })
    }
}

/// Evaluate the tier policy for `candidate` against the privileges `owned` by the nickname.
///
/// Owned entries without a rank are ignored; they sit outside the ladder. The duplicate check runs first, so
/// re-buying the top privilege reports [`TierCheck::DuplicatePrivilege`] rather than a downgrade.
pub fn check_tier(candidate: &Product, owned: &[OwnedPrivilege]) -> TierCheck {
    if candidate.category != ProductCategory::Privilege {
        return TierCheck::NotApplicable;
    }
    if owned.iter().any(|p| p.product_id == candidate.id) {
        return TierCheck::DuplicatePrivilege { product: candidate.name.clone() };
    }
    let Some(candidate_rank) = candidate.privilege_rank else {
        return TierCheck::NotApplicable;
    };
    let highest = owned
        .iter()
        .filter(|p| p.privilege_rank.is_some())
        .max_by_key(|p| p.privilege_rank.unwrap_or(i64::MIN));
    let Some(highest) = highest else {
        return TierCheck::NotApplicable;
    };
    let highest_rank = highest.privilege_rank.unwrap_or(i64::MIN);
    if highest_rank >= candidate_rank {
        return TierCheck::Downgrade { candidate: candidate.name.clone(), owned: highest.name.clone() };
    }
    TierCheck::Upgrade { credit: highest.price, traded_in: highest.name.clone() }
}
