//! Per-resource filter allow-lists and the filtering step.
//!
//! # Design
//! The allow-lists are `const` slices: fixed at build time and shared by
//! every call without locking. Membership is a linear scan.

use crate::types::{Filters, QueryParams};

/// Filters accepted by `GET /v2/spells/`.
pub const SPELLS_FILTERS: &[&str] = &[
    "name",
    "name__icontains",
    "classes__key__in",
    "level",
    "level__range",
    "range",
    "range__range",
    "school__name",
    "school__name__in",
    "school__key",
    "duration",
    "duration__in",
    "concentration",
    "verbal",
    "somatic",
    "material",
    "material_consumed",
    "casting_time",
];

/// Filters accepted by `GET /v1/monsters/`.
pub const MONSTERS_FILTERS: &[&str] = &[
    "name",
    "name__icontains",
    "desc",
    "desc__icontains",
    "cr",
    "cr__range",
    "hit_points",
    "hit_points__range",
    "armor_class",
    "armor_class__range",
    "type",
    "type__contains",
    "size",
    "size__contains",
];

/// Filters accepted by `GET /v1/magicitems/`.
pub const MAGIC_ITEMS_FILTERS: &[&str] = &[
    "slug",
    "slug__in",
    "name",
    "name__icontains",
    "desc",
    "desc__contains",
    "desc__in",
    "type",
    "type__contains",
    "rarity",
    "rarity__contains",
    "requires_attunement",
];

/// Keep only filters whose key is in `allowed` and whose value is set.
///
/// Input order is preserved. Unknown keys are dropped silently; values are
/// passed through untouched.
pub fn only_allowed(filters: &Filters, allowed: &[&str]) -> QueryParams {
    filters
        .iter()
        .filter_map(|(key, value)| {
            if !allowed.contains(&key) {
                tracing::trace!(key, "dropping filter not in allow-list");
                return None;
            }
            value.map(|v| (key.to_string(), v.clone()))
        })
        .collect()
}
