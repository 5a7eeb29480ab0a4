//! The per-record variant map and bulk-update planning.
//!
//! A base record owns a [`Localizations`] map keyed by [`Locale`]; key
//! uniqueness is a property of the type. [`plan_update`] decides, for a bulk
//! update, which stored variants are dropped, replaced or inserted. The store
//! applies the plan inside a single transaction.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CoreError;
use crate::locale::Locale;
use crate::resolver::{resolve_locale, Resolution};

/* --------------------------------------------------------------------------
Variant map
-------------------------------------------------------------------------- */

/// Localized variants of one base record, keyed by locale.
#[derive(Debug, Clone, PartialEq)]
pub struct Localizations<V> {
    entries: BTreeMap<Locale, V>,
}

impl<V> Localizations<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, locale: &Locale) -> Option<&V> {
        self.entries.get(locale)
    }

    pub fn contains(&self, locale: &Locale) -> bool {
        self.entries.contains_key(locale)
    }

    /// Stored locales in ascending order.
    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Locale, &V)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Insert or replace the variant for `locale`, returning the previous one.
    pub fn upsert(&mut self, locale: Locale, variant: V) -> Option<V> {
        self.entries.insert(locale, variant)
    }

    /// Pick the locale to serve for `requested`. See [`resolve_locale`].
    pub fn resolve(&self, requested: &Locale, default: &Locale) -> Result<Resolution, CoreError> {
        resolve_locale(self.entries.keys(), requested, default)
    }
}

impl<V> Default for Localizations<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(Locale, V)> for Localizations<V> {
    /// Later entries for the same locale replace earlier ones.
    fn from_iter<T: IntoIterator<Item = (Locale, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V> IntoIterator for Localizations<V> {
    type Item = (Locale, V);
    type IntoIter = std::collections::btree_map::IntoIter<Locale, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/* --------------------------------------------------------------------------
Bulk update planning
-------------------------------------------------------------------------- */

/// How a bulk update treats variants that are not part of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Keep unmentioned variants; replace or insert the submitted ones.
    Merge,
    /// Drop every stored variant, then insert the submitted ones.
    Override,
}

impl UpdateMode {
    pub fn from_override_flag(replace: bool) -> Self {
        if replace {
            UpdateMode::Override
        } else {
            UpdateMode::Merge
        }
    }
}

/// A single variant write inside an [`UpdatePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantWrite {
    Insert(Locale),
    Replace(Locale),
}

impl VariantWrite {
    pub fn locale(&self) -> &Locale {
        match self {
            VariantWrite::Insert(locale) | VariantWrite::Replace(locale) => locale,
        }
    }
}

/// Steps the store executes, in order, for one bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Delete every stored variant before writing.
    pub clear_existing: bool,
    /// One write per submitted locale, in submission order.
    pub writes: Vec<VariantWrite>,
}

impl UpdatePlan {
    pub fn inserts(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, VariantWrite::Insert(_)))
            .count()
    }

    pub fn replacements(&self) -> usize {
        self.writes.len() - self.inserts()
    }
}

/// Plan a bulk update of a variant set.
///
/// `existing` holds the locales currently stored, `submitted` the locales of
/// the request entries in order. The request must name at least one locale
/// and no locale twice.
pub fn plan_update<'a, I>(
    existing: I,
    submitted: &[Locale],
    mode: UpdateMode,
) -> Result<UpdatePlan, CoreError>
where
    I: IntoIterator<Item = &'a Locale>,
{
    if submitted.is_empty() {
        return Err(CoreError::Validation(
            "At least one localization must be provided".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for locale in submitted {
        if !seen.insert(locale) {
            return Err(CoreError::Validation(format!(
                "Duplicate localization for locale '{locale}'"
            )));
        }
    }

    let plan = match mode {
        UpdateMode::Override => UpdatePlan {
            clear_existing: true,
            writes: submitted.iter().cloned().map(VariantWrite::Insert).collect(),
        },
        UpdateMode::Merge => {
            let stored: BTreeSet<&Locale> = existing.into_iter().collect();
            let writes = submitted
                .iter()
                .map(|locale| {
                    if stored.contains(locale) {
                        VariantWrite::Replace(locale.clone())
                    } else {
                        VariantWrite::Insert(locale.clone())
                    }
                })
                .collect();
            UpdatePlan {
                clear_existing: false,
                writes,
            }
        }
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn loc(code: &str) -> Locale {
        Locale::parse(code).unwrap()
    }

    fn locales(codes: &[&str]) -> Vec<Locale> {
        codes.iter().map(|c| loc(c)).collect()
    }

    // -- Localizations --

    #[test]
    fn upsert_keeps_one_variant_per_locale() {
        let mut map = Localizations::new();
        assert!(map.upsert(loc("en"), "first").is_none());
        assert_eq!(map.upsert(loc("en"), "second"), Some("first"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&loc("en")), Some(&"second"));
    }

    #[test]
    fn locales_iterate_in_code_order() {
        let map: Localizations<()> = locales(&["fr", "de", "en"])
            .into_iter()
            .map(|l| (l, ()))
            .collect();
        let codes: Vec<&str> = map.locales().map(Locale::as_str).collect();
        assert_eq!(codes, ["de", "en", "fr"]);
    }

    #[test]
    fn resolve_delegates_to_fallback_chain() {
        let map: Localizations<&str> = [(loc("en"), "Title"), (loc("fr"), "Titre")]
            .into_iter()
            .collect();
        let res = map.resolve(&loc("de"), &loc("en")).unwrap();
        assert_eq!(res.locale, loc("en"));
        assert!(res.fallback);

        let empty: Localizations<&str> = Localizations::new();
        assert_matches!(
            empty.resolve(&loc("en"), &loc("en")),
            Err(CoreError::LocaleNotFound { .. })
        );
    }

    // -- plan_update --

    #[test]
    fn override_clears_and_inserts_everything() {
        let stored = locales(&["en", "es"]);
        let plan = plan_update(&stored, &locales(&["en", "de"]), UpdateMode::Override).unwrap();
        assert!(plan.clear_existing);
        assert_eq!(
            plan.writes,
            vec![VariantWrite::Insert(loc("en")), VariantWrite::Insert(loc("de"))]
        );
    }

    #[test]
    fn merge_replaces_known_and_inserts_new() {
        let stored = locales(&["en", "de"]);
        let plan = plan_update(&stored, &locales(&["de", "fr"]), UpdateMode::Merge).unwrap();
        assert!(!plan.clear_existing);
        assert_eq!(
            plan.writes,
            vec![VariantWrite::Replace(loc("de")), VariantWrite::Insert(loc("fr"))]
        );
        assert_eq!(plan.inserts(), 1);
        assert_eq!(plan.replacements(), 1);
    }

    #[test]
    fn merge_into_empty_set_inserts() {
        let stored: Vec<Locale> = Vec::new();
        let plan = plan_update(&stored, &locales(&["en"]), UpdateMode::Merge).unwrap();
        assert_eq!(plan.writes, vec![VariantWrite::Insert(loc("en"))]);
    }

    #[test]
    fn empty_request_rejected() {
        let stored = locales(&["en"]);
        assert_matches!(
            plan_update(&stored, &[], UpdateMode::Merge),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn duplicate_locale_in_request_rejected() {
        let stored = locales(&["en"]);
        let err = plan_update(&stored, &locales(&["fr", "fr"]), UpdateMode::Override).unwrap_err();
        assert!(err.to_string().contains("Duplicate localization for locale 'fr'"));
    }

    #[test]
    fn override_flag_maps_to_mode() {
        assert_eq!(UpdateMode::from_override_flag(true), UpdateMode::Override);
        assert_eq!(UpdateMode::from_override_flag(false), UpdateMode::Merge);
    }
}
