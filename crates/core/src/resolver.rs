//! Locale resolution: which stored variant to serve for a requested locale.
//!
//! The fallback chain is requested -> default -> smallest stored code. Every
//! successful resolution names a locale that is actually present in the
//! variant set; an empty set is an error, never a silent default.

use crate::error::CoreError;
use crate::locale::Locale;

/// Outcome of resolving a requested locale against a variant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Locale whose variant should be served.
    pub locale: Locale,
    /// `true` when `locale` differs from the requested one.
    pub fallback: bool,
}

/// Resolve `requested` against the locales present in a variant set.
///
/// 1. Empty set: [`CoreError::LocaleNotFound`].
/// 2. `requested` present: served as is.
/// 3. `default` present: served, flagged as fallback.
/// 4. Otherwise the lexicographically smallest present code, flagged as
///    fallback. This holds for any iteration order of `available`.
pub fn resolve_locale<'a, I>(
    available: I,
    requested: &Locale,
    default: &Locale,
) -> Result<Resolution, CoreError>
where
    I: IntoIterator<Item = &'a Locale>,
{
    let mut has_default = false;
    let mut smallest: Option<&Locale> = None;

    for locale in available {
        if locale == requested {
            return Ok(Resolution {
                locale: locale.clone(),
                fallback: false,
            });
        }
        if locale == default {
            has_default = true;
        }
        smallest = match smallest {
            Some(current) if current <= locale => Some(current),
            _ => Some(locale),
        };
    }

    if has_default {
        return Ok(Resolution {
            locale: default.clone(),
            fallback: true,
        });
    }

    match smallest {
        Some(locale) => Ok(Resolution {
            locale: locale.clone(),
            fallback: true,
        }),
        None => Err(CoreError::LocaleNotFound {
            requested: requested.to_string(),
        }),
    }
}
