//! Unicode case folding for match keys.

/// Fold `value` with full Unicode default case folding.
///
/// Plain lowercasing is not enough for names such as `STRASSE`/`straße`.
#[must_use]
pub fn fold(value: &str) -> String {
    caseless::default_case_fold_str(value)
}
