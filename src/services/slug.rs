use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use std::collections::HashSet;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new("[^a-z0-9]+").expect("static slug pattern"));

const FALLBACK_SLUG: &str = "item";

/// Lowercases, collapses every run of non-alphanumerics to `-` and trims dashes.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_ascii_lowercase();
    let slug = NON_ALNUM.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Appends `-1`, `-2`, ... to `base` until `taken` reports the candidate free.
pub fn next_free_slug(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    let mut candidate = base.to_string();
    let mut counter = 1;
    while taken(&candidate) {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }
    candidate
}

/// Generates a slug for `source` that is unique in `column`, deleted rows included.
pub async fn unique_slug<E, C>(db: &C, column: E::Column, source: &str) -> Result<String, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let base = slugify(source);
    let taken: HashSet<String> = E::find()
        .select_only()
        .column(column)
        .filter(column.starts_with(base.as_str()))
        .into_tuple::<String>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    Ok(next_free_slug(&base, |candidate| taken.contains(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Steel & Iron Works"), "steel-iron-works");
        assert_eq!(slugify("  --Textiles--  "), "textiles");
        assert_eq!(slugify("Maharashtra-Pune"), "maharashtra-pune");
        assert_eq!(slugify("ABC 123"), "abc-123");
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(slugify(""), "item");
        assert_eq!(slugify("!!!"), "item");
    }

    #[test]
    fn next_free_slug_appends_counter() {
        let existing = ["acme", "acme-1"];
        let slug = next_free_slug("acme", |s| existing.contains(&s));
        assert_eq!(slug, "acme-2");
        assert_eq!(next_free_slug("fresh", |_| false), "fresh");
    }

    proptest! {
        #[test]
        fn slug_is_url_safe(input in ".{0,64}") {
            let slug = slugify(&input);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
