//! Slug derivation for entry permalinks and tags.
//!
//! Titles go through `pinyin` transliteration before `slug::slugify`, so a
//! title such as “基线对齐” still yields a usable permalink (`ji-xian-dui-qi`).
//! Uniqueness is checked against the store by the caller-provided predicate.

use std::future::Future;

use pinyin::ToPinyin;
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum UniqueSlugError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Lookup(E),
}

/// Lowercase, hyphenated form of `input`. Returns an empty string when nothing
/// representable remains.
pub fn slug_fragment(input: &str) -> String {
    slugify(transliterate(input))
}

/// Derive the base slug for a title.
pub fn derive_slug(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let slug = slug_fragment(title);
    if slug.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: title.to_string(),
        });
    }

    Ok(slug)
}

/// Derive a slug for `title` that `is_taken` reports as free, suffixing
/// `-2`, `-3`, … on collision.
pub async fn unique_slug<F, Fut, E>(title: &str, mut is_taken: F) -> Result<String, UniqueSlugError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(title)?;
    let candidates = std::iter::once(base.clone())
        .chain((2..=MAX_SUFFIX_ATTEMPTS + 1).map(|n| format!("{base}-{n}")));

    for candidate in candidates {
        if !is_taken(candidate.clone())
            .await
            .map_err(UniqueSlugError::Lookup)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted { base }.into())
}

fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            out.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(syllable) => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(syllable.plain());
                out.push(' ');
            }
            // slugify decides what to keep.
            None => out.push(ch),
        }
    }

    out
}
