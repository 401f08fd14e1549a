use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::FieldErrors;

pub mod categories;
pub mod products;
pub mod sales;

pub const MAX_TEXT_LEN: usize = 255;

/// Lets `Option<Option<T>>` tell an absent field (`None`) from an explicit
/// `null` (`Some(None)`).
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Trimmed, non-empty text of at most [`MAX_TEXT_LEN`] characters.
pub(crate) fn required_text(errors: &mut FieldErrors, field: &str, value: Option<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, "is required");
    } else if value.chars().count() > MAX_TEXT_LEN {
        errors.add(field, format!("must not exceed {MAX_TEXT_LEN} characters"));
    }
    value
}

/// Blank text collapses to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn bounded_optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
) -> Option<String> {
    let value = optional_text(value);
    if value
        .as_ref()
        .is_some_and(|v| v.chars().count() > MAX_TEXT_LEN)
    {
        errors.add(field, format!("must not exceed {MAX_TEXT_LEN} characters"));
    }
    value
}

/// `""` and `"null"` mean "no category"; anything else must be a UUID.
pub(crate) fn category_reference(errors: &mut FieldErrors, raw: Option<String>) -> Option<Uuid> {
    let raw = optional_text(raw)?;
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    match Uuid::parse_str(&raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add("category_id", "must be a valid id");
            None
        }
    }
}

pub(crate) fn entity_reference(errors: &mut FieldErrors, field: &str, raw: Option<String>) -> Uuid {
    match optional_text(raw) {
        None => {
            errors.add(field, "is required");
            Uuid::nil()
        }
        Some(raw) => Uuid::parse_str(&raw).unwrap_or_else(|_| {
            errors.add(field, "must be a valid id");
            Uuid::nil()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_null_category_mean_none() {
        let mut errors = FieldErrors::new();
        assert_eq!(category_reference(&mut errors, Some(String::new())), None);
        assert_eq!(category_reference(&mut errors, Some("null".into())), None);
        assert_eq!(category_reference(&mut errors, None), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn malformed_category_is_a_field_error() {
        let mut errors = FieldErrors::new();
        assert_eq!(category_reference(&mut errors, Some("7".into())), None);
        assert!(errors.contains("category_id"));

        let id = Uuid::new_v4();
        let mut errors = FieldErrors::new();
        assert_eq!(category_reference(&mut errors, Some(id.to_string())), Some(id));
        assert!(errors.is_empty());
    }

    #[test]
    fn required_text_is_trimmed_and_bounded() {
        let mut errors = FieldErrors::new();
        assert_eq!(required_text(&mut errors, "name", Some("  Mug ".into())), "Mug");
        assert!(errors.is_empty());

        required_text(&mut errors, "name", Some("   ".into()));
        required_text(&mut errors, "client", Some("x".repeat(256)));
        assert!(errors.contains("name"));
        assert!(errors.contains("client"));
    }
}
