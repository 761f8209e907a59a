//! Extractors that reject with the crate's `{ "error": ... }` body.

pub mod object_id_path;
pub mod validated_json;
pub mod validated_query;

pub use object_id_path::ObjectIdPath;
pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;

use std::borrow::Cow;
use validator::{ValidationErrors, ValidationErrorsKind};

/// First validation message, walking fields in name order so the result is stable.
pub(crate) fn first_validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (field, kind) in fields {
        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|err| {
                err.message
                    .clone()
                    .unwrap_or_else(|| Cow::Owned(format!("{field} is invalid")))
                    .into_owned()
            }),
            ValidationErrorsKind::Struct(inner) => Some(first_validation_message(inner)),
            ValidationErrorsKind::List(items) => items
                .values()
                .next()
                .map(|inner| first_validation_message(inner)),
        };
        if let Some(message) = found {
            return message;
        }
    }

    "Request validation failed".to_string()
}
