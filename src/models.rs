use serde_json::{Map, Value};

use crate::object_id::ObjectId;

/// A schema-flexible film document: field name to any JSON value.
pub type Document = Map<String, Value>;

/// Wire name of the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    StringList,
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::StringList => {
                value.as_array().is_some_and(|items| items.iter().all(Value::is_string))
            },
            FieldKind::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::StringList => "an array of strings",
            FieldKind::Object => "an object",
        }
    }
}

pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(name: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec { name, kind, required }
}

pub const FILM_SCHEMA: &[FieldSpec] = &[
    field("title", FieldKind::String, true),
    field("year", FieldKind::Number, true),
    field("cast", FieldKind::StringList, true),
    field("plot", FieldKind::String, false),
    field("fullplot", FieldKind::String, false),
    field("genres", FieldKind::StringList, false),
    field("rated", FieldKind::String, false),
    field("metacritic", FieldKind::Number, false),
    field("languages", FieldKind::StringList, false),
    field("writers", FieldKind::StringList, false),
    field("poster", FieldKind::String, false),
    field("num_mflix_comments", FieldKind::Number, false),
    field("awards", FieldKind::Object, false),
    field("countries", FieldKind::StringList, false),
    field("directors", FieldKind::StringList, false),
    field("runtime", FieldKind::Number, false),
    field("imdb", FieldKind::Object, false),
];

/// Every rule a submitted body broke, keyed by field name.
#[derive(Clone, Debug, Default, thiserror::Error)]
#[error("{}", self.summary())]
pub struct ValidationError {
    pub errors: Map<String, Value>,
}

impl ValidationError {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| Value::String(message.into()));
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }

    fn summary(&self) -> String {
        let details = self
            .errors
            .iter()
            .map(|(field, msg)| format!("{field}: {}", msg.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Film validation failed: {details}")
    }
}

/// Checks a body submitted for creation. The store assigns the id, so the
/// body must not carry one.
pub fn validate_new(doc: &Document) -> Result<(), ValidationError> {
    let mut err = ValidationError::default();

    if doc.contains_key(ID_FIELD) {
        err.push(ID_FIELD, "Path `_id` is assigned by the store and must not be supplied.");
    }
    check_field_names(doc, &mut err);

    for spec in FILM_SCHEMA {
        match doc.get(spec.name) {
            None | Some(Value::Null) if spec.required => {
                err.push(spec.name, format!("Path `{}` is required.", spec.name));
            },
            Some(value) => check_kind(spec, value, &mut err),
            None => {},
        }
    }

    err.into_result()
}

/// Turns an update body into a `$set` patch addressed at `id`.
///
/// An embedded `_id` equal to `id` is dropped; any other `_id` is rejected
/// rather than silently overridden.
pub fn prepare_patch(id: ObjectId, mut doc: Document) -> Result<Document, ValidationError> {
    let mut err = ValidationError::default();

    if let Some(embedded) = doc.remove(ID_FIELD) {
        let matches = embedded
            .as_str()
            .and_then(|s| s.parse::<ObjectId>().ok())
            .is_some_and(|embedded| embedded == id);
        if !matches {
            err.push(
                ID_FIELD,
                format!("Body `_id` {embedded} does not match the addressed film {id}."),
            );
        }
    }
    check_field_names(&doc, &mut err);

    for spec in FILM_SCHEMA {
        match doc.get(spec.name) {
            Some(Value::Null) if spec.required => {
                err.push(spec.name, format!("Path `{}` is required.", spec.name));
            },
            Some(value) => check_kind(spec, value, &mut err),
            None => {},
        }
    }

    err.into_result().map(|()| doc)
}

fn check_kind(spec: &FieldSpec, value: &Value, err: &mut ValidationError) {
    // Optional fields may be cleared explicitly.
    if value.is_null() && !spec.required {
        return;
    }
    if !spec.kind.matches(value) {
        err.push(spec.name, format!("Path `{}` must be {}.", spec.name, spec.kind.describe()));
    }
}

/// Names end up inside quoted JSON path labels, which the store copies into
/// the document verbatim, so anything needing an escape is refused.
fn check_field_names(doc: &Document, err: &mut ValidationError) {
    for name in doc.keys() {
        let needs_escape = name.chars().any(|c| matches!(c, '.' | '"' | '\\') || c.is_control());
        if name.is_empty() || name.starts_with('$') || needs_escape {
            err.push(name, format!("Field name `{name}` is not allowed."));
        }
    }
}
