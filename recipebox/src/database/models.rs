//! Recipe and profile models
//!
//! Rust structs for the records the sync core moves in and out of the
//! remote document store. Documents are untyped JSON maps; the mapping
//! to and from `Recipe` is done by hand in `from_document`/`to_document`
//! so that defaults and type errors stay visible.

use crate::config::{CUSTOM_RECIPE_CATALOG_ID, DIET_PREFERENCE_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// An untyped document body as exchanged with the gateway
pub type Document = Map<String, Value>;

const FIELD_CATALOG_ID: &str = "catalogId";
const FIELD_TITLE: &str = "title";
const FIELD_CUSTOM_TITLE: &str = "customTitle";
const FIELD_IMAGE_URL: &str = "imageUrl";
const FIELD_SUMMARY: &str = "summary";
const FIELD_INGREDIENTS: &str = "ingredients";
const FIELD_INSTRUCTIONS: &str = "instructions";
const FIELD_USER_NOTES: &str = "userNotes";

/// A document field held a value of the wrong JSON type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}` expected {expected}, found {found}")]
pub struct DocumentError {
    pub field: &'static str,
    pub expected: &'static str,
    pub found: &'static str,
}

/// A saved recipe, either user-authored or derived from a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recipe {
    /// Document key in the owner's collection. `None` until first persist.
    pub remote_id: Option<String>,
    /// External catalog id; `CUSTOM_RECIPE_CATALOG_ID` for user-authored
    pub catalog_id: i64,
    pub title: String,
    pub custom_title: String,
    pub image_url: String,
    /// Free text fields may carry inline markup; rendering is the caller's job
    pub summary: String,
    pub ingredients: String,
    pub instructions: String,
    pub user_notes: String,
}

/// Where a recipe is being shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayContext {
    /// The owner's saved recipes; custom titles win
    PersonalCollection,
    /// Browsing an external catalog; the catalog title is shown as-is
    Catalog,
}

/// What the rendering layer should load for a recipe's picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Url(&'a str),
    Placeholder,
}

impl Recipe {
    /// An empty record for a brand-new user-authored recipe
    pub fn new_custom() -> Self {
        Self {
            catalog_id: CUSTOM_RECIPE_CATALOG_ID,
            ..Self::default()
        }
    }

    pub fn is_custom(&self) -> bool {
        self.catalog_id == CUSTOM_RECIPE_CATALOG_ID
    }

    pub fn is_persisted(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Resolve the title to show for this record
    pub fn display_title(&self, context: DisplayContext) -> &str {
        match context {
            DisplayContext::PersonalCollection if !self.custom_title.is_empty() => {
                self.custom_title.as_str()
            }
            _ => self.title.as_str(),
        }
    }

    pub fn image_source(&self) -> ImageSource<'_> {
        let url = self.image_url.trim();
        if url.is_empty() {
            ImageSource::Placeholder
        } else {
            ImageSource::Url(url)
        }
    }

    /// Parse a stored document into a record keyed by `remote_id`.
    ///
    /// Unknown fields are ignored and missing or `null` fields take their
    /// default. A field of the wrong type fails the whole document.
    pub fn from_document(
        remote_id: impl Into<String>,
        doc: &Document,
    ) -> Result<Self, DocumentError> {
        Ok(Self {
            remote_id: Some(remote_id.into()),
            catalog_id: int_field(doc, FIELD_CATALOG_ID)?,
            title: string_field(doc, FIELD_TITLE)?,
            custom_title: string_field(doc, FIELD_CUSTOM_TITLE)?,
            image_url: string_field(doc, FIELD_IMAGE_URL)?,
            summary: string_field(doc, FIELD_SUMMARY)?,
            ingredients: string_field(doc, FIELD_INGREDIENTS)?,
            instructions: string_field(doc, FIELD_INSTRUCTIONS)?,
            user_notes: string_field(doc, FIELD_USER_NOTES)?,
        })
    }

    /// Document body for this record. The remote id is the document key
    /// and is not part of the body.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(FIELD_CATALOG_ID.into(), Value::from(self.catalog_id));
        doc.insert(FIELD_TITLE.into(), Value::from(self.title.as_str()));
        doc.insert(
            FIELD_CUSTOM_TITLE.into(),
            Value::from(self.custom_title.as_str()),
        );
        doc.insert(FIELD_IMAGE_URL.into(), Value::from(self.image_url.as_str()));
        doc.insert(FIELD_SUMMARY.into(), Value::from(self.summary.as_str()));
        doc.insert(
            FIELD_INGREDIENTS.into(),
            Value::from(self.ingredients.as_str()),
        );
        doc.insert(
            FIELD_INSTRUCTIONS.into(),
            Value::from(self.instructions.as_str()),
        );
        doc.insert(FIELD_USER_NOTES.into(), Value::from(self.user_notes.as_str()));
        doc
    }

    /// Overwrite the editable fields from a submitted form
    pub fn apply_form(&mut self, form: &RecipeForm) {
        self.title = form.title.trim().to_string();
        self.summary = form.summary.trim().to_string();
        self.ingredients = form.ingredients.trim().to_string();
        self.instructions = form.instructions.trim().to_string();
        self.user_notes = form.user_notes.trim().to_string();
        self.image_url = form.image_url.trim().to_string();
    }
}

/// Values submitted from the add/edit recipe form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeForm {
    pub title: String,
    pub summary: String,
    pub ingredients: String,
    pub instructions: String,
    pub user_notes: String,
    pub image_url: String,
}

impl RecipeForm {
    /// Pre-fill the form from a stored record
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            title: recipe.title.clone(),
            summary: recipe.summary.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            user_notes: recipe.user_notes.clone(),
            image_url: recipe.image_url.clone(),
        }
    }
}

/// Owner profile stored alongside the recipe collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub diet: Option<String>,
}

impl Profile {
    pub fn from_document(doc: &Document) -> Result<Self, DocumentError> {
        let diet = optional_string_field(doc, DIET_PREFERENCE_FIELD)?;
        Ok(Self { diet })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn optional_string_field(
    doc: &Document,
    field: &'static str,
) -> Result<Option<String>, DocumentError> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DocumentError {
            field,
            expected: "string",
            found: type_name(other),
        }),
    }
}

fn string_field(doc: &Document, field: &'static str) -> Result<String, DocumentError> {
    Ok(optional_string_field(doc, field)?.unwrap_or_default())
}

fn int_field(doc: &Document, field: &'static str) -> Result<i64, DocumentError> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_i64().ok_or(DocumentError {
            field,
            expected: "integer",
            found: type_name(value),
        }),
    }
}
