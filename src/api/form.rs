//! Form Parsing
//!
//! Reads urlencoded or multipart bodies into an [`ActionForm`] and converts
//! its loosely-typed fields into typed inputs. Anything that does not parse
//! cleanly is rejected with a validation error rather than coerced.

use super::error::ApiError;
use crate::core::{
    MachineInput,
    repository::{PricingInput, SpecificationInput},
};
use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use std::collections::HashMap;
use tracing::debug;

/// A file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-declared name; only its extension is ever used
    pub filename: String,
    /// Raw content of the part
    pub bytes: Bytes,
}

/// Text fields and file parts of a submitted form. Repeated names keep the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

fn invalid(field: &str) -> ApiError {
    ApiError::Validation(format!("invalid {field}"))
}

/// Parses a boolean form value. Blank is false, as for an unticked checkbox sent explicitly.
fn parse_bool(field: &str, raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(invalid(field)),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(field: &str, raw: &str) -> Result<T, ApiError> {
    serde_json::from_str(raw).map_err(|e| {
        debug!("Rejected {} payload: {}", field, e);
        invalid(field)
    })
}

impl ActionForm {
    /// Builds a form from already-decoded text fields.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            files: HashMap::new(),
        }
    }

    /// Reads the request body according to its content type.
    ///
    /// Bodies that are neither urlencoded nor multipart yield an empty form.
    pub async fn read(request: Request) -> Result<Self, ApiError> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| ApiError::Validation(e.body_text()))?;
            Self::read_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
                .await
                .map_err(|e| ApiError::Validation(e.body_text()))?;
            Ok(Self::from_pairs(pairs))
        } else {
            Ok(Self::default())
        }
    }

    async fn read_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if let Some(filename) = field.file_name().map(str::to_string) {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                // Browsers send an empty part for a file input left blank
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.files.insert(name, UploadedFile { filename, bytes });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// The text field `name`, if submitted.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Whether the text field `name` was submitted at all.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The file part `name`, if submitted with content.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// A required positive integer id.
    pub fn id(&self) -> Result<i64, ApiError> {
        self.get("id")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| invalid("id"))
    }

    fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    fn optional_i64(&self, name: &str) -> Result<Option<Option<i64>>, ApiError> {
        self.get(name)
            .map(|raw| match raw.trim() {
                "" => Ok(None),
                value => value.parse::<i64>().map(Some).map_err(|_| invalid(name)),
            })
            .transpose()
    }

    fn i32_field(&self, name: &str) -> Result<Option<i32>, ApiError> {
        self.get(name)
            .map(|raw| match raw.trim() {
                "" => Ok(0),
                value => value.parse::<i32>().map_err(|_| invalid(name)),
            })
            .transpose()
    }

    fn json_field<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        self.get(name)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_json(name, raw))
            .transpose()
    }

    /// Converts the submitted fields into a [`MachineInput`]. Fields not submitted stay `None`.
    pub fn machine_input(&self) -> Result<MachineInput, ApiError> {
        Ok(MachineInput {
            name: self.text("name"),
            model: self.text("model"),
            slug: self.text("slug"),
            description: self.text("description"),
            short_description: self.text("short_description"),
            status: self.text("status"),
            category_id: self.optional_i64("category_id")?,
            featured: self
                .get("featured")
                .map(|raw| parse_bool("featured", raw))
                .transpose()?,
            sort_order: self.i32_field("sort_order")?,
            main_image: self.text("main_image").map(Some),
            specifications: self.json_field::<SpecificationInput>("specifications")?,
            pricing: self.json_field::<PricingInput>("pricing")?,
        })
    }
}
