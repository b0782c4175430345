//! Machine business logic - create, update, delete and status changes.
//!
//! Input arrives as a [`MachineInput`] where every field is optional. On create
//! a missing field takes its default. On update it keeps the stored value. A
//! field that is present always wins, even when it is an empty string. Slugs
//! are derived from the name when not given, normalised through
//! [`slugify`] and made unique by appending `-2`, `-3`, ... .

use crate::{
    core::{
        repository::{
            MachineFields, MachineFilter, MachinePage, MachineRecord, MachineRepository,
            PageRequest, PricingInput, SpecificationInput,
        },
        slug::{slugify, with_suffix},
    },
    entities::{MachineStatus, machine_pricing, machine_specification},
    errors::{Error, Result},
};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Upper bound on slug candidates tried before giving up with `Error::SlugConflict`.
pub const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Caller-supplied machine data. `None` means the field was not submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineInput {
    /// Required on create; blank is rejected
    pub name: Option<String>,
    /// Model designation
    pub model: Option<String>,
    /// Requested slug; blank derives it from the name
    pub slug: Option<String>,
    /// Long description
    pub description: Option<String>,
    /// Teaser shown in listings
    pub short_description: Option<String>,
    /// Raw status string, validated against the three wire values
    pub status: Option<String>,
    /// `Some(None)` clears the category
    pub category_id: Option<Option<i64>>,
    /// Highlight flag
    pub featured: Option<bool>,
    /// Manual ordering key
    pub sort_order: Option<i32>,
    /// `Some(None)` clears the image
    pub main_image: Option<Option<String>>,
    /// Replaces the specification row when present
    pub specifications: Option<SpecificationInput>,
    /// Replaces the pricing row when present
    pub pricing: Option<PricingInput>,
}

/// A machine together with its optional detail rows, as returned by [`MachineService::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineDetail {
    /// The machine row itself
    #[serde(flatten)]
    pub machine: MachineRecord,
    /// Technical data, if recorded
    pub specifications: Option<machine_specification::Model>,
    /// Commercial terms, if recorded
    pub pricing: Option<machine_pricing::Model>,
}

/// Orchestrates machine writes on top of a [`MachineRepository`].
#[derive(Debug, Clone)]
pub struct MachineService {
    repo: MachineRepository,
    max_slug_attempts: u32,
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Trimmed image reference; blank means no image.
fn normalize_image(image: Option<String>) -> Option<String> {
    image
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
}

fn require_name(name: String) -> Result<String> {
    if name.is_empty() {
        return Err(Error::validation("name required"));
    }
    Ok(name)
}

fn check_measure(label: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::validation(format!(
            "{label} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn validate_specifications(spec: &SpecificationInput) -> Result<()> {
    check_measure("width", spec.width)?;
    check_measure("height", spec.height)?;
    check_measure("depth", spec.depth)?;
    check_measure("weight", spec.weight)
}

fn validate_pricing(mut pricing: PricingInput) -> Result<PricingInput> {
    check_measure("base_price", pricing.base_price)?;
    let currency = pricing.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::validation("currency must be a 3-letter code"));
    }
    pricing.currency = currency;
    Ok(pricing)
}

impl MachineInput {
    /// Runs the checks that need no stored row.
    ///
    /// Callers use this to reject bad input before side effects such as
    /// storing an uploaded image. A missing name fails only when `creating`.
    ///
    /// # Errors
    /// `Error::Validation` for a blank name, an unknown status or bad detail values.
    pub fn check(&self, creating: bool) -> Result<()> {
        match self.name.as_deref() {
            Some(name) => {
                require_name(trimmed(name))?;
            }
            None if creating => return Err(Error::validation("name required")),
            None => {}
        }
        if let Some(raw) = self.status.as_deref() {
            raw.parse::<MachineStatus>()?;
        }
        if let Some(spec) = &self.specifications {
            validate_specifications(spec)?;
        }
        if let Some(pricing) = &self.pricing {
            validate_pricing(pricing.clone())?;
        }
        Ok(())
    }
}

fn is_unique_violation(err: &Error) -> bool {
    matches!(
        err,
        Error::Database(db) if matches!(db.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
    )
}

impl MachineService {
    /// Creates a service over `repo`.
    #[must_use]
    pub const fn new(repo: MachineRepository) -> Self {
        Self {
            repo,
            max_slug_attempts: MAX_SLUG_ATTEMPTS,
        }
    }

    /// Overrides the slug attempt cap.
    #[must_use]
    pub const fn with_max_slug_attempts(mut self, attempts: u32) -> Self {
        self.max_slug_attempts = attempts;
        self
    }

    /// The underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &MachineRepository {
        &self.repo
    }

    /// Lists machines; see [`MachineRepository::list`].
    pub async fn list(&self, filter: &MachineFilter, page: PageRequest) -> Result<MachinePage> {
        self.repo.list(filter, page).await
    }

    /// Loads a machine with its specification and pricing rows.
    ///
    /// # Errors
    /// `Error::MachineNotFound` if the id does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<MachineDetail> {
        let machine = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(Error::MachineNotFound { id })?;
        let specifications = self.repo.get_specification(id).await?;
        let pricing = self.repo.get_pricing(id).await?;
        Ok(MachineDetail {
            machine,
            specifications,
            pricing,
        })
    }

    /// Creates a machine and returns its id.
    ///
    /// Status defaults to draft. The slug comes from `input.slug` when non-blank
    /// and is otherwise derived from the name.
    ///
    /// # Errors
    /// - `Error::Validation` for a blank name, an unknown status or bad detail values
    /// - `Error::SlugConflict` if no free slug is found, or a concurrent create
    ///   takes the slug twice in a row
    #[instrument(skip(self, input), fields(name = ?input.name))]
    pub async fn create(&self, input: MachineInput, acting_user_id: i64) -> Result<i64> {
        let name = require_name(input.name.as_deref().map(trimmed).unwrap_or_default())?;
        let status = match input.status.as_deref() {
            Some(raw) => raw.parse::<MachineStatus>()?,
            None => MachineStatus::default(),
        };
        let candidate = slug_candidate(input.slug.as_deref(), &name);
        if let Some(spec) = &input.specifications {
            validate_specifications(spec)?;
        }
        let pricing = input.pricing.map(validate_pricing).transpose()?;

        let mut fields = MachineFields {
            name,
            model: input.model.as_deref().map(trimmed).unwrap_or_default(),
            slug: self.unique_slug(&candidate, None).await?,
            description: input.description.as_deref().map(trimmed).unwrap_or_default(),
            short_description: input
                .short_description
                .as_deref()
                .map(trimmed)
                .unwrap_or_default(),
            status,
            category_id: input.category_id.flatten(),
            featured: input.featured.unwrap_or(false),
            sort_order: input.sort_order.unwrap_or(0),
            main_image: normalize_image(input.main_image.flatten()),
            specifications: input.specifications,
            pricing,
        };

        let id = match self.repo.insert(&fields, acting_user_id).await {
            Err(err) if is_unique_violation(&err) => {
                warn!(
                    "Slug '{}' was taken concurrently, resolving again",
                    fields.slug
                );
                fields.slug = self.unique_slug(&candidate, None).await?;
                self.repo
                    .insert(&fields, acting_user_id)
                    .await
                    .map_err(|err| conflict_or(err, &fields.slug))?
            }
            other => other?,
        };

        info!("Created machine {} ('{}')", id, fields.slug);
        Ok(id)
    }

    /// Applies a partial update to machine `id`.
    ///
    /// A changed slug goes through the uniqueness check again, ignoring this
    /// machine's own row. An unchanged slug is kept as is.
    ///
    /// # Errors
    /// - `Error::MachineNotFound` if the id does not exist
    /// - `Error::Validation` if the resolved name is blank or a submitted status is unknown
    /// - `Error::SlugConflict` as for [`MachineService::create`]
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: MachineInput, acting_user_id: i64) -> Result<()> {
        let current = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(Error::MachineNotFound { id })?;

        let name = require_name(input.name.as_deref().map_or(current.name, trimmed))?;
        let status = match input.status.as_deref() {
            Some(raw) => raw.parse::<MachineStatus>()?,
            None => current.status,
        };
        let candidate = match input.slug.as_deref() {
            Some(raw) => slug_candidate(Some(raw), &name),
            None => current.slug.clone(),
        };
        if let Some(spec) = &input.specifications {
            validate_specifications(spec)?;
        }
        let pricing = input.pricing.map(validate_pricing).transpose()?;

        let slug = if candidate == current.slug {
            candidate.clone()
        } else {
            self.unique_slug(&candidate, Some(id)).await?
        };

        let mut fields = MachineFields {
            name,
            model: input.model.as_deref().map_or(current.model, trimmed),
            slug,
            description: input
                .description
                .as_deref()
                .map_or(current.description, trimmed),
            short_description: input
                .short_description
                .as_deref()
                .map_or(current.short_description, trimmed),
            status,
            category_id: input.category_id.unwrap_or(current.category_id),
            featured: input.featured.unwrap_or(current.featured),
            sort_order: input.sort_order.unwrap_or(current.sort_order),
            main_image: input
                .main_image
                .map_or(current.main_image, normalize_image),
            specifications: input.specifications,
            pricing,
        };

        let updated = match self.repo.update(id, &fields, acting_user_id).await {
            Err(err) if is_unique_violation(&err) => {
                warn!(
                    "Slug '{}' was taken concurrently, resolving again",
                    fields.slug
                );
                fields.slug = self.unique_slug(&candidate, Some(id)).await?;
                self.repo
                    .update(id, &fields, acting_user_id)
                    .await
                    .map_err(|err| conflict_or(err, &fields.slug))?
            }
            other => other?,
        };

        if !updated {
            return Err(Error::MachineNotFound { id });
        }
        Ok(())
    }

    /// Hard-deletes machine `id`. Deleting an id that does not exist succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.repo.delete(id).await? {
            info!("Machine {} was already gone", id);
        }
        Ok(())
    }

    /// Moves machine `id` to status `to`. Any status may move to any other.
    ///
    /// # Errors
    /// - `Error::Validation` if `to` is not a status wire value
    /// - `Error::MachineNotFound` if the id does not exist
    #[instrument(skip(self))]
    pub async fn toggle_status(&self, id: i64, to: &str) -> Result<MachineStatus> {
        let status = to.parse::<MachineStatus>()?;
        if !self.repo.set_status(id, status).await? {
            return Err(Error::MachineNotFound { id });
        }
        info!("Machine {} is now {}", id, status);
        Ok(status)
    }

    /// First of `candidate`, `candidate-2`, `candidate-3`, ... not used by another machine.
    async fn unique_slug(&self, candidate: &str, exclude_id: Option<i64>) -> Result<String> {
        if !self.repo.exists_with_slug(candidate, exclude_id).await? {
            return Ok(candidate.to_string());
        }
        for n in 2..=self.max_slug_attempts {
            let slug = with_suffix(candidate, n);
            if !self.repo.exists_with_slug(&slug, exclude_id).await? {
                return Ok(slug);
            }
        }
        warn!(
            "Gave up finding a free slug for '{}' after {} attempts",
            candidate, self.max_slug_attempts
        );
        Err(Error::SlugConflict {
            slug: candidate.to_string(),
        })
    }
}

/// Slug the caller asked for, or one derived from `name` when blank or absent.
fn slug_candidate(requested: Option<&str>, name: &str) -> String {
    match requested.map(str::trim) {
        Some(slug) if !slug.is_empty() => slugify(slug),
        _ => slugify(name),
    }
}

fn conflict_or(err: Error, slug: &str) -> Error {
    if is_unique_violation(&err) {
        Error::SlugConflict {
            slug: slug.to_string(),
        }
    } else {
        err
    }
}
