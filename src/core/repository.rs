//! Machine persistence - the only code that queries the `machines` table.
//!
//! Writes that touch the specification or pricing tables run inside one database
//! transaction together with the machine row. Store failures come back as
//! `Error::Database`; nothing here retries.

use crate::{
    entities::{
        MachinePricing, MachineSpecification, MachineStatus, machine, machine::Entity as Machine,
        machine_pricing, machine_specification,
    },
    errors::Result,
};
use chrono::{SubsecRound, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{
    Condition, FromQueryResult, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 12;
/// Upper bound on page size, keeping list latency predictable.
pub const MAX_PAGE_SIZE: u64 = 50;

/// Optional criteria for [`MachineRepository::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MachineFilter {
    /// Case-insensitive substring matched against name, model and description
    pub q: Option<String>,
    /// One of the status wire values; anything else is ignored
    pub status: Option<String>,
    /// Restrict to a single category
    pub category_id: Option<i64>,
}

/// A clamped page request: `page >= 1`, `1 <= limit <= 50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Clamps raw caller input into a valid page request.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.map_or(1, |p| u64::try_from(p.max(1)).unwrap_or(1));
        let limit = limit.map_or(DEFAULT_PAGE_SIZE, |l| {
            u64::try_from(l.max(1)).map_or(DEFAULT_PAGE_SIZE, |l| l.min(MAX_PAGE_SIZE))
        });
        Self { page, limit }
    }

    /// 1-based page number
    #[must_use]
    pub const fn page(self) -> u64 {
        self.page
    }

    /// Rows per page
    #[must_use]
    pub const fn limit(self) -> u64 {
        self.limit
    }

    /// Rows to skip, bounded by what SQLite can bind as a signed 64-bit integer
    #[must_use]
    pub fn offset(self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX.unsigned_abs())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,
    /// Rows per page
    pub limit: u64,
    /// Rows matching the filter across all pages
    pub total: u64,
    /// `ceil(total / limit)`
    pub total_pages: u64,
}

/// Row shape used by the admin list view.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct MachineSummary {
    /// Machine id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Model designation
    pub model: String,
    /// URL slug, unique across machines
    pub slug: String,
    /// Lifecycle status
    pub status: MachineStatus,
    /// Highlighted in the catalog
    pub featured: bool,
    /// Manual ordering key
    pub sort_order: i32,
    /// URL of the main image
    pub main_image: Option<String>,
    /// Teaser shown in listings
    pub short_description: String,
    /// Creation time, second precision
    pub created_at: DateTimeUtc,
    /// Last write time, second precision
    pub updated_at: DateTimeUtc,
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachinePage {
    /// Rows on this page, newest first
    pub items: Vec<MachineSummary>,
    /// Where this page sits in the full result
    pub pagination: Pagination,
}

/// Row shape used by the edit form; leaves out the audit columns.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct MachineRecord {
    /// Machine id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Model designation
    pub model: String,
    /// URL slug, unique across machines
    pub slug: String,
    /// Long description
    pub description: String,
    /// Teaser shown in listings
    pub short_description: String,
    /// Owning category, if any
    pub category_id: Option<i64>,
    /// Lifecycle status
    pub status: MachineStatus,
    /// Highlighted in the catalog
    pub featured: bool,
    /// Manual ordering key
    pub sort_order: i32,
    /// URL of the main image
    pub main_image: Option<String>,
    /// Creation time, second precision
    pub created_at: DateTimeUtc,
    /// Last write time, second precision
    pub updated_at: DateTimeUtc,
}

/// Technical data submitted with a create or update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpecificationInput {
    /// Free-text capacity
    pub capacity: Option<String>,
    /// Free-text speed
    pub speed: Option<String>,
    /// Free-text power rating
    pub power: Option<String>,
    /// Width, non-negative
    pub width: Option<f64>,
    /// Height, non-negative
    pub height: Option<f64>,
    /// Depth, non-negative
    pub depth: Option<f64>,
    /// Weight, non-negative
    pub weight: Option<f64>,
    /// Materials the machine handles
    pub materials: Vec<String>,
    /// Certifications held
    pub certifications: Vec<String>,
}

/// Commercial terms submitted with a create or update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PricingInput {
    /// List price, non-negative
    pub base_price: Option<f64>,
    /// ISO 4217 code, upper-cased on save
    pub currency: String,
    /// Free-text price range
    pub price_range: Option<String>,
    /// Price given on request only
    pub is_quote_only: bool,
    /// Free-text pricing notes
    pub price_notes: Option<String>,
}

impl Default for PricingInput {
    fn default() -> Self {
        Self {
            base_price: None,
            currency: "USD".to_string(),
            price_range: None,
            is_quote_only: true,
            price_notes: None,
        }
    }
}

/// Fully resolved column values for an insert or full-row update.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineFields {
    /// Display name
    pub name: String,
    /// Model designation
    pub model: String,
    /// URL slug, unique across machines
    pub slug: String,
    /// Long description
    pub description: String,
    /// Teaser shown in listings
    pub short_description: String,
    /// Lifecycle status
    pub status: MachineStatus,
    /// Owning category, if any
    pub category_id: Option<i64>,
    /// Highlighted in the catalog
    pub featured: bool,
    /// Manual ordering key
    pub sort_order: i32,
    /// URL of the main image
    pub main_image: Option<String>,
    /// Upserted in the same transaction when present
    pub specifications: Option<SpecificationInput>,
    /// Upserted in the same transaction when present
    pub pricing: Option<PricingInput>,
}

const SUMMARY_COLUMNS: [machine::Column; 11] = [
    machine::Column::Id,
    machine::Column::Name,
    machine::Column::Model,
    machine::Column::Slug,
    machine::Column::Status,
    machine::Column::Featured,
    machine::Column::SortOrder,
    machine::Column::MainImage,
    machine::Column::ShortDescription,
    machine::Column::CreatedAt,
    machine::Column::UpdatedAt,
];

const RECORD_COLUMNS: [machine::Column; 13] = [
    machine::Column::Id,
    machine::Column::Name,
    machine::Column::Model,
    machine::Column::Slug,
    machine::Column::Description,
    machine::Column::ShortDescription,
    machine::Column::CategoryId,
    machine::Column::Status,
    machine::Column::Featured,
    machine::Column::SortOrder,
    machine::Column::MainImage,
    machine::Column::CreatedAt,
    machine::Column::UpdatedAt,
];

/// Lower-cases `needle` and escapes LIKE wildcards with `\`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(needle: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\')
}

/// Current time at second precision. Stored timestamps stay fixed-width, so
/// ordering on the text column matches chronological order.
fn now() -> DateTimeUtc {
    Utc::now().trunc_subsecs(0)
}

fn filter_condition(filter: &MachineFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let text_match = [
            machine::Column::Name,
            machine::Column::Model,
            machine::Column::Description,
        ]
        .into_iter()
        .fold(Condition::any(), |any, column| {
            any.add(Expr::expr(Func::lower(Expr::col(column))).like(contains_pattern(q)))
        });
        condition = condition.add(text_match);
    }

    if let Some(status) = filter
        .status
        .as_deref()
        .and_then(|s| MachineStatus::parse(s.trim()))
    {
        condition = condition.add(machine::Column::Status.eq(status));
    }

    if let Some(category_id) = filter.category_id {
        condition = condition.add(machine::Column::CategoryId.eq(category_id));
    }

    condition
}

/// Owns all reads and writes of machine rows.
#[derive(Debug, Clone)]
pub struct MachineRepository {
    db: std::sync::Arc<DatabaseConnection>,
}

impl MachineRepository {
    /// Wraps an already-established connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db: std::sync::Arc::new(db),
        }
    }

    /// The connection this repository runs on.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns one page of machines matching `filter`, newest first.
    ///
    /// The total is computed with a separate count query over the same filter.
    /// When the requested page starts past the last row, the page query is skipped.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &MachineFilter, page: PageRequest) -> Result<MachinePage> {
        let condition = filter_condition(filter);

        let total = Machine::find()
            .filter(condition.clone())
            .count(self.db.as_ref())
            .await?;

        let items = if page.offset() >= total {
            Vec::new()
        } else {
            Machine::find()
                .select_only()
                .columns(SUMMARY_COLUMNS)
                .filter(condition)
                .order_by_desc(machine::Column::CreatedAt)
                .order_by_desc(machine::Column::Id)
                .limit(page.limit())
                .offset(page.offset())
                .into_model::<MachineSummary>()
                .all(self.db.as_ref())
                .await?
        };

        debug!("Listed {} of {} machines", items.len(), total);
        Ok(MachinePage {
            items,
            pagination: Pagination {
                page: page.page(),
                limit: page.limit(),
                total,
                total_pages: total.div_ceil(page.limit()),
            },
        })
    }

    /// Fetches the edit-form projection of a single machine.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MachineRecord>> {
        Machine::find_by_id(id)
            .select_only()
            .columns(RECORD_COLUMNS)
            .into_model::<MachineRecord>()
            .one(self.db.as_ref())
            .await
            .map_err(Into::into)
    }

    /// Fetches the specification row of a machine, if any.
    pub async fn get_specification(
        &self,
        machine_id: i64,
    ) -> Result<Option<machine_specification::Model>> {
        MachineSpecification::find_by_id(machine_id)
            .one(self.db.as_ref())
            .await
            .map_err(Into::into)
    }

    /// Fetches the pricing row of a machine, if any.
    pub async fn get_pricing(&self, machine_id: i64) -> Result<Option<machine_pricing::Model>> {
        MachinePricing::find_by_id(machine_id)
            .one(self.db.as_ref())
            .await
            .map_err(Into::into)
    }

    /// Inserts a machine (plus any detail rows) and returns the new id.
    #[instrument(skip(self, fields), fields(slug = %fields.slug))]
    pub async fn insert(&self, fields: &MachineFields, created_by: i64) -> Result<i64> {
        let now = now();
        let txn = self.db.begin().await?;

        let row = machine::ActiveModel {
            name: Set(fields.name.clone()),
            model: Set(fields.model.clone()),
            slug: Set(fields.slug.clone()),
            description: Set(fields.description.clone()),
            short_description: Set(fields.short_description.clone()),
            status: Set(fields.status),
            category_id: Set(fields.category_id),
            featured: Set(fields.featured),
            sort_order: Set(fields.sort_order),
            main_image: Set(fields.main_image.clone()),
            created_by: Set(Some(created_by)),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let id = Machine::insert(row).exec(&txn).await?.last_insert_id;
        write_details(&txn, id, fields).await?;

        txn.commit().await?;
        info!("Inserted machine {} with slug '{}'", id, fields.slug);
        Ok(id)
    }

    /// Rewrites every mutable column of machine `id`.
    ///
    /// Returns `false` when no such row exists, in which case nothing is written.
    #[instrument(skip(self, fields), fields(slug = %fields.slug))]
    pub async fn update(&self, id: i64, fields: &MachineFields, updated_by: i64) -> Result<bool> {
        let txn = self.db.begin().await?;

        let row = machine::ActiveModel {
            name: Set(fields.name.clone()),
            model: Set(fields.model.clone()),
            slug: Set(fields.slug.clone()),
            description: Set(fields.description.clone()),
            short_description: Set(fields.short_description.clone()),
            status: Set(fields.status),
            category_id: Set(fields.category_id),
            featured: Set(fields.featured),
            sort_order: Set(fields.sort_order),
            main_image: Set(fields.main_image.clone()),
            updated_by: Set(Some(updated_by)),
            updated_at: Set(now()),
            ..Default::default()
        };
        let result = Machine::update_many()
            .set(row)
            .filter(machine::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }
        write_details(&txn, id, fields).await?;

        txn.commit().await?;
        info!("Updated machine {}", id);
        Ok(true)
    }

    /// Sets only the status column (and the modification time).
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: i64, status: MachineStatus) -> Result<bool> {
        let row = machine::ActiveModel {
            status: Set(status),
            updated_at: Set(now()),
            ..Default::default()
        };
        let result = Machine::update_many()
            .set(row)
            .filter(machine::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Hard-deletes machine `id`. Detail rows go with it through the foreign keys.
    ///
    /// Returns whether a row was actually removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = Machine::delete_by_id(id).exec(self.db.as_ref()).await?;
        info!(
            "Attempted to delete machine {}, rows affected: {}",
            id, result.rows_affected
        );
        Ok(result.rows_affected > 0)
    }

    /// Whether any machine other than `exclude_id` already uses `slug`.
    #[instrument(skip(self))]
    pub async fn exists_with_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let mut query = Machine::find().filter(machine::Column::Slug.eq(slug));
        if let Some(id) = exclude_id {
            query = query.filter(machine::Column::Id.ne(id));
        }
        Ok(query.count(self.db.as_ref()).await? > 0)
    }
}

/// Upserts the optional detail rows for `machine_id` on `conn`.
async fn write_details<C>(conn: &C, machine_id: i64, fields: &MachineFields) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(spec) = &fields.specifications {
        let row = machine_specification::ActiveModel {
            machine_id: Set(machine_id),
            capacity: Set(spec.capacity.clone()),
            speed: Set(spec.speed.clone()),
            power: Set(spec.power.clone()),
            width: Set(spec.width),
            height: Set(spec.height),
            depth: Set(spec.depth),
            weight: Set(spec.weight),
            materials: Set(serde_json::json!(spec.materials)),
            certifications: Set(serde_json::json!(spec.certifications)),
        };
        MachineSpecification::insert(row)
            .on_conflict(
                OnConflict::column(machine_specification::Column::MachineId)
                    .update_columns([
                        machine_specification::Column::Capacity,
                        machine_specification::Column::Speed,
                        machine_specification::Column::Power,
                        machine_specification::Column::Width,
                        machine_specification::Column::Height,
                        machine_specification::Column::Depth,
                        machine_specification::Column::Weight,
                        machine_specification::Column::Materials,
                        machine_specification::Column::Certifications,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }

    if let Some(pricing) = &fields.pricing {
        let row = machine_pricing::ActiveModel {
            machine_id: Set(machine_id),
            base_price: Set(pricing.base_price),
            currency: Set(pricing.currency.clone()),
            price_range: Set(pricing.price_range.clone()),
            is_quote_only: Set(pricing.is_quote_only),
            price_notes: Set(pricing.price_notes.clone()),
        };
        MachinePricing::insert(row)
            .on_conflict(
                OnConflict::column(machine_pricing::Column::MachineId)
                    .update_columns([
                        machine_pricing::Column::BasePrice,
                        machine_pricing::Column::Currency,
                        machine_pricing::Column::PriceRange,
                        machine_pricing::Column::IsQuoteOnly,
                        machine_pricing::Column::PriceNotes,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_page_request_clamping() {
        let default = PageRequest::new(None, None);
        assert_eq!((default.page(), default.limit()), (1, DEFAULT_PAGE_SIZE));

        let huge = PageRequest::new(Some(1), Some(999));
        assert_eq!(huge.limit(), MAX_PAGE_SIZE);

        let zero = PageRequest::new(Some(0), Some(0));
        assert_eq!((zero.page(), zero.limit()), (1, 1));

        let negative = PageRequest::new(Some(-4), Some(-1));
        assert_eq!((negative.page(), negative.limit()), (1, 1));

        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);

        let far = PageRequest::new(Some(i64::MAX), Some(12));
        assert_eq!(far.page(), i64::MAX.unsigned_abs());
        assert_eq!(far.offset(), i64::MAX.unsigned_abs());
    }

    #[tokio::test]
    async fn test_list_page_past_the_end_is_empty() -> Result<()> {
        let repo = setup_test_repository().await?;
        repo.insert(&test_fields("Lathe", "lathe"), 1).await?;

        let page = repo
            .list(&MachineFilter::default(), PageRequest::new(Some(i64::MAX), Some(12)))
            .await?;
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.pagination.total_pages, 1);

        let page = repo
            .list(&MachineFilter::default(), PageRequest::new(Some(2), Some(1)))
            .await?;
        assert!(page.items.is_empty());
        Ok(())
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_Off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("Press"), "press");
    }

    #[tokio::test]
    async fn test_insert_and_get_by_id() -> Result<()> {
        let repo = setup_test_repository().await?;
        let id = repo.insert(&test_fields("Lathe", "lathe"), 3).await?;

        let record = repo.get_by_id(id).await?.unwrap();
        assert_eq!(record.name, "Lathe");
        assert_eq!(record.slug, "lathe");
        assert_eq!(record.status, MachineStatus::Draft);
        assert!(!record.featured);
        assert_eq!(record.sort_order, 0);

        assert!(repo.get_by_id(id + 100).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_pagination_and_order() -> Result<()> {
        let repo = setup_test_repository().await?;
        for n in 0..60 {
            repo.insert(&test_fields(&format!("Machine {n}"), &format!("machine-{n}")), 1)
                .await?;
        }

        let page = repo
            .list(&MachineFilter::default(), PageRequest::new(Some(1), Some(999)))
            .await?;
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.pagination.total, 60);
        assert_eq!(page.pagination.total_pages, 2);
        // Newest first
        assert_eq!(page.items[0].slug, "machine-59");

        let second = repo
            .list(&MachineFilter::default(), PageRequest::new(Some(0), Some(50)))
            .await?;
        assert_eq!(second.pagination.page, 1);

        let last = repo
            .list(&MachineFilter::default(), PageRequest::new(Some(2), Some(50)))
            .await?;
        assert_eq!(last.items.len(), 10);
        assert_eq!(last.items[9].slug, "machine-0");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters() -> Result<()> {
        let repo = setup_test_repository().await?;

        let mut press = test_fields("Hydraulic Press", "hydraulic-press");
        press.status = MachineStatus::Published;
        press.category_id = Some(4);
        repo.insert(&press, 1).await?;

        let mut lathe = test_fields("Lathe", "lathe");
        lathe.model = "HX-PRESS-9".to_string();
        repo.insert(&lathe, 1).await?;

        let mut drill = test_fields("Drill", "drill");
        drill.description = "Column drill for 100% steel".to_string();
        drill.status = MachineStatus::Archived;
        repo.insert(&drill, 1).await?;

        let by_text = |q: &str| MachineFilter {
            q: Some(q.to_string()),
            ..Default::default()
        };

        // Matches name on one row and model on another, case-insensitively
        let page = repo.list(&by_text("press"), PageRequest::default()).await?;
        assert_eq!(page.pagination.total, 2);

        let page = repo.list(&by_text("100%"), PageRequest::default()).await?;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].slug, "drill");

        // `%` is literal, not a wildcard
        let page = repo.list(&by_text("d%l"), PageRequest::default()).await?;
        assert_eq!(page.pagination.total, 0);
        assert!(page.items.is_empty());

        let published = MachineFilter {
            status: Some("published".to_string()),
            ..Default::default()
        };
        let page = repo.list(&published, PageRequest::default()).await?;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].slug, "hydraulic-press");

        // Unknown status values are ignored rather than matching nothing
        let bogus = MachineFilter {
            status: Some("bogus".to_string()),
            ..Default::default()
        };
        assert_eq!(
            repo.list(&bogus, PageRequest::default())
                .await?
                .pagination
                .total,
            3
        );

        let combined = MachineFilter {
            q: Some("press".to_string()),
            status: Some("draft".to_string()),
            category_id: None,
        };
        let page = repo.list(&combined, PageRequest::default()).await?;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].slug, "lathe");

        let by_category = MachineFilter {
            category_id: Some(4),
            ..Default::default()
        };
        assert_eq!(
            repo.list(&by_category, PageRequest::default())
                .await?
                .pagination
                .total,
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_exists_with_slug() -> Result<()> {
        let repo = setup_test_repository().await?;
        let id = repo.insert(&test_fields("Pump", "pump"), 1).await?;

        assert!(repo.exists_with_slug("pump", None).await?);
        assert!(!repo.exists_with_slug("pump", Some(id)).await?);
        assert!(!repo.exists_with_slug("pump-2", None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_slug_constraint_is_enforced_by_store() -> Result<()> {
        let repo = setup_test_repository().await?;
        repo.insert(&test_fields("Pump", "pump"), 1).await?;

        let result = repo.insert(&test_fields("Other Pump", "pump"), 1).await;
        let Err(crate::errors::Error::Database(err)) = result else {
            panic!("expected a database error");
        };
        assert!(matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_set_status_on_missing_row() -> Result<()> {
        let repo = setup_test_repository().await?;
        assert!(!repo.update(42, &test_fields("Ghost", "ghost"), 1).await?);
        assert!(!repo.set_status(42, MachineStatus::Published).await?);
        assert!(repo.get_specification(42).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_details_are_upserted_and_cascade_on_delete() -> Result<()> {
        let repo = setup_test_repository().await?;

        let mut fields = test_fields("Press", "press");
        fields.specifications = Some(SpecificationInput {
            capacity: Some("20 t".to_string()),
            materials: vec!["steel".to_string()],
            ..Default::default()
        });
        let id = repo.insert(&fields, 1).await?;

        let spec = repo.get_specification(id).await?.unwrap();
        assert_eq!(spec.capacity.as_deref(), Some("20 t"));
        assert_eq!(spec.materials, serde_json::json!(["steel"]));
        assert!(repo.get_pricing(id).await?.is_none());

        fields.specifications = Some(SpecificationInput {
            capacity: Some("40 t".to_string()),
            ..Default::default()
        });
        fields.pricing = Some(PricingInput {
            base_price: Some(12_500.0),
            ..Default::default()
        });
        assert!(repo.update(id, &fields, 2).await?);

        let spec = repo.get_specification(id).await?.unwrap();
        assert_eq!(spec.capacity.as_deref(), Some("40 t"));
        let pricing = repo.get_pricing(id).await?.unwrap();
        assert_eq!(pricing.currency, "USD");
        assert!(pricing.is_quote_only);

        assert!(repo.delete(id).await?);
        assert!(repo.get_specification(id).await?.is_none());
        assert!(repo.get_pricing(id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() -> Result<()> {
        let repo = setup_test_repository().await?;
        let first = repo.insert(&test_fields("One", "one"), 1).await?;
        assert!(repo.delete(first).await?);
        assert!(!repo.delete(first).await?);

        let second = repo.insert(&test_fields("Two", "two"), 1).await?;
        assert!(second > first);
        Ok(())
    }

    #[tokio::test]
    async fn test_audit_columns_are_recorded() -> Result<()> {
        let repo = setup_test_repository().await?;
        let id = repo.insert(&test_fields("Mill", "mill"), 3).await?;
        assert!(repo.update(id, &test_fields("Mill 2", "mill"), 8).await?);

        let row = Machine::find_by_id(id)
            .one(repo.connection())
            .await?
            .unwrap();
        assert_eq!(row.created_by, Some(3));
        assert_eq!(row.updated_by, Some(8));
        assert_eq!(row.name, "Mill 2");
        assert!(row.updated_at >= row.created_at);
        Ok(())
    }
}
