pub mod contacts;
pub mod dashboard;
pub mod orders;
pub mod pricing;
pub mod products;

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};
use sea_orm::DbErr;
use tracing::error;

use crate::errors::ServiceError;

/// Page window of a list request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

/// Largest page size a list request may ask for.
pub const MAX_PAGE_LIMIT: u64 = 500;

impl Pagination {
    /// Clamps `limit` to `1..=MAX_PAGE_LIMIT` and rejects pages whose row
    /// offset does not fit a signed 64-bit SQL offset.
    pub fn new(page: u64, limit: u64) -> Result<Self, ServiceError> {
        let pagination = Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        };
        let offset = pagination
            .limit
            .checked_mul(pagination.page_index())
            .filter(|offset| i64::try_from(*offset).is_ok());
        if offset.is_none() {
            return Err(ServiceError::ValidationError(
                "Page is out of range".to_string(),
            ));
        }
        Ok(pagination)
    }

    /// Zero-based page index for `Paginator::fetch_page`
    pub fn page_index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    pub fn offset(&self) -> u64 {
        self.limit * self.page_index()
    }
}

/// Logs a failed query and wraps it for the handler layer.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(DbErr) -> ServiceError {
    move |e| {
        error!(error = %e, "{context}");
        ServiceError::DatabaseError(e)
    }
}

/// Case-insensitive substring match on a text column.
pub(crate) fn contains_ci<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.to_lowercase()))
}

/// Trimmed, non-empty value of an optional text field.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Fails with "Please fill <label>" for the first missing field.
pub(crate) fn require_fields(fields: &[(Option<&str>, &str)]) -> Result<(), ServiceError> {
    match fields.iter().find(|(value, _)| non_empty(*value).is_none()) {
        Some((_, label)) => Err(ServiceError::ValidationError(format!("Please fill {label}"))),
        None => Ok(()),
    }
}

static SLUG_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s-]+").expect("valid slug regex"));
static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("valid slug regex"));

pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    let cleaned = SLUG_STRIP.replace_all(&lower, " ");
    let dashed = SLUG_SEPARATORS.replace_all(cleaned.trim(), "-");
    dashed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Rahim Store", "rahim-store")]
    #[case("  Premium  Course: Rust & Axum! ", "premium-course-rust-axum")]
    #[case("already-slugged", "already-slugged")]
    #[case("Ünïcode Café", "ünïcode-café")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn pagination_clamps_and_offsets() {
        let page = Pagination::new(0, 0).unwrap();
        assert_eq!((page.page, page.limit), (1, 1));
        assert_eq!(Pagination::new(3, 10).unwrap().offset(), 20);
        assert_eq!(Pagination::new(3, 10).unwrap().page_index(), 2);
        assert_eq!(Pagination::new(1, u64::MAX).unwrap().limit, MAX_PAGE_LIMIT);
    }

    #[rstest]
    #[case(u64::MAX, 10)]
    #[case(u64::MAX / 2, MAX_PAGE_LIMIT)]
    #[case(i64::MAX as u64, 2)]
    fn pagination_rejects_offsets_past_i64(#[case] page: u64, #[case] limit: u64) {
        let err = Pagination::new(page, limit).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert_eq!(err.to_string(), "Page is out of range");
    }

    #[test]
    fn missing_fields_report_first_label() {
        let err = require_fields(&[(Some("Nadia"), "Name"), (Some("  "), "Phone"), (None, "Invoice")])
            .unwrap_err();
        assert_eq!(err.to_string(), "Please fill Phone");
        assert!(require_fields(&[(Some("x"), "Name")]).is_ok());
    }
}
