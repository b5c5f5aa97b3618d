use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};

/// Rows per page the dashboard requests for an on-screen report.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Rows requested when exporting a report to CSV.
pub const EXPORT_LIMIT: u32 = 1000;

/// Inclusive calendar date range, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

/// Body of `POST /api/reports/query` and `POST /api/reports/export`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportQuery {
    #[garde(length(min = 1))]
    pub dimensions: Vec<String>,

    #[garde(length(min = 1))]
    pub metrics: Vec<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, Vec<String>>>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,

    #[garde(range(min = 1))]
    pub page: u32,

    #[garde(range(min = 1, max = 1000))]
    pub limit: u32,
}

impl ReportQuery {
    /// First page of an on-screen report, grouped by its dimensions.
    pub fn new(dimensions: Vec<String>, metrics: Vec<String>) -> Self {
        Self {
            group_by: Some(dimensions.clone()),
            dimensions,
            metrics,
            filters: None,
            date_range: None,
            page: 1,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    /// Export request: no explicit grouping, larger limit.
    pub fn for_export(dimensions: Vec<String>, metrics: Vec<String>) -> Self {
        Self {
            group_by: None,
            limit: EXPORT_LIMIT,
            ..Self::new(dimensions, metrics)
        }
    }

    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, dimension: impl Into<String>, values: Vec<String>) -> Self {
        self.filters
            .get_or_insert_with(BTreeMap::new)
            .insert(dimension.into(), values);
        self
    }
}

/// One page of aggregated report rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPage {
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Totals shown on the dashboard overview. Missing or null counters read as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    #[serde(
        rename = "ad_exchange_total_requests",
        default,
        deserialize_with = "zero_if_null"
    )]
    pub total_requests: u64,

    #[serde(
        rename = "ad_exchange_line_item_level_impressions",
        default,
        deserialize_with = "zero_if_null"
    )]
    pub total_impressions: u64,

    #[serde(
        rename = "ad_exchange_line_item_level_clicks",
        default,
        deserialize_with = "zero_if_null"
    )]
    pub total_clicks: u64,

    #[serde(rename = "payout", default, deserialize_with = "zero_if_null")]
    pub total_payout: f64,

    #[serde(default, deserialize_with = "zero_if_null")]
    pub average_ecpm: f64,
}

fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A report definition stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: String,
    pub name: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    pub created_at: NaiveDateTime,
}

impl SavedReport {
    /// Rebuild the query this report was saved from.
    pub fn to_query(&self) -> ReportQuery {
        ReportQuery::new(self.dimensions.clone(), self.metrics.clone())
            .with_date_range(self.date_range)
    }
}

/// Body of `POST /api/reports/saved-reports`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSavedReport {
    #[garde(length(min = 1, max = 200))]
    pub name: String,

    #[garde(length(min = 1))]
    pub dimensions: Vec<String>,

    #[garde(length(min = 1))]
    pub metrics: Vec<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedReportCreated {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HasData {
    pub has_data: bool,
}
