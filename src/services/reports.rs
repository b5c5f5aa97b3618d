use garde::Validate;

use crate::models::report::{
    DashboardSummary, DateRange, HasData, NewSavedReport, ReportPage, ReportQuery, SavedReport,
    SavedReportCreated,
};
use crate::services::api::{ensure_success, ApiClient, ApiError};

impl ApiClient {
    /// GET /api/reports/summary
    pub async fn summary(&self) -> Result<DashboardSummary, ApiError> {
        self.get_json("/api/reports/summary").await
    }

    /// GET /api/reports/has_data
    pub async fn has_data(&self) -> Result<bool, ApiError> {
        let body: HasData = self.get_json("/api/reports/has_data").await?;
        Ok(body.has_data)
    }

    /// GET /api/reports/dimensions
    pub async fn dimensions(&self) -> Result<Vec<String>, ApiError> {
        self.get_json("/api/reports/dimensions").await
    }

    /// GET /api/reports/metrics
    pub async fn metrics(&self) -> Result<Vec<String>, ApiError> {
        self.get_json("/api/reports/metrics").await
    }

    /// POST /api/reports/query
    pub async fn query(&self, query: &ReportQuery) -> Result<ReportPage, ApiError> {
        check_query(query)?;
        tracing::debug!(
            dimensions = ?query.dimensions,
            metrics = ?query.metrics,
            page = query.page,
            limit = query.limit,
            "Querying report"
        );
        self.post_json("/api/reports/query", query).await
    }

    /// POST /api/reports/export. Returns the CSV body as sent by the server.
    pub async fn export(&self, query: &ReportQuery) -> Result<Vec<u8>, ApiError> {
        check_query(query)?;
        let response = self
            .http
            .post(self.url("/api/reports/export"))
            .json(query)
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// GET /api/reports/saved-reports
    pub async fn saved_reports(&self) -> Result<Vec<SavedReport>, ApiError> {
        self.get_json("/api/reports/saved-reports").await
    }

    /// POST /api/reports/saved-reports
    pub async fn save_report(&self, report: &NewSavedReport) -> Result<SavedReportCreated, ApiError> {
        report.validate()?;
        if report.name.trim().is_empty() {
            return Err(ApiError::Invalid("report name must not be blank".to_string()));
        }
        check_date_range(report.date_range.as_ref())?;
        self.post_json("/api/reports/saved-reports", report).await
    }

    /// DELETE /api/reports/saved-reports/{id}
    pub async fn delete_saved_report(&self, report_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url_with_id("/api/reports/saved-reports", report_id)?)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

fn check_query(query: &ReportQuery) -> Result<(), ApiError> {
    query.validate()?;
    check_date_range(query.date_range.as_ref())
}

fn check_date_range(range: Option<&DateRange>) -> Result<(), ApiError> {
    match range {
        Some(r) if !r.is_ordered() => Err(ApiError::Invalid(format!(
            "start date {} is after end date {}",
            r.start, r.end
        ))),
        _ => Ok(()),
    }
}
