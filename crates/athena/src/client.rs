//! AWS Athena query execution client.
//!
//! Provides [`AthenaClient`] for running ad-hoc SQL in the stack's
//! workgroup, with exponential-backoff polling, timeout enforcement,
//! scan-limit checks, and structured result parsing into [`AthenaQueryResult`].

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use aws_config::BehaviorVersion;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::operation::get_query_results::GetQueryResultsOutput;
use aws_sdk_athena::types::{
    QueryExecution, QueryExecutionContext, QueryExecutionState, ResultConfiguration,
};
use tracing::{debug, error, info, warn};

use crate::config::AthenaConfig;
use crate::result::{AthenaColumn, AthenaQueryResult, QueryMetadata};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur during Athena operations.
#[derive(Debug, thiserror::Error)]
pub enum AthenaError {
    /// The stack has no resource the query needs.
    #[error("stack has no {0}")]
    NotProvisioned(String),

    /// The query execution failed on the Athena side.
    #[error("Query {query_id} failed: {reason}")]
    QueryFailed { query_id: String, reason: String },

    /// The query was cancelled (either by the user or by Athena).
    #[error("Query {query_id} was cancelled")]
    QueryCancelled { query_id: String },

    /// The query exceeded the configured timeout.
    #[error("Query {query_id} timed out after {seconds}s")]
    QueryTimeout { query_id: String, seconds: u32 },

    /// The query scanned more bytes than the configured limit.
    #[error("Scan limit exceeded: {bytes_scanned} bytes scanned, limit is {limit} bytes")]
    ScanLimitExceeded { bytes_scanned: u64, limit: u64 },

    /// An AWS SDK error, provider message kept verbatim.
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// Failed to parse Athena result data.
    #[error("Parse error: {0}")]
    ParseError(String),
}

fn sdk_err<E: std::error::Error>(e: E) -> AthenaError {
    AthenaError::AwsSdk(DisplayErrorContext(e).to_string())
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Poll delay: starts at 200ms, grows 1.5x per attempt, capped at 2s.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    delay_ms: u64,
}

impl Backoff {
    const INITIAL_MS: u64 = 200;
    const MAX_MS: u64 = 2000;
    const FACTOR: f64 = 1.5;

    pub(crate) fn new() -> Self {
        Self {
            delay_ms: Self::INITIAL_MS,
        }
    }

    /// Delay for this attempt (without jitter), then advance.
    pub(crate) fn next_delay_ms(&mut self) -> u64 {
        let current = self.delay_ms;
        self.delay_ms = ((self.delay_ms as f64 * Self::FACTOR) as u64).min(Self::MAX_MS);
        current
    }
}

/// Jitter without rand: nanosecond fraction of the current time, in [0, 100).
fn jitter_ms() -> u64 {
    (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos()
        % 100) as u64
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for executing queries against the provisioned workgroup.
pub struct AthenaClient {
    config: AthenaConfig,
    athena_client: aws_sdk_athena::Client,
}

impl AthenaClient {
    /// Create a new [`AthenaClient`] using the region in `config`.
    pub async fn new(config: AthenaConfig) -> Self {
        let region = aws_sdk_athena::config::Region::new(config.region.clone());
        let aws_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let athena_client = aws_sdk_athena::Client::new(&aws_cfg);

        info!(
            region = %config.region,
            database = %config.database,
            workgroup = %config.workgroup,
            "AthenaClient initialised"
        );

        Self {
            config,
            athena_client,
        }
    }

    pub fn config(&self) -> &AthenaConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Run `sql` and return the parsed results: start, poll until a terminal
    /// state, then fetch the result set.
    pub async fn execute_query(&self, sql: &str) -> Result<AthenaQueryResult, AthenaError> {
        info!(sql = %sql, "Starting Athena query");

        let start_resp = self
            .athena_client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&self.config.database)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&self.config.output_location)
                    .build(),
            )
            .work_group(&self.config.workgroup)
            .send()
            .await
            .map_err(sdk_err)?;

        let query_id = start_resp
            .query_execution_id()
            .ok_or_else(|| AthenaError::AwsSdk("No query execution ID returned".into()))?
            .to_string();

        info!(query_id = %query_id, "Query execution started");

        let query_execution = self.poll_until_complete(&query_id).await?;
        let metadata = extract_metadata(&query_id, &query_execution);

        let pages = self.fetch_result_pages(&query_id).await?;
        parse_results(&pages, metadata)
    }

    /// Execute `sql` and fail if it scanned more than the configured budget.
    ///
    /// Athena has no pre-execution scan estimate, so the check runs after
    /// the query completes. A budget of 0 disables it.
    pub async fn execute_query_with_limit(
        &self,
        sql: &str,
    ) -> Result<AthenaQueryResult, AthenaError> {
        let result = self.execute_query(sql).await?;
        let limit = self.config.max_scan_bytes;

        if limit > 0 && result.metadata.bytes_scanned > limit {
            warn!(
                bytes_scanned = result.metadata.bytes_scanned,
                limit,
                query_id = %result.metadata.query_id,
                "Query exceeded scan limit"
            );
            return Err(AthenaError::ScanLimitExceeded {
                bytes_scanned: result.metadata.bytes_scanned,
                limit,
            });
        }

        Ok(result)
    }

    /// Cancel a running query.
    pub async fn cancel_query(&self, query_id: &str) -> Result<(), AthenaError> {
        info!(query_id = %query_id, "Cancelling query");

        self.athena_client
            .stop_query_execution()
            .query_execution_id(query_id)
            .send()
            .await
            .map_err(sdk_err)?;

        info!(query_id = %query_id, "Query cancellation requested");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Every `GetQueryResults` page, following `next_token` to the end.
    async fn fetch_result_pages(
        &self,
        query_id: &str,
    ) -> Result<Vec<GetQueryResultsOutput>, AthenaError> {
        let mut pages = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .athena_client
                .get_query_results()
                .query_execution_id(query_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(sdk_err)?;

            next_token = page.next_token().map(str::to_string);
            pages.push(page);
            if next_token.is_none() {
                break;
            }
        }

        debug!(query_id = %query_id, pages = pages.len(), "Fetched result pages");
        Ok(pages)
    }

    /// Poll `GetQueryExecution` until SUCCEEDED, FAILED or CANCELLED, or the
    /// configured timeout passes (the query is then cancelled).
    async fn poll_until_complete(&self, query_id: &str) -> Result<QueryExecution, AthenaError> {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_seconds as u64);
        let mut backoff = Backoff::new();

        loop {
            let resp = self
                .athena_client
                .get_query_execution()
                .query_execution_id(query_id)
                .send()
                .await
                .map_err(sdk_err)?;

            let qe = resp
                .query_execution()
                .ok_or_else(|| AthenaError::AwsSdk("No query execution in response".into()))?
                .clone();

            let state = qe
                .status()
                .and_then(|s| s.state())
                .cloned()
                .unwrap_or(QueryExecutionState::Queued);

            debug!(
                query_id = %query_id,
                state = ?state,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Polling query status"
            );

            match state {
                QueryExecutionState::Succeeded => return Ok(qe),

                QueryExecutionState::Failed => {
                    let reason = qe
                        .status()
                        .and_then(|s| s.state_change_reason())
                        .unwrap_or("unknown")
                        .to_string();

                    error!(query_id = %query_id, reason = %reason, "Query failed");
                    return Err(AthenaError::QueryFailed {
                        query_id: query_id.to_string(),
                        reason,
                    });
                }

                QueryExecutionState::Cancelled => {
                    warn!(query_id = %query_id, "Query was cancelled");
                    return Err(AthenaError::QueryCancelled {
                        query_id: query_id.to_string(),
                    });
                }

                // Queued | Running | unknown future variant
                _ => {}
            }

            if start.elapsed() > timeout {
                warn!(
                    query_id = %query_id,
                    timeout_seconds = self.config.timeout_seconds,
                    "Query timed out, cancelling"
                );
                if let Err(e) = self.cancel_query(query_id).await {
                    warn!(query_id = %query_id, error = %e, "Cancel after timeout failed");
                }
                return Err(AthenaError::QueryTimeout {
                    query_id: query_id.to_string(),
                    seconds: self.config.timeout_seconds,
                });
            }

            let sleep_ms = backoff.next_delay_ms() + jitter_ms();
            tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        }
    }
}

/// Parse a `GetQueryResults` page into an [`AthenaQueryResult`].
///
/// Column metadata comes from `ResultSetMetadata`, data from `ResultSet.Rows`.
/// For SELECT queries (`UpdateCount` absent) the first row echoes the column
/// headers and is skipped.
pub(crate) fn parse_results(
    pages: &[GetQueryResultsOutput],
    metadata: QueryMetadata,
) -> Result<AthenaQueryResult, AthenaError> {
    let first_page = pages
        .first()
        .ok_or_else(|| AthenaError::ParseError("No result pages".into()))?;
    let first = first_page
        .result_set()
        .ok_or_else(|| AthenaError::ParseError("No ResultSet in response".into()))?;

    let columns: Vec<AthenaColumn> = first
        .result_set_metadata()
        .map(|meta| {
            meta.column_info()
                .iter()
                .map(|ci| AthenaColumn {
                    name: ci.name().to_string(),
                    data_type: ci.r#type().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    // SELECT results repeat the column names as the first row of page one.
    let has_header = first_page.update_count().is_none() && !first.rows().is_empty();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        let result_set = page.result_set().ok_or_else(|| {
            AthenaError::ParseError(format!("No ResultSet on page {}", i + 1))
        })?;
        let skip = usize::from(i == 0 && has_header);
        rows.extend(result_set.rows().iter().skip(skip).map(|row| {
            row.data()
                .iter()
                .map(|datum| datum.var_char_value().map(|v| v.to_string()))
                .collect::<Vec<_>>()
        }));
    }

    if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
        return Err(AthenaError::ParseError(format!(
            "row has {} cells, expected {}",
            bad.len(),
            columns.len()
        )));
    }

    debug!(
        columns = columns.len(),
        rows = rows.len(),
        query_id = %metadata.query_id,
        "Parsed Athena results"
    );

    Ok(AthenaQueryResult {
        columns,
        rows,
        metadata,
    })
}

pub(crate) fn extract_metadata(query_id: &str, qe: &QueryExecution) -> QueryMetadata {
    let stats = qe.statistics();
    let status = qe.status();

    QueryMetadata {
        query_id: query_id.to_string(),
        bytes_scanned: stats
            .and_then(|s| s.data_scanned_in_bytes())
            .unwrap_or(0) as u64,
        execution_time_ms: stats
            .and_then(|s| s.engine_execution_time_in_millis())
            .unwrap_or(0) as u64,
        state: status
            .and_then(|s| s.state())
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        output_location: qe
            .result_configuration()
            .and_then(|rc| rc.output_location())
            .map(|s| s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests: parsing logic only, no AWS calls
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_athena::types::{
        ColumnInfo, Datum, QueryExecutionStatistics, QueryExecutionStatus, ResultSet,
        ResultSetMetadata, Row,
    };

    fn metadata() -> QueryMetadata {
        QueryMetadata {
            query_id: "q-1".into(),
            bytes_scanned: 0,
            execution_time_ms: 0,
            state: "SUCCEEDED".into(),
            output_location: None,
        }
    }

    fn column(name: &str, ty: &str) -> ColumnInfo {
        ColumnInfo::builder().name(name).r#type(ty).build().unwrap()
    }

    fn row(cells: &[Option<&str>]) -> Row {
        let mut b = Row::builder();
        for cell in cells {
            let datum = match cell {
                Some(v) => Datum::builder().var_char_value(*v).build(),
                None => Datum::builder().build(),
            };
            b = b.data(datum);
        }
        b.build()
    }

    fn output(update_count: Option<i64>, rows: Vec<Row>) -> GetQueryResultsOutput {
        let meta = ResultSetMetadata::builder()
            .column_info(column("id", "bigint"))
            .column_info(column("name", "varchar"))
            .build();
        let mut rs = ResultSet::builder().result_set_metadata(meta);
        for r in rows {
            rs = rs.rows(r);
        }
        let mut out = GetQueryResultsOutput::builder().result_set(rs.build());
        if let Some(n) = update_count {
            out = out.update_count(n);
        }
        out.build()
    }

    #[test]
    fn select_skips_header_row() {
        let out = output(
            None,
            vec![
                row(&[Some("id"), Some("name")]),
                row(&[Some("1"), Some("ada")]),
                row(&[Some("2"), None]),
            ],
        );

        let result = parse_results(&[out], metadata()).unwrap();
        assert_eq!(result.column_count(), 2);
        assert_eq!(result.columns[0].data_type, "bigint");
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.get_value(0, "name"), Some("ada"));
        assert_eq!(result.get_value(1, "name"), None);
    }

    #[test]
    fn header_only_select_is_empty() {
        let out = output(None, vec![row(&[Some("id"), Some("name")])]);
        let result = parse_results(&[out], metadata()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn later_pages_keep_their_first_row() {
        let page_one = output(
            None,
            vec![
                row(&[Some("id"), Some("name")]),
                row(&[Some("1"), Some("ada")]),
            ],
        );
        let page_two = output(
            None,
            vec![
                row(&[Some("2"), Some("grace")]),
                row(&[Some("3"), Some("linus")]),
            ],
        );

        let result = parse_results(&[page_one, page_two], metadata()).unwrap();
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.get_value(1, "name"), Some("grace"));
        assert_eq!(result.get_value(2, "id"), Some("3"));
    }

    #[test]
    fn no_pages_is_a_parse_error() {
        assert!(matches!(
            parse_results(&[], metadata()),
            Err(AthenaError::ParseError(_))
        ));
    }

    #[test]
    fn update_count_keeps_first_row() {
        let out = output(Some(1), vec![row(&[Some("1"), Some("ada")])]);
        let result = parse_results(&[out], metadata()).unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.get_value(0, "id"), Some("1"));
    }

    #[test]
    fn ragged_row_is_a_parse_error() {
        let out = output(None, vec![row(&[Some("id"), Some("name")]), row(&[Some("1")])]);
        let err = parse_results(&[out], metadata()).unwrap_err();
        assert!(matches!(err, AthenaError::ParseError(_)));
    }

    #[test]
    fn missing_result_set_is_a_parse_error() {
        let out = GetQueryResultsOutput::builder().build();
        assert!(matches!(
            parse_results(&[out], metadata()),
            Err(AthenaError::ParseError(_))
        ));
    }

    #[test]
    fn metadata_from_execution() {
        let qe = QueryExecution::builder()
            .status(
                QueryExecutionStatus::builder()
                    .state(QueryExecutionState::Succeeded)
                    .build(),
            )
            .statistics(
                QueryExecutionStatistics::builder()
                    .data_scanned_in_bytes(2048)
                    .engine_execution_time_in_millis(120)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location("s3://lake/athena-results/q-9.csv")
                    .build(),
            )
            .build();

        let meta = extract_metadata("q-9", &qe);
        assert_eq!(meta.state, "SUCCEEDED");
        assert_eq!(meta.bytes_scanned, 2048);
        assert_eq!(meta.execution_time_ms, 120);
        assert_eq!(
            meta.output_location.as_deref(),
            Some("s3://lake/athena-results/q-9.csv")
        );
    }

    #[test]
    fn backoff_grows_and_caps() {
        let mut b = Backoff::new();
        let delays: Vec<u64> = (0..8).map(|_| b.next_delay_ms()).collect();
        assert_eq!(&delays[..4], &[200, 300, 450, 675]);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), 2000);
    }

    #[test]
    fn jitter_is_bounded() {
        for _ in 0..1000 {
            assert!(jitter_ms() < 100);
        }
    }

    #[test]
    fn error_display_messages() {
        let err = AthenaError::QueryFailed {
            query_id: "abc-123".into(),
            reason: "TABLE_NOT_FOUND: seed_people".into(),
        };
        assert!(err.to_string().contains("abc-123"));
        assert!(err.to_string().contains("TABLE_NOT_FOUND"));

        let err = AthenaError::QueryTimeout {
            query_id: "t-1".into(),
            seconds: 60,
        };
        assert!(err.to_string().contains("60s"));

        let err = AthenaError::ScanLimitExceeded {
            bytes_scanned: 1_000_000,
            limit: 500_000,
        };
        assert!(err.to_string().contains("1000000"));
        assert!(err.to_string().contains("500000"));
    }
}
