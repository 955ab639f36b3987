pub const EVENTS_RECEIVED: &str = "hashtag_trends_events_received";
pub const DECODE_ERRORS: &str = "hashtag_trends_decode_errors";
pub const EMPTY_EVENTS: &str = "hashtag_trends_empty_events";
pub const EXTRACTION_ERRORS: &str = "hashtag_trends_extraction_errors";
pub const HASHTAGS_DROPPED: &str = "hashtag_trends_hashtags_dropped";
pub const HASHTAGS_COUNTED: &str = "hashtag_trends_hashtags_counted";
pub const SOURCE_ERRORS: &str = "hashtag_trends_source_errors";
pub const REPORTS_EMITTED: &str = "hashtag_trends_reports_emitted";
pub const REPORT_FAILED: &str = "hashtag_trends_report_failed";
pub const DISTINCT_HASHTAGS: &str = "hashtag_trends_distinct_hashtags";
pub const REPORTED_HASHTAGS: &str = "hashtag_trends_reported_hashtags";
pub const SNAPSHOT_TIME: &str = "hashtag_trends_snapshot_time_ms";
pub const WORKERS_ABORTED: &str = "hashtag_trends_workers_aborted";
pub const PAYLOADS_TOO_LARGE: &str = "hashtag_trends_payloads_too_large";
