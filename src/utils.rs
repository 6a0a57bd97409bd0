use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Instant;
use tracing::debug;

// Utility function to measure execution time of operations
pub async fn measure_time<F, T, E>(operation_name: &str, f: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let result = f.await;
    let elapsed = start.elapsed();

    debug!("{} completed in {:.2?}", operation_name, elapsed);

    result
}

// Format a timestamp for CLI output
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_time() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 15, 53, 0).unwrap();
        assert_eq!(format_time(&ts), "2024-01-01 15:53:00 UTC");
    }

    #[tokio::test]
    async fn test_measure_time_passes_result_through() {
        let ok: Result<u8, String> = measure_time("noop", async { Ok(3) }).await;
        assert_eq!(ok, Ok(3));

        let err: Result<u8, String> = measure_time("noop", async { Err("boom".to_string()) }).await;
        assert_eq!(err, Err("boom".to_string()));
    }
}
