//! Query timing and pool gauges for the remote backend.

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;

const QUERY_DURATION: &str = "invite_store_query_duration_seconds";
const CONSUME_REJECTED: &str = "invite_store_consume_rejected_total";

/// Samples the pool's size and idle count into gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let total = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("invite_store_pool_connections", "state" => "idle").set(idle as f64);
    gauge!("invite_store_pool_connections", "state" => "in_use")
        .set(total.saturating_sub(idle) as f64);
}

/// Counts consume attempts whose conditional update matched no row, i.e.
/// the code was exhausted, expired or disabled by the time it was written.
pub fn record_consume_rejected() {
    counter!(CONSUME_REJECTED).increment(1);
}

/// Wall-clock timer for one named statement.
///
/// ```ignore
/// let timer = QueryTimer::start("find_invite_code_by_code");
/// let row = query.fetch_optional(&pool).await;
/// timer.finish();
/// ```
pub struct QueryTimer {
    name: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            started: Instant::now(),
        }
    }

    /// Records the elapsed time under the statement's name and returns it
    /// in seconds.
    pub fn finish(self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        histogram!(QUERY_DURATION, "query" => self.name).record(elapsed);
        elapsed
    }
}
