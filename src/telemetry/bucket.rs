use std::time::Duration;

/// Fixed latency histogram buckets for the per-day latency counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatencyBucket {
    Under10Ms,
    Under50Ms,
    Under100Ms,
    Under500Ms,
    Over500Ms,
}

impl LatencyBucket {
    pub fn for_latency(latency: Duration) -> Self {
        let ms = latency.as_millis();
        if ms <= 10 {
            LatencyBucket::Under10Ms
        } else if ms <= 50 {
            LatencyBucket::Under50Ms
        } else if ms <= 100 {
            LatencyBucket::Under100Ms
        } else if ms <= 500 {
            LatencyBucket::Under500Ms
        } else {
            LatencyBucket::Over500Ms
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LatencyBucket::Under10Ms => "le_10ms",
            LatencyBucket::Under50Ms => "le_50ms",
            LatencyBucket::Under100Ms => "le_100ms",
            LatencyBucket::Under500Ms => "le_500ms",
            LatencyBucket::Over500Ms => "gt_500ms",
        }
    }
}
