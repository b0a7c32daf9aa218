//! Per-query timing accumulator. Created at query start, carried through the
//! loop by value, and returned alongside the transcript; no process-global
//! state.

use std::time::{Duration, Instant};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone)]
pub struct QueryMetrics {
    started_at: String,
    started: Instant,
    tool_listing: Option<Duration>,
    llm_requests: Vec<Duration>,
    tool_calls: Vec<ToolCallTiming>,
    total: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ToolCallTiming {
    pub name: String,
    pub elapsed: Duration,
}

impl QueryMetrics {
    pub fn start() -> Self {
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            started_at,
            started: Instant::now(),
            tool_listing: None,
            llm_requests: Vec::new(),
            tool_calls: Vec::new(),
            total: None,
        }
    }

    pub fn record_tool_listing(&mut self, elapsed: Duration) {
        self.tool_listing = Some(elapsed);
    }

    pub fn record_llm_request(&mut self, elapsed: Duration) {
        self.llm_requests.push(elapsed);
    }

    pub fn record_tool_call(&mut self, name: impl Into<String>, elapsed: Duration) {
        self.tool_calls.push(ToolCallTiming {
            name: name.into(),
            elapsed,
        });
    }

    /// Number of LLM round trips so far; this is the turn budget counter.
    pub fn llm_requests(&self) -> usize {
        self.llm_requests.len()
    }

    pub fn tool_calls(&self) -> &[ToolCallTiming] {
        &self.tool_calls
    }

    pub fn finish(&mut self) {
        self.total = Some(self.started.elapsed());
    }

    /// Human-readable timing block printed under the transcript.
    pub fn summary(&self) -> String {
        let llm_total: Duration = self.llm_requests.iter().sum();
        let llm_avg = average(llm_total, self.llm_requests.len());
        let tool_total: Duration = self.tool_calls.iter().map(|call| call.elapsed).sum();
        let tool_avg = average(tool_total, self.tool_calls.len());

        let mut out = String::from("[Query timing]");
        out.push_str(&format!("\n• started: {}", self.started_at));
        if let Some(total) = self.total {
            out.push_str(&format!("\n• total: {}", fmt_secs(total)));
        }
        if let Some(listing) = self.tool_listing {
            out.push_str(&format!("\n• tool listing: {}", fmt_secs(listing)));
        }
        out.push_str(&format!(
            "\n• LLM round trips: {} (total {}, avg {})",
            self.llm_requests.len(),
            fmt_secs(llm_total),
            fmt_secs(llm_avg),
        ));
        out.push_str(&format!(
            "\n• tool calls: {} (total {}, avg {})",
            self.tool_calls.len(),
            fmt_secs(tool_total),
            fmt_secs(tool_avg),
        ));

        if !self.tool_calls.is_empty() {
            out.push_str("\n\n[Per-tool timing]");
            for (index, call) in self.tool_calls.iter().enumerate() {
                out.push_str(&format!(
                    "\n{}. {} took {}",
                    index + 1,
                    call.name,
                    fmt_secs(call.elapsed),
                ));
            }
        }
        out
    }
}

fn average(total: Duration, count: usize) -> Duration {
    if count == 0 {
        Duration::ZERO
    } else {
        total / count as u32
    }
}

fn fmt_secs(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_round_trips_and_tool_calls() {
        let mut metrics = QueryMetrics::start();
        metrics.record_llm_request(Duration::from_millis(500));
        metrics.record_llm_request(Duration::from_millis(300));
        metrics.record_tool_call("list_roaming_plans", Duration::from_millis(120));
        metrics.finish();

        assert_eq!(metrics.llm_requests(), 2);
        assert_eq!(metrics.tool_calls().len(), 1);

        let summary = metrics.summary();
        assert!(summary.contains("LLM round trips: 2 (total 0.800s, avg 0.400s)"));
        assert!(summary.contains("1. list_roaming_plans took 0.120s"));
    }

    #[test]
    fn summary_without_tool_calls_has_no_per_tool_block() {
        let mut metrics = QueryMetrics::start();
        metrics.record_llm_request(Duration::from_millis(100));
        metrics.finish();
        assert!(!metrics.summary().contains("[Per-tool timing]"));
    }
}
