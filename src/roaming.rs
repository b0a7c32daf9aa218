//! Roaming-plan domain logic and REST client backing the bundled tool
//! server: plan ranking, transcript-friendly formatting, and the catalog /
//! usage / subscribe endpoints.

use serde::{Deserialize, Serialize};

use crate::{AgentError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoamingPlan {
    pub plan_code: String,
    pub plan_name: String,
    pub price: u64,
    pub duration: u64,
    pub duration_unit: DurationUnit,
    pub data_amount: String,
    pub voice_incoming_fee: u64,
    pub voice_outgoing_fee: u64,
    pub supported_countries: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Hours,
}

impl DurationUnit {
    fn label(self) -> &'static str {
        match self {
            DurationUnit::Days => "days",
            DurationUnit::Hours => "hours",
        }
    }
}

/// A plan priced for a concrete trip length.
#[derive(Debug, Clone)]
pub struct RankedPlan {
    pub plan: RoamingPlan,
    pub purchases_needed: u64,
    pub total_price: u64,
}

/// Price each plan for a trip of `trip_days` days and return the cheapest
/// five. A plan shorter than the trip is bought repeatedly; the purchase
/// count is the ceiling of trip hours over the plan's coverage window.
pub fn rank_plans(plans: Vec<RoamingPlan>, trip_days: u64) -> Vec<RankedPlan> {
    let trip_hours = trip_days * 24;
    let mut ranked: Vec<RankedPlan> = plans
        .into_iter()
        .map(|plan| {
            let coverage_hours = match plan.duration_unit {
                DurationUnit::Days => plan.duration * 24,
                DurationUnit::Hours => plan.duration,
            }
            .max(1);
            let purchases_needed = trip_hours.div_ceil(coverage_hours).max(1);
            let total_price = plan.price * purchases_needed;
            RankedPlan {
                plan,
                purchases_needed,
                total_price,
            }
        })
        .collect();
    ranked.sort_by_key(|entry| entry.total_price);
    ranked.truncate(5);
    ranked
}

fn voice_fee(fee: u64) -> String {
    if fee == 0 {
        "free".to_string()
    } else {
        format!("{fee} per minute")
    }
}

/// Render the ranked plans plus a recommendation for the cheapest one.
pub fn format_recommendation(ranked: &[RankedPlan], country: &str, trip_days: u64) -> String {
    let Some(best) = ranked.first() else {
        return format!("No suitable roaming plan was found for {country}.");
    };

    let mut details = format!(
        "Top {count} roaming plans for a {trip_days}-day trip to {country}:\n",
        count = ranked.len(),
    );
    for (index, entry) in ranked.iter().enumerate() {
        let plan = &entry.plan;
        details.push_str(&format!(
            "\n{rank}. [{name}]\n\
             - coverage: {duration} {unit}\n\
             - data: {data}\n\
             - incoming voice: {incoming}\n\
             - outgoing voice: {outgoing}\n\
             - price per purchase: {price}\n\
             - total for {trip_days} days: {total} ({purchases} purchases)\n\
             - plan code: {code}\n",
            rank = index + 1,
            name = plan.plan_name,
            duration = plan.duration,
            unit = plan.duration_unit.label(),
            data = plan.data_amount,
            incoming = voice_fee(plan.voice_incoming_fee),
            outgoing = voice_fee(plan.voice_outgoing_fee),
            price = plan.price,
            total = entry.total_price,
            purchases = entry.purchases_needed,
            code = plan.plan_code,
        ));
    }

    let plan = &best.plan;
    let mut summary = format!(
        "For your {trip_days}-day trip to {country}, '{name}' (code {code}) is the most \
         economical: {purchases} purchases of the {duration}-{unit} pass for a total of {total}. ",
        name = plan.plan_name,
        code = plan.plan_code,
        purchases = best.purchases_needed,
        duration = plan.duration,
        unit = plan.duration_unit.label(),
        total = best.total_price,
    );
    match (plan.voice_incoming_fee, plan.voice_outgoing_fee) {
        (0, 0) => summary.push_str("Incoming and outgoing voice calls are both free."),
        (0, out) => summary.push_str(&format!(
            "Incoming voice calls are free; outgoing calls cost {out} per minute."
        )),
        (input, 0) => summary.push_str(&format!(
            "Incoming voice calls cost {input} per minute; outgoing calls are free."
        )),
        (input, out) => summary.push_str(&format!(
            "Incoming voice calls cost {input} per minute and outgoing calls {out} per minute."
        )),
    }

    format!("{summary}\n\n{details}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoamingUsage {
    pub plan_name: String,
    pub roaming_country: String,
    pub subscription_date: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub time_standard: String,
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

pub fn format_usage_history(phone_number: &str, usages: &[RoamingUsage]) -> String {
    if usages.is_empty() {
        return format!("No roaming usage found for {phone_number}.");
    }
    let mut out = format!("Roaming usage for {phone_number}:");
    for usage in usages {
        out.push_str(&format!(
            "\n\n[{name}]\n\
             - country: {country}\n\
             - subscribed: {subscribed}\n\
             - starts: {start} {start_time} ({standard})\n\
             - ends: {end}",
            name = usage.plan_name,
            country = usage.roaming_country,
            subscribed = date_part(&usage.subscription_date),
            start = date_part(&usage.start_date),
            start_time = usage.start_time,
            standard = usage.time_standard,
            end = date_part(&usage.end_date),
        ));
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    pub phone_number: String,
    pub plan_code: String,
    pub roaming_country: String,
    pub start_date: String,
    pub start_time: String,
    pub time_standard: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeResponse {
    #[serde(default)]
    pub plan_name: Option<String>,
}

pub fn format_subscription(request: &SubscribeRequest, response: &SubscribeResponse) -> String {
    format!(
        "Your roaming subscription is confirmed.\n\n\
         [Subscription]\n\
         - phone number: {phone}\n\
         - plan: {plan}\n\
         - country: {country}\n\
         - starts: {start} {time}",
        phone = request.phone_number,
        plan = response.plan_name.as_deref().unwrap_or("unknown"),
        country = request.roaming_country,
        start = date_part(&request.start_date),
        time = request.start_time,
    )
}

/// Thin client for the roaming REST API the tools are backed by.
#[derive(Clone)]
pub struct RoamingApi {
    http: reqwest::Client,
    base_url: String,
}

impl RoamingApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(AgentError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    pub async fn plans(&self) -> Result<Vec<RoamingPlan>> {
        let response = self.http.get(self.url("/roaming/plans")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }
        Ok(response.json().await?)
    }

    pub async fn usage(&self, phone_number: &str) -> Result<Vec<RoamingUsage>> {
        let response = self
            .http
            .get(self.url(&format!("/roaming/subscription/{phone_number}")))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }
        Ok(response.json().await?)
    }

    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<SubscribeResponse> {
        let response = self
            .http
            .post(self.url("/roaming/subscribe"))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(code: &str, price: u64, duration: u64, unit: DurationUnit) -> RoamingPlan {
        RoamingPlan {
            plan_code: code.to_string(),
            plan_name: format!("plan {code}"),
            price,
            duration,
            duration_unit: unit,
            data_amount: "5GB".to_string(),
            voice_incoming_fee: 0,
            voice_outgoing_fee: 0,
            supported_countries: vec!["Japan".to_string()],
        }
    }

    #[test]
    fn ranks_by_total_trip_cost() {
        let plans = vec![
            // 9000 per day of coverage: 5 purchases, 45000 total.
            plan("DAILY", 9000, 1, DurationUnit::Days),
            // Covers the whole trip in one purchase.
            plan("WEEKLY", 33000, 7, DurationUnit::Days),
            // 12-hour pass: ceil(120 / 12) = 10 purchases, 40000 total.
            plan("HALFDAY", 4000, 12, DurationUnit::Hours),
        ];

        let ranked = rank_plans(plans, 5);
        assert_eq!(ranked[0].plan.plan_code, "WEEKLY");
        assert_eq!(ranked[0].purchases_needed, 1);
        assert_eq!(ranked[0].total_price, 33000);
        assert_eq!(ranked[1].plan.plan_code, "HALFDAY");
        assert_eq!(ranked[1].purchases_needed, 10);
        assert_eq!(ranked[2].plan.plan_code, "DAILY");
        assert_eq!(ranked[2].total_price, 45000);
    }

    #[test]
    fn keeps_at_most_five_plans() {
        let plans = (0..8)
            .map(|i| plan(&format!("P{i}"), 1000 + i, 1, DurationUnit::Days))
            .collect();
        let ranked = rank_plans(plans, 3);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].plan.plan_code, "P0");
    }

    #[test]
    fn recommendation_mentions_free_voice() {
        let ranked = rank_plans(vec![plan("ZERO", 9900, 1, DurationUnit::Days)], 2);
        let message = format_recommendation(&ranked, "Japan", 2);
        assert!(message.contains("'plan ZERO' (code ZERO)"));
        assert!(message.contains("Incoming and outgoing voice calls are both free."));
        assert!(message.contains("total for 2 days: 19800 (2 purchases)"));
    }

    #[test]
    fn empty_ranking_reports_no_plan() {
        let message = format_recommendation(&[], "Atlantis", 4);
        assert!(message.contains("No suitable roaming plan"));
    }

    #[test]
    fn usage_history_formats_dates() {
        let usages = vec![RoamingUsage {
            plan_name: "Zero Premium".to_string(),
            roaming_country: "Japan".to_string(),
            subscription_date: "2025-03-01T09:30:00Z".to_string(),
            start_date: "2025-03-10T00:00:00Z".to_string(),
            start_time: "09:00".to_string(),
            end_date: "2025-03-15T00:00:00Z".to_string(),
            time_standard: "LOCAL".to_string(),
        }];
        let message = format_usage_history("01012345678", &usages);
        assert!(message.contains("[Zero Premium]"));
        assert!(message.contains("starts: 2025-03-10 09:00 (LOCAL)"));
        assert!(message.contains("ends: 2025-03-15"));
    }

    #[test]
    fn empty_usage_history_is_friendly() {
        let message = format_usage_history("01012345678", &[]);
        assert!(message.contains("No roaming usage found"));
    }
}
