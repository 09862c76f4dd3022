use serde::Serialize;

use crate::users::model::UserCounts;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSubscribers {
    pub price_id: String,
    pub subscribers: i64,
    /// `None` when the price has no configured amount.
    pub monthly_amount_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: UserCounts,
    pub leads: i64,
    pub unread_user_messages: i64,
    pub plans: Vec<PlanSubscribers>,
    pub estimated_mrr_cents: i64,
}

/// Joins subscriber counts with configured plan amounts.
pub fn revenue_by_plan(
    subscribers: Vec<(String, i64)>,
    plan_amounts: &[(String, i64)],
) -> (Vec<PlanSubscribers>, i64) {
    let plans: Vec<PlanSubscribers> = subscribers
        .into_iter()
        .map(|(price_id, subscribers)| {
            let monthly_amount_cents = plan_amounts
                .iter()
                .find(|(id, _)| *id == price_id)
                .map(|(_, amount)| *amount);
            PlanSubscribers {
                price_id,
                subscribers,
                monthly_amount_cents,
            }
        })
        .collect();
    let mrr = plans
        .iter()
        .map(|p| p.subscribers * p.monthly_amount_cents.unwrap_or(0))
        .sum();
    (plans, mrr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mrr_counts_only_priced_plans() {
        let amounts = vec![("price_pro".to_string(), 4900), ("price_max".to_string(), 9900)];
        let (plans, mrr) = revenue_by_plan(
            vec![
                ("price_legacy".into(), 3),
                ("price_max".into(), 1),
                ("price_pro".into(), 2),
            ],
            &amounts,
        );
        assert_eq!(mrr, 2 * 4900 + 9900);
        assert_eq!(plans[0].monthly_amount_cents, None);
        assert_eq!(plans[2].subscribers, 2);
    }

    #[test]
    fn no_subscribers_means_no_revenue() {
        let (plans, mrr) = revenue_by_plan(Vec::new(), &[("p".into(), 100)]);
        assert!(plans.is_empty());
        assert_eq!(mrr, 0);
    }
}
