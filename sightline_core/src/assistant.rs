//! Keyword-triggered canned-response assistant.
//!
//! Not a language model: an ordered table of keyword sets is checked
//! top-to-bottom against the lowercased input and the first hit returns a
//! fixed (response, sample SQL, sample chart) triple. Unmatched input gets
//! one of a few generic prompts chosen at random, with no chart payload.

use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<serde_json::Value>,
}

struct Rule {
    keywords: &'static [&'static str],
    make: fn() -> AssistantReply,
}

/// Evaluation order is the priority order: earlier rules win when several
/// keyword sets appear in the same message.
const RULES: &[Rule] = &[
    Rule {
        keywords: &["revenue", "sales", "money", "income"],
        make: revenue_reply,
    },
    Rule {
        keywords: &["orders", "purchases", "transactions"],
        make: orders_reply,
    },
    Rule {
        keywords: &["customers", "users", "people"],
        make: customers_reply,
    },
    Rule {
        keywords: &["products", "items", "inventory"],
        make: products_reply,
    },
    Rule {
        keywords: &["aov", "average order value", "order value"],
        make: aov_reply,
    },
    Rule {
        keywords: &["help", "what can you do", "capabilities"],
        make: help_reply,
    },
];

const FALLBACK_RESPONSES: &[&str] = &[
    "I can help you analyze that data. Could you be more specific about what metrics you'd like to see?",
    "Let me look into your data for that information. What specific time period are you interested in?",
    "That's an interesting question! I can generate insights about your business data. What would you like to focus on?",
    "I'd be happy to help with that analysis. Could you clarify which data points you're most interested in?",
];

/// Map a free-text message to its canned reply.
pub fn reply(message: &str) -> AssistantReply {
    let message = message.to_lowercase();
    for rule in RULES {
        if rule.keywords.iter().any(|kw| message.contains(kw)) {
            return (rule.make)();
        }
    }
    fallback_reply()
}

fn revenue_reply() -> AssistantReply {
    AssistantReply {
        response: "Based on your data, here's the revenue analysis. The total revenue for the \
                   last 30 days shows a positive trend with some seasonal variations."
            .to_string(),
        sql_query: Some(
            "SELECT SUM(total_amount) AS total_revenue FROM orders WHERE status = 'completed' \
             AND created_at >= CURRENT_DATE - INTERVAL '30 days'"
                .to_string(),
        ),
        chart_data: Some(json!({
            "type": "line",
            "data": [
                {"date": "2024-01-01", "value": 12500},
                {"date": "2024-01-02", "value": 13200},
                {"date": "2024-01-03", "value": 11800},
                {"date": "2024-01-04", "value": 14500},
                {"date": "2024-01-05", "value": 15200}
            ]
        })),
    }
}

fn orders_reply() -> AssistantReply {
    AssistantReply {
        response: "Here's your order analysis. I can see the order patterns and status \
                   distribution across different time periods."
            .to_string(),
        sql_query: Some(
            "SELECT status, COUNT(*) AS count FROM orders WHERE created_at >= CURRENT_DATE - \
             INTERVAL '30 days' GROUP BY status"
                .to_string(),
        ),
        chart_data: Some(json!({
            "type": "pie",
            "data": [
                {"name": "Completed", "value": 45},
                {"name": "Pending", "value": 12},
                {"name": "Shipped", "value": 23},
                {"name": "Cancelled", "value": 8}
            ]
        })),
    }
}

fn customers_reply() -> AssistantReply {
    AssistantReply {
        response: "Your customer metrics show healthy growth patterns. Here's the user \
                   engagement and acquisition data."
            .to_string(),
        sql_query: Some(
            "SELECT COUNT(DISTINCT customer_id) AS active_customers FROM orders WHERE \
             created_at >= CURRENT_DATE - INTERVAL '30 days'"
                .to_string(),
        ),
        chart_data: Some(json!({
            "type": "bar",
            "data": [
                {"category": "New Users", "value": 156},
                {"category": "Returning Users", "value": 234},
                {"category": "Active Users", "value": 189},
                {"category": "Churned Users", "value": 23}
            ]
        })),
    }
}

fn products_reply() -> AssistantReply {
    AssistantReply {
        response: "Here's your product performance analysis. I can show you the top-selling \
                   products and inventory insights."
            .to_string(),
        sql_query: Some(
            "SELECT p.name, SUM(ol.quantity) AS total_sold FROM products p JOIN order_lines ol \
             ON p.id = ol.product_id GROUP BY p.id, p.name ORDER BY total_sold DESC LIMIT 5"
                .to_string(),
        ),
        chart_data: Some(json!({
            "type": "bar",
            "data": [
                {"name": "Laptop Pro", "sales": 45},
                {"name": "Wireless Headphones", "sales": 38},
                {"name": "Smartphone", "sales": 32},
                {"name": "Coffee Maker", "sales": 28},
                {"name": "Running Shoes", "sales": 25}
            ]
        })),
    }
}

fn aov_reply() -> AssistantReply {
    AssistantReply {
        response: "The Average Order Value (AOV) analysis shows your customers' spending \
                   patterns. Here's the breakdown by time period."
            .to_string(),
        sql_query: Some(
            "SELECT AVG(total_amount) AS avg_order_value FROM orders WHERE status = 'completed' \
             AND created_at >= CURRENT_DATE - INTERVAL '30 days'"
                .to_string(),
        ),
        chart_data: Some(json!({
            "type": "line",
            "data": [
                {"period": "Week 1", "aov": 125.50},
                {"period": "Week 2", "aov": 132.20},
                {"period": "Week 3", "aov": 118.80},
                {"period": "Week 4", "aov": 145.30}
            ]
        })),
    }
}

fn help_reply() -> AssistantReply {
    AssistantReply {
        response: "I'm your analytics copilot! Ask me about revenue, orders, customers, or \
                   products and I'll answer with the matching SQL query and a chart. Try \
                   \"Show me revenue trends\", \"What are my top products?\", \"How many \
                   active customers do I have?\" or \"Calculate average order value\"."
            .to_string(),
        sql_query: None,
        chart_data: None,
    }
}

fn fallback_reply() -> AssistantReply {
    let response = FALLBACK_RESPONSES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_RESPONSES[0]);
    AssistantReply {
        response: response.to_string(),
        sql_query: Some("SELECT COUNT(*) AS total_records FROM orders".to_string()),
        chart_data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_keywords_win_over_later_rules() {
        // "customers" also matches, but revenue is checked first.
        let reply = reply("show revenue for my customers");
        assert!(reply.response.contains("revenue analysis"));
        assert!(reply.sql_query.unwrap().contains("SUM(total_amount)"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let reply = reply("What are my TOP PRODUCTS?");
        assert!(reply.response.contains("product performance"));
        assert!(reply.chart_data.is_some());
    }

    #[test]
    fn aov_phrase_matches() {
        let reply = reply("what's the average order value this month");
        assert!(reply.sql_query.unwrap().contains("AVG(total_amount)"));
    }

    #[test]
    fn help_has_no_chart_payload() {
        let reply = reply("help");
        assert!(reply.sql_query.is_none());
        assert!(reply.chart_data.is_none());
    }

    #[test]
    fn fallback_is_generic_with_no_chart() {
        let reply = reply("tell me a story");
        assert!(FALLBACK_RESPONSES.contains(&reply.response.as_str()));
        assert!(reply.chart_data.is_none());
        assert_eq!(
            reply.sql_query.as_deref(),
            Some("SELECT COUNT(*) AS total_records FROM orders")
        );
    }
}
