//! # Order Board
//!
//! Kanban-style overview of every open book line, grouped by title and state.
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┐
//! │   Missing    │   OnOrder    │   InStore    │   (Delivered never shown)
//! ├──────────────┼──────────────┼──────────────┤
//! │ Naturales 1  │ Atlas        │ Naturales 1  │
//! │ ×3 Ana, Pedro│ ×1 Lucía     │ ×1 Marta     │
//! └──────────────┴──────────────┴──────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{title_key, FulfillmentState, Order};

/// One card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoardGroup {
    /// First spelling seen for this title.
    pub title: String,
    pub state: FulfillmentState,
    pub count: usize,
    /// Distinct customers, in the order they were first seen.
    pub customer_names: Vec<String>,
}

/// Groups all non-delivered lines across `orders` by `(title, state)`.
///
/// Titles group case-insensitively. Output is sorted by title key, then by
/// lifecycle order of the state. Read-only.
pub fn aggregate_open_lines_by_title_and_state(orders: &[Order]) -> Vec<BoardGroup> {
    let mut groups: BTreeMap<(String, FulfillmentState), BoardGroup> = BTreeMap::new();

    for order in orders {
        for line in &order.lines {
            if line.state == FulfillmentState::Delivered {
                continue;
            }

            let group = groups
                .entry((title_key(&line.title), line.state))
                .or_insert_with(|| BoardGroup {
                    title: line.title.trim().to_string(),
                    state: line.state,
                    count: 0,
                    customer_names: Vec::new(),
                });

            group.count += 1;
            if !group.customer_names.contains(&order.customer_name) {
                group.customer_names.push(order.customer_name.clone());
            }
        }
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::BookLine;
    use chrono::Utc;

    fn order(customer: &str, lines: &[(&str, FulfillmentState)]) -> Order {
        Order {
            id: customer.to_string(),
            customer_name: customer.to_string(),
            phone: String::new(),
            created_at: Utc::now(),
            tentative_arrival: None,
            lines: lines
                .iter()
                .map(|(t, s)| BookLine {
                    state: *s,
                    ..BookLine::new(*t, Money::zero())
                })
                .collect(),
            payments: Vec::new(),
            sync_version: 0,
        }
    }

    #[test]
    fn test_groups_by_title_and_state() {
        let orders = vec![
            order(
                "Ana",
                &[
                    ("Naturales 1", FulfillmentState::Missing),
                    ("Naturales 1", FulfillmentState::Missing),
                    ("Atlas", FulfillmentState::OnOrder),
                ],
            ),
            order(
                "Pedro",
                &[
                    ("NATURALES 1", FulfillmentState::Missing),
                    ("Naturales 1", FulfillmentState::InStore),
                ],
            ),
        ];

        let board = aggregate_open_lines_by_title_and_state(&orders);
        assert_eq!(board.len(), 3);

        assert_eq!(board[0].title, "Atlas");
        assert_eq!(board[0].state, FulfillmentState::OnOrder);

        assert_eq!(board[1].title, "Naturales 1");
        assert_eq!(board[1].state, FulfillmentState::Missing);
        assert_eq!(board[1].count, 3);
        assert_eq!(board[1].customer_names, vec!["Ana", "Pedro"]);

        assert_eq!(board[2].state, FulfillmentState::InStore);
        assert_eq!(board[2].customer_names, vec!["Pedro"]);
    }

    #[test]
    fn test_delivered_never_shown() {
        let orders = vec![order(
            "Ana",
            &[
                ("A", FulfillmentState::Delivered),
                ("B", FulfillmentState::Delivered),
            ],
        )];
        let board = aggregate_open_lines_by_title_and_state(&orders);
        assert!(board.is_empty());
        assert!(board.iter().all(|g| g.state != FulfillmentState::Delivered));
    }
}
