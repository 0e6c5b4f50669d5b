//! # Customer Notification
//!
//! Builds the WhatsApp deep link the counter uses to tell a customer their
//! books arrived. Pure string formatting; nothing is sent from here.
//!
//! ```text
//! Order(phone "11 2345-6789", InStore: ["Naturales 1"])
//!      │
//!      ▼
//! https://wa.me/5491123456789?text=%C2%A1Hola+Ana%21+...
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::Order;

/// Formatting knobs for the notification link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Prepended to the phone digits when missing (Argentina mobile: 549).
    pub country_prefix: String,
    /// How the shop names itself in the message.
    pub shop_name: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            country_prefix: "549".to_string(),
            shop_name: "la librería".to_string(),
        }
    }
}

/// Keeps only the digits of a phone number and adds the country prefix.
///
/// Returns `None` when the phone has no digits at all.
///
/// ```rust
/// use atril_core::notify::normalize_phone;
///
/// assert_eq!(normalize_phone("11 2345-6789", "549").as_deref(), Some("5491123456789"));
/// assert_eq!(normalize_phone("+54 9 11 2345 6789", "549").as_deref(), Some("5491123456789"));
/// assert_eq!(normalize_phone("n/a", "549"), None);
/// ```
pub fn normalize_phone(phone: &str, country_prefix: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    if digits.starts_with(country_prefix) {
        Some(digits)
    } else {
        Some(format!("{country_prefix}{digits}"))
    }
}

/// The message text for the books currently in the shop.
pub fn arrival_message(order: &Order, config: &NotifyConfig) -> Option<String> {
    let titles: Vec<&str> = order
        .lines_in_store()
        .into_iter()
        .map(|l| l.title.as_str())
        .collect();

    let body = match titles.as_slice() {
        [] => return None,
        [single] => format!("ya llegó el libro que encargaste: {single}"),
        many => format!("ya llegaron los libros que encargaste: {}", many.join(", ")),
    };

    Some(format!(
        "¡Hola {}! Te aviso de {} que {}.",
        order.customer_name, config.shop_name, body
    ))
}

/// Builds `https://wa.me/<digits>?text=<message>` for an order.
///
/// The message is form-encoded into the query. `None` when the order has no
/// usable phone or nothing is `InStore`.
pub fn whatsapp_link(order: &Order, config: &NotifyConfig) -> Option<String> {
    let phone = normalize_phone(&order.phone, &config.country_prefix)?;
    let message = arrival_message(order, config)?;
    Url::parse_with_params(
        &format!("https://wa.me/{phone}"),
        &[("text", message.as_str())],
    )
    .ok()
    .map(String::from)
}
