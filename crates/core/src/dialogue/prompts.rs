//! Spoken prompt builders. Every outcome the caller can reach maps to one
//! of these; no technical fault text ever leaves the engine.

use crate::domain::OrderLine;

pub fn greeting(store_name: &str) -> String {
    format!("Welcome to {store_name}! Please tell me your name.")
}

pub fn ask_order(customer_name: Option<&str>) -> String {
    match customer_name {
        Some(name) => format!("Hello, {name}. What would you like to order?"),
        None => "Hello! What would you like to order?".to_string(),
    }
}

pub fn reask_order() -> String {
    "Sorry, I didn't catch that. Could you tell me the product and quantity again?".to_string()
}

pub fn not_found(product: &str) -> String {
    format!("Sorry, I couldn't find {product} in our inventory. Could you please say it again?")
}

pub fn out_of_stock(product: &str) -> String {
    format!("Sorry, {product} is currently out of stock. Would you like to order something else?")
}

pub fn in_stock(quantity: u32, product: &str) -> String {
    format!("We have {product} in stock. Shall I add {quantity} to your order?")
}

pub fn only_n_available(available: u32, product: &str) -> String {
    format!("We only have {available} {product} in stock. Would you like to take them?")
}

pub fn item_confirmed() -> String {
    "Done. Would you like to order anything else?".to_string()
}

pub fn ask_again_after_reject() -> String {
    "No problem. What would you like to order instead?".to_string()
}

pub fn yes_or_no() -> String {
    "Sorry, was that a yes or a no?".to_string()
}

pub fn confirm_full_order(order_lines: &[OrderLine]) -> String {
    format!("Your order: {}. Is that correct?", order_summary(order_lines))
}

pub fn thanks() -> String {
    "Thank you for your order. We'll process it shortly. Goodbye!".to_string()
}

pub fn polite_close() -> String {
    "Okay, feel free to call us anytime to place your order. Goodbye!".to_string()
}

pub fn goodbye() -> String {
    "Alright, thank you for calling. Goodbye!".to_string()
}

pub fn handoff() -> String {
    "I'm having trouble understanding. Please call the store directly and we'll help you out. Goodbye!"
        .to_string()
}

/// Itemized "Name xQty" list, comma separated, in confirmation order.
pub fn order_summary(order_lines: &[OrderLine]) -> String {
    order_lines
        .iter()
        .map(|line| format!("{} x{}", line.product_name, line.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::order_summary;
    use crate::domain::OrderLine;

    #[test]
    fn summary_lists_items_in_confirmation_order() {
        let lines = vec![OrderLine::new("Biscuits", 2), OrderLine::new("Rice", 1)];
        assert_eq!(order_summary(&lines), "Biscuits x2, Rice x1");
    }
}
