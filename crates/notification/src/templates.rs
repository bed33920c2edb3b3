//! Human-readable notification text.

use domain::{BuildCompleted, PaymentCompleted};

pub fn order_paid(event: &PaymentCompleted) -> String {
    format!(
        "Order {order} has been paid.\n\
         Payment method: {method}\n\
         Transaction: {transaction}\n\
         Your ship is going to assembly.",
        order = event.order_id,
        method = event.payment_method,
        transaction = event.transaction_id,
    )
}

pub fn order_assembled(event: &BuildCompleted) -> String {
    format!(
        "Your ship for order {order} is assembled!\n\
         Build time: {seconds} s",
        order = event.order_id,
        seconds = event.build_time_sec,
    )
}

#[cfg(test)]
mod tests {
    use common::{OrderId, UserId};
    use domain::PaymentMethod;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_order_paid_mentions_order_and_method() {
        let event = PaymentCompleted::new(
            OrderId::new(),
            UserId::from("u1"),
            PaymentMethod::Sbp,
            Uuid::new_v4(),
        );
        let text = order_paid(&event);
        assert!(text.contains(&event.order_id.to_string()));
        assert!(text.contains("SBP"));
        assert!(text.contains(&event.transaction_id.to_string()));
    }

    #[test]
    fn test_order_assembled_mentions_build_time() {
        let event = BuildCompleted::new(OrderId::new(), UserId::from("u1"), 7);
        let text = order_assembled(&event);
        assert!(text.contains(&event.order_id.to_string()));
        assert!(text.contains("7 s"));
    }
}
