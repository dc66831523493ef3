//! 订单处理状态机
//!
//! 待付款 -> 待发货 -> 已发货 -> 已送达；任一阶段可能失败或取消。
//! 每个状态注册一个进入动作，把通知追加到共享的通知日志并输出 tracing 日志。

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::core::MachineError;
use crate::machine::StateRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    PendingPayment,
    AwaitingShipment,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    PaymentReceived,
    PaymentFailed,
    ItemShipped,
    DeliveryConfirmed,
    CancelOrder,
    ErrorOccurred,
}

/// 事件附带的订单数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl OrderData {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            ..Self::default()
        }
    }

    pub fn with_tracking(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = Some(tracking_id.into());
        self
    }

    pub fn with_error(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// 通知日志，进入动作写入，调用方读取
pub type Notifications = Arc<Mutex<Vec<String>>>;

pub type OrderRegister = StateRegister<OrderState, OrderEvent, OrderData>;

fn notifier(
    log: &Notifications,
    render: fn(&OrderData) -> String,
) -> impl Fn(&OrderData) -> Result<(), String> + Send + Sync + 'static {
    let log = log.clone();
    move |data: &OrderData| {
        let line = render(data);
        tracing::info!(order_id = %data.order_id, "{}", line);
        log.lock()
            .map_err(|_| "notification log poisoned".to_string())?
            .push(line);
        Ok(())
    }
}

/// 构建完整的订单状态机：全部转移 + 每个状态的进入通知
pub fn order_register(
    initial: OrderState,
    notifications: &Notifications,
) -> Result<OrderRegister, MachineError> {
    use OrderEvent::*;
    use OrderState::*;

    StateRegister::builder(initial)
        .transition(PendingPayment, PaymentReceived, AwaitingShipment)
        .transition(PendingPayment, PaymentFailed, Failed)
        .transition(PendingPayment, CancelOrder, Cancelled)
        .transition(AwaitingShipment, ItemShipped, Shipped)
        .transition(AwaitingShipment, CancelOrder, Cancelled)
        .transition(AwaitingShipment, ErrorOccurred, Failed)
        .transition(Shipped, DeliveryConfirmed, Delivered)
        .transition(Shipped, ErrorOccurred, Failed)
        .on_enter(
            PendingPayment,
            notifier(notifications, |d| {
                format!("Order {} is pending payment", d.order_id)
            }),
        )
        .on_enter(
            AwaitingShipment,
            notifier(notifications, |d| {
                format!("Payment processed for order {}, preparing shipment", d.order_id)
            }),
        )
        .on_enter(
            Shipped,
            notifier(notifications, |d| {
                format!(
                    "Shipping notification sent for order {} with tracking {}",
                    d.order_id,
                    d.tracking_id.as_deref().unwrap_or("-")
                )
            }),
        )
        .on_enter(
            Delivered,
            notifier(notifications, |d| {
                format!("Delivery confirmed for order {}, order closed", d.order_id)
            }),
        )
        .on_enter(
            Cancelled,
            notifier(notifications, |d| {
                format!("Order {} cancelled, refund initiated if applicable", d.order_id)
            }),
        )
        .on_enter(
            Failed,
            notifier(notifications, |d| {
                format!(
                    "Critical failure for order {}: {}",
                    d.order_id,
                    d.error_details.as_deref().unwrap_or("unknown error")
                )
            }),
        )
        .build()
}
