//! 状态机：通用状态寄存器与订单处理示例

pub mod order;
pub mod register;

pub use order::{order_register, Notifications, OrderData, OrderEvent, OrderRegister, OrderState};
pub use register::{
    Action, ActionError, ActionPhase, SharedStateRegister, StateRegister, StateRegisterBuilder,
    Transition,
};
