//! agentflow 命令行
//!
//! `agentflow <goal...>` 运行单个目标并输出 JSON 结果；不带参数时运行演示：
//! 订单状态机走一遍完整流程，再并发运行一组示例目标。

use anyhow::Context;
use agentflow::config::load_config;
use agentflow::machine::{order_register, Notifications, OrderData, OrderEvent, OrderState};
use agentflow::{observability, Orchestrator};

const DEMO_GOALS: &[&str] = &[
    "What is the time?",
    "Tell me about the capital of France",
    "Define python for me.",
    "calculate 25 * (4 + 1)",
    "calculate 100/0",
    "What's the weather like in Paris?",
    "search for LLM agents",
    "Tell me a joke.",
];

fn order_demo() -> anyhow::Result<()> {
    let notifications = Notifications::default();
    let mut order = order_register(OrderState::PendingPayment, &notifications)?;
    let data = OrderData::new("ORD123");

    order.transition(OrderEvent::PaymentReceived, &data)?;
    order.transition(
        OrderEvent::ItemShipped,
        &data.clone().with_tracking("TRKXYZ789"),
    )?;
    order.transition(OrderEvent::DeliveryConfirmed, &data)?;
    // 已送达的订单不再接受付款事件
    let ignored = order.transition(OrderEvent::PaymentReceived, &data)?;

    println!("Order {} final state: {:?}", data.order_id, order.current());
    println!("Late payment event: {ignored:?}");
    for line in notifications
        .lock()
        .map_err(|_| anyhow::anyhow!("notification log poisoned"))?
        .iter()
    {
        println!("  notified: {line}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = load_config(None);
    let cfg = loaded.as_ref().cloned().unwrap_or_default();
    observability::init(&cfg.logging.level);
    if let Err(e) = &loaded {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    let orchestrator = Orchestrator::from_config(&cfg).context("Failed to build orchestrator")?;

    let goal = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !goal.trim().is_empty() {
        let result = orchestrator.run(&goal).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    order_demo().context("Order demo failed")?;

    println!();
    for result in orchestrator.run_tasks(DEMO_GOALS.iter().copied()).await {
        println!(
            "[{}] {} -> {} ({} steps)\n    {}",
            result.flow_id,
            result.goal,
            result.status.as_str(),
            result.steps_executed,
            result.final_answer
        );
    }
    Ok(())
}
