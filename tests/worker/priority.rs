//! tests/worker/priority.rs
//! Ready high priority tasks are taken before medium and low ones.

#[path = "../mod.rs"]
mod common;

use std::time::Duration;

use message_dispatch::worker::{ProcessingProfile, TaskRegistry};
use tokio::sync::watch;

use common::{task_body, BrokerEvent, FakeBroker};

fn acked(events: &[BrokerEvent]) -> usize {
    events.iter().filter(|e| matches!(e, BrokerEvent::Acked(_))).count()
}

#[tokio::test(start_paused = true)]
async fn takes_ready_queues_highest_priority_first() {
    let broker = FakeBroker::default();
    broker.push("sms_low_queue", &task_body("process_sms_message", "low-1", "low"));
    broker.push("email_medium_queue", &task_body("process_email_message", "medium-1", "medium"));
    broker.push("whatsapp_high_queue", &task_body("process_whatsapp_message", "high-1", "high"));

    let worker = common::worker(&broker, TaskRegistry::with_defaults(), ProcessingProfile::immediate());
    let (stop_tx, stop_rx) = watch::channel(false);

    let (result, ()) = tokio::join!(worker.run(stop_rx), async {
        common::wait_until(&broker, |events| acked(events) == 3).await;
        stop_tx.send(true).unwrap();
    });

    result.unwrap();
    assert_eq!(
        broker.fetched_queues(),
        ["whatsapp_high_queue", "email_medium_queue", "sms_low_queue"]
    );
}

#[tokio::test(start_paused = true)]
async fn high_task_arriving_mid_run_goes_before_waiting_low_tasks() {
    let broker = FakeBroker::default();
    broker.push("sms_low_queue", &task_body("process_sms_message", "low-1", "low"));
    broker.push("sms_low_queue", &task_body("process_sms_message", "low-2", "low"));

    let profile = ProcessingProfile {
        high_priority: Duration::from_secs(1),
        default: Duration::from_secs(1),
    };
    let worker = common::worker(&broker, TaskRegistry::with_defaults(), profile);
    let (stop_tx, stop_rx) = watch::channel(false);

    let (result, ()) = tokio::join!(worker.run(stop_rx), async {
        common::wait_until(&broker, |events| !events.is_empty()).await;
        broker.push("email_high_queue", &task_body("process_email_message", "high-1", "high"));

        common::wait_until(&broker, |events| acked(events) == 3).await;
        stop_tx.send(true).unwrap();
    });

    result.unwrap();
    assert_eq!(
        broker.fetched_queues(),
        ["sms_low_queue", "email_high_queue", "sms_low_queue"]
    );
}
