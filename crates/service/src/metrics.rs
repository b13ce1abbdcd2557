use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

// Prometheus metrics (default registry)
pub static EXPOSURE_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "exposure_operations_total",
        "Port exposure operations by direction, operation and result",
        &["direction", "operation", "result"]
    )
    .expect("register exposure_operations_total")
});

pub static EXPOSURE_COMPENSATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "exposure_compensations_total",
        "Exposure objects deleted to undo a failed open"
    )
    .expect("register exposure_compensations_total")
});

pub static TASKS_ENQUEUED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tasks_enqueued_total",
        "Tasks published to the task queue by type and result",
        &["task_type", "result"]
    )
    .expect("register tasks_enqueued_total")
});

pub fn record_exposure(direction: &str, operation: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    EXPOSURE_OPERATIONS_TOTAL.with_label_values(&[direction, operation, result]).inc();
}
