/// Discrete-event clock and event queue.
pub mod clock;
pub mod engine;
/// Cancellable handles to scheduled callbacks.
pub mod event;
pub mod kpi;
/// Consumer current profiles.
pub mod schedule;
pub mod types;
