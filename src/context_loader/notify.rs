#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Receiver of user-visible notices emitted while loading data
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, level: NotificationLevel);
}

/// Sink writing notices to the log, used when no UI is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;
impl NotificationSink for LogNotificationSink {
    fn notify(&self, message: &str, level: NotificationLevel) {
        match level {
            NotificationLevel::Info => log::info!("{message}"),
            NotificationLevel::Error => log::error!("{message}"),
        }
    }
}
