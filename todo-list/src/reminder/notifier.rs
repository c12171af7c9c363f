use thiserror::Error;

/// Permission state of the notification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user has not been asked yet.
    Undetermined,
    Granted,
    Denied,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifications are unavailable")]
    Unavailable,
    #[error("cannot display notification: {0}")]
    Display(String),
}

/// The platform capability used to show reminders.
///
/// Implementations are best-effort: a failure to display is logged by the
/// scheduler and never escalates further.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn permission(&self) -> Permission;
    /// Asks the user for permission. The answer is observed through a later
    /// call to [`Notifier::permission`].
    fn request_permission(&self);
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}
