use crate::config::PermissionSetting;
use std::cell::Cell;
use std::io::Write;
use todo_list::reminder::{Notifier, NotifyError, Permission};
use tracing::info;

/// Shows reminders as lines on standard output.
pub struct ConsoleNotifier {
    permission: Cell<Permission>,
}

impl ConsoleNotifier {
    pub fn new(setting: PermissionSetting) -> Self {
        Self {
            permission: Cell::new(setting.into()),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    fn request_permission(&self) {
        info!("granting notification permission for this session");
        self.permission.set(Permission::Granted);
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "[{title}] {body}").map_err(|e| NotifyError::Display(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_starts_undetermined_and_request_grants() {
        // Arrange
        let notifier = ConsoleNotifier::new(PermissionSetting::Ask);

        // Act & Assert
        assert_eq!(notifier.permission(), Permission::Undetermined);
        notifier.request_permission();
        assert_eq!(notifier.permission(), Permission::Granted);
    }

    #[test]
    fn denied_setting_reports_denied() {
        let notifier = ConsoleNotifier::new(PermissionSetting::Denied);
        assert_eq!(notifier.permission(), Permission::Denied);
    }
}
