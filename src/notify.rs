//! Report delivery seam.
//!
//! The actual sink (chat bot, webhook) is an external collaborator;
//! only the trait and a console implementation live here.

use thiserror::Error;

/// Report delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The sink rejected or failed to deliver the report.
    #[error("report delivery failed: {0}")]
    Delivery(String),
}

/// Delivers one formatted report per symbol per cycle.
pub trait Notifier: Send + Sync {
    /// Deliver one report.
    fn notify(&self, report: &str) -> Result<(), NotifyError>;
}

/// Writes reports to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, report: &str) -> Result<(), NotifyError> {
        println!("{report}");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures reports for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        /// Delivered reports, in order.
        pub delivered: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, report: &str) -> Result<(), NotifyError> {
            self.delivered
                .lock()
                .expect("notifier mutex poisoned")
                .push(report.to_string());
            Ok(())
        }
    }
}
