//! Error reporting shared by the terminal and web front ends
//!
//! Errors that the user can act on (a locked directory, a bad URL, a missing
//! scanner binary) carry a specific message. Everything else is reported
//! with the operation that failed and the detail goes to the debug log.

/// Errors that know whether their message is meant for the user.
///
/// When `is_user_actionable()` is true, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    /// True if the message can be shown to the user as-is
    fn is_user_actionable(&self) -> bool;

    /// The message to show when the error is user actionable
    fn user_message(&self) -> Option<&str>;
}

/// Text to show a user for `error` raised while performing `operation_context`
pub fn describe_error<E: ContextualError>(error: &E, operation_context: &str) -> String {
    match error.user_message() {
        Some(message) if error.is_user_actionable() => message.to_string(),
        _ => format!("{}: {}", operation_context, error),
    }
}

/// Log an error at error level with detail only at debug level
pub fn log_error_with_context<E: ContextualError>(error: &E, operation_context: &str) {
    if error.is_user_actionable() {
        if let Some(message) = error.user_message() {
            log::error!("{}", message);
        } else {
            log::error!("{}", operation_context);
        }
    } else {
        log::error!("{} failed", operation_context);
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
