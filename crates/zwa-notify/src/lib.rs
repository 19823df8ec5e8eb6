//! Notification delivery for zwave-alert
//!
//! The [`Notifier`] turns alerts into text and hands the text to a
//! [`Transport`] on a background task. Presentation (severity glyphs,
//! headers) lives in [`format`]; the classifier never sees it.

pub mod format;
mod notifier;
mod telegram;
mod transport;

pub use format::{glyph, MessageFormatter};
pub use notifier::Notifier;
pub use telegram::TelegramTransport;
pub use transport::{LogTransport, NotifyError, Transport};
