//! Threshold alert composition and delivery.

mod compose;
mod dispatch;

pub use compose::{
    build_threshold_email, CompositionError, Priority, ThresholdEmail, ThresholdEmailInput,
};
pub use dispatch::{
    NoPause, NotificationMetadata, Pause, RetryPolicy, SendOutcome, ThreadPause, ThresholdNotifier,
};
