//! Helper macro enforcing consistent reconciliation log fields.
//!
//! Keeps an `event` field (and optionally `unit`) present on every log
//! emitted from the driver and its components so downstream parsing can rely
//! on them.

/// Log a reconciliation event plus any extra fields.
#[macro_export]
macro_rules! unit_event {
    ($level:ident, $target:expr, $event:expr, unit = $unit:expr $(, $field:ident = $value:expr )* $(,)?) => {
        tracing::$level!(
            target: $target,
            event = $event,
            unit = %$unit,
            $($field = %$value,)*
        )
    };
    ($level:ident, $target:expr, $event:expr $(, $field:ident = $value:expr )* $(,)?) => {
        tracing::$level!(
            target: $target,
            event = $event,
            $($field = %$value,)*
        )
    };
}
