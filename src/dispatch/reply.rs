//! Conversion of handler return values into response bodies.

use std::fmt::Display;

use axum::body::Bytes;

/// What a handler's return type produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Text body, sent as UTF-8.
    Text,
    /// Opaque byte body, sent verbatim.
    Bytes,
    /// Nothing returned: the handler wrote the response through the context.
    Written,
}

/// Result of invoking a handler once.
#[derive(Debug)]
pub enum Outcome {
    Text(String),
    Bytes(Bytes),
    Written,
    /// The handler reported a failure; the request ends with a 500.
    Failed(String),
}

/// Values a handler may return.
pub trait Reply {
    /// Output shape, known statically from the return type.
    const KIND: OutputKind;

    fn into_outcome(self) -> Outcome;
}

impl Reply for String {
    const KIND: OutputKind = OutputKind::Text;

    fn into_outcome(self) -> Outcome {
        Outcome::Text(self)
    }
}

impl Reply for &'static str {
    const KIND: OutputKind = OutputKind::Text;

    fn into_outcome(self) -> Outcome {
        Outcome::Text(self.to_string())
    }
}

impl Reply for Vec<u8> {
    const KIND: OutputKind = OutputKind::Bytes;

    fn into_outcome(self) -> Outcome {
        Outcome::Bytes(Bytes::from(self))
    }
}

impl Reply for Bytes {
    const KIND: OutputKind = OutputKind::Bytes;

    fn into_outcome(self) -> Outcome {
        Outcome::Bytes(self)
    }
}

impl Reply for () {
    const KIND: OutputKind = OutputKind::Written;

    fn into_outcome(self) -> Outcome {
        Outcome::Written
    }
}

impl<T, E> Reply for Result<T, E>
where
    T: Reply,
    E: Display,
{
    const KIND: OutputKind = T::KIND;

    fn into_outcome(self) -> Outcome {
        match self {
            Ok(value) => value.into_outcome(),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}
