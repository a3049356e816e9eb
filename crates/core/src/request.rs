//! Per-operation request state.

/// State of one asynchronous lifecycle operation in a client session.
///
/// Each operation (create, pay, deliver, fetch details) owns one of these.
/// They are transient and reset before an operation is issued again for a
/// different order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState<T, E = String> {
    Idle,
    Loading,
    Succeeded(T),
    Failed(E),
}

impl<T, E> Default for RequestState<T, E> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T, E> RequestState<T, E> {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The success value, if the operation finished successfully.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    /// The failure, if the operation failed.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Return to `Idle`, dropping any previous outcome.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    /// Record the outcome of a finished request.
    pub fn finish(&mut self, result: Result<T, E>) {
        *self = match result {
            Ok(value) => Self::Succeeded(value),
            Err(error) => Self::Failed(error),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state: RequestState<u32> = RequestState::default();
        assert!(state.is_idle());
        assert!(state.value().is_none());
    }

    #[test]
    fn test_finish_and_reset() {
        let mut state: RequestState<u32> = RequestState::Loading;
        state.finish(Ok(3));
        assert_eq!(state.value(), Some(&3));

        state.reset();
        assert!(state.is_idle());

        state.finish(Err("boom".to_string()));
        assert_eq!(state.error().map(String::as_str), Some("boom"));
    }
}
