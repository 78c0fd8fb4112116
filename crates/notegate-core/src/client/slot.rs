//! One in-flight request per UI surface

use std::sync::Mutex;

use crate::types::CancellationToken;

/// Issues cancellation tokens for a single surface (a chat panel, an inline
/// completion box, ...).
///
/// `begin` cancels the token this slot issued last and nothing else, so
/// independent surfaces never abort each other.
#[derive(Debug, Default)]
pub struct RequestSlot {
    current: Mutex<Option<CancellationToken>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the previous request of this slot and return a token for the next one
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        token
    }

    /// Cancel the in-flight request, if any
    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(token) = current {
            token.cancel();
        }
    }

    /// Whether the last issued token is still live
    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(false, |token| !token.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_cancels_only_previous() {
        let chat = RequestSlot::new();
        let inline = RequestSlot::new();

        let first = chat.begin();
        let other = inline.begin();
        let second = chat.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!other.is_cancelled());
        assert!(chat.is_active());
    }

    #[test]
    fn test_cancel() {
        let slot = RequestSlot::new();
        assert!(!slot.is_active());
        let token = slot.begin();
        slot.cancel();
        assert!(token.is_cancelled());
        assert!(!slot.is_active());
        // Nothing left to cancel.
        slot.cancel();
    }
}
