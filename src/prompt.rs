//! Range-selection prompt
//!
//! The prompt is asked once per subject with more than one asset. Returning `None`
//! cancels the download phase entirely.

use crate::types::Selection;
use async_trait::async_trait;

/// Collaborator that lets the caller pick which assets to download
#[async_trait]
pub trait RangePrompt: Send + Sync {
    /// Choose a selection for `total` assets, starting from `default`
    ///
    /// `None` cancels; any returned selection is passed on unmodified and clamped later.
    async fn choose(&self, total: usize, default: Selection) -> Option<Selection>;
}

/// Always accepts the default selection
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl RangePrompt for AcceptAll {
    async fn choose(&self, _total: usize, default: Selection) -> Option<Selection> {
        Some(default)
    }
}

/// Always answers with a fixed selection, or cancels when constructed with `None`
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSelection(pub Option<Selection>);

impl FixedSelection {
    /// Prompt that always picks `selection`
    pub fn new(selection: Selection) -> Self {
        Self(Some(selection))
    }

    /// Prompt that always cancels
    pub fn cancel() -> Self {
        Self(None)
    }
}

#[async_trait]
impl RangePrompt for FixedSelection {
    async fn choose(&self, _total: usize, _default: Selection) -> Option<Selection> {
        self.0
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_all_returns_default() {
        let default = Selection::Range { start: 1, end: 4 };
        assert_eq!(AcceptAll.choose(4, default).await, Some(default));
    }

    #[tokio::test]
    async fn fixed_selection_ignores_default() {
        let prompt = FixedSelection::new(Selection::Range { start: 2, end: 2 });
        assert_eq!(
            prompt.choose(10, Selection::All).await,
            Some(Selection::Range { start: 2, end: 2 })
        );
        assert_eq!(FixedSelection::cancel().choose(10, Selection::All).await, None);
    }
}
