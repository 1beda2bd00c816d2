//! Translation overlay.
//!
//! An overlay supplies, per string id, a localized variant of the source
//! text together with its review state. The core only consumes the
//! [`OverlayProvider`] trait; the HTTP-backed provider lives in the CLI.
//!
//! Providers may block on network I/O and may fail. Callers in the core
//! treat a failure exactly like "no translation available".

pub mod index;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::StringId;

pub use index::{IndexEntry, IndexError, WeblateIndex};

/// One localized unit as reported by the translation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationUnit {
    pub source: String,
    pub target: String,
    pub fuzzy: bool,
    pub translated: bool,
    pub approved: bool,
}

impl TranslationUnit {
    /// A unit counts as translated when it is either final or a fuzzy draft.
    #[must_use]
    pub const fn has_translation(&self) -> bool {
        self.translated || self.fuzzy
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("translation service request failed: {0}")]
    Transport(String),

    #[error("translation service returned HTTP {status}")]
    Status { status: u16 },

    #[error("translation service response could not be decoded: {0}")]
    Decode(String),

    #[error("translation service rejected the token")]
    Unauthorized,
}

impl OverlayError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized => ErrorCode::OverlayAuthFailed,
            Self::Transport(_) | Self::Status { .. } | Self::Decode(_) => {
                ErrorCode::OverlayUnavailable
            }
        }
    }
}

/// Source of localized text.
pub trait OverlayProvider {
    /// Look up the unit for `id`. `Ok(None)` means the string is not part of
    /// the translation project.
    ///
    /// # Errors
    ///
    /// Returns an [`OverlayError`] when the provider cannot answer.
    fn lookup(&self, id: StringId) -> Result<Option<TranslationUnit>, OverlayError>;

    /// URL of the editor page for `id`, if the provider knows one.
    fn editor_link(&self, _id: StringId) -> Option<String> {
        None
    }
}

/// Provider used when translation is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverlay;

impl OverlayProvider for NoOverlay {
    fn lookup(&self, _id: StringId) -> Result<Option<TranslationUnit>, OverlayError> {
        Ok(None)
    }
}

/// In-memory provider, loaded up front. Also handy in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticOverlay {
    units: HashMap<StringId, TranslationUnit>,
}

impl StaticOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, id: StringId, unit: TranslationUnit) -> Self {
        self.units.insert(id, unit);
        self
    }

    pub fn insert(&mut self, id: StringId, unit: TranslationUnit) {
        self.units.insert(id, unit);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl OverlayProvider for StaticOverlay {
    fn lookup(&self, id: StringId) -> Result<Option<TranslationUnit>, OverlayError> {
        Ok(self.units.get(&id).cloned())
    }
}

impl<P: OverlayProvider + ?Sized> OverlayProvider for &P {
    fn lookup(&self, id: StringId) -> Result<Option<TranslationUnit>, OverlayError> {
        (**self).lookup(id)
    }

    fn editor_link(&self, id: StringId) -> Option<String> {
        (**self).editor_link(id)
    }
}
