//! Actions accepted by the reducer

use crate::builder::CreateSectionsPayload;
use crate::types::UnitKey;

/// Closed set of state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Rebuild sections from an execution node
    CreateSections(CreateSectionsPayload),
    /// Request data for a section
    FetchSectionData(UnitKey),
    /// Request accepted and about to be issued
    FetchingSectionData(UnitKey),
    /// New section text
    UpdateSectionData(UpdateSectionData),
    /// Fetch failed; restore status and close
    ResetSection(UnitKey),
    /// Human toggled a section open or closed
    ToggleSection(UnitKey),
    /// Run a search
    Search(String),
    /// Clear the search
    ResetSearch,
    /// Highlight the next match
    GoToNextSearchResult,
    /// Highlight the previous match
    GoToPrevSearchResult,
}

impl Action {
    /// Target section, for actions that have one
    #[must_use]
    pub fn target(&self) -> Option<&UnitKey> {
        match self {
            Self::FetchSectionData(id)
            | Self::FetchingSectionData(id)
            | Self::ResetSection(id)
            | Self::ToggleSection(id) => Some(id),
            Self::UpdateSectionData(update) => Some(&update.id),
            Self::CreateSections(_)
            | Self::Search(_)
            | Self::ResetSearch
            | Self::GoToNextSearchResult
            | Self::GoToPrevSearchResult => None,
        }
    }

    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateSections(_) => "create_sections",
            Self::FetchSectionData(_) => "fetch_section_data",
            Self::FetchingSectionData(_) => "fetching_section_data",
            Self::UpdateSectionData(_) => "update_section_data",
            Self::ResetSection(_) => "reset_section",
            Self::ToggleSection(_) => "toggle_section",
            Self::Search(_) => "search",
            Self::ResetSearch => "reset_search",
            Self::GoToNextSearchResult => "go_to_next_search_result",
            Self::GoToPrevSearchResult => "go_to_prev_search_result",
        }
    }
}

/// Payload of [`Action::UpdateSectionData`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSectionData {
    /// Target section
    pub id: UnitKey,
    /// Raw newline-delimited text
    pub data: String,
    /// Append instead of replacing
    pub append: bool,
}

impl UpdateSectionData {
    /// Replace update
    #[must_use]
    pub fn replace(id: impl Into<UnitKey>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            append: false,
        }
    }

    /// Append update
    #[must_use]
    pub fn append(id: impl Into<UnitKey>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            append: true,
        }
    }
}
