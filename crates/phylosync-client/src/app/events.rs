use crate::graph::dictionary::DictionaryPhase;

/// Everything the core wants the surrounding shell to show or do.
///
/// The core never navigates or pops dialogs itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Alert(String),
    Navigate(String),
    /// A node query failed and the working set was emptied.
    RefreshRequested,
    DictionaryFinal(DictionaryPhase),
    ConfigReady,
    /// Config could not be loaded and no fallback location is configured.
    ConfigUnavailable,
    Status(Option<String>),
}
