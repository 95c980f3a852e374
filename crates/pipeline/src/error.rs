use imagegen_core::error::CoreError;
use imagegen_core::provider::ProviderError;
use imagegen_core::store::StoreError;

/// Errors surfaced by orchestrator operations that have a caller to report
/// to (intake, webhook). Cycle operations never return them.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
