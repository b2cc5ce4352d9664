//! CompletionProvider trait definition.

use relay_types::error::CompletionError;
use relay_types::turn::Turn;

/// Trait for completion engine backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). One call is
/// exactly one attempt: implementations must not retry, and must return an
/// error rather than a guessed reply when the engine's answer is unusable.
///
/// Implementations live in relay-infra (e.g., `OpenAiCompatGateway`).
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name used in logs and spans.
    fn name(&self) -> &str;

    /// Send the full ordered history and return the reply text.
    fn complete(
        &self,
        history: &[Turn],
    ) -> impl std::future::Future<Output = Result<String, CompletionError>> + Send;
}
