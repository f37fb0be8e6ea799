/*!

Contracts for the neural side: language models and the optional embedding layer.

A backend implements whichever of the three entry points it has; the defaults report
`LmUnavailable` so the harness can probe `generate_text → process → query` in order and settle
on the first one that answers. All three take the same prompt/options pair and return the raw
response text.

*/

use async_trait::async_trait;
use nonax_abs::IString;

use crate::core::{config::LmOptions, error::ReasonerError};

#[async_trait]
pub trait LanguageModel: Send + Sync {
  async fn generate_text(
    &self,
    _prompt: &str,
    _options: &LmOptions,
  ) -> Result<String, ReasonerError> {
    Err(ReasonerError::LmUnavailable)
  }

  async fn process(&self, _prompt: &str, _options: &LmOptions) -> Result<String, ReasonerError> {
    Err(ReasonerError::LmUnavailable)
  }

  async fn query(&self, _prompt: &str, _options: &LmOptions) -> Result<String, ReasonerError> {
    Err(ReasonerError::LmUnavailable)
  }
}

/// One similarity hit from the embedding layer.
#[derive(Clone, Debug)]
pub struct SimilarTerm {
  pub name:       IString,
  pub similarity: f32,
}

/// Optional vector-similarity index over canonical term names.
pub trait EmbeddingLayer: Send + Sync {
  /// The `k` nearest neighbors of `query`, most similar first.
  fn find_similar(&self, query: &str, k: usize) -> Vec<SimilarTerm>;
}
