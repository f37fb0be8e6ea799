/*!

Semantic matching: use the embedding layer, when the host supplies one, to find concepts whose
terms live near the primary in vector space, and propose their beliefs as secondaries.

Without an embedding layer the strategy yields nothing and costs nothing.

*/

use crate::core::{
  error::ReasonerError,
  strategy::{Candidate, CandidateKind, FormationStrategy, StrategyContext},
  task::Task,
};

/// Beliefs proposed per similar concept.
const BELIEFS_PER_CONCEPT: usize = 3;

pub struct SemanticStrategy {
  enabled:       bool,
  base_priority: f32,
}

impl Default for SemanticStrategy {
  fn default() -> Self {
    SemanticStrategy { enabled: true, base_priority: 0.9 }
  }
}

impl SemanticStrategy {
  pub fn new() -> SemanticStrategy {
    SemanticStrategy::default()
  }
}

impl FormationStrategy for SemanticStrategy {
  fn name(&self) -> &'static str {
    "semantic"
  }

  fn enabled(&self) -> bool {
    self.enabled
  }

  fn base_priority(&self) -> f32 {
    self.base_priority
  }

  fn candidates(
    &self,
    primary: &Task,
    ctx: &StrategyContext,
  ) -> Result<Vec<Candidate>, ReasonerError> {
    let Some(embeddings) = ctx.embeddings else { return Ok(Vec::new()) };

    let hits = embeddings.find_similar(primary.term().name().as_str(), ctx.config.semantic_k);
    let mut candidates = Vec::new();

    for hit in hits {
      if hit.similarity < ctx.config.semantic_threshold {
        continue;
      }
      // Similarity to itself proposes nothing new.
      if hit.name == primary.term().name() {
        continue;
      }
      let Some(concept) = ctx.memory.concept(hit.name) else { continue };
      for belief in concept.beliefs(Some(BELIEFS_PER_CONCEPT)) {
        candidates.push(Candidate::from_task(
          belief,
          hit.similarity * self.base_priority,
          CandidateKind::Semantic,
        ));
      }
    }

    Ok(candidates)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    api::{
      language_model::{EmbeddingLayer, SimilarTerm},
      memory::SimpleMemory,
      MemoryView,
      TermFactory,
    },
    core::{config::ReasonerConfig, stamp::Stamp, truth::Truth},
  };
  use nonax_abs::IString;

  struct FixedEmbeddings {
    hits: Vec<SimilarTerm>,
  }

  impl EmbeddingLayer for FixedEmbeddings {
    fn find_similar(&self, _query: &str, k: usize) -> Vec<SimilarTerm> {
      self.hits.iter().take(k).cloned().collect()
    }
  }

  #[test]
  fn similar_concepts_contribute_their_beliefs() {
    let f = TermFactory::new_default();
    let memory = Arc::new(SimpleMemory::new());
    memory.add_task(Task::belief(f.atom("sparrow"), Truth::new(1.0, 0.9), Stamp::input()));
    memory.add_task(Task::belief(f.atom("brick"), Truth::new(1.0, 0.9), Stamp::input()));

    let embeddings: Arc<dyn EmbeddingLayer> = Arc::new(FixedEmbeddings {
      hits: vec![
        SimilarTerm { name: IString::from("sparrow"), similarity: 0.92 },
        SimilarTerm { name: IString::from("brick"), similarity: 0.1 },
      ],
    });

    let memory_view: Arc<dyn MemoryView> = memory;
    let config = ReasonerConfig::default();
    let ctx = StrategyContext {
      memory:     &memory_view,
      factory:    &f,
      config:     &config,
      embeddings: Some(&embeddings),
    };

    let primary = Task::belief(f.atom("robin"), Truth::new(1.0, 0.9), Stamp::input());
    let candidates = SemanticStrategy::new().candidates(&primary, &ctx).unwrap();

    // The brick hit is under threshold.
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].kind, CandidateKind::Semantic);
    assert_eq!(
      candidates[0].source_task.as_ref().unwrap().term().name().as_str(),
      "sparrow"
    );
  }

  #[test]
  fn without_an_embedding_layer_nothing_is_proposed() {
    let f = TermFactory::new_default();
    let memory_view: Arc<dyn MemoryView> = Arc::new(SimpleMemory::new());
    let config = ReasonerConfig::default();
    let ctx = StrategyContext { memory: &memory_view, factory: &f, config: &config, embeddings: None };

    let primary = Task::belief(f.atom("robin"), Truth::new(1.0, 0.9), Stamp::input());
    assert!(SemanticStrategy::new().candidates(&primary, &ctx).unwrap().is_empty());
  }
}
