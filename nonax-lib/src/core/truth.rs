/*!

Truth values and the NAL truth functions.

A `Truth` is a frequency/confidence pair: `f` is the proportion of positive evidence, `c` how
much total evidence backs it up, mapped into `[0, 1)` through the evidential horizon. The
inference rules name one of the pure functions below to compute a conclusion truth from its
premise truths.

*/

/// Evidential horizon for the weight/confidence conversions.
const HORIZON: f32 = 1.0;

/// Discount applied by `weak`, used when synthesizing secondary premises from a primary.
const WEAK_FACTOR: f32 = 0.8;

/// Confidence never reaches 1; total certainty is not a thing here.
const MAX_CONFIDENCE: f32 = 0.9999;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Truth {
  /// Frequency in `[0, 1]`.
  pub f: f32,
  /// Confidence in `[0, 1)`.
  pub c: f32,
}

impl Truth {
  /// The long parameter names accept the spelled-out form used at ingestion boundaries; the
  /// short field names are canonical everywhere else.
  pub fn new(frequency: f32, confidence: f32) -> Truth {
    Truth {
      f: frequency.clamp(0.0, 1.0),
      c: confidence.clamp(0.0, MAX_CONFIDENCE),
    }
  }

  /// `(1 − f, c)`: the truth of the unwrapped term when a negation is stripped.
  pub fn negated(self) -> Truth {
    Truth { f: 1.0 - self.f, c: self.c }
  }

  /// How strongly the value predicts a positive outcome; used to rank answers.
  pub fn expectation(self) -> f32 {
    self.c * (self.f - 0.5) + 0.5
  }
}

impl std::fmt::Display for Truth {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{{{:.2}, {:.2}}}", self.f, self.c)
  }
}

/// Confidence discount for synthesized premises.
pub fn weak(c: f32) -> f32 {
  (c * WEAK_FACTOR).clamp(0.0, MAX_CONFIDENCE)
}

/// Evidence weight to confidence.
pub fn w2c(w: f32) -> f32 {
  (w / (w + HORIZON)).clamp(0.0, MAX_CONFIDENCE)
}

/// Confidence to evidence weight.
pub fn c2w(c: f32) -> f32 {
  HORIZON * c / (1.0 - c.min(MAX_CONFIDENCE))
}

fn and(values: &[f32]) -> f32 {
  values.iter().product()
}

fn or(values: &[f32]) -> f32 {
  1.0 - values.iter().map(|v| 1.0 - v).product::<f32>()
}

/// `{<M --> P>, <S --> M>} ⊢ <S --> P>`
pub fn deduction(t1: Truth, t2: Truth) -> Truth {
  let f = and(&[t1.f, t2.f]);
  Truth::new(f, and(&[f, t1.c, t2.c]))
}

/// `{<P --> M>, <S --> M>} ⊢ <S --> P>`
pub fn abduction(t1: Truth, t2: Truth) -> Truth {
  Truth::new(t1.f, w2c(and(&[t2.f, t1.c, t2.c])))
}

/// `{<M --> P>, <M --> S>} ⊢ <S --> P>`
pub fn induction(t1: Truth, t2: Truth) -> Truth {
  abduction(t2, t1)
}

/// `{<P --> M>, <M --> S>} ⊢ <S --> P>`
pub fn exemplification(t1: Truth, t2: Truth) -> Truth {
  Truth::new(1.0, w2c(and(&[t1.f, t2.f, t1.c, t2.c])))
}

/// `{<M --> P>, <S <-> M>} ⊢ <S --> P>`
pub fn analogy(t1: Truth, t2: Truth) -> Truth {
  Truth::new(and(&[t1.f, t2.f]), and(&[t1.c, t2.c, t2.f]))
}

/// `{<S <-> M>, <M <-> P>} ⊢ <S <-> P>`
pub fn resemblance(t1: Truth, t2: Truth) -> Truth {
  Truth::new(and(&[t1.f, t2.f]), and(&[t1.c, t2.c, or(&[t1.f, t2.f])]))
}

/// `{<P --> S>} ⊢ <S --> P>`
pub fn conversion(t: Truth) -> Truth {
  Truth::new(1.0, w2c(and(&[t.f, t.c])))
}

/// `{<S --> P>, <S --> P>} ⊢ <S --> P>`, pooling the evidence of two non-overlapping sources.
pub fn revision(t1: Truth, t2: Truth) -> Truth {
  let w1 = c2w(t1.c);
  let w2 = c2w(t2.c);
  let w = w1 + w2;
  Truth::new((w1 * t1.f + w2 * t2.f) / w, w2c(w))
}

/// `{<M --> P>, <M --> S>} ⊢ <S <-> P>`
pub fn comparison(t1: Truth, t2: Truth) -> Truth {
  let f0 = or(&[t1.f, t2.f]);
  let f = if f0 < f32::EPSILON { 0.0 } else { and(&[t1.f, t2.f]) / f0 };
  Truth::new(f, w2c(and(&[f0, t1.c, t2.c])))
}

/// `{T1, T2} ⊢ (T1 ∧ T2)`
pub fn intersection(t1: Truth, t2: Truth) -> Truth {
  Truth::new(and(&[t1.f, t2.f]), and(&[t1.c, t2.c]))
}

/// `{T1, T2} ⊢ (T1 ∨ T2)`
pub fn union(t1: Truth, t2: Truth) -> Truth {
  Truth::new(or(&[t1.f, t2.f]), and(&[t1.c, t2.c]))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strong() -> Truth {
    Truth::new(1.0, 0.9)
  }

  #[test]
  fn construction_clamps_into_range() {
    let t = Truth::new(1.5, 1.0);
    assert_eq!(t.f, 1.0);
    assert!(t.c < 1.0);
  }

  #[test]
  fn deduction_keeps_frequency_and_loses_confidence() {
    let t = deduction(strong(), strong());
    assert!((t.f - 1.0).abs() < 1e-6);
    assert!((t.c - 0.81).abs() < 1e-6);
    assert!(t.c < 0.9);
  }

  #[test]
  fn abduction_confidence_is_below_both_premises() {
    let t = abduction(strong(), strong());
    assert!((t.f - 1.0).abs() < 1e-6);
    assert!(t.c < 0.9);
    // w2c(0.81) with a unit horizon
    assert!((t.c - 0.81 / 1.81).abs() < 1e-6);
  }

  #[test]
  fn induction_swaps_the_premise_roles_of_abduction() {
    let t1 = Truth::new(0.9, 0.9);
    let t2 = Truth::new(0.5, 0.6);
    assert_eq!(induction(t1, t2), abduction(t2, t1));
  }

  #[test]
  fn negation_inverts_frequency_only() {
    let t = Truth::new(0.2, 0.9).negated();
    assert!((t.f - 0.8).abs() < 1e-6);
    assert!((t.c - 0.9).abs() < 1e-6);
  }

  #[test]
  fn revision_raises_confidence() {
    let t = revision(strong(), strong());
    assert!(t.c > 0.9);
    assert!((t.f - 1.0).abs() < 1e-6);
  }

  #[test]
  fn weak_discounts_confidence() {
    assert!((weak(0.9) - 0.72).abs() < 1e-6);
  }

  #[test]
  fn conversion_yields_weak_positive_evidence() {
    let t = conversion(strong());
    assert!((t.f - 1.0).abs() < 1e-6);
    assert!(t.c < 0.5);
  }
}
