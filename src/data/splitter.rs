// ============================================================
// Layer 4: Dataset Splitter
// ============================================================
// Two strategies, one per task:
//
//   split_positional     slices by index ranges; the caller has
//                        already shuffled the corpus, so no
//                        randomness happens here
//
//                        train = floor(n * train_fraction)
//                        val   = floor(rest * val_fraction)
//                        test  = whatever remains
//
//   split_random_subset  samples a random index subset of
//                        floor(n * fraction) items as the held-out
//                        part; the remainder stays in its original
//                        order as the kept part
//
// Partitions are disjoint and their sizes add up to the input
// size. Truncation leftovers land in the last partition.

use rand::{seq::index, Rng};

use crate::domain::error::{CoreError, CoreResult};

/// Train / validation / test partitions of one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    /// None when no validation fraction was requested
    pub validation: Option<Vec<T>>,
    pub test: Vec<T>,
}

impl<T> Partition<T> {
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.as_ref().map_or(0, Vec::len) + self.test.len()
    }
}

/// Fail unless `fraction` lies strictly between 0 and 1.
pub fn check_fraction(name: &str, fraction: f64) -> CoreResult<()> {
    if fraction > 0.0 && fraction < 1.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidConfig(format!(
            "{name} must be in (0, 1), got {fraction}"
        )))
    }
}

/// Positional split into train, optional validation and test.
pub fn split_positional<T>(
    mut items: Vec<T>,
    train_fraction: f64,
    val_fraction: Option<f64>,
) -> CoreResult<Partition<T>> {
    check_fraction("train fraction", train_fraction)?;
    if let Some(f) = val_fraction {
        check_fraction("validation fraction", f)?;
    }

    let total    = items.len();
    let train_at = (total as f64 * train_fraction).floor() as usize;
    let mut rest = items.split_off(train_at.min(total));

    let validation = val_fraction.map(|f| {
        let val_at = (rest.len() as f64 * f).floor() as usize;
        let test   = rest.split_off(val_at.min(rest.len()));
        std::mem::replace(&mut rest, test)
    });

    tracing::debug!(
        "Positional split: {} train, {} validation, {} test",
        items.len(),
        validation.as_ref().map_or(0, Vec::len),
        rest.len(),
    );

    Ok(Partition { train: items, validation, test: rest })
}

/// Random-subset split into (kept, held_out).
pub fn split_random_subset<T, R: Rng + ?Sized>(
    items: Vec<T>,
    fraction: f64,
    rng: &mut R,
) -> CoreResult<(Vec<T>, Vec<T>)> {
    check_fraction("held-out fraction", fraction)?;

    let total   = items.len();
    let amount  = (total as f64 * fraction).floor() as usize;
    let mut picked = vec![false; total];
    for i in index::sample(rng, total, amount) {
        picked[i] = true;
    }

    let mut kept     = Vec::with_capacity(total - amount);
    let mut held_out = Vec::with_capacity(amount);
    for (item, held) in items.into_iter().zip(picked) {
        if held {
            held_out.push(item);
        } else {
            kept.push(item);
        }
    }

    tracing::debug!("Random subset split: {} kept, {} held out", kept.len(), held_out.len());
    Ok((kept, held_out))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_positional_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let p = split_positional(items, 0.8, Some(0.5)).unwrap();
        assert_eq!(p.train.len(), 80);
        assert_eq!(p.validation.as_ref().unwrap().len(), 10);
        assert_eq!(p.test.len(), 10);
        assert_eq!(p.train[0], 0);
        assert_eq!(p.test[0], 90);
    }

    #[test]
    fn test_positional_without_validation() {
        let items: Vec<usize> = (0..10).collect();
        let p = split_positional(items, 0.8, None).unwrap();
        assert_eq!(p.train, (0..8).collect::<Vec<_>>());
        assert!(p.validation.is_none());
        assert_eq!(p.test, vec![8, 9]);
    }

    #[test]
    fn test_positional_preserves_every_item() {
        for n in [0usize, 1, 7, 33, 101] {
            let p = split_positional((0..n).collect(), 0.7, Some(0.3)).unwrap();
            assert_eq!(p.total(), n);
            let mut all: Vec<usize> = p.train.clone();
            all.extend(p.validation.unwrap());
            all.extend(p.test);
            assert_eq!(all, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_fractions_must_be_open_interval() {
        assert!(matches!(split_positional(vec![1, 2], 1.0, None), Err(CoreError::InvalidConfig(_))));
        assert!(matches!(split_positional(vec![1, 2], 0.5, Some(0.0)), Err(CoreError::InvalidConfig(_))));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(split_random_subset(vec![1, 2], 1.5, &mut rng).is_err());
    }

    #[test]
    fn test_random_subset_is_disjoint_and_complete() {
        let mut rng = StdRng::seed_from_u64(42);
        let (kept, held) = split_random_subset((0..50).collect::<Vec<usize>>(), 0.2, &mut rng).unwrap();
        assert_eq!(held.len(), 10);
        assert_eq!(kept.len(), 40);
        assert!(kept.iter().all(|k| !held.contains(k)));
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_random_subset_is_seeded() {
        let a = split_random_subset((0..30).collect::<Vec<u8>>(), 0.3, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = split_random_subset((0..30).collect::<Vec<u8>>(), 0.3, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }
}
