//! Train/test partitioning of loaded views.

use crate::error::DataError;
use tracing::debug;

/// How a loader separates evaluation views from training views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    /// When false every view is used for training.
    pub eval: bool,
    /// Every `holdout_stride`-th view (starting at 0) is held out for testing.
    pub holdout_stride: usize,
    /// Explicit positions of training views. Takes precedence over the stride.
    pub train_override: Option<Vec<usize>>,
    /// Explicit positions of test views. Takes precedence over the stride.
    pub test_override: Option<Vec<usize>>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            eval: false,
            holdout_stride: 8,
            train_override: None,
            test_override: None,
        }
    }
}

/// Split `items` into `(train, test)`, preserving input order in both halves.
///
/// With overrides present, a view lands in a group only if its position is
/// listed for that group; the stride is ignored.
pub fn split_cameras<T>(items: Vec<T>, options: &SplitOptions) -> Result<(Vec<T>, Vec<T>), DataError> {
    if options.holdout_stride == 0 {
        return Err(DataError::InvalidHoldoutStride);
    }
    if !options.eval {
        return Ok((items, Vec::new()));
    }

    let mut train = Vec::new();
    let mut test = Vec::new();

    if options.train_override.is_some() || options.test_override.is_some() {
        let train_idxs = options.train_override.as_deref().unwrap_or(&[]);
        let test_idxs = options.test_override.as_deref().unwrap_or(&[]);
        for (idx, item) in items.into_iter().enumerate() {
            if train_idxs.contains(&idx) {
                train.push(item);
            } else if test_idxs.contains(&idx) {
                test.push(item);
            }
        }
        debug!("Override split: {} train, {} test", train.len(), test.len());
    } else {
        for (idx, item) in items.into_iter().enumerate() {
            if idx % options.holdout_stride == 0 {
                test.push(item);
            } else {
                train.push(item);
            }
        }
        debug!(
            "Holdout split every {}: {} train, {} test",
            options.holdout_stride,
            train.len(),
            test.len()
        );
    }

    Ok((train, test))
}
