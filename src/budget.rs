// src/budget.rs
// Allocation limits for drape polylines and collection storage
// RELEVANT FILES: src/config.rs, src/drape/mod.rs, src/overlay/collection.rs

use log::warn;

use crate::error::{OverlayError, OverlayResult};

/// Upper bounds on the buffers the draper and the overlay store may grow.
///
/// Requests above a limit fail with `OutOfMemory` before touching the
/// allocator; requests under it still go through `Vec::try_reserve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationBudget {
    pub max_drape_samples: usize,
    pub max_collection_points: usize,
}

impl AllocationBudget {
    /// Reserve room for `count` drape samples in an empty or partly filled buffer.
    pub fn reserve_samples<T>(&self, buf: &mut Vec<T>, count: usize) -> OverlayResult<()> {
        reserve_within(buf, count, self.max_drape_samples, "drape samples")
    }

    /// Grow point storage by `additional`, rounding capacity up to `chunk`.
    pub fn reserve_points<T>(
        &self,
        buf: &mut Vec<T>,
        additional: usize,
        chunk: usize,
    ) -> OverlayResult<()> {
        let needed = buf.len().saturating_add(additional);
        if needed > self.max_collection_points {
            warn!(
                "Point storage request {} exceeds budget {}",
                needed, self.max_collection_points
            );
            return Err(OverlayError::out_of_memory(format!(
                "{} points requested, budget {}",
                needed, self.max_collection_points
            )));
        }
        if needed <= buf.capacity() {
            return Ok(());
        }
        let chunk = chunk.max(1);
        let target = needed
            .div_ceil(chunk)
            .saturating_mul(chunk)
            .min(self.max_collection_points);
        buf.try_reserve_exact(target - buf.len())?;
        Ok(())
    }
}

impl Default for AllocationBudget {
    fn default() -> Self {
        crate::config::ViewerConfig::default().budget()
    }
}

fn reserve_within<T>(
    buf: &mut Vec<T>,
    additional: usize,
    limit: usize,
    what: &str,
) -> OverlayResult<()> {
    let requested = buf.len().saturating_add(additional);
    if requested > limit {
        warn!("{} request {} exceeds budget {}", what, requested, limit);
        return Err(OverlayError::out_of_memory(format!(
            "{} {} exceeds budget {}",
            what, requested, limit
        )));
    }
    buf.try_reserve(additional)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_budget_enforced() {
        let budget = AllocationBudget {
            max_drape_samples: 4,
            max_collection_points: 4,
        };
        let mut buf: Vec<u8> = Vec::new();
        assert!(budget.reserve_samples(&mut buf, 4).is_ok());
        assert!(buf.capacity() >= 4);
        let err = budget.reserve_samples(&mut buf, 5).unwrap_err();
        assert_eq!(err.category(), "OutOfMemory");
    }

    #[test]
    fn test_points_grow_in_chunks() {
        let budget = AllocationBudget {
            max_drape_samples: 16,
            max_collection_points: 1000,
        };
        let mut buf: Vec<u32> = Vec::new();
        budget.reserve_points(&mut buf, 3, 128).unwrap();
        assert!(buf.capacity() >= 128);
        assert!(budget.reserve_points(&mut buf, 1001, 128).is_err());
        assert!(buf.is_empty());
    }
}
