//! Ambient configuration: the process-wide default grid spacing.
//!
//! Fields, elements and geometries constructed without an explicit spacing
//! read this value. It starts unset; construction without a spacing then
//! fails with [`OpticsError::DefaultSpacingUnset`].

use std::sync::RwLock;

use crate::error::{OpticsError, Result};
use crate::types::Vector2;

static DEFAULT_SPACING: RwLock<Option<[f64; 2]>> = RwLock::new(None);

/// Set the default spacing used when a constructor receives no spacing.
///
/// Both components must be finite and strictly positive.
pub fn set_default_spacing(spacing: impl Into<Vector2>) -> Result<()> {
    let spacing = spacing.into().0;
    if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(OpticsError::invalid_parameter(
            "spacing",
            format!("must be finite and positive, got {spacing:?}"),
        ));
    }
    let mut guard = DEFAULT_SPACING.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(spacing);
    log::debug!("Default spacing set to {:?}", spacing);
    Ok(())
}

/// The current default spacing, if one has been set.
pub fn default_spacing() -> Option<[f64; 2]> {
    *DEFAULT_SPACING.read().unwrap_or_else(|e| e.into_inner())
}

/// Return the default spacing to the unset state.
pub fn clear_default_spacing() {
    let mut guard = DEFAULT_SPACING.write().unwrap_or_else(|e| e.into_inner());
    *guard = None;
    log::debug!("Default spacing cleared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarGeometry;

    // The only test in the crate that touches the global default; everything
    // else passes spacing explicitly.
    #[test]
    fn test_default_spacing_lifecycle() {
        clear_default_spacing();
        assert!(default_spacing().is_none());
        assert!(matches!(
            PlanarGeometry::new(10, 0.0, None, None),
            Err(OpticsError::DefaultSpacingUnset)
        ));

        assert!(set_default_spacing(0.0).is_err());
        assert!(set_default_spacing([1e-6, f64::NAN]).is_err());

        set_default_spacing(2e-6).unwrap();
        assert_eq!(default_spacing(), Some([2e-6, 2e-6]));
        let geometry = PlanarGeometry::new((4, 5), 0.0, None, None).unwrap();
        assert_eq!(geometry.spacing(), [2e-6, 2e-6]);

        clear_default_spacing();
        assert!(default_spacing().is_none());
    }
}
