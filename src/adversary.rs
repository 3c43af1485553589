//! The seam between the batch generator and whatever crafts adversarial examples
use crate::AdvFloat;
use ndarray::{Array4, ArrayView4};
use std::convert::Infallible;
use std::error::Error;

/// Crafts one adversarial example for `model`
///
/// `image` is a single-example batch of shape `(1, height, width, channels)` and the result must
/// have that same shape. Implementations must not retry internally and should be deterministic
/// for identical model state.
pub trait Adversary<M: ?Sized> {
    type Error: Error + Send + Sync + 'static;

    /// # Errors
    /// Whenever the attack cannot be computed for this example
    fn perturb(
        &self,
        model: &M,
        image: ArrayView4<AdvFloat>,
        label: usize,
        eps: AdvFloat,
    ) -> Result<Array4<AdvFloat>, Self::Error>;
}

impl<M, F, E> Adversary<M> for F
where
    M: ?Sized,
    F: Fn(&M, ArrayView4<AdvFloat>, usize, AdvFloat) -> Result<Array4<AdvFloat>, E>,
    E: Error + Send + Sync + 'static,
{
    type Error = E;

    fn perturb(
        &self,
        model: &M,
        image: ArrayView4<AdvFloat>,
        label: usize,
        eps: AdvFloat,
    ) -> Result<Array4<AdvFloat>, E> {
        self(model, image, label, eps)
    }
}

/// Pins a closure to the [`Adversary`] call signature so its argument types can be inferred
pub fn from_fn<M, F, E>(f: F) -> F
where
    M: ?Sized,
    F: Fn(&M, ArrayView4<AdvFloat>, usize, AdvFloat) -> Result<Array4<AdvFloat>, E>,
{
    f
}

/// Returns every image unchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<M: ?Sized> Adversary<M> for Identity {
    type Error = Infallible;

    fn perturb(
        &self,
        _model: &M,
        image: ArrayView4<AdvFloat>,
        _label: usize,
        _eps: AdvFloat,
    ) -> Result<Array4<AdvFloat>, Infallible> {
        Ok(image.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::tensorshape::TensorShape;

    #[test]
    fn test_closure_is_an_adversary() {
        let shift = from_fn(|offset: &AdvFloat, image, _label, eps| {
            Ok::<_, ModelError>(&image + (*offset * eps))
        });
        let image = Array4::<AdvFloat>::ones((1, 2, 2, 1));
        let out = shift.perturb(&2., image.view(), 0, 0.5).unwrap();
        assert!(out.iter().all(|&x| (x - 2.).abs() < 1e-12));
    }

    #[test]
    fn test_closure_errors_pass_through() {
        let refuse = from_fn(|_: &(), _image, label, _eps| {
            Err(ModelError::LabelOutOfRange { label, classes: 0 })
        });
        let image = Array4::<AdvFloat>::zeros((1, 1, 1, 1));
        assert_eq!(
            refuse.perturb(&(), image.view(), 3, 0.1).unwrap_err(),
            ModelError::LabelOutOfRange {
                label: 3,
                classes: 0
            }
        );
    }

    #[test]
    fn test_identity_keeps_shape_and_values() {
        let image = Array4::from_shape_fn((1, 2, 3, 1), |(_, h, w, _)| (h * 3 + w) as AdvFloat);
        let out = Identity.perturb(&(), image.view(), 1, 0.01).unwrap();
        assert_eq!(out, image);
        assert_eq!(TensorShape::from(out.shape()), TensorShape::from(vec![1, 2, 3, 1]));
    }
}
