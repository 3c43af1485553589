//! Fast Gradient Sign Method
//!
//! `x_adv = x + eps * sign(grad_x loss(model(x), label))`, optionally clipped into a pixel range.
use crate::adversary::Adversary;
use crate::error::ModelError;
use crate::tensorshape::TensorShape;
use crate::AdvFloat;
use ndarray::{Array4, ArrayView4, Zip};
use num::Zero;
use serde::{Deserialize, Serialize};

/// Models that can report the gradient of their loss with respect to an input batch
pub trait LossGradient {
    /// # Errors
    /// If the input shape or label does not fit the model
    fn loss_gradient(
        &self,
        image: ArrayView4<AdvFloat>,
        label: usize,
    ) -> Result<Array4<AdvFloat>, ModelError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Fgsm {
    clip: Option<(AdvFloat, AdvFloat)>,
}

impl Fgsm {
    pub const fn new() -> Self {
        Self { clip: None }
    }

    /// Clamp every adversarial pixel into `[lower, upper]`
    pub const fn clipped(lower: AdvFloat, upper: AdvFloat) -> Self {
        Self {
            clip: Some((lower, upper)),
        }
    }

    pub const fn clip(&self) -> Option<(AdvFloat, AdvFloat)> {
        self.clip
    }

    /// `eps * sign(gradient)` with `sign(0) == 0`
    pub fn perturbation(gradient: ArrayView4<AdvFloat>, eps: AdvFloat) -> Array4<AdvFloat> {
        gradient.mapv(|g| sign(g) * eps)
    }
}

fn sign(x: AdvFloat) -> AdvFloat {
    if x > AdvFloat::zero() {
        1.
    } else if x < AdvFloat::zero() {
        -1.
    } else {
        0.
    }
}

impl<M: LossGradient + ?Sized> Adversary<M> for Fgsm {
    type Error = ModelError;

    fn perturb(
        &self,
        model: &M,
        image: ArrayView4<AdvFloat>,
        label: usize,
        eps: AdvFloat,
    ) -> Result<Array4<AdvFloat>, ModelError> {
        let gradient = model.loss_gradient(image, label)?;
        if gradient.shape() != image.shape() {
            return Err(ModelError::Shape {
                expected: TensorShape::from(image.shape()),
                given: TensorShape::from(gradient.shape()),
            });
        }
        let mut adversary = Self::perturbation(gradient.view(), eps);
        Zip::from(&mut adversary).and(&image).for_each(|adv, &x| {
            *adv += x;
            if let Some((lower, upper)) = self.clip {
                *adv = adv.max(lower).min(upper);
            }
        });
        Ok(adversary)
    }
}
