//! A single dense layer followed by softmax, trained elsewhere and used here as an attack target
use crate::affine::Affine2;
use crate::error::ModelError;
use crate::fgsm::LossGradient;
use crate::tensorshape::TensorShape;
use crate::AdvFloat;
use ndarray::{Array1, Array2, Array4, ArrayView1, ArrayView4};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SoftmaxClassifier {
    aff: Affine2,
    input_shape: TensorShape,
}

impl SoftmaxClassifier {
    /// # Errors
    /// If `aff` does not take `h * w * c` inputs or maps to zero classes
    pub fn new(aff: Affine2, (h, w, c): (usize, usize, usize)) -> Result<Self, ModelError> {
        let input_shape = TensorShape::image(h, w, c);
        if aff.input_dim() != h * w * c || aff.output_dim() == 0 {
            return Err(ModelError::Shape {
                expected: input_shape,
                given: TensorShape::from(aff.basis().shape()),
            });
        }
        Ok(Self { aff, input_shape })
    }

    /// Gaussian weights scaled by `1 / sqrt(fan_in)` and zero bias
    ///
    /// # Panics
    /// If `classes` is zero
    pub fn random<R: Rng + ?Sized>(
        (h, w, c): (usize, usize, usize),
        classes: usize,
        rng: &mut R,
    ) -> Self {
        assert!(classes > 0);
        let fan_in = h * w * c;
        let scale = 1. / (fan_in.max(1) as AdvFloat).sqrt();
        let basis: Array2<AdvFloat> =
            Array2::random_using((classes, fan_in), StandardNormal, rng) * scale;
        Self {
            aff: Affine2::new(basis, Array1::zeros(classes)),
            input_shape: TensorShape::image(h, w, c),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.aff.output_dim()
    }

    pub const fn input_shape(&self) -> &TensorShape {
        &self.input_shape
    }

    fn flatten(&self, image: &ArrayView4<AdvFloat>) -> Result<Array1<AdvFloat>, ModelError> {
        let expected = self.input_shape.batched(1);
        if TensorShape::from(image.shape()) != expected {
            return Err(ModelError::Shape {
                expected,
                given: TensorShape::from(image.shape()),
            });
        }
        Ok(image.iter().copied().collect())
    }

    fn check_label(&self, label: usize) -> Result<(), ModelError> {
        if label >= self.num_classes() {
            return Err(ModelError::LabelOutOfRange {
                label,
                classes: self.num_classes(),
            });
        }
        Ok(())
    }

    /// # Errors
    /// If `image` is not shaped `(1, h, w, c)`
    pub fn logits(&self, image: ArrayView4<AdvFloat>) -> Result<Array1<AdvFloat>, ModelError> {
        let x = self.flatten(&image)?;
        Ok(self.aff.apply(&x.view()))
    }

    /// Class probabilities
    ///
    /// # Errors
    /// If `image` is not shaped `(1, h, w, c)`
    pub fn predict(&self, image: ArrayView4<AdvFloat>) -> Result<Array1<AdvFloat>, ModelError> {
        Ok(softmax(&self.logits(image)?.view()))
    }

    /// # Errors
    /// If `image` is not shaped `(1, h, w, c)` or the model output is NaN
    pub fn classify(&self, image: ArrayView4<AdvFloat>) -> Result<usize, ModelError> {
        self.predict(image)?
            .argmax()
            .map_err(|_| ModelError::NonFinite)
    }

    /// Categorical cross-entropy `-ln p[label]`
    ///
    /// # Errors
    /// If `image` is not shaped `(1, h, w, c)` or `label` is not a class
    pub fn loss(&self, image: ArrayView4<AdvFloat>, label: usize) -> Result<AdvFloat, ModelError> {
        self.check_label(label)?;
        let probs = self.predict(image)?;
        Ok(-probs[label].max(AdvFloat::MIN_POSITIVE).ln())
    }
}

fn softmax(logits: &ArrayView1<AdvFloat>) -> Array1<AdvFloat> {
    // Any shift gives the same result; the max keeps exp() from overflowing
    let max = logits.max().copied().unwrap_or(0.);
    let exp = logits.mapv(|z| (z - max).exp());
    let total = exp.sum();
    exp / total
}

impl LossGradient for SoftmaxClassifier {
    /// `Wᵀ (softmax(W x + b) - onehot(label))`, reshaped to the input
    fn loss_gradient(
        &self,
        image: ArrayView4<AdvFloat>,
        label: usize,
    ) -> Result<Array4<AdvFloat>, ModelError> {
        self.check_label(label)?;
        let mut delta = self.predict(image.view())?;
        delta[label] -= 1.;
        self.aff
            .vjp(&delta.view())
            .into_shape(image.raw_dim())
            .map_err(|_| ModelError::Shape {
                expected: self.input_shape.batched(1),
                given: TensorShape::from(image.shape()),
            })
    }
}

impl fmt::Display for SoftmaxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Input {} => Dense {} => Softmax",
            self.input_shape,
            self.num_classes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adversary::Adversary;
    use crate::fgsm::Fgsm;
    use crate::test_util::*;
    use more_asserts::assert_gt;
    use ndarray::{arr1, arr2};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn two_pixel_model() -> SoftmaxClassifier {
        // class 0 likes bright first pixel, class 1 likes bright second pixel
        let aff = Affine2::new(arr2(&[[4., -4.], [-4., 4.]]), arr1(&[0., 0.]));
        SoftmaxClassifier::new(aff, (1, 2, 1)).unwrap()
    }

    #[test]
    fn test_predict_and_classify() {
        let model = two_pixel_model();
        let image = Array4::from_shape_vec((1, 1, 2, 1), vec![0.9, 0.1]).unwrap();
        let probs = model.predict(image.view()).unwrap();
        approx::assert_abs_diff_eq!(probs.sum(), 1., epsilon = 1e-12);
        assert_eq!(model.classify(image.view()).unwrap(), 0);
        assert_eq!(format!("{}", model), "Input (1, 2, 1) => Dense 2 => Softmax");
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let model = two_pixel_model();
        let wrong = Array4::zeros((1, 2, 1, 1));
        assert!(matches!(
            model.predict(wrong.view()),
            Err(ModelError::Shape { .. })
        ));
        let image = Array4::zeros((1, 1, 2, 1));
        assert_eq!(
            model.loss_gradient(image.view(), 2).unwrap_err(),
            ModelError::LabelOutOfRange {
                label: 2,
                classes: 2
            }
        );
        let aff = Affine2::new(Array2::zeros((2, 3)), Array1::zeros(2));
        assert!(SoftmaxClassifier::new(aff, (1, 2, 1)).is_err());
    }

    #[test]
    fn test_fgsm_raises_loss() {
        let model = two_pixel_model();
        let image = Array4::from_shape_vec((1, 1, 2, 1), vec![0.7, 0.3]).unwrap();
        let before = model.loss(image.view(), 0).unwrap();
        let adv = Fgsm::new().perturb(&model, image.view(), 0, 0.05).unwrap();
        let after = model.loss(adv.view(), 0).unwrap();
        assert_gt!(after, before);
        approx::assert_abs_diff_eq!(adv[[0, 0, 0, 0]], 0.65, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(adv[[0, 0, 1, 0]], 0.35, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn test_gradient_matches_finite_differences(aff in affine2(4, 3), x in array1(4), label in 0..3usize) {
            let model = SoftmaxClassifier::new(aff.clone() * 0.1, (2, 2, 1)).unwrap();
            let image = (x * 0.1).into_shape((1, 2, 2, 1)).unwrap();
            let grad = model.loss_gradient(image.view(), label).unwrap();
            let h = 1e-6;
            for idx in [(0, 0, 0, 0), (0, 0, 1, 0), (0, 1, 0, 0), (0, 1, 1, 0)] {
                let mut plus = image.clone();
                plus[idx] += h;
                let mut minus = image.clone();
                minus[idx] -= h;
                let numeric = (model.loss(plus.view(), label).unwrap() - model.loss(minus.view(), label).unwrap()) / (2. * h);
                prop_assert!((numeric - grad[idx]).abs() < 1e-5, "numeric {} vs analytic {}", numeric, grad[idx]);
            }
        }
    }

    #[test]
    fn test_random_model_shapes() {
        let mut rng = Pcg64::seed_from_u64(7);
        let model = SoftmaxClassifier::random((3, 3, 1), 4, &mut rng);
        assert_eq!(model.num_classes(), 4);
        assert_eq!(model.input_shape(), &TensorShape::image(3, 3, 1));
        let image = Array4::from_elem((1, 3, 3, 1), 0.5);
        let grad = model.loss_gradient(image.view(), 3).unwrap();
        assert_eq!(grad.shape(), image.shape());
    }
}
