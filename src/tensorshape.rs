use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a tensor where each axis may be unknown (`None`)
///
/// Image shapes are stored channels-last: `[height, width, channels]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TensorShape {
    dims: Vec<Option<usize>>,
}

impl TensorShape {
    pub fn new(dims: Vec<Option<usize>>) -> Self {
        Self { dims }
    }

    pub fn image(height: usize, width: usize, channels: usize) -> Self {
        Self::from(vec![height, width, channels])
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements described by the shape, treating unknown axes as empty
    pub fn dims(&self) -> usize {
        self.dims.iter().map(|x| x.unwrap_or(0)).product()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.dims.iter().all(Option::is_some)
    }

    /// `(height, width, channels)` if this is a fully defined rank 3 shape
    pub fn as_image(&self) -> Option<(usize, usize, usize)> {
        match self.dims.as_slice() {
            [Some(h), Some(w), Some(c)] => Some((*h, *w, *c)),
            _ => None,
        }
    }

    /// Prepends a batch axis of size `n`
    pub fn batched(&self, n: usize) -> Self {
        let mut dims = Vec::with_capacity(self.dims.len() + 1);
        dims.push(Some(n));
        dims.extend_from_slice(&self.dims);
        Self { dims }
    }
}

impl From<Vec<usize>> for TensorShape {
    fn from(v: Vec<usize>) -> Self {
        Self {
            dims: v.into_iter().map(Some).collect(),
        }
    }
}

impl From<&[usize]> for TensorShape {
    fn from(v: &[usize]) -> Self {
        Self::from(v.to_vec())
    }
}

impl From<(usize, usize, usize)> for TensorShape {
    fn from((h, w, c): (usize, usize, usize)) -> Self {
        Self::image(h, w, c)
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dims: Vec<String> = self
            .dims
            .iter()
            .map(|x| x.map_or_else(|| "?".to_string(), |d| d.to_string()))
            .collect();
        write!(f, "({})", dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_axes_are_not_an_image() {
        let partial = TensorShape::new(vec![None, Some(28), Some(1)]);
        assert!(!partial.is_fully_defined());
        assert!(partial.as_image().is_none());
        assert_eq!(partial.dims(), 0);
        assert_eq!(format!("{}", partial), "(?, 28, 1)");
        assert!(TensorShape::from(vec![28, 28]).as_image().is_none());
    }

    #[test]
    fn test_batched_prepends_axis() {
        let shape = TensorShape::image(2, 3, 1).batched(1);
        assert_eq!(shape, TensorShape::from(vec![1, 2, 3, 1]));
        assert_eq!(shape.rank(), 4);
        assert_eq!(shape.dims(), 6);
        assert_eq!(format!("{}", shape), "(1, 2, 3, 1)");
    }

    #[test]
    fn test_deserialize_from_plain_list() {
        let shape: TensorShape = serde_json::from_str("[32, 32, 3]").unwrap();
        assert_eq!(shape.as_image(), Some((32, 32, 3)));
    }
}
