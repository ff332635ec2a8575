use anyhow::anyhow;
use ndarray::{s, Array1, Array2, ArrayView2};
use nshare::{IntoNalgebra, IntoNdarray2};

pub struct SVD {
    u: Array2<f64>,
    s: Array1<f64>,
    vt: Array2<f64>,
}

impl SVD {
    pub fn new(x: ArrayView2<f64>) -> anyhow::Result<Self> {
        let matrix = x.into_nalgebra().clone_owned();
        let svd = nalgebra_lapack::SVD::new(matrix)
            .ok_or_else(|| anyhow!("LAPACK SVD failed to converge"))?;

        // LAPACK returns full U (m x m) and V^T (n x n); slice both down to
        // the thin factors the solver contract expects.
        let k = svd.singular_values.len();
        let u = svd.u.into_ndarray2().slice(s![.., ..k]).to_owned();
        let vt = svd.vt.into_ndarray2().slice(s![..k, ..]).to_owned();
        let s = Array1::from(svd.singular_values.as_slice().to_vec());

        Ok(SVD { u, s, vt })
    }

    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn s(&self) -> &Array1<f64> {
        &self.s
    }

    pub fn vt(&self) -> &Array2<f64> {
        &self.vt
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<f64>, Array2<f64>) {
        (self.u, self.s, self.vt)
    }

    // Reconstruct the original matrix
    pub fn reconstruct(&self) -> Array2<f64> {
        let s_diag = Array2::from_diag(&self.s);
        self.u.dot(&s_diag).dot(&self.vt)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_simple_svd() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let svd = SVD::new(a.view()).unwrap();

        assert_eq!(svd.u().shape(), &[2, 2]);
        assert_eq!(svd.s().len(), 2);
        assert_eq!(svd.vt().shape(), &[2, 2]);

        assert_abs_diff_eq!(svd.s()[0], 5.4649857, epsilon = 1e-6);
        assert_abs_diff_eq!(svd.s()[1], 0.3659662, epsilon = 1e-6);

        let reconstructed = svd.reconstruct();
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(reconstructed[[i, j]], a[[i, j]], epsilon = 1e-6);
            }
        }
    }
}
