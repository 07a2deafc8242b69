// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;
use std::marker::PhantomData;

pub type BackendError = Box<dyn Error + Send + Sync>;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput<F: 'static> {
    /// Eigenvalues, in the order the backend returns them (ascending for LAPACK and faer).
    pub eigenvalues: Array1<F>,
    /// Eigenvectors as columns; `eigenvectors.column(i)` pairs with `eigenvalues[i]`.
    pub eigenvectors: Array2<F>,
}

/// Symmetric eigendecomposition reading the upper triangle of `matrix`.
pub trait BackendEigh<F: 'static + Copy + Send + Sync> {
    fn eigh_upper(&self, matrix: &Array2<F>) -> Result<EighOutput<F>, BackendError>;
}

/// Dispatches to the linear algebra backend selected by feature flags.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider<F: 'static + Copy + Send + Sync> {
    _phantom: PhantomData<F>,
}

impl<F: 'static + Copy + Send + Sync> LinAlgBackendProvider<F> {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

// --- ndarray-linalg (LAPACK) backend ---

use ndarray_linalg::{Eigh as NdLinalgEigh, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

impl BackendEigh<f64> for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, BackendError> {
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(|e| Box::new(e) as BackendError)?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

// --- faer backend ---

#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendEigh, BackendError, EighOutput};
    use faer::{ColRef, MatRef, Side};
    use ndarray::{Array1, Array2};

    fn faer_error(msg: String) -> BackendError {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        Array2::from_shape_fn((faer_mat.nrows(), faer_mat.ncols()), |(i, j)| faer_mat[(i, j)])
    }

    fn faer_col_to_ndarray(faer_col: ColRef<'_, f64>) -> Array1<f64> {
        (0..faer_col.nrows()).map(|i| faer_col[i]).collect()
    }

    impl BackendEigh<f64> for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, BackendError> {
            let (nrows, ncols) = matrix.dim();
            if nrows != ncols {
                return Err(faer_error("Matrix must be square for eigendecomposition.".to_string()));
            }
            if matrix.is_empty() {
                return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            let contiguous = matrix.as_standard_layout();
            let slice = contiguous
                .as_slice()
                .ok_or_else(|| faer_error(format!("Failed to get slice from {}x{} matrix", nrows, ncols)))?;
            let faer_view = MatRef::from_row_major_slice(slice, nrows, ncols);
            let eig = faer_view
                .self_adjoint_eigen(Side::Upper)
                .map_err(|e| faer_error(format!("faer eigendecomposition failed: {:?}", e)))?;
            Ok(EighOutput {
                eigenvalues: faer_col_to_ndarray(eig.S().column_vector()),
                eigenvectors: faer_mat_to_ndarray(eig.U()),
            })
        }
    }
}

#[cfg(feature = "backend_faer")]
pub use faer_specific_code::FaerLinAlgBackend;

impl BackendEigh<f64> for LinAlgBackendProvider<f64> {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, BackendError> {
        #[cfg(feature = "backend_faer")]
        {
            FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}
