/// Compressed sparse column matrix
///
/// Owns the value array, the row index array and the column pointer array.
/// The sparsity pattern is fixed at construction;
/// only values are rewritten afterwards (see [`CscMat::set_values_by_columns`]).
#[derive(Debug, Clone, PartialEq)]
pub struct CscMat
{
    n_row: usize,
    n_col: usize,
    data: Vec<f64>,
    indices: Vec<usize>,
    indptr: Vec<usize>,
}

impl CscMat
{
    /// Creates an instance from per-column `(row, value)` lists.
    ///
    /// Returns the [`CscMat`] instance.
    /// * `n_row` is a number of rows.
    /// * `columns` holds one list per column, rows strictly ascending.
    ///   Zero values are kept as explicit entries.
    pub fn from_columns(n_row: usize, columns: &[Vec<(usize, f64)>]) -> Self
    {
        let nnz = columns.iter().map(|c| c.len()).sum();

        let mut data = Vec::with_capacity(nnz);
        let mut indices = Vec::with_capacity(nnz);
        let mut indptr = Vec::with_capacity(columns.len() + 1);

        for col in columns {
            indptr.push(data.len());
            let mut prev: Option<usize> = None;
            for &(r, v) in col {
                assert!(r < n_row);
                if let Some(p) = prev {
                    assert!(p < r);
                }
                prev = Some(r);

                indices.push(r);
                data.push(v);
            }
        }
        indptr.push(data.len());

        CscMat {
            n_row,
            n_col: columns.len(),
            data,
            indices,
            indptr,
        }
    }

    /// Size of the matrix.
    ///
    /// Returns a tuple of a number of rows and columns.
    pub fn size(&self) -> (usize, usize)
    {
        (self.n_row, self.n_col)
    }

    /// Number of stored entries, explicit zeros included.
    pub fn nnz(&self) -> usize
    {
        self.data.len()
    }

    pub fn data(&self) -> &[f64]
    {
        &self.data
    }

    pub fn indices(&self) -> &[usize]
    {
        &self.indices
    }

    pub fn indptr(&self) -> &[usize]
    {
        &self.indptr
    }

    /// Iterates `(row, value)` of a column.
    pub fn col(&self, c: usize) -> impl Iterator<Item=(usize, f64)> + '_
    {
        let (beg, end) = (self.indptr[c], self.indptr[c + 1]);

        self.indices[beg.. end].iter().copied()
            .zip(self.data[beg.. end].iter().copied())
    }

    /// Stored value at `(r, c)`, zero if not stored.
    pub fn get(&self, r: usize, c: usize) -> f64
    {
        assert!(r < self.n_row);
        assert!(c < self.n_col);

        self.col(c).find(|&(i, _)| i == r).map_or(0., |(_, v)| v)
    }

    /// Checks if every stored entry lies on or above the diagonal.
    pub fn is_upper(&self) -> bool
    {
        (0.. self.n_col).all(|c| self.col(c).all(|(r, _)| r <= c))
    }

    /// Replaces the value array as it is.
    ///
    /// Returns `Err` if the length differs from [`CscMat::nnz`].
    pub fn set_data(&mut self, data: &[f64]) -> Result<(), ()>
    {
        if data.len() != self.data.len() {
            return Err(());
        }
        self.data.copy_from_slice(data);
        Ok(())
    }

    /// Rewrites values from per-column `(row, value)` lists of the same pattern.
    ///
    /// Panics if the pattern differs.
    pub fn set_values_by_columns(&mut self, columns: &[Vec<(usize, f64)>])
    {
        assert_eq!(columns.len(), self.n_col);

        for (c, col) in columns.iter().enumerate() {
            let (beg, end) = (self.indptr[c], self.indptr[c + 1]);
            assert_eq!(col.len(), end - beg);

            for (i, &(r, v)) in (beg.. end).zip(col) {
                assert_eq!(self.indices[i], r);
                self.data[i] = v;
            }
        }
    }

    /// Calculates \\(\alpha M x + \beta y\\).
    pub fn mul_vec(&self, alpha: f64, x: &[f64], beta: f64, y: &mut[f64])
    {
        assert_eq!(x.len(), self.n_col);
        assert_eq!(y.len(), self.n_row);

        for e in y.iter_mut() {
            *e = beta * *e;
        }
        for (c, &xc) in x.iter().enumerate() {
            for (r, v) in self.col(c) {
                y[r] = y[r] + alpha * v * xc;
            }
        }
    }

    /// Calculates \\(S x\\) for a symmetric \\(S\\) of which only the upper triangle is stored.
    pub fn sym_upper_mul_vec(&self, x: &[f64], y: &mut[f64])
    {
        assert_eq!(self.n_row, self.n_col);
        assert_eq!(x.len(), self.n_col);
        assert_eq!(y.len(), self.n_row);

        for e in y.iter_mut() {
            *e = 0.;
        }
        for c in 0.. self.n_col {
            for (r, v) in self.col(c) {
                y[r] += v * x[c];
                if r != c {
                    y[c] += v * x[r];
                }
            }
        }
    }

    /// Calculates \\(x^T S x\\) for a symmetric \\(S\\) of which only the upper triangle is stored.
    pub fn quad_form_upper(&self, x: &[f64]) -> f64
    {
        assert_eq!(self.n_row, self.n_col);
        assert_eq!(x.len(), self.n_col);

        let mut sum = 0.;
        for c in 0.. self.n_col {
            for (r, v) in self.col(c) {
                if r == c {
                    sum += v * x[r] * x[c];
                }
                else {
                    sum += 2. * v * x[r] * x[c];
                }
            }
        }
        sum
    }

    /// Dense row-major copy.
    /// If `mirror_upper` is `true`, stored entries are mirrored below the diagonal.
    pub fn to_dense(&self, mirror_upper: bool) -> Vec<Vec<f64>>
    {
        let mut dense = vec![vec![0.; self.n_col]; self.n_row];

        for c in 0.. self.n_col {
            for (r, v) in self.col(c) {
                dense[r][c] = v;
                if mirror_upper && r != c {
                    dense[c][r] = v;
                }
            }
        }
        dense
    }
}

//

#[test]
fn test_cscmat1()
{
    use float_eq::assert_float_eq;

    // | 4 1 0 |
    // | 1 3 2 |
    // | 0 2 5 |  upper triangle stored
    let m = CscMat::from_columns(3, &[
        vec![(0, 4.)],
        vec![(0, 1.), (1, 3.)],
        vec![(1, 2.), (2, 5.)],
    ]);

    assert_eq!(m.size(), (3, 3));
    assert_eq!(m.nnz(), 5);
    assert_eq!(m.indptr(), &[0, 1, 3, 5]);
    assert_eq!(m.indices(), &[0, 0, 1, 1, 2]);
    assert!(m.is_upper());
    assert_eq!(m.get(1, 2), 2.);
    assert_eq!(m.get(2, 1), 0.);

    let x = [1., -1., 2.];
    let mut y = [0.; 3];
    m.sym_upper_mul_vec(&x, &mut y);
    assert_float_eq!(y.as_slice(), [3., 2., 8.].as_ref(), abs_all <= 1e-12);

    // x^T S x = x . (S x)
    assert_float_eq!(m.quad_form_upper(&x), 3. - 2. + 16., abs <= 1e-12);

    m.mul_vec(1., &x, 0., &mut y);
    assert_float_eq!(y.as_slice(), [3., 1., 10.].as_ref(), abs_all <= 1e-12);
}

#[test]
fn test_cscmat_values()
{
    let mut m = CscMat::from_columns(2, &[
        vec![(0, 1.), (1, 0.)],
        vec![(1, 1.)],
    ]);
    assert_eq!(m.nnz(), 3);

    m.set_values_by_columns(&[
        vec![(0, 2.), (1, -3.)],
        vec![(1, 4.)],
    ]);
    assert_eq!(m.data(), &[2., -3., 4.]);

    assert!(m.set_data(&[1., 1.]).is_err());
    assert!(m.set_data(&[1., 1., 1.]).is_ok());
    assert_eq!(m.to_dense(false), vec![vec![1., 0.], vec![1., 1.]]);
}
