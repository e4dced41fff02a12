use std::sync::Arc;

use ahash::AHashMap;
use eyre::{ensure, eyre, Result};
use impl_tools::autoimpl;

use crate::table::RpkmTableRow;

/// MA-loess normalization of two paired measurement vectors. Implementations are expected to
/// return the normalized values of both samples, in the input order.
#[autoimpl(for<T: trait + ?Sized> &T, Box<T>, Arc<T>)]
pub trait LoessFit {
    fn normalize(&self, first: &[f64], second: &[f64]) -> Result<(Vec<f64>, Vec<f64>)>;
}

/// Optional loess backend. The fit is delegated to an external statistical routine that might
/// not be installed, in which case normalization is skipped.
#[derive(Default)]
pub enum Loess {
    Available(Box<dyn LoessFit + Send + Sync>),
    #[default]
    Unavailable,
}

/// RPKM values of several samples over a shared set of genes. Missing values are NaN.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct RpkmMatrix {
    genes: Vec<String>,
    columns: Vec<(String, Vec<f64>)>,
}

impl RpkmMatrix {
    pub fn new(genes: Vec<String>) -> Self {
        Self {
            genes,
            columns: Vec::new(),
        }
    }

    /// Join per-sample RPKM tables on the gene id. Genes are ordered by their first appearance.
    pub fn from_samples<'a>(
        samples: impl IntoIterator<Item = (&'a str, &'a [RpkmTableRow])>,
    ) -> Result<Self> {
        let samples: Vec<_> = samples.into_iter().collect();

        let mut index = AHashMap::new();
        let mut genes = Vec::new();
        for row in samples.iter().flat_map(|(_, rows)| rows.iter()) {
            if !index.contains_key(row.gene_id()) {
                index.insert(row.gene_id().clone(), genes.len());
                genes.push(row.gene_id().clone());
            }
        }

        let mut matrix = Self::new(genes);
        for (sample, rows) in samples {
            let mut values = vec![f64::NAN; matrix.genes.len()];
            for row in rows {
                let ind = index[row.gene_id()];
                values[ind] = row.rpkm().unwrap_or(f64::NAN);
            }
            matrix.push_column(sample, values)?;
        }
        Ok(matrix)
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|(x, _)| x == name)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| eyre!("RPKM matrix has no column {name}"))
    }

    /// Add a column, replacing any existing column with the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        ensure!(
            values.len() == self.genes.len(),
            "Column {name} has {} values, expected {}",
            values.len(),
            self.genes.len()
        );
        match self.columns.iter_mut().find(|(x, _)| *x == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        Ok(())
    }
}

impl Loess {
    pub fn is_available(&self) -> bool {
        matches!(self, Loess::Available(_))
    }

    /// Loess-normalize each pair of samples, adding `norm_<a>.<b>_1`, `norm_<a>.<b>_2` and the
    /// normalized fold change `norm_fc_<a>.<b>`. Returns None when no backend is available.
    pub fn normalize_pairs(
        &self,
        matrix: &RpkmMatrix,
        pairs: &[(String, String)],
    ) -> Result<Option<RpkmMatrix>> {
        let fit = match self {
            Loess::Available(fit) => fit,
            Loess::Unavailable => {
                log::warn!("Loess normalization is not available, skipping it");
                return Ok(None);
            }
        };

        let mut normalized = matrix.clone();
        for (first, second) in pairs {
            let (first_normed, second_normed) =
                fit.normalize(matrix.column(first)?, matrix.column(second)?)?;
            ensure!(
                first_normed.len() == matrix.genes.len() && second_normed.len() == matrix.genes.len(),
                "Loess normalization of {first} vs {second} returned a wrong number of values"
            );

            let fold_change = first_normed
                .iter()
                .zip(&second_normed)
                .map(|(a, b)| a / b)
                .collect();

            normalized.push_column(format!("norm_{first}.{second}_1"), first_normed)?;
            normalized.push_column(format!("norm_{first}.{second}_2"), second_normed)?;
            normalized.push_column(format!("norm_fc_{first}.{second}"), fold_change)?;
        }
        Ok(Some(normalized))
    }
}
