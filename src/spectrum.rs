//! # Allele frequency spectra
//!
//! A `Spectrum` is a dense, row-major array of expected or observed counts
//! with one axis per population. Axis `k` has length `n_k + 1`, where `n_k` is
//! the number of sampled chromosomes of population `k`.
//!
//! Spectra are read from and written to the plain-text `.fs` format:
//!
//! ```text
//! # optional comment lines
//! 3 unfolded "YRI"
//! 0 12.5 3.1
//! 1 0 1
//! ```
//!
//! The first line holds the shape, an optional `folded`/`unfolded` flag and
//! optional quoted population labels. The second line holds the data and an
//! optional third line the mask (`1` = masked). Without a mask line the two
//! corner entries are masked.
//!
//! Composite log-likelihoods treat unmasked entries as independent Poisson
//! counts. `ll_multinom` first rescales the model by the optimal `theta`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{OptimizationError, Result, ResultExt};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    shape: Vec<usize>,
    data: Vec<f64>,
    mask: Vec<bool>,
    folded: bool,
    pop_ids: Option<Vec<String>>,
}

impl Spectrum {
    /// Creates an unmasked, unfolded spectrum.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        if shape.is_empty() || shape.iter().any(|&n| n < 2) {
            return Err(OptimizationError::Data(format!(
                "Invalid spectrum shape {:?}",
                shape
            )));
        }
        let size: usize = shape.iter().product();
        if size != data.len() {
            return Err(OptimizationError::Data(format!(
                "Spectrum of shape {:?} needs {} entries, got {}",
                shape,
                size,
                data.len()
            )));
        }
        Ok(Self {
            mask: vec![false; size],
            shape,
            data,
            folded: false,
            pop_ids: None,
        })
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Result<Self> {
        if mask.len() != self.data.len() {
            return Err(OptimizationError::Data(format!(
                "Mask has {} entries, spectrum has {}",
                mask.len(),
                self.data.len()
            )));
        }
        self.mask = mask;
        Ok(self)
    }

    pub fn with_pop_ids(mut self, pop_ids: Vec<String>) -> Result<Self> {
        if pop_ids.len() != self.shape.len() {
            return Err(OptimizationError::Data(format!(
                "Got {} population labels for {} populations",
                pop_ids.len(),
                self.shape.len()
            )));
        }
        self.pop_ids = Some(pop_ids);
        Ok(self)
    }

    /// Marks the spectrum as folded without transforming its data.
    pub fn with_folded(mut self, folded: bool) -> Self {
        self.folded = folded;
        self
    }

    /// Masks the entries where all alleles are ancestral or all derived.
    pub fn mask_corners(mut self) -> Self {
        let last = self.data.len() - 1;
        self.mask[0] = true;
        self.mask[last] = true;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_folded(&self) -> bool {
        self.folded
    }

    pub fn pop_ids(&self) -> Option<&[String]> {
        self.pop_ids.as_deref()
    }

    /// Number of sampled chromosomes per population.
    pub fn sample_sizes(&self) -> Vec<usize> {
        self.shape.iter().map(|n| n - 1).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry at a multi-dimensional index, `None` when out of range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.flat_index(index).map(|i| self.data[i])
    }

    /// Sum of the unmasked entries.
    pub fn sum(&self) -> f64 {
        self.unmasked().map(|(_, v)| v).sum()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        scaled.data.iter_mut().for_each(|v| *v *= factor);
        scaled
    }

    fn unmasked(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.mask[*i])
            .map(|(i, &v)| (i, v))
    }

    fn flat_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }
        Some(flat)
    }

    fn multi_index(&self, mut flat: usize) -> Vec<usize> {
        let mut index = vec![0; self.shape.len()];
        for (slot, &n) in index.iter_mut().zip(&self.shape).rev() {
            *slot = flat % n;
            flat /= n;
        }
        index
    }

    /// Folds the spectrum by minor allele frequency.
    ///
    /// Entries with more than half of all chromosomes derived are added onto
    /// their mirror entry and masked. Entries with exactly half are averaged
    /// with their mirror.
    pub fn fold(&self) -> Self {
        if self.folded {
            return self.clone();
        }
        let total: usize = self.sample_sizes().iter().sum();
        let mut data = vec![0.0; self.data.len()];
        let mut mask = self.mask.clone();
        for flat in 0..self.data.len() {
            let index = self.multi_index(flat);
            let derived: usize = index.iter().sum();
            let mirror: Vec<usize> = index
                .iter()
                .zip(&self.shape)
                .map(|(&i, &n)| n - 1 - i)
                .collect();
            let mirror_flat = self.flat_index(&mirror).unwrap_or(flat);
            let own = if self.mask[flat] { 0.0 } else { self.data[flat] };
            let other = if self.mask[mirror_flat] {
                0.0
            } else {
                self.data[mirror_flat]
            };
            if 2 * derived < total {
                data[flat] = own + other;
                mask[flat] = self.mask[flat] && self.mask[mirror_flat];
            } else if 2 * derived == total {
                data[flat] = if flat == mirror_flat {
                    own
                } else {
                    (own + other) / 2.0
                };
            } else {
                mask[flat] = true;
            }
        }
        Self {
            shape: self.shape.clone(),
            data,
            mask,
            folded: true,
            pop_ids: self.pop_ids.clone(),
        }
    }

    /// Reads a spectrum from a `.fs` file.
    pub fn read_fs(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .context(format!("Failed to read spectrum from {}", path.display()))?;
        text.parse()
    }

    /// Writes the spectrum to a `.fs` file.
    pub fn write_fs(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_fs_string())?;
        Ok(())
    }

    pub fn to_fs_string(&self) -> String {
        let mut out = String::new();
        let shape: Vec<String> = self.shape.iter().map(|n| n.to_string()).collect();
        out.push_str(&shape.join(" "));
        out.push_str(if self.folded { " folded" } else { " unfolded" });
        if let Some(ids) = &self.pop_ids {
            for id in ids {
                let _ = write!(out, " \"{}\"", id);
            }
        }
        out.push('\n');
        let data: Vec<String> = self.data.iter().map(|v| v.to_string()).collect();
        out.push_str(&data.join(" "));
        out.push('\n');
        let mask: Vec<&str> = self
            .mask
            .iter()
            .map(|&m| if m { "1" } else { "0" })
            .collect();
        out.push_str(&mask.join(" "));
        out.push('\n');
        out
    }

    fn check_compatible(&self, other: &Spectrum) -> Result<()> {
        if self.shape != other.shape {
            return Err(OptimizationError::Data(format!(
                "Model spectrum shape {:?} does not match data shape {:?}",
                self.shape, other.shape
            )));
        }
        Ok(())
    }

    /// Brings a model spectrum to the folding state of the data and applies
    /// the data mask.
    fn aligned_with(&self, data: &Spectrum) -> Result<Spectrum> {
        self.check_compatible(data)?;
        let mut model = if data.folded && !self.folded {
            self.fold()
        } else {
            self.clone()
        };
        for (m, &d) in model.mask.iter_mut().zip(&data.mask) {
            *m = *m || d;
        }
        Ok(model)
    }
}

impl FromStr for Spectrum {
    type Err = OptimizationError;

    fn from_str(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let header = lines
            .next()
            .ok_or_else(|| OptimizationError::Data("Spectrum file is empty".to_string()))?;
        let (shape, folded, pop_ids) = parse_header(header)?;

        let mut values = Vec::new();
        for line in lines {
            for token in line.split_whitespace() {
                let value = token.parse::<f64>().map_err(|_| {
                    OptimizationError::Data(format!("Invalid spectrum entry '{}'", token))
                })?;
                values.push(value);
            }
        }

        let size: usize = shape.iter().product();
        if values.len() != size && values.len() != 2 * size {
            return Err(OptimizationError::Data(format!(
                "Spectrum of shape {:?} needs {} entries (or {} with a mask), got {}",
                shape,
                size,
                2 * size,
                values.len()
            )));
        }
        let mask_values = values.split_off(size);
        let mut spectrum = Spectrum::new(shape, values)?.with_folded(folded);
        spectrum = if mask_values.is_empty() {
            spectrum.mask_corners()
        } else {
            spectrum.with_mask(mask_values.iter().map(|&m| m != 0.0).collect())?
        };
        if !pop_ids.is_empty() {
            spectrum = spectrum.with_pop_ids(pop_ids)?;
        }
        Ok(spectrum)
    }
}

fn parse_header(header: &str) -> Result<(Vec<usize>, bool, Vec<String>)> {
    let (plain, quoted) = match header.find('"') {
        Some(pos) => header.split_at(pos),
        None => (header, ""),
    };
    let mut shape = Vec::new();
    let mut folded = false;
    for token in plain.split_whitespace() {
        match token {
            "folded" => folded = true,
            "unfolded" => folded = false,
            _ => shape.push(token.parse::<usize>().map_err(|_| {
                OptimizationError::Data(format!("Invalid spectrum header token '{}'", token))
            })?),
        }
    }
    let pop_ids = quoted
        .split('"')
        .map(str::trim)
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, id)| id.to_string())
        .collect();
    Ok((shape, folded, pop_ids))
}

/// Natural log of the gamma function (Lanczos approximation).
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (i, &c) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Poisson composite log-likelihood of `data` given the expected `model`.
pub fn ll(model: &Spectrum, data: &Spectrum) -> Result<f64> {
    let model = model.aligned_with(data)?;
    let mut total = 0.0;
    for (i, m) in model.unmasked() {
        let d = data.data[i];
        if m <= 0.0 {
            if d > 0.0 {
                return Ok(f64::NEG_INFINITY);
            }
            continue;
        }
        total += -m + d * m.ln() - ln_gamma(d + 1.0);
    }
    Ok(total)
}

/// Scaling of `model` that maximizes the Poisson likelihood of `data`.
pub fn optimal_sfs_scaling(model: &Spectrum, data: &Spectrum) -> Result<f64> {
    let model = model.aligned_with(data)?;
    let model_sum = model.sum();
    if model_sum <= 0.0 {
        return Err(OptimizationError::InvalidNumericValue(
            "Model spectrum sums to zero".to_string(),
        ));
    }
    let data_sum: f64 = model.unmasked().map(|(i, _)| data.data[i]).sum();
    Ok(data_sum / model_sum)
}

/// Log-likelihood after scaling `model` by the optimal theta.
pub fn ll_multinom(model: &Spectrum, data: &Spectrum) -> Result<f64> {
    let theta = optimal_sfs_scaling(model, data)?;
    ll(&model.scaled(theta), data)
}
