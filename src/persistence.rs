//! Model persistence in the LibSVM text layout
//!
//! A header of `key value...` lines, then `SV` and one line per support
//! vector: its `nr_class − 1` coefficients followed by `index:value`
//! features. Floats are written in Rust's shortest round-trip form, so a
//! loaded model reproduces the saved coefficients exactly.
//!
//! ```text
//! svm_type c_svc
//! kernel_type gaussian
//! gamma 0.5
//! nr_class 2
//! total_sv 3
//! rho 0.12
//! label 1 -1
//! nr_sv 2 1
//! SV
//! 0.5 1:0.3 4:1
//! ...
//! ```

use crate::core::{KernelType, Parameters, Result, SVMError, SparseVector, SvmType};
use crate::data::parse_features;
use crate::model::{Model, SupportVectorStore};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::SplitWhitespace;
use std::sync::Arc;

/// Save a model to `path`
pub fn save_model<P: AsRef<Path>>(path: P, model: &Model) -> Result<()> {
    let file = File::create(path).map_err(SVMError::IoError)?;
    let mut writer = BufWriter::new(file);
    write_model(&mut writer, model)?;
    writer.flush().map_err(SVMError::IoError)
}

/// Load a model from `path`
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = File::open(path).map_err(SVMError::IoError)?;
    read_model(BufReader::new(file))
}

fn write_list<W: Write, T: Display>(writer: &mut W, key: &str, values: &[T]) -> Result<()> {
    write!(writer, "{}", key)?;
    for v in values {
        write!(writer, " {}", v)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Write a model in text form
pub fn write_model<W: Write>(writer: &mut W, model: &Model) -> Result<()> {
    let params = model.params();
    writeln!(writer, "svm_type {}", params.svm_type)?;
    writeln!(writer, "kernel_type {}", params.kernel_type)?;
    if params.kernel_type == KernelType::Polynomial {
        writeln!(writer, "degree {}", params.degree)?;
    }
    if params.kernel_type.uses_gamma() {
        writeln!(writer, "gamma {}", params.gamma)?;
    }
    if params.kernel_type.uses_coef0() {
        writeln!(writer, "coef0 {}", params.coef0)?;
    }

    writeln!(writer, "nr_class {}", model.nr_class())?;
    writeln!(writer, "total_sv {}", model.total_sv())?;
    write_list(writer, "rho", model.rho())?;
    if params.svm_type.is_classification() {
        write_list(writer, "label", model.labels())?;
    }
    if !model.prob_a.is_empty() {
        write_list(writer, "probA", &model.prob_a)?;
    }
    if !model.prob_b.is_empty() {
        write_list(writer, "probB", &model.prob_b)?;
    }
    if params.svm_type.is_classification() {
        write_list(writer, "nr_sv", model.class_support_counts())?;
    }

    writeln!(writer, "SV")?;
    for (k, sv) in model.support_vectors().iter().enumerate() {
        for row in model.sv_coef() {
            write!(writer, "{} ", row[k])?;
        }
        for (index, value) in sv.iter() {
            write!(writer, "{}:{} ", index, value)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn malformed(message: impl Into<String>) -> SVMError {
    SVMError::ModelFormat(message.into())
}

fn parse_value<T: std::str::FromStr>(key: &str, token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| malformed(format!("invalid value for {}: {}", key, token)))
}

fn parse_values<'a, T: std::str::FromStr>(
    key: &str,
    tokens: impl Iterator<Item = &'a str>,
) -> Result<Vec<T>> {
    tokens.map(|t| parse_value(key, t)).collect()
}

fn single<'a>(key: &str, tokens: &mut SplitWhitespace<'a>) -> Result<&'a str> {
    tokens
        .next()
        .ok_or_else(|| malformed(format!("missing value for {}", key)))
}

/// Header fields collected before the `SV` marker
#[derive(Default)]
struct Header {
    svm_type: Option<SvmType>,
    kernel_type: Option<KernelType>,
    degree: Option<i32>,
    gamma: Option<f64>,
    coef0: Option<f64>,
    nr_class: Option<usize>,
    total_sv: Option<usize>,
    rho: Vec<f64>,
    labels: Vec<i32>,
    prob_a: Vec<f64>,
    prob_b: Vec<f64>,
    n_sv: Vec<usize>,
}

impl Header {
    fn read<R: BufRead>(lines: &mut std::io::Lines<R>) -> Result<Header> {
        let mut header = Header::default();
        loop {
            let line = lines
                .next()
                .ok_or_else(|| malformed("missing SV section"))?
                .map_err(SVMError::IoError)?;
            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else {
                continue;
            };
            match key {
                "svm_type" => {
                    let name = single(key, &mut tokens)?;
                    header.svm_type = Some(
                        name.parse()
                            .map_err(|_| malformed(format!("unknown svm type: {}", name)))?,
                    );
                }
                "kernel_type" => {
                    let name = single(key, &mut tokens)?;
                    header.kernel_type = Some(
                        name.parse()
                            .map_err(|_| malformed(format!("unknown kernel type: {}", name)))?,
                    );
                }
                "degree" => header.degree = Some(parse_value(key, single(key, &mut tokens)?)?),
                "gamma" => header.gamma = Some(parse_value(key, single(key, &mut tokens)?)?),
                "coef0" => header.coef0 = Some(parse_value(key, single(key, &mut tokens)?)?),
                "nr_class" => header.nr_class = Some(parse_value(key, single(key, &mut tokens)?)?),
                "total_sv" => header.total_sv = Some(parse_value(key, single(key, &mut tokens)?)?),
                "rho" => header.rho = parse_values(key, tokens)?,
                "label" => header.labels = parse_values(key, tokens)?,
                "probA" => header.prob_a = parse_values(key, tokens)?,
                "probB" => header.prob_b = parse_values(key, tokens)?,
                "nr_sv" => header.n_sv = parse_values(key, tokens)?,
                "SV" => return Ok(header),
                other => return Err(malformed(format!("unknown header key: {}", other))),
            }
        }
    }

    /// Check the header is complete and self-consistent
    fn validate(&self) -> Result<(SvmType, KernelType, usize, usize)> {
        let svm_type = self.svm_type.ok_or_else(|| malformed("missing svm_type"))?;
        let kernel_type = self
            .kernel_type
            .ok_or_else(|| malformed("missing kernel_type"))?;
        let nr_class = self.nr_class.ok_or_else(|| malformed("missing nr_class"))?;
        let total_sv = self.total_sv.ok_or_else(|| malformed("missing total_sv"))?;

        let n_pairs = if svm_type.is_classification() {
            nr_class * nr_class.saturating_sub(1) / 2
        } else {
            1
        };
        if self.rho.len() != n_pairs {
            return Err(malformed(format!(
                "expected {} rho values, found {}",
                n_pairs,
                self.rho.len()
            )));
        }
        if svm_type.is_classification() {
            if self.labels.len() != nr_class || self.n_sv.len() != nr_class {
                return Err(malformed("label and nr_sv need one entry per class"));
            }
            if self.n_sv.iter().sum::<usize>() != total_sv {
                return Err(malformed("nr_sv does not add up to total_sv"));
            }
            if !self.prob_a.is_empty() && self.prob_a.len() != n_pairs {
                return Err(malformed("probA needs one entry per class pair"));
            }
        }
        Ok((svm_type, kernel_type, nr_class, total_sv))
    }
}

/// Read a model in text form. Support vectors of the result are held in a
/// shared store.
pub fn read_model<R: BufRead>(reader: R) -> Result<Model> {
    let mut lines = reader.lines();
    let header = Header::read(&mut lines)?;
    let (svm_type, kernel_type, nr_class, total_sv) = header.validate()?;

    let defaults = Parameters::default();
    let params = Parameters {
        svm_type,
        kernel_type,
        degree: header.degree.unwrap_or(defaults.degree),
        gamma: header.gamma.unwrap_or(defaults.gamma),
        coef0: header.coef0.unwrap_or(defaults.coef0),
        probability: !header.prob_a.is_empty(),
        ..defaults
    };

    let n_rows = if svm_type.is_classification() {
        nr_class.saturating_sub(1)
    } else {
        1
    };
    let mut sv_coef = vec![Vec::with_capacity(total_sv); n_rows];
    let mut vectors: Vec<SparseVector> = Vec::with_capacity(total_sv);

    for line in lines {
        let line = line.map_err(SVMError::IoError)?;
        if line.trim().is_empty() {
            continue;
        }
        if vectors.len() == total_sv {
            return Err(malformed("more support vectors than total_sv"));
        }
        let mut tokens = line.split_whitespace();
        for row in sv_coef.iter_mut() {
            let token = tokens
                .next()
                .ok_or_else(|| malformed(format!("support vector {} lacks coefficients", vectors.len())))?;
            row.push(parse_value("coefficient", token)?);
        }
        let vector = parse_features(tokens)
            .map_err(|e| malformed(format!("support vector {}: {}", vectors.len(), e)))?;
        vectors.push(vector);
    }
    if vectors.len() != total_sv {
        return Err(malformed(format!(
            "expected {} support vectors, found {}",
            total_sv,
            vectors.len()
        )));
    }

    let shared: Arc<[SparseVector]> = vectors.into();
    Ok(Model {
        params,
        nr_class,
        support_vectors: SupportVectorStore::Shared(shared),
        sv_coef,
        rho: header.rho,
        prob_a: header.prob_a,
        prob_b: header.prob_b,
        labels: header.labels,
        n_sv: header.n_sv,
        sv_indices: Vec::new(),
        bsv_indices: Vec::new(),
        summaries: Vec::new(),
    })
}
