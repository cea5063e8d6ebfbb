//! Heritability estimation entry point.
//!
//! [`calc_h2`] validates the inputs, optionally removes the top
//! principal components from a working copy of the kinship matrix,
//! classifies the phenotype and dispatches to one of four slope
//! estimators:
//!
//! | phenotype  | ascertainment | PCs removed | estimator            |
//! |------------|---------------|-------------|----------------------|
//! | binary     | none          | yes         | `BinaryCorrected`    |
//! | binary     | none          | no          | `BinaryUncorrected`  |
//! | continuous | one tail      | any         | `ContinuousOneTail`  |
//! | continuous | two tails     | any         | `ContinuousTwoTail`  |
//!
//! A non-positive or non-finite slope is replaced by [`H2_PLACEHOLDER`]
//! and reported as a warning, so that downstream scans always receive a
//! usable value.

pub mod estimators;
pub mod regression;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{H2Error, H2Warning};
use crate::kinship::{remove_top_pcs, Relatedness, RetainedMask};
use crate::liability::{estimate_liability_thresholds, LogisticClassifier, ProbabilityClassifier};
use crate::phenotype::{classify, extract_phenotype, recode_binary, PhenotypeInput, PhenotypeKind};

pub use estimators::{Estimator, SlopeEstimate};

/// Value substituted for a non-positive or non-finite estimate.
pub const H2_PLACEHOLDER: f64 = 0.01;

/// How the sample was ascertained with respect to the trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AscertainmentModel {
    /// Continuous trait sampled from the upper tail.
    OneTail,
    /// Continuous trait sampled from both tails.
    TwoTail,
    /// Case/control sampling, corrected through the prevalence.
    None,
}

impl AscertainmentModel {
    pub fn for_phenotype(kind: PhenotypeKind, lowtail: bool) -> Self {
        match (kind, lowtail) {
            (PhenotypeKind::Binary, _) => AscertainmentModel::None,
            (PhenotypeKind::Continuous, false) => AscertainmentModel::OneTail,
            (PhenotypeKind::Continuous, true) => AscertainmentModel::TwoTail,
        }
    }
}

impl Estimator {
    /// The dispatch table.
    pub fn select(kind: PhenotypeKind, model: AscertainmentModel, num_remove_pcs: usize) -> Self {
        match (kind, model) {
            (PhenotypeKind::Binary, _) if num_remove_pcs > 0 => Estimator::BinaryCorrected,
            (PhenotypeKind::Binary, _) => Estimator::BinaryUncorrected,
            (PhenotypeKind::Continuous, AscertainmentModel::TwoTail) => {
                Estimator::ContinuousTwoTail
            }
            (PhenotypeKind::Continuous, _) => Estimator::ContinuousOneTail,
        }
    }
}

/// Parameters of a single estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct H2Config {
    /// Population prevalence K, in (0, 1).
    pub prevalence: f64,
    /// Number of top principal components removed from the kinship.
    pub num_remove_pcs: usize,
    /// Multiplier on the ascertainment coefficient.
    pub h2coeff: f64,
    /// Continuous traits only: treat the study as ascertained in both tails.
    pub lowtail: bool,
}

impl H2Config {
    pub fn new(prevalence: f64) -> Self {
        Self {
            prevalence,
            num_remove_pcs: 0,
            h2coeff: 1.0,
            lowtail: false,
        }
    }

    pub fn with_num_remove_pcs(mut self, num_remove_pcs: usize) -> Self {
        self.num_remove_pcs = num_remove_pcs;
        self
    }

    pub fn with_h2coeff(mut self, h2coeff: f64) -> Self {
        self.h2coeff = h2coeff;
        self
    }

    pub fn with_lowtail(mut self, lowtail: bool) -> Self {
        self.lowtail = lowtail;
        self
    }
}

/// A heritability estimate and how it was obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct H2Estimate {
    /// Final estimate, always finite and positive.
    pub h2: f64,
    /// Regression slope before sanitising.
    pub raw_estimate: f64,
    pub estimator: Estimator,
    pub phenotype_kind: PhenotypeKind,
    pub n_retained: usize,
    /// Number of individual pairs entering the regression.
    pub n_pairs: usize,
    pub warnings: Vec<H2Warning>,
}

/// Estimate heritability with the default logistic case classifier.
///
/// `retained` defaults to every individual. The caller's kinship matrix
/// is never modified.
pub fn calc_h2<'a, P>(
    phenotype: P,
    relatedness: &Relatedness,
    retained: Option<&RetainedMask>,
    config: &H2Config,
) -> Result<H2Estimate, H2Error>
where
    P: Into<PhenotypeInput<'a>>,
{
    calc_h2_with_classifier(
        phenotype,
        relatedness,
        retained,
        config,
        &LogisticClassifier::default(),
    )
}

/// Estimate heritability, using `classifier` for the case probabilities
/// of the PC-corrected binary path.
pub fn calc_h2_with_classifier<'a, P, C>(
    phenotype: P,
    relatedness: &Relatedness,
    retained: Option<&RetainedMask>,
    config: &H2Config,
    classifier: &C,
) -> Result<H2Estimate, H2Error>
where
    P: Into<PhenotypeInput<'a>>,
    C: ProbabilityClassifier,
{
    let phe = extract_phenotype(phenotype.into())?;
    let kind = classify(&phe)?;
    let n = phe.len();

    let xxt = &relatedness.xxt;
    if xxt.nrows() != n || xxt.ncols() != n {
        return Err(H2Error::DimensionMismatch {
            what: "kinship matrix vs phenotype",
            expected: n,
            got: if xxt.nrows() != n { xxt.nrows() } else { xxt.ncols() },
        });
    }
    let prevalence = config.prevalence;
    if !(prevalence > 0.0 && prevalence < 1.0) {
        return Err(H2Error::InvalidPrevalence(prevalence));
    }

    let all;
    let mask = match retained {
        Some(m) => {
            if m.len() != n {
                return Err(H2Error::DimensionMismatch {
                    what: "retained mask vs phenotype",
                    expected: n,
                    got: m.len(),
                });
            }
            m
        }
        None => {
            all = RetainedMask::all(n);
            &all
        }
    };
    let kept = mask.indices();
    if kept.len() < 2 {
        return Err(H2Error::TooFewRetained { retained: kept.len() });
    }

    let num_remove_pcs = config.num_remove_pcs;
    let kinship: Cow<'_, _> = if num_remove_pcs > 0 {
        let mut working = xxt.clone();
        remove_top_pcs(&mut working, relatedness.eigen.as_ref(), num_remove_pcs)?;
        Cow::Owned(working)
    } else {
        Cow::Borrowed(xxt)
    };

    let model = AscertainmentModel::for_phenotype(kind, config.lowtail);
    let estimator = Estimator::select(kind, model, num_remove_pcs);
    debug!("Computing h2 for a {:?} phenotype with {:?}", kind, estimator);

    let h2coeff = config.h2coeff;
    let fit = match estimator {
        Estimator::BinaryCorrected => {
            let phe = recode_binary(&phe);
            let eigen = relatedness
                .eigen
                .as_ref()
                .ok_or(H2Error::MissingEigenDecomposition { num_remove_pcs })?;
            let liability = estimate_liability_thresholds(
                classifier,
                eigen,
                mask,
                &phe,
                num_remove_pcs,
                prevalence,
            )?;
            estimators::binary_corrected(&kinship, &phe, &liability, &kept, prevalence, h2coeff)
        }
        Estimator::BinaryUncorrected => {
            let phe = recode_binary(&phe);
            estimators::binary_uncorrected(&kinship, &phe, &kept, prevalence, h2coeff)
        }
        Estimator::ContinuousOneTail => {
            estimators::continuous_one_tail(&kinship, &phe, &kept, prevalence, h2coeff)
        }
        Estimator::ContinuousTwoTail => {
            estimators::continuous_two_tail(&kinship, &phe, &kept, prevalence, h2coeff)
        }
    };

    let (h2, warning) = sanitize_estimate(fit.slope);
    if let Some(w) = warning {
        warn!("{}; using h2 = {}", w, H2_PLACEHOLDER);
    }
    debug!("h2: {:.6}", h2);

    Ok(H2Estimate {
        h2,
        raw_estimate: fit.slope,
        estimator,
        phenotype_kind: kind,
        n_retained: kept.len(),
        n_pairs: fit.n_pairs,
        warnings: warning.into_iter().collect(),
    })
}

/// Replace a non-finite or non-positive slope by [`H2_PLACEHOLDER`].
pub fn sanitize_estimate(raw: f64) -> (f64, Option<H2Warning>) {
    if !raw.is_finite() {
        (H2_PLACEHOLDER, Some(H2Warning::NonFiniteEstimate { raw }))
    } else if raw <= 0.0 {
        (H2_PLACEHOLDER, Some(H2Warning::NonPositiveEstimate { raw }))
    } else {
        (raw, None)
    }
}
