//! Integration tests on simulated cohorts.
//!
//! Genotypes are drawn under Hardy-Weinberg equilibrium, liabilities
//! are the sum of a polygenic effect and Gaussian noise, and cases are
//! those individuals whose liability exceeds the threshold implied by
//! the prevalence. The Bernoulli cohort instead draws its latent
//! variable directly from a mixed kinship through a Cholesky factor.

use rand::distributions::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statrs::distribution::Normal;

use leap_core::h2::estimators::{self, Estimator};
use leap_core::kinship::related::unrelated_mask;
use leap_core::kinship::{remove_top_pcs, Relatedness, RetainedMask};
use leap_core::{calc_h2, H2Config, H2Error, PhenotypeKind};
use leap_linalg::decomposition::CholeskyDecomp;
use leap_linalg::DenseMatrix;

/// Simulated individuals: standardised genotypes and liabilities.
struct Cohort {
    genotypes: Vec<Vec<f64>>,
    liabilities: Vec<f64>,
}

fn simulate_population(rng: &mut ChaCha8Rng, n: usize, n_snps: usize, h2: f64) -> Cohort {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let freqs: Vec<f64> = (0..n_snps).map(|_| 0.05 + 0.45 * rng.gen::<f64>()).collect();
    let effects: Vec<f64> = (0..n_snps)
        .map(|_| normal.sample(rng) * (h2 / n_snps as f64).sqrt())
        .collect();

    let mut genotypes = Vec::with_capacity(n);
    let mut liabilities = Vec::with_capacity(n);
    for _ in 0..n {
        let g: Vec<f64> = freqs
            .iter()
            .map(|&f| {
                let dosage = (rng.gen::<f64>() < f) as u8 as f64 + (rng.gen::<f64>() < f) as u8 as f64;
                (dosage - 2.0 * f) / (2.0 * f * (1.0 - f)).sqrt()
            })
            .collect();
        let genetic: f64 = g.iter().zip(&effects).map(|(x, b)| x * b).sum();
        liabilities.push(genetic + normal.sample(rng) * (1.0 - h2).sqrt());
        genotypes.push(g);
    }
    Cohort {
        genotypes,
        liabilities,
    }
}

/// Genetic relationship matrix XX'/p of the selected individuals.
fn kinship_of(cohort: &Cohort, selected: &[usize]) -> DenseMatrix {
    let n_snps = cohort.genotypes[0].len() as f64;
    let n = selected.len();
    let mut k = DenseMatrix::zeros(n, n);
    for a in 0..n {
        for b in a..n {
            let ga = &cohort.genotypes[selected[a]];
            let gb = &cohort.genotypes[selected[b]];
            let v = ga.iter().zip(gb).map(|(x, y)| x * y).sum::<f64>() / n_snps;
            k.set(a, b, v);
            k.set(b, a, v);
        }
    }
    k
}

/// Pick `n_cases` cases and `n_controls` controls from a population,
/// case status meaning liability above `isf(prevalence)`.
fn ascertain(cohort: &Cohort, prevalence: f64, n_cases: usize, n_controls: usize) -> (Vec<usize>, Vec<f64>) {
    let t = leap_core::util::math::normal_isf(prevalence);
    let cases = (0..cohort.liabilities.len())
        .filter(|&i| cohort.liabilities[i] > t)
        .take(n_cases);
    let controls = (0..cohort.liabilities.len())
        .filter(|&i| cohort.liabilities[i] <= t)
        .take(n_controls);
    let selected: Vec<usize> = cases.chain(controls).collect();
    assert_eq!(selected.len(), n_cases + n_controls, "population too small");
    let phe = selected
        .iter()
        .map(|&i| if cohort.liabilities[i] > t { 1.0 } else { 0.0 })
        .collect();
    (selected, phe)
}

mod binary {
    use super::*;

    /// Bernoulli trait on a mixed kinship, as in the GCTA comparison run:
    /// 500 individuals, 504 genotypes uniform on {0, 1, 2}, a latent
    /// `z ~ N(0.4, 0.5 Kg + 0.5 I)` and cases where `z > 0`.
    fn bernoulli_cohort(seed: u64) -> (DenseMatrix, Vec<f64>) {
        let n = 500;
        let p = n + 4;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut g: Vec<Vec<f64>> = (0..n)
            .map(|_| (0..p).map(|_| rng.gen_range(0..3u8) as f64).collect())
            .collect();
        for s in 0..p {
            let mean = g.iter().map(|row| row[s]).sum::<f64>() / n as f64;
            let var = g.iter().map(|row| (row[s] - mean).powi(2)).sum::<f64>() / n as f64;
            let scale = if var > 0.0 { 1.0 / (var.sqrt() * (p as f64).sqrt()) } else { 0.0 };
            for row in g.iter_mut() {
                row[s] = (row[s] - mean) * scale;
            }
        }

        let mut k = DenseMatrix::zeros(n, n);
        for a in 0..n {
            for b in a..n {
                let v: f64 = g[a].iter().zip(&g[b]).map(|(x, y)| x * y).sum();
                k.set(a, b, v);
                k.set(b, a, v);
            }
        }
        let kg = k.scale(1.0 / mean_diagonal(&k));
        let mixed = DenseMatrix::from_fn(n, n, |i, j| {
            0.5 * kg.get(i, j) + if i == j { 0.5 } else { 0.0 }
        });
        let mixed = mixed.scale(1.0 / mean_diagonal(&mixed));

        let chol = CholeskyDecomp::new(&mixed).unwrap();
        let normal = Normal::new(0.0, 1.0).unwrap();
        let e: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
        let z = chol.l.mat_vec(&e);
        let y = z.iter().map(|&v| if v + 0.4 > 0.0 { 1.0 } else { 0.0 }).collect();
        (kg, y)
    }

    fn mean_diagonal(k: &DenseMatrix) -> f64 {
        k.trace() / k.nrows() as f64
    }

    #[test]
    fn test_bernoulli_latent_h2_recovered() {
        // The latent variance is split evenly between Kg and noise, so
        // the liability-scale heritability is 0.5. The mean shift puts
        // roughly 65% of the sample above the threshold while the model
        // is told the prevalence is 0.5; across seeds the estimate has
        // mean 0.53 and standard deviation 0.13.
        let (kg, y) = bernoulli_cohort(981);
        let cases = y.iter().filter(|&&v| v == 1.0).count();
        assert!((280..=380).contains(&cases), "{} cases", cases);

        let rel = Relatedness::new(kg);
        let est = calc_h2(&y, &rel, None, &H2Config::new(0.5)).unwrap();
        assert_eq!(est.estimator, Estimator::BinaryUncorrected);
        assert_eq!(est.phenotype_kind, PhenotypeKind::Binary);
        assert_eq!(est.n_pairs, 500 * 499 / 2);
        assert!(est.warnings.is_empty());
        assert!(
            est.h2 > 0.1 && est.h2 < 0.95,
            "h2 = {} too far from the simulated 0.5",
            est.h2
        );
    }

    #[test]
    fn test_case_coding_is_irrelevant() {
        // {1, 2} coding recodes to the same {0, 1} phenotype.
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let population = simulate_population(&mut rng, 1200, 200, 0.4);
        let (selected, phe) = ascertain(&population, 0.2, 60, 60);
        let rel = Relatedness::new(kinship_of(&population, &selected));
        let recoded: Vec<f64> = phe.iter().map(|v| v + 1.0).collect();

        let cfg = H2Config::new(0.2);
        let a = calc_h2(&phe, &rel, None, &cfg).unwrap();
        let b = calc_h2(&recoded, &rel, None, &cfg).unwrap();
        assert_eq!(a.raw_estimate.to_bits(), b.raw_estimate.to_bits());
    }

    #[test]
    fn test_corrected_close_to_uncorrected_without_ascertainment() {
        // Random sample: the case fraction equals the prevalence and the
        // PCs carry no case signal, so the individual probabilities stay
        // close to P and both estimators agree.
        let mut rng = ChaCha8Rng::seed_from_u64(4242);
        let n = 400;
        let population = simulate_population(&mut rng, n, 400, 0.5);
        let t = leap_core::util::math::normal_isf(0.3);
        let phe: Vec<f64> = population
            .liabilities
            .iter()
            .map(|&l| if l > t { 1.0 } else { 0.0 })
            .collect();
        let prevalence = phe.iter().sum::<f64>() / n as f64;
        let selected: Vec<usize> = (0..n).collect();
        let rel = Relatedness::with_eigen(kinship_of(&population, &selected)).unwrap();

        let cfg = H2Config::new(prevalence).with_num_remove_pcs(2);
        let corrected = calc_h2(&phe, &rel, None, &cfg).unwrap();
        assert_eq!(corrected.estimator, Estimator::BinaryCorrected);

        let mut deflated = rel.xxt.clone();
        remove_top_pcs(&mut deflated, rel.eigen.as_ref(), 2).unwrap();
        let uncorrected = estimators::binary_uncorrected(&deflated, &phe, &selected, prevalence, 1.0);

        assert!(corrected.raw_estimate.is_finite());
        assert!(
            (corrected.raw_estimate - uncorrected.slope).abs() < 0.25,
            "corrected {} vs uncorrected {}",
            corrected.raw_estimate,
            uncorrected.slope
        );
    }

    #[test]
    fn test_missing_eigen_decomposition() {
        let k = DenseMatrix::identity(4);
        let rel = Relatedness::new(k);
        let cfg = H2Config::new(0.1).with_num_remove_pcs(1);
        assert!(matches!(
            calc_h2(&vec![0.0, 1.0, 1.0, 0.0], &rel, None, &cfg),
            Err(H2Error::MissingEigenDecomposition { num_remove_pcs: 1 })
        ));
    }
}

mod continuous {
    use super::*;

    fn standardized(v: &[f64]) -> Vec<f64> {
        let n = v.len() as f64;
        let mean = v.iter().sum::<f64>() / n;
        let sd = (v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
        v.iter().map(|x| (x - mean) / sd).collect()
    }

    #[test]
    fn test_routing_by_lowtail() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let population = simulate_population(&mut rng, 150, 120, 0.6);
        let selected: Vec<usize> = (0..150).collect();
        let rel = Relatedness::new(kinship_of(&population, &selected));
        let phe = standardized(&population.liabilities);

        let one = calc_h2(&phe, &rel, None, &H2Config::new(0.2)).unwrap();
        assert_eq!(one.estimator, Estimator::ContinuousOneTail);
        assert_eq!(one.phenotype_kind, PhenotypeKind::Continuous);

        let two = calc_h2(&phe, &rel, None, &H2Config::new(0.2).with_lowtail(true)).unwrap();
        assert_eq!(two.estimator, Estimator::ContinuousTwoTail);

        for est in [one, two] {
            assert!(est.h2.is_finite() && est.h2 > 0.0);
        }
    }

    #[test]
    fn test_constant_phenotype_rejected() {
        let rel = Relatedness::new(DenseMatrix::identity(5));
        assert!(matches!(
            calc_h2(&vec![1.3; 5], &rel, None, &H2Config::new(0.1)),
            Err(H2Error::DegeneratePhenotype { distinct: 1 })
        ));
    }

    #[test]
    fn test_matrix_phenotype_must_have_one_column() {
        let rel = Relatedness::new(DenseMatrix::identity(3));
        let phe = DenseMatrix::from_row_major(3, 2, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert!(matches!(
            calc_h2(&phe, &rel, None, &H2Config::new(0.1)),
            Err(H2Error::MultiplePhenotypeColumns { ncols: 2 })
        ));

        let single = DenseMatrix::from_column(&[0.1, -0.4, 0.9]);
        assert!(calc_h2(&single, &rel, None, &H2Config::new(0.1)).is_ok());
    }
}

mod relatedness {
    use super::*;

    #[test]
    fn test_related_individuals_excluded() {
        // Individuals 0..20 plus exact duplicates of the first five.
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let population = simulate_population(&mut rng, 20, 300, 0.5);
        let mut selected: Vec<usize> = (0..20).collect();
        selected.extend(0..5);
        let k = kinship_of(&population, &selected);
        let phe: Vec<f64> = selected.iter().map(|&i| population.liabilities[i]).collect();

        let mask = unrelated_mask(&k, 0.5);
        assert_eq!(mask.n_retained(), 20);

        let rel = Relatedness::new(k);
        let est = calc_h2(&phe, &rel, Some(&mask), &H2Config::new(0.1)).unwrap();
        assert_eq!(est.n_retained, 20);
        assert_eq!(est.n_pairs, 20 * 19 / 2);

        let all = calc_h2(&phe, &rel, Some(&RetainedMask::all(25)), &H2Config::new(0.1)).unwrap();
        assert_eq!(all.n_pairs, 25 * 24 / 2);
    }
}
