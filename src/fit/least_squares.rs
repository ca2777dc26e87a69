// Closed-form default implementation of the Fitter trait
//
// Linear fit: ordinary least squares with standard parameter errors from
// the residual variance. Gaussian fit: moment estimates over the restricted
// histogram window, with the usual standard errors for a Gaussian sample
// (mean_err = sigma/sqrt(n), sigma_err = sigma/sqrt(2n)). Both satisfy the
// Fitter contract without pulling in an iterative minimizer.

use crate::error::FitError;
use crate::fit::{Fitter, GaussianFit, LinearFit};

/// Default closed-form fitter
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresFitter;

impl LeastSquaresFitter {
    pub fn new() -> Self {
        Self
    }
}

impl Fitter for LeastSquaresFitter {
    fn fit_gaussian(&self, hist: &[u32], lo: usize, hi: usize) -> Result<GaussianFit, FitError> {
        let hi = hi.min(hist.len().saturating_sub(1));
        if lo > hi {
            return Err(FitError::EmptyHistogram);
        }

        let mut n = 0.0;
        let mut sum = 0.0;
        for (bin, &count) in hist.iter().enumerate().take(hi + 1).skip(lo) {
            let w = f64::from(count);
            n += w;
            sum += w * bin as f64;
        }
        if n == 0.0 {
            return Err(FitError::EmptyHistogram);
        }

        let mean = sum / n;
        let mut m2 = 0.0;
        for (bin, &count) in hist.iter().enumerate().take(hi + 1).skip(lo) {
            let d = bin as f64 - mean;
            m2 += f64::from(count) * d * d;
        }
        let sigma = (m2 / n).sqrt();

        Ok(GaussianFit {
            mean,
            sigma,
            mean_err: sigma / n.sqrt(),
            sigma_err: sigma / (2.0 * n).sqrt(),
        })
    }

    fn fit_linear(&self, points: &[(f64, f64)]) -> Result<LinearFit, FitError> {
        let n = points.len();
        if n < 2 {
            return Err(FitError::InsufficientPoints {
                required: 2,
                collected: n,
            });
        }
        let nf = n as f64;

        let x_mean = points.iter().map(|p| p.0).sum::<f64>() / nf;
        let y_mean = points.iter().map(|p| p.1).sum::<f64>() / nf;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for &(x, y) in points {
            sxx += (x - x_mean) * (x - x_mean);
            sxy += (x - x_mean) * (y - y_mean);
        }
        if sxx == 0.0 {
            return Err(FitError::Degenerate {
                reason: "all abscissa values equal".to_string(),
            });
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        // Residual variance; exactly determined with two points
        let s2 = if n > 2 {
            points
                .iter()
                .map(|&(x, y)| {
                    let r = y - (intercept + slope * x);
                    r * r
                })
                .sum::<f64>()
                / (nf - 2.0)
        } else {
            0.0
        };

        Ok(LinearFit {
            slope,
            intercept,
            slope_err: (s2 / sxx).sqrt(),
            intercept_err: (s2 * (1.0 / nf + x_mean * x_mean / sxx)).sqrt(),
        })
    }
}
