use super::Matrix7;
use super::moments::{self, Axis, MomentError, normalized_term};

/// Target Twiss parameters for [`set_twiss`].
///
/// Every field is optional; an unset field keeps the current value of the block.
/// `beta` and `rms_size` are mutually exclusive, as are `emittance` and
/// `normalized_emittance`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TwissSpec {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub rms_size: Option<f64>,
    pub emittance: Option<f64>,
    pub normalized_emittance: Option<f64>,
}

impl TwissSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = Some(beta);
        self
    }
    pub fn rms_size(mut self, rms_size: f64) -> Self {
        self.rms_size = Some(rms_size);
        self
    }
    pub fn emittance(mut self, emittance: f64) -> Self {
        self.emittance = Some(emittance);
        self
    }
    pub fn normalized_emittance(mut self, normalized_emittance: f64) -> Self {
        self.normalized_emittance = Some(normalized_emittance);
        self
    }

    fn validate(&self) -> Result<(), MomentError> {
        if self.beta.is_some() && self.rms_size.is_some() {
            return Err(MomentError::ConflictingInputs {
                first: "beta",
                second: "rms_size",
            });
        }
        if self.emittance.is_some() && self.normalized_emittance.is_some() {
            return Err(MomentError::ConflictingInputs {
                first: "emittance",
                second: "normalized_emittance",
            });
        }
        Ok(())
    }
}

/// Rebuilds the 2×2 block of `axis` in `tensor` from Twiss parameters.
///
/// The normalized coupling terms between this axis and the two other axes are
/// captured before the block is overwritten and re-applied against the new
/// diagonal afterwards, so `coupling(..)` readings across axes are unchanged.
///
/// # Arguments
///
/// * `axis` - The phase-space axis to rebuild.
/// * `spec` - Target parameters; unset fields keep their current values.
/// * `tensor` - The correlation tensor of one charge state, edited in place.
/// * `ref_bg` - Reference `beta*gamma`, used to convert a normalized emittance.
///
/// # Errors
///
/// Returns [`MomentError::ConflictingInputs`] when mutually exclusive inputs are
/// both supplied. The tensor is left untouched in that case.
pub fn set_twiss(
    axis: Axis,
    spec: &TwissSpec,
    tensor: &mut Matrix7,
    ref_bg: f64,
) -> Result<(), MomentError> {
    spec.validate()?;

    let eps = match (spec.emittance, spec.normalized_emittance) {
        (Some(eps), _) => eps,
        (None, Some(neps)) => neps / ref_bg,
        (None, None) => moments::emittance(axis, tensor),
    };
    let beta = match (spec.beta, spec.rms_size) {
        (Some(beta), _) => beta,
        (None, Some(rms)) => rms * rms / eps,
        (None, None) => moments::twiss_beta(axis, tensor),
    };
    let alpha = spec
        .alpha
        .unwrap_or_else(|| moments::twiss_alpha(axis, tensor));

    let a = axis.index();
    let own = [a, a + 1];

    // Ratios are normalized by the diagonal, which is about to change.
    let mut captured = Vec::with_capacity(8);
    for other in axis.others() {
        let o = other.index();
        for &i in &own {
            for j in [o, o + 1] {
                captured.push((i, j, normalized_term(tensor, i, j)));
            }
        }
    }

    let (k1, k2) = axis.block_scales();
    tensor[(a, a)] = beta * eps;
    tensor[(a, a + 1)] = -alpha * eps * k1;
    tensor[(a + 1, a)] = tensor[(a, a + 1)];
    tensor[(a + 1, a + 1)] = (1.0 + alpha * alpha) / beta * eps * k2;

    for (i, j, ratio) in captured {
        let value = ratio * (tensor[(i, i)] * tensor[(j, j)]).sqrt();
        tensor[(i, j)] = value;
        tensor[(j, i)] = value;
    }

    Ok(())
}
