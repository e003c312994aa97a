use crate::core::optics::{Matrix7, Vector7};
use std::fmt;
use std::str::FromStr;

/// Kinematic quantities tracked both for the reference particle and per charge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KinematicField {
    Beta,
    Bg,
    Gamma,
    IonEk,
    IonEs,
    IonQ,
    IonW,
    IonZ,
    Phis,
    SampleIonK,
}

impl KinematicField {
    pub const ALL: [KinematicField; 10] = [
        KinematicField::Beta,
        KinematicField::Bg,
        KinematicField::Gamma,
        KinematicField::IonEk,
        KinematicField::IonEs,
        KinematicField::IonQ,
        KinematicField::IonW,
        KinematicField::IonZ,
        KinematicField::Phis,
        KinematicField::SampleIonK,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KinematicField::Beta => "beta",
            KinematicField::Bg => "bg",
            KinematicField::Gamma => "gamma",
            KinematicField::IonEk => "IonEk",
            KinematicField::IonEs => "IonEs",
            KinematicField::IonQ => "IonQ",
            KinematicField::IonW => "IonW",
            KinematicField::IonZ => "IonZ",
            KinematicField::Phis => "phis",
            KinematicField::SampleIonK => "SampleIonK",
        }
    }
}

impl fmt::Display for KinematicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KinematicField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KinematicField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or(())
    }
}

/// Reference-particle scalars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReferenceParticle {
    pub beta: f64,
    pub bg: f64,
    pub gamma: f64,
    /// Kinetic energy, eV/u.
    pub ion_ek: f64,
    /// Rest energy, eV/u.
    pub ion_es: f64,
    pub ion_q: f64,
    /// Total energy, eV/u.
    pub ion_w: f64,
    /// Charge-to-mass ratio.
    pub ion_z: f64,
    /// Absolute synchronous phase, rad.
    pub phis: f64,
    pub sample_ion_k: f64,
}

impl ReferenceParticle {
    pub fn get(&self, field: KinematicField) -> f64 {
        match field {
            KinematicField::Beta => self.beta,
            KinematicField::Bg => self.bg,
            KinematicField::Gamma => self.gamma,
            KinematicField::IonEk => self.ion_ek,
            KinematicField::IonEs => self.ion_es,
            KinematicField::IonQ => self.ion_q,
            KinematicField::IonW => self.ion_w,
            KinematicField::IonZ => self.ion_z,
            KinematicField::Phis => self.phis,
            KinematicField::SampleIonK => self.sample_ion_k,
        }
    }

    pub fn get_mut(&mut self, field: KinematicField) -> &mut f64 {
        match field {
            KinematicField::Beta => &mut self.beta,
            KinematicField::Bg => &mut self.bg,
            KinematicField::Gamma => &mut self.gamma,
            KinematicField::IonEk => &mut self.ion_ek,
            KinematicField::IonEs => &mut self.ion_es,
            KinematicField::IonQ => &mut self.ion_q,
            KinematicField::IonW => &mut self.ion_w,
            KinematicField::IonZ => &mut self.ion_z,
            KinematicField::Phis => &mut self.phis,
            KinematicField::SampleIonK => &mut self.sample_ion_k,
        }
    }
}

/// Per-charge-state kinematic arrays; every array has one entry per charge state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeStateData {
    pub beta: Vec<f64>,
    pub bg: Vec<f64>,
    pub gamma: Vec<f64>,
    pub ion_ek: Vec<f64>,
    pub ion_es: Vec<f64>,
    pub ion_q: Vec<f64>,
    pub ion_w: Vec<f64>,
    pub ion_z: Vec<f64>,
    pub phis: Vec<f64>,
    pub sample_ion_k: Vec<f64>,
}

impl ChargeStateData {
    pub fn zeros(count: usize) -> Self {
        let z = vec![0.0; count];
        Self {
            beta: z.clone(),
            bg: z.clone(),
            gamma: z.clone(),
            ion_ek: z.clone(),
            ion_es: z.clone(),
            ion_q: z.clone(),
            ion_w: z.clone(),
            ion_z: z.clone(),
            phis: z.clone(),
            sample_ion_k: z,
        }
    }

    pub fn get(&self, field: KinematicField) -> &[f64] {
        match field {
            KinematicField::Beta => &self.beta,
            KinematicField::Bg => &self.bg,
            KinematicField::Gamma => &self.gamma,
            KinematicField::IonEk => &self.ion_ek,
            KinematicField::IonEs => &self.ion_es,
            KinematicField::IonQ => &self.ion_q,
            KinematicField::IonW => &self.ion_w,
            KinematicField::IonZ => &self.ion_z,
            KinematicField::Phis => &self.phis,
            KinematicField::SampleIonK => &self.sample_ion_k,
        }
    }

    pub fn get_mut(&mut self, field: KinematicField) -> &mut Vec<f64> {
        match field {
            KinematicField::Beta => &mut self.beta,
            KinematicField::Bg => &mut self.bg,
            KinematicField::Gamma => &mut self.gamma,
            KinematicField::IonEk => &mut self.ion_ek,
            KinematicField::IonEs => &mut self.ion_es,
            KinematicField::IonQ => &mut self.ion_q,
            KinematicField::IonW => &mut self.ion_w,
            KinematicField::IonZ => &mut self.ion_z,
            KinematicField::Phis => &mut self.phis,
            KinematicField::SampleIonK => &mut self.sample_ion_k,
        }
    }
}

/// Raw moment-matrix state as produced by a transport engine.
///
/// This is plain owned data: cloning it never shares storage with the original.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentState {
    /// Longitudinal position, m.
    pub pos: f64,
    pub reference: ReferenceParticle,
    pub charge_states: ChargeStateData,
    /// Centroid `[x, x', y, y', phi, dEk, 1]` per charge state.
    pub moment0: Vec<Vector7>,
    /// Correlation tensor per charge state.
    pub moment1: Vec<Matrix7>,
    /// Charge-weighted centroid.
    pub moment0_env: Vector7,
    /// RMS envelope, `sqrt(diag(moment1_env))`.
    pub moment0_rms: Vector7,
    /// Charge-weighted correlation tensor.
    pub moment1_env: Matrix7,
    /// Accumulated linear map per charge state.
    pub transfer_matrix: Vec<Matrix7>,
    /// Driven phase of the last RF cavity passed, deg. Not every engine reports it.
    pub last_caviphi0: Option<f64>,
}

impl Default for MomentState {
    fn default() -> Self {
        Self::zeros(1)
    }
}

impl MomentState {
    /// An all-zero state with `count` charge states, as allocated by an engine
    /// before the first propagation step.
    pub fn zeros(count: usize) -> Self {
        Self {
            pos: 0.0,
            reference: ReferenceParticle::default(),
            charge_states: ChargeStateData::zeros(count),
            moment0: vec![Vector7::zeros(); count],
            moment1: vec![Matrix7::zeros(); count],
            moment0_env: Vector7::zeros(),
            moment0_rms: Vector7::zeros(),
            moment1_env: Matrix7::zeros(),
            transfer_matrix: vec![Matrix7::identity(); count],
            last_caviphi0: None,
        }
    }

    #[inline]
    pub fn charge_state_count(&self) -> usize {
        self.moment0.len()
    }

    /// `true` while every centroid component of every charge state (the trailing
    /// constant included) is zero, i.e. the state has never been seeded.
    pub fn is_uninitialized(&self) -> bool {
        self.moment0.iter().all(|m| m.iter().all(|v| *v == 0.0))
    }

    /// Recomputes the charge-weighted aggregates from the per-charge-state moments,
    /// weighting each charge state by its `IonQ`.
    ///
    /// The aggregate tensor includes the spread of the centroids around the
    /// weighted mean. Row and column 6 of the aggregate stay zero.
    pub fn update_envelopes(&mut self) {
        let weights = &self.charge_states.ion_q;
        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            return;
        }

        let mut env = Vector7::zeros();
        for (w, m0) in weights.iter().zip(&self.moment0) {
            env += *m0 * *w;
        }
        env /= total;

        let mut spread = Matrix7::zeros();
        for ((w, m0), m1) in weights.iter().zip(&self.moment0).zip(&self.moment1) {
            let d = m0 - env;
            spread += (m1 + d * d.transpose()) * *w;
        }
        spread /= total;
        for k in 0..7 {
            spread[(6, k)] = 0.0;
            spread[(k, 6)] = 0.0;
        }

        self.moment0_env = env;
        self.moment1_env = spread;
        self.refresh_rms();
    }

    /// Re-derives `moment0_rms` from the diagonal of `moment1_env`.
    pub fn refresh_rms(&mut self) {
        for k in 0..7 {
            self.moment0_rms[k] = self.moment1_env[(k, k)].sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_state_is_uninitialized_until_any_centroid_changes() {
        let mut state = MomentState::zeros(2);
        assert!(state.is_uninitialized());
        state.moment0[1][6] = 1.0;
        assert!(!state.is_uninitialized());
    }

    #[test]
    fn envelopes_are_charge_weighted() {
        let mut state = MomentState::zeros(2);
        state.charge_states.ion_q = vec![1.0, 3.0];
        state.moment0[0][0] = 4.0;
        state.moment0[1][0] = 0.0;
        state.moment1[0][(0, 0)] = 1.0;
        state.moment1[1][(0, 0)] = 1.0;
        state.update_envelopes();

        assert_eq!(state.moment0_env[0], 1.0);
        // 1 + (1 * 9 + 3 * 1) / 4
        assert!((state.moment1_env[(0, 0)] - 4.0).abs() < 1e-12);
        assert!((state.moment0_rms[0] - 2.0).abs() < 1e-12);
        for k in 0..6 {
            assert_eq!(state.moment0_rms[k].powi(2), state.moment1_env[(k, k)]);
        }
    }

    #[test]
    fn kinematic_fields_parse_by_name() {
        for field in KinematicField::ALL {
            assert_eq!(field.name().parse::<KinematicField>(), Ok(field));
        }
        assert!("ionek".parse::<KinematicField>().is_err());
    }
}
