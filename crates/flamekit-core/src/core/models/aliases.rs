use phf::{Map, phf_map};

/// Alternate accessor names for [`BeamState`](super::beam::BeamState), mapped to
/// their canonical names.
#[rustfmt::skip]
pub static ALIASES: Map<&'static str, &'static str> = phf_map! {
    // --- Centroids, per charge state ---
    "xcen_all" => "x0", "xpcen_all" => "xp0",
    "ycen_all" => "y0", "ypcen_all" => "yp0",
    "zcen_all" => "phi0", "phicen_all" => "phi0",
    "zpcen_all" => "dEk0", "dEkcen_all" => "dEk0",

    // --- Centroids, charge-weighted ---
    "xcen" => "x0_env", "xpcen" => "xp0_env",
    "ycen" => "y0_env", "ypcen" => "yp0_env",
    "zcen" => "phi0_env", "phicen" => "phi0_env",
    "zpcen" => "dEk0_env", "dEkcen" => "dEk0_env",

    // --- RMS envelope ---
    "xrms" => "x0_rms", "xprms" => "xp0_rms",
    "yrms" => "y0_rms", "yprms" => "yp0_rms",
    "zrms" => "phi0_rms", "phirms" => "phi0_rms",
    "zprms" => "dEk0_rms", "dEkrms" => "dEk0_rms",

    // --- Emittance ---
    "xeps" => "xemittance", "yeps" => "yemittance", "zeps" => "zemittance",
    "xeps_all" => "xemittance_all", "yeps_all" => "yemittance_all", "zeps_all" => "zemittance_all",
    "xepsn" => "xnemittance", "yepsn" => "ynemittance", "zepsn" => "znemittance",
    "xepsn_all" => "xnemittance_all", "yepsn_all" => "ynemittance_all", "zepsn_all" => "znemittance_all",

    // --- Twiss ---
    "xtwsa" => "xtwiss_alpha", "xtwsb" => "xtwiss_beta", "xtwsg" => "xtwiss_gamma",
    "ytwsa" => "ytwiss_alpha", "ytwsb" => "ytwiss_beta", "ytwsg" => "ytwiss_gamma",
    "ztwsa" => "ztwiss_alpha", "ztwsb" => "ztwiss_beta", "ztwsg" => "ztwiss_gamma",
    "xtwsa_all" => "xtwiss_alpha_all", "xtwsb_all" => "xtwiss_beta_all", "xtwsg_all" => "xtwiss_gamma_all",
    "ytwsa_all" => "ytwiss_alpha_all", "ytwsb_all" => "ytwiss_beta_all", "ytwsg_all" => "ytwiss_gamma_all",
    "ztwsa_all" => "ztwiss_alpha_all", "ztwsb_all" => "ztwiss_beta_all", "ztwsg_all" => "ztwiss_gamma_all",

    // --- Coupling terms ---
    "cxy" => "couple_xy", "cxpy" => "couple_xpy", "cxyp" => "couple_xyp", "cxpyp" => "couple_xpyp",
    "cxy_all" => "couple_xy_all", "cxpy_all" => "couple_xpy_all",
    "cxyp_all" => "couple_xyp_all", "cxpyp_all" => "couple_xpyp_all",
};

/// Resolves `name` to its canonical accessor name. Non-aliases are returned unchanged.
#[inline]
pub fn canonical_name(name: &str) -> &str {
    ALIASES.get(name).copied().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_names() {
        assert_eq!(canonical_name("xtwsb_all"), "xtwiss_beta_all");
        assert_eq!(canonical_name("cxpy"), "couple_xpy");
        assert_eq!(canonical_name("x0"), "x0");
    }

    #[test]
    fn no_alias_points_at_another_alias() {
        for target in ALIASES.values() {
            assert!(!ALIASES.contains_key(target), "'{target}' is itself an alias");
        }
    }
}
