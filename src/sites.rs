/// Site registry for the California regional wind model.
///
/// Defines the canonical list of NREL measurement sites feeding the model,
/// with the installed wind capacity at each site today and in the deep
/// (33%) renewable integration scenario. This is the single source of truth
/// for site names; configuration refers to sites by these names.

// ---------------------------------------------------------------------------
// Measurement constants
// ---------------------------------------------------------------------------

/// Installed capacity represented by one NREL measurement point, in MW.
pub const CAPACITY_PER_MEASUREMENT_MW: f64 = 30.0;

/// Scenario name for today's installed capacity.
pub const SCENARIO_NOW: &str = "now";

/// Scenario name for the deep integration build-out.
pub const SCENARIO_DEEP: &str = "deep";

// ---------------------------------------------------------------------------
// Site metadata
// ---------------------------------------------------------------------------

/// Metadata for a single wind measurement site.
pub struct Site {
    /// Short identifier used in config and logs.
    pub name: &'static str,
    /// Human-readable region name.
    pub region: &'static str,
    /// Measurement file, relative to the configured data directory.
    pub file: &'static str,
    /// Installed capacity today, in MW.
    pub now_mw: f64,
    /// Installed capacity in the deep integration scenario, in MW.
    pub deep_mw: f64,
}

impl Site {
    /// Target capacity for a named scenario. Unknown scenarios return `None`.
    pub fn capacity_for(&self, scenario: &str) -> Option<f64> {
        match scenario {
            SCENARIO_NOW => Some(self.now_mw),
            SCENARIO_DEEP => Some(self.deep_mw),
            _ => None,
        }
    }
}

/// All California wind regions with NREL measurement traces.
pub static SITE_REGISTRY: &[Site] = &[
    Site {
        name: "tehachapi",
        region: "Tehachapi Pass",
        file: "tehachapi.csv",
        now_mw: 722.0,
        deep_mw: 6459.0,
    },
    Site {
        name: "clark",
        region: "Clark County",
        file: "clark.csv",
        now_mw: 0.0,
        deep_mw: 1500.0,
    },
    Site {
        name: "solano",
        region: "Solano County",
        file: "solano.csv",
        now_mw: 327.0,
        deep_mw: 583.45,
    },
    Site {
        name: "san_gorgonio",
        region: "San Gorgonio Pass",
        file: "san gorgonio.csv",
        now_mw: 624.0,
        deep_mw: 528.0,
    },
    Site {
        name: "san_diego",
        region: "San Diego County",
        file: "san diego.csv",
        now_mw: 0.0,
        deep_mw: 1527.0,
    },
    Site {
        name: "humboldt",
        region: "Humboldt County",
        file: "humboldt.csv",
        now_mw: 0.0,
        deep_mw: 218.2,
    },
    Site {
        name: "imperial",
        region: "Imperial County",
        file: "imperial.csv",
        now_mw: 0.0,
        deep_mw: 547.9,
    },
    Site {
        name: "altamont",
        region: "Altamont Pass",
        file: "altamont.csv",
        now_mw: 954.0,
        deep_mw: 14.0,
    },
    Site {
        name: "monterey",
        region: "Monterey County",
        file: "monterey.csv",
        now_mw: 118.0,
        deep_mw: 0.0,
    },
    Site {
        name: "pacheco",
        region: "Pacheco Pass",
        file: "pacheco.csv",
        now_mw: 21.0,
        deep_mw: 0.0,
    },
];

/// Returns the names of all registered sites.
pub fn all_site_names() -> Vec<&'static str> {
    SITE_REGISTRY.iter().map(|s| s.name).collect()
}

/// Looks up a site by name. Returns `None` if not found.
pub fn find_site(name: &str) -> Option<&'static Site> {
    SITE_REGISTRY.iter().find(|s| s.name == name)
}

/// Total installed capacity across all sites for a scenario, in MW.
pub fn total_capacity(scenario: &str) -> Option<f64> {
    SITE_REGISTRY
        .iter()
        .map(|s| s.capacity_for(scenario))
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_names_are_unique() {
        let mut names = all_site_names();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SITE_REGISTRY.len(), "duplicate site name in registry");
    }

    #[test]
    fn test_scenario_totals_match_published_capacity() {
        let now = total_capacity(SCENARIO_NOW).unwrap();
        let deep = total_capacity(SCENARIO_DEEP).unwrap();
        assert!((now - 2766.0).abs() < 1e-9, "now total was {}", now);
        assert!((deep - 11377.55).abs() < 1e-6, "deep total was {}", deep);
    }

    #[test]
    fn test_capacities_are_non_negative() {
        for site in SITE_REGISTRY {
            assert!(site.now_mw >= 0.0, "{} has negative now capacity", site.name);
            assert!(site.deep_mw >= 0.0, "{} has negative deep capacity", site.name);
        }
    }

    #[test]
    fn test_unknown_scenario_and_site() {
        assert!(find_site("tehachapi").is_some());
        assert!(find_site("mojave").is_none());
        assert_eq!(total_capacity("offshore"), None);
    }
}
