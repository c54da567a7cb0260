//! Configuration types and defaults for tooltip composition

use serde::{Deserialize, Serialize};

/// Default item count at which a track switches to brief miners
pub const DEFAULT_BRIEF_LEN: usize = 4;

/// Tooltip composition policy
///
/// Accepted from JS as a plain object with camelCase keys; missing keys take
/// the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TipConfig {
    /// Item count at or above which brief miners are used. Default: 4.
    /// Objects may override this with their own `briefLen`.
    pub brief_len: usize,
    /// Populations needed before a multi-allelic variant gets a gravity plot. Default: 10
    pub gravity_min_populations: usize,
    /// Populations needed for a bi-allelic variant. Default: 5
    pub gravity_min_populations_biallelic: usize,
    /// Gravity plot canvas width in pixels. Default: 400
    pub plot_width: u32,
    /// Separator placed between miner fragments. Default: `<br />`
    pub separator: String,
}

impl Default for TipConfig {
    fn default() -> Self {
        Self {
            brief_len: DEFAULT_BRIEF_LEN,
            gravity_min_populations: 10,
            gravity_min_populations_biallelic: 5,
            plot_width: 400,
            separator: "<br />".to_string(),
        }
    }
}

impl TipConfig {
    /// Brief threshold for an object, honoring its own override
    pub fn brief_len_for(&self, object_override: Option<usize>) -> usize {
        match object_override {
            Some(n) if n > 0 => n,
            _ => self.brief_len,
        }
    }

    /// Whether a variant with `alleles` alleles seen in `populations`
    /// populations warrants a gravity plot
    pub fn wants_gravity_plot(&self, alleles: usize, populations: usize) -> bool {
        alleles > 1
            && (populations >= self.gravity_min_populations
                || (alleles == 2 && populations >= self.gravity_min_populations_biallelic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TipConfig::default();
        assert_eq!(config.brief_len, 4);
        assert_eq!(config.separator, "<br />");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: TipConfig = serde_json::from_str(r#"{"briefLen": 7}"#).unwrap();
        assert_eq!(config.brief_len, 7);
        assert_eq!(config.gravity_min_populations, 10);
        assert_eq!(config.plot_width, 400);
    }

    #[test]
    fn test_object_override() {
        let config = TipConfig::default();
        assert_eq!(config.brief_len_for(Some(2)), 2);
        assert_eq!(config.brief_len_for(Some(0)), 4);
        assert_eq!(config.brief_len_for(None), 4);
    }

    #[test]
    fn test_gravity_thresholds() {
        let config = TipConfig::default();
        assert!(!config.wants_gravity_plot(1, 50));
        assert!(config.wants_gravity_plot(2, 5));
        assert!(!config.wants_gravity_plot(3, 5));
        assert!(config.wants_gravity_plot(3, 10));
    }
}
