//! On-disk layout of one optimization run.
//!
//! Every oracle evaluation persists its artifact under a phase-scoped,
//! monotonically indexed path so a run can be audited or resumed after
//! the fact. The phases generate the per-evaluation file names; this
//! module owns everything above them.
//!
//! ```text
//! <run root>/
//!   report.json
//!   _best_geometry.csv            final preset per channel
//!   _best_geometry                confirming render artifact
//!   geometry/
//!     bayes/iter_0000..           global-search evaluations
//!     iter_0000..                 refinement center evaluations
//!     grad/iter_0000_00..         finite-difference evaluations
//!     step/iter_0000_00..         line-search evaluations
//!     ata_iter_0000.json          singular-matrix dumps (on failure)
//! ```

use std::path::{Path, PathBuf};

/// Path conventions for one run directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn channel_dir(&self, channel: &str) -> PathBuf {
        self.root.join(channel)
    }

    /// Artifact directory for the global phase of a channel.
    pub fn global_dir(&self, channel: &str) -> PathBuf {
        self.channel_dir(channel).join("bayes")
    }

    /// Artifact directory for the refinement phase of a channel.
    pub fn refine_dir(&self, channel: &str) -> PathBuf {
        self.channel_dir(channel)
    }

    /// Final preset table for a channel.
    pub fn best_preset(&self, channel: &str) -> PathBuf {
        self.root.join(format!("_best_{channel}.csv"))
    }

    /// Confirming render of the final best vector.
    pub fn confirm_artifact(&self, channel: &str) -> PathBuf {
        self.root.join(format!("_best_{channel}"))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join("report.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_phase_scoped() {
        let layout = RunLayout::new("/runs/sample");
        assert_eq!(
            layout.global_dir("geometry"),
            PathBuf::from("/runs/sample/geometry/bayes")
        );
        assert_eq!(
            layout.refine_dir("color"),
            PathBuf::from("/runs/sample/color")
        );
        assert_eq!(
            layout.best_preset("geometry"),
            PathBuf::from("/runs/sample/_best_geometry.csv")
        );
        assert_eq!(
            layout.confirm_artifact("color"),
            PathBuf::from("/runs/sample/_best_color")
        );
        assert_eq!(
            layout.report_path(),
            PathBuf::from("/runs/sample/report.json")
        );
    }
}
