use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use meteofinder_core::decision::{Mode, Verdict};
use meteofinder_core::io::is_supported_image;
use meteofinder_core::report::RunReport;
use tracing::debug;

/// Name of the folder accepted images are copied into.
pub const FOUND_FOLDER: &str = "Found";

/// Name of the folder local candidates are staged in for later verification.
pub const CANDIDATES_FOLDER: &str = "Candidates";

/// Where a run's accepted images end up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyTarget {
    Found,
    Candidates,
}

impl CopyTarget {
    pub fn folder_name(self) -> &'static str {
        match self {
            Self::Found => FOUND_FOLDER,
            Self::Candidates => CANDIDATES_FOLDER,
        }
    }

    /// Copy target of a scan. Prefilter-only runs copy nothing.
    pub fn for_scan(mode: Mode, candidates_only: bool) -> Option<Self> {
        match (mode, candidates_only) {
            (Mode::PrefilterOnly, _) => None,
            (_, true) => Some(Self::Candidates),
            (_, false) => Some(Self::Found),
        }
    }
}

/// Images of `report` that belong in `target`.
///
/// Candidate staging takes every local acceptance. `Found/` takes every
/// accepted image, unless `verified_only` limits it to remote confirmations.
pub fn images_to_copy(report: &RunReport, target: CopyTarget, verified_only: bool) -> Vec<PathBuf> {
    report
        .accepted_set()
        .into_iter()
        .filter(|a| match target {
            CopyTarget::Found if verified_only => a.verdict == Verdict::AcceptedRemote,
            _ => true,
        })
        .map(|a| a.path)
        .collect()
}

/// Supported images directly inside `folder`, sorted by path.
///
/// The listing is not recursive, so `Found/`, `Candidates/` and any other
/// sub-folder never feed back into a scan.
pub fn find_images(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        bail!("Not a directory: {}", folder.display());
    }

    let mut images = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("Failed to list {}", folder.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Images staged in `<folder>/Candidates`.
pub fn find_candidates(folder: &Path) -> Result<Vec<PathBuf>> {
    let staged = folder.join(CANDIDATES_FOLDER);
    if !staged.is_dir() {
        bail!(
            "No {CANDIDATES_FOLDER} folder in {}. Run `meteofinder scan --candidates-only` first.",
            folder.display()
        );
    }
    find_images(&staged)
}

/// Copy `images` into `<folder>/<target>`, leaving files that already exist
/// there. Returns how many files were copied.
pub fn copy_into(folder: &Path, target: CopyTarget, images: &[PathBuf]) -> Result<usize> {
    let dest_dir = folder.join(target.folder_name());
    std::fs::create_dir_all(&dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let mut copied = 0;
    for image in images {
        let Some(name) = image.file_name() else {
            continue;
        };
        let dest = dest_dir.join(name);
        if dest.exists() {
            debug!(path = %dest.display(), "Already there, not copied");
            continue;
        }
        std::fs::copy(image, &dest)
            .with_context(|| format!("Failed to copy {} to {}", image.display(), dest.display()))?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteofinder_core::report::{ImageVerdict, ResultAggregator};
    use meteofinder_core::scoring::SensitivityLevel;
    use meteofinder_core::verify::RunBudget;

    fn report(verdicts: &[(&str, Verdict)]) -> RunReport {
        let mut aggregator = ResultAggregator::new();
        for (i, (name, verdict)) in verdicts.iter().enumerate() {
            aggregator.push(ImageVerdict::new(i, PathBuf::from(name), *verdict));
        }
        aggregator.finish(
            Mode::Hybrid,
            SensitivityLevel::default(),
            RunBudget::new(None, 0.0),
            false,
        )
    }

    #[test]
    fn test_find_images_skips_subfolders_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.JPG"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        for sub in [FOUND_FOLDER, CANDIDATES_FOLDER] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("c.jpg"), b"x").unwrap();
        }

        let images = find_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG"]);
    }

    #[test]
    fn test_find_candidates_needs_the_staging_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_candidates(dir.path()).is_err());

        std::fs::create_dir(dir.path().join(CANDIDATES_FOLDER)).unwrap();
        std::fs::write(dir.path().join(CANDIDATES_FOLDER).join("m.jpg"), b"x").unwrap();
        let staged = find_candidates(dir.path()).unwrap();
        assert_eq!(staged, vec![dir.path().join(CANDIDATES_FOLDER).join("m.jpg")]);
    }

    #[test]
    fn test_copy_target_for_scan() {
        assert_eq!(CopyTarget::for_scan(Mode::Hybrid, false), Some(CopyTarget::Found));
        assert_eq!(CopyTarget::for_scan(Mode::LocalOnly, false), Some(CopyTarget::Found));
        assert_eq!(CopyTarget::for_scan(Mode::LocalOnly, true), Some(CopyTarget::Candidates));
        assert_eq!(CopyTarget::for_scan(Mode::PrefilterOnly, false), None);
        assert_eq!(CopyTarget::for_scan(Mode::PrefilterOnly, true), None);
        assert_eq!(CopyTarget::Candidates.folder_name(), "Candidates");
    }

    #[test]
    fn test_verified_only_keeps_remote_confirmations() {
        let r = report(&[
            ("a.jpg", Verdict::AcceptedRemote),
            ("b.jpg", Verdict::AcceptedLocal),
            ("c.jpg", Verdict::Rejected),
            ("d.jpg", Verdict::EscalationFailed),
        ]);
        assert_eq!(
            images_to_copy(&r, CopyTarget::Found, true),
            vec![PathBuf::from("a.jpg")]
        );
        assert_eq!(
            images_to_copy(&r, CopyTarget::Found, false),
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]
        );
        assert_eq!(
            images_to_copy(&r, CopyTarget::Candidates, true),
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]
        );
    }

    #[test]
    fn test_copy_into_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"new").unwrap();
        std::fs::write(&b, b"new").unwrap();
        std::fs::create_dir(dir.path().join(FOUND_FOLDER)).unwrap();
        std::fs::write(dir.path().join(FOUND_FOLDER).join("a.jpg"), b"old").unwrap();

        let copied = copy_into(dir.path(), CopyTarget::Found, &[a, b]).unwrap();
        assert_eq!(copied, 1);
        let kept = std::fs::read(dir.path().join(FOUND_FOLDER).join("a.jpg")).unwrap();
        assert_eq!(kept, b"old");
    }

    #[test]
    fn test_copy_into_candidates_creates_the_folder() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        std::fs::write(&a, b"x").unwrap();

        assert_eq!(copy_into(dir.path(), CopyTarget::Candidates, &[a]).unwrap(), 1);
        assert!(dir.path().join(CANDIDATES_FOLDER).join("a.jpg").is_file());
        assert!(!dir.path().join(FOUND_FOLDER).exists());
    }
}
