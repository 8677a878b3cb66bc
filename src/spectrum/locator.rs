use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

// ---------------------------------------------------------------------------
// Spectrum index – every file beneath the spectra root
// ---------------------------------------------------------------------------

/// Result of a spectrum lookup. A miss is routine, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(PathBuf),
    Miss,
}

/// File-name and timestamp index of a spectra folder, built once.
#[derive(Debug, Clone)]
pub struct SpectrumIndex {
    root: Option<PathBuf>,
    by_name: HashMap<String, PathBuf>,
    /// Files whose name encodes date and time, sorted by time.
    by_time: Vec<(NaiveDateTime, PathBuf)>,
    tolerance: TimeDelta,
}

impl SpectrumIndex {
    /// An index with no files; every lookup misses.
    pub fn empty(tolerance: TimeDelta) -> Self {
        Self {
            root: None,
            by_name: HashMap::new(),
            by_time: Vec::new(),
            tolerance,
        }
    }

    /// Walk `root` recursively. Unreadable directories are logged and skipped.
    pub fn build(root: &Path, tolerance: TimeDelta) -> Self {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Cannot list {}: {e}", dir.display());
                    continue;
                }
            };
            let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
            paths.sort();
            let mut subdirs = Vec::new();
            for path in paths {
                // `is_dir` follows symlinks; symlinked directories are skipped
                // to avoid cycles.
                let is_link = path.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink());
                if path.is_dir() {
                    if !is_link {
                        subdirs.push(path);
                    }
                } else if path.is_file() {
                    files.push(path);
                }
            }
            // Reversed so the stack pops subdirectories in sorted order.
            pending.extend(subdirs.into_iter().rev());
        }

        let mut index = Self::from_paths(files, tolerance);
        index.root = Some(root.to_path_buf());
        log::info!(
            "Indexed {} spectra under {} ({} with timestamps)",
            index.by_name.len(),
            root.display(),
            index.by_time.len()
        );
        index
    }

    /// Index an explicit list of files. The first path wins on duplicate names.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>, tolerance: TimeDelta) -> Self {
        let mut by_name: HashMap<String, PathBuf> = HashMap::new();
        let mut by_time = Vec::new();

        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if let Some(t) = timestamp_from_file_name(&name) {
                by_time.push((t, path.clone()));
            }
            if let Some(previous) = by_name.get(&name) {
                log::debug!("Duplicate spectrum name {name}: keeping {}", previous.display());
                continue;
            }
            by_name.insert(name, path);
        }
        by_time.sort();

        Self {
            root: None,
            by_name,
            by_time,
            tolerance,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Find the spectrum for a data point.
    ///
    /// A row that names its spectrum only matches a file of that name.
    /// Unnamed rows get the file whose name-encoded timestamp is nearest to
    /// `at`, provided it lies within the tolerance; equidistant candidates
    /// resolve to the earlier one.
    pub fn locate(&self, name: Option<&str>, at: NaiveDateTime) -> Lookup {
        if let Some(name) = name {
            return match self.by_name.get(name) {
                Some(path) => Lookup::Found(path.clone()),
                None => Lookup::Miss,
            };
        }

        let split = self.by_time.partition_point(|(t, _)| *t < at);
        let before = split.checked_sub(1).and_then(|i| self.by_time.get(i));
        let after = self.by_time.get(split);

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if a.0 - at < at - b.0 {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (b, a) => b.or(a),
        };

        match best {
            Some((t, path)) if (*t - at).abs() <= self.tolerance => Lookup::Found(path.clone()),
            _ => Lookup::Miss,
        }
    }
}

// ---------------------------------------------------------------------------
// File-name convention
// ---------------------------------------------------------------------------

/// Extract `YYYYMMDD` followed by an optional separator (`_`, `-`, `T`, `.`)
/// and `HHMMSS` from a file name, e.g. `sa_20190815_101530.spc`.
///
/// Names carrying only a date (such as TCCON's `br20190815saaaaa.043`)
/// return `None`: they cannot be correlated by time.
pub fn timestamp_from_file_name(name: &str) -> Option<NaiveDateTime> {
    let bytes = name.as_bytes();
    let digits_at = |start: usize, n: usize| -> Option<u32> {
        let run = bytes.get(start..start + n)?;
        if run.iter().all(u8::is_ascii_digit) {
            std::str::from_utf8(run).ok()?.parse().ok()
        } else {
            None
        }
    };

    for start in 0..bytes.len() {
        if start > 0 && bytes[start - 1].is_ascii_digit() {
            continue;
        }
        let Some(ymd) = digits_at(start, 8) else {
            continue;
        };
        let Some(date) = NaiveDate::from_ymd_opt((ymd / 10_000) as i32, ymd / 100 % 100, ymd % 100)
        else {
            continue;
        };

        let mut t = start + 8;
        if matches!(bytes.get(t), Some(b'_' | b'-' | b'T' | b'.')) {
            t += 1;
        }
        let time = digits_at(t, 6)
            .filter(|_| !bytes.get(t + 6).is_some_and(u8::is_ascii_digit))
            .and_then(|hms| NaiveTime::from_hms_opt(hms / 10_000, hms / 100 % 100, hms % 100));
        if let Some(time) = time {
            return Some(date.and_time(time));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::ts;

    fn tolerance() -> TimeDelta {
        TimeDelta::seconds(120)
    }

    fn index() -> SpectrumIndex {
        SpectrumIndex::from_paths(
            [
                "/spc/2019/br20190815saaaaa.043",
                "/spc/a/sa_20190815_101500.spc",
                "/spc/a/sa_20190815_103000.spc",
                "/spc/b/sa_20190815_103000.spc",
                "/spc/a/sa20190816T080000.spc",
            ]
            .map(PathBuf::from),
            tolerance(),
        )
    }

    #[test]
    fn parses_file_name_timestamps() {
        assert_eq!(
            timestamp_from_file_name("sa_20190815_101530.spc"),
            Some(ts("2019-08-15 10:15:30"))
        );
        assert_eq!(
            timestamp_from_file_name("20190815101530"),
            Some(ts("2019-08-15 10:15:30"))
        );
        assert_eq!(
            timestamp_from_file_name("x20200229-235959.dat"),
            Some(ts("2020-02-29 23:59:59"))
        );
        assert_eq!(timestamp_from_file_name("br20190815saaaaa.043"), None);
        assert_eq!(timestamp_from_file_name("id_20191345_101530"), None);
        assert_eq!(timestamp_from_file_name("sa_20190815_1015301"), None);
    }

    #[test]
    fn exact_name_wins() {
        let idx = index();
        assert_eq!(
            idx.locate(Some("br20190815saaaaa.043"), ts("2000-01-01 00:00:00")),
            Lookup::Found(PathBuf::from("/spc/2019/br20190815saaaaa.043"))
        );
    }

    #[test]
    fn duplicate_names_keep_the_first_path() {
        let idx = index();
        assert_eq!(idx.len(), 4);
        assert_eq!(
            idx.locate(Some("sa_20190815_103000.spc"), ts("2000-01-01 00:00:00")),
            Lookup::Found(PathBuf::from("/spc/a/sa_20190815_103000.spc"))
        );
    }

    #[test]
    fn nearest_timestamp_within_tolerance() {
        let idx = index();
        assert_eq!(
            idx.locate(None, ts("2019-08-15 10:16:10")),
            Lookup::Found(PathBuf::from("/spc/a/sa_20190815_101500.spc"))
        );
        assert_eq!(
            idx.locate(None, ts("2019-08-16 07:58:30")),
            Lookup::Found(PathBuf::from("/spc/a/sa20190816T080000.spc"))
        );
    }

    #[test]
    fn named_row_never_falls_back_to_time() {
        // A simultaneous file from the other detector must not stand in.
        let idx = SpectrumIndex::from_paths([PathBuf::from("/s/sb_20190815_101500_b.spc")], tolerance());
        assert_eq!(
            idx.locate(Some("sa_20190815_101500_a.spc"), ts("2019-08-15 10:15:00")),
            Lookup::Miss
        );
        assert_eq!(
            idx.locate(None, ts("2019-08-15 10:15:00")),
            Lookup::Found(PathBuf::from("/s/sb_20190815_101500_b.spc"))
        );
    }

    #[test]
    fn equidistant_candidates_resolve_to_earlier() {
        let idx = SpectrumIndex::from_paths(
            ["/s/a_20190815_100000", "/s/b_20190815_100200"].map(PathBuf::from),
            tolerance(),
        );
        assert_eq!(
            idx.locate(None, ts("2019-08-15 10:01:00")),
            Lookup::Found(PathBuf::from("/s/a_20190815_100000"))
        );
    }

    #[test]
    fn outside_tolerance_is_a_miss() {
        let idx = index();
        assert_eq!(idx.locate(None, ts("2019-08-15 10:22:30")), Lookup::Miss);
        assert_eq!(idx.locate(None, ts("1999-01-01 00:00:00")), Lookup::Miss);
        assert_eq!(
            SpectrumIndex::empty(tolerance()).locate(Some("x"), ts("2019-08-15 10:15:00")),
            Lookup::Miss
        );
    }

    #[test]
    fn builds_from_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2019").join("08");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("sa_20190815_101500.spc"), b"").unwrap();
        std::fs::write(nested.join("br20190815saaaaa.043"), b"").unwrap();

        let idx = SpectrumIndex::build(dir.path(), tolerance());
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.root(), Some(dir.path()));
        assert_eq!(
            idx.locate(Some("br20190815saaaaa.043"), ts("2019-08-15 00:00:00")),
            Lookup::Found(nested.join("br20190815saaaaa.043"))
        );
    }

    #[test]
    fn duplicate_names_resolve_in_sorted_walk_order() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("dup.001"), b"").unwrap();
        }
        let idx = SpectrumIndex::build(dir.path(), tolerance());
        assert_eq!(
            idx.locate(Some("dup.001"), ts("2019-08-15 00:00:00")),
            Lookup::Found(dir.path().join("a").join("dup.001"))
        );
    }

    #[test]
    fn missing_root_yields_empty_index() {
        let idx = SpectrumIndex::build(Path::new("/no/such/spectra/root"), tolerance());
        assert!(idx.is_empty());
        assert_eq!(idx.locate(None, ts("2019-08-15 10:15:00")), Lookup::Miss);
    }
}
