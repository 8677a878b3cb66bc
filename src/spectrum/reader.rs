use std::path::Path;

use super::{opus, Spectrum, SpectrumError};
use crate::data::model::file_name_of;

/// Load a spectrum file. OPUS files are recognised by their magic number;
/// anything else is read as whitespace- or comma-separated text.
pub fn read_spectrum(path: &Path) -> Result<Spectrum, SpectrumError> {
    let bytes = std::fs::read(path).map_err(|source| SpectrumError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = file_name_of(path);

    let spectrum = if opus::is_opus(&bytes) {
        opus::parse(&name, &bytes)?
    } else {
        parse_text(&name, &String::from_utf8_lossy(&bytes))?
    };
    log::info!(
        "Loaded spectrum {} ({} points)",
        spectrum.name,
        spectrum.y.len()
    );
    Ok(spectrum)
}

/// Text layout: one sample per line, `x y` (extra columns ignored) or a
/// single `y` column plotted against its index. Blank lines and lines
/// starting with `#` are skipped.
pub fn parse_text(name: &str, text: &str) -> Result<Spectrum, SpectrumError> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut indexed = None;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad_line = || SpectrumError::Text {
            line: line_no + 1,
            content: line.to_string(),
        };
        let columns = line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|t| !t.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| bad_line())?;

        // The first data line decides between (x, y) and index-based layout.
        let single = *indexed.get_or_insert(columns.len() == 1);
        match (single, columns.as_slice()) {
            (true, [v, ..]) => {
                x.push(y.len() as f64);
                y.push(*v);
            }
            (false, [xi, yi, ..]) => {
                x.push(*xi);
                y.push(*yi);
            }
            _ => return Err(bad_line()),
        }
    }

    if y.is_empty() {
        return Err(SpectrumError::Empty);
    }
    Ok(Spectrum {
        name: name.to_string(),
        x,
        y,
        x_label: if indexed == Some(true) {
            "Index".to_string()
        } else {
            "Wavenumber".to_string()
        },
        measured_at: None,
        header: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::opus::tests::sample_opus;

    #[test]
    fn two_column_text() {
        let sp = parse_text("a.txt", "# wn  signal\n4000.0 0.1\n4000.5, 0.2\n\n4001.0\t0.3\n").unwrap();
        assert_eq!(sp.x, vec![4000.0, 4000.5, 4001.0]);
        assert_eq!(sp.y, vec![0.1, 0.2, 0.3]);
        assert_eq!(sp.x_label, "Wavenumber");
    }

    #[test]
    fn single_column_is_plotted_against_index() {
        let sp = parse_text("b.txt", "5\n6\n7\n").unwrap();
        assert_eq!(sp.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(sp.y, vec![5.0, 6.0, 7.0]);
        assert_eq!(sp.x_label, "Index");
    }

    #[test]
    fn reports_the_offending_line() {
        let err = parse_text("c.txt", "1 2\n3 four\n").unwrap_err();
        match err {
            SpectrumError::Text { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "3 four");
            }
            other => panic!("unexpected error: {other}"),
        }
        // Layout change after the first line.
        assert!(matches!(
            parse_text("d.txt", "1 2\n3\n"),
            Err(SpectrumError::Text { line: 2, .. })
        ));
    }

    #[test]
    fn empty_file_has_no_points() {
        assert!(matches!(
            parse_text("e.txt", "# only a comment\n"),
            Err(SpectrumError::Empty)
        ));
    }

    #[test]
    fn dispatches_on_magic() {
        let dir = tempfile::tempdir().unwrap();
        let opus_path = dir.path().join("sa20190815.001");
        std::fs::write(&opus_path, sample_opus()).unwrap();
        let text_path = dir.path().join("sa20190815.txt");
        std::fs::write(&text_path, "1 2\n3 4\n").unwrap();

        let sp = read_spectrum(&opus_path).unwrap();
        assert_eq!(sp.name, "sa20190815.001");
        assert_eq!(sp.y.len(), 4);
        assert!(sp.measured_at.is_some());

        let sp = read_spectrum(&text_path).unwrap();
        assert_eq!(sp.y, vec![2.0, 4.0]);
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_spectrum(&dir.path().join("missing")),
            Err(SpectrumError::Io { .. })
        ));
    }
}
