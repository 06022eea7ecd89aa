//! Time series files written by the throughput sampler.
//!
//! One file per flow, named `<prefix>_<index>.dat`. Each line holds the
//! sampling time in seconds and the throughput, separated by a tab.

use anyhow::{Context as _, Result, anyhow};
use std::{
    fs::{self, File},
    io::{BufRead as _, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Path of the time series of flow `index`.
///
/// ```
/// # use flowsim::output::series_path;
/// # use std::path::Path;
/// assert_eq!(
///     series_path(Path::new("out"), "throughput", 2),
///     Path::new("out/throughput_2.dat")
/// );
/// ```
pub fn series_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{prefix}_{index}.dat"))
}

/// Create (or truncate) the time series files of `count` flows in `dir`,
/// creating `dir` if needed.
pub fn create_series(
    dir: &Path,
    prefix: &str,
    count: usize,
) -> Result<(Vec<PathBuf>, Vec<Option<Box<dyn Write>>>)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut paths = Vec::with_capacity(count);
    let mut streams = Vec::with_capacity(count);
    for index in 0..count {
        let path = series_path(dir, prefix, index);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let stream: Box<dyn Write> = Box::new(BufWriter::new(file));

        streams.push(Some(stream));
        paths.push(path);
    }

    Ok((paths, streams))
}

/// Read back a time series as `(time, value)` pairs.
pub fn read_series(path: &Path) -> Result<Vec<(f64, f64)>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut series = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace().map(str::parse::<f64>);
        let (Some(Ok(time)), Some(Ok(value)), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(anyhow!(
                "{}:{}: expected `<time> <value>', got `{line}'",
                path.display(),
                number + 1
            ));
        };
        series.push((time, value));
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, mut streams) = create_series(dir.path(), "tp", 2).unwrap();
        assert_eq!(paths[1], dir.path().join("tp_1.dat"));

        let stream = streams[0].as_mut().unwrap();
        writeln!(stream, "1.100000\t0.998400").unwrap();
        writeln!(stream, "1.600000\t1.015040").unwrap();
        drop(streams);

        let series = read_series(&paths[0]).unwrap();
        assert_eq!(series, vec![(1.1, 0.9984), (1.6, 1.01504)]);
        assert!(read_series(&paths[1]).unwrap().is_empty());
    }

    #[test]
    fn malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.dat");
        fs::write(&path, "1.0\t2.0\nnot a number\n").unwrap();

        let error = read_series(&path).unwrap_err();
        assert!(error.to_string().contains("bad.dat:2"));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let (paths, _) = create_series(&nested, "tp", 1).unwrap();
        assert!(paths[0].exists());
    }
}
