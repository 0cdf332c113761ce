use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::SplitAsciiWhitespace;

use tracing::info;

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::instance::Instance;

/// numbers written per line by the writer before wrapping
const WRITE_WRAP: usize = 12;

/// whitespace-separated integer cursor over an instance file
pub(crate) struct TokenReader<'a> {
    tokens: SplitAsciiWhitespace<'a>,
    path: &'a Path,
}

impl<'a> TokenReader<'a> {
    pub(crate) fn new(content: &'a str, path: &'a Path) -> Self {
        Self {
            tokens: content.split_ascii_whitespace(),
            path,
        }
    }

    /// next integer token, invalid-input on exhaustion or parse failure
    pub(crate) fn next_usize(&mut self) -> Result<usize> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| Error::InvalidInput(format!("{}: unexpected end of file", self.path.display())))?;
        token.parse::<usize>().map_err(|_| {
            Error::InvalidInput(format!("{}: invalid number {:?}", self.path.display(), token))
        })
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|io_error| Error::InvalidInput(format!("{}: {}", path.display(), io_error)))
}

/** Reads an instance in the OR-Library set covering format.

Layout: points number, subsets number, one (ignored) cost per subset, then
for every point the count of covering subsets followed by their 1-based
indices. */
pub fn read(path: &Path, name: &str) -> Result<Instance> {
    let content = read_file(path)?;
    let mut reader = TokenReader::new(&content, path);

    let points_number = reader.next_usize()?;
    if points_number == 0 {
        return Err(Error::InvalidInput(format!("{}: invalid points number", path.display())));
    }
    let subsets_number = reader.next_usize()?;
    if subsets_number == 0 {
        return Err(Error::InvalidInput(format!("{}: invalid subsets number", path.display())));
    }

    // subset costs are read and ignored: the problem is unicost
    for _ in 0..subsets_number {
        reader.next_usize()?;
    }

    let mut subsets_points = vec![Bitset::new(points_number); subsets_number];
    for i_point in 0..points_number {
        let covering_subsets = reader.next_usize()?;
        for _ in 0..covering_subsets {
            let i_subset = reader.next_usize()?;
            if i_subset == 0 || i_subset > subsets_number {
                return Err(Error::InvalidInput(format!(
                    "{}: subset index {} out of range [1, {}]",
                    path.display(),
                    i_subset,
                    subsets_number
                )));
            }
            subsets_points[i_subset - 1].set(i_point); // numbered from 1 in the file
        }
    }

    info!(
        "Read OR-Library instance {} with {} points and {} subsets from {}",
        name,
        points_number,
        subsets_number,
        path.display()
    );
    Ok(Instance::new(name, points_number, subsets_points))
}

/** Reads an instance in the OR-Library rail format.

Layout: points number, subsets number, then for every subset its (ignored)
cost, the count of points it covers and their 1-based indices. */
pub fn read_rail(path: &Path, name: &str) -> Result<Instance> {
    let content = read_file(path)?;
    let mut reader = TokenReader::new(&content, path);

    let points_number = reader.next_usize()?;
    if points_number == 0 {
        return Err(Error::InvalidInput(format!("{}: invalid points number", path.display())));
    }
    let subsets_number = reader.next_usize()?;
    if subsets_number == 0 {
        return Err(Error::InvalidInput(format!("{}: invalid subsets number", path.display())));
    }

    let mut subsets_points = vec![Bitset::new(points_number); subsets_number];
    for subset_points in subsets_points.iter_mut() {
        reader.next_usize()?; // cost, ignored
        let covered_points = reader.next_usize()?;
        for _ in 0..covered_points {
            let i_point = reader.next_usize()?;
            if i_point == 0 || i_point > points_number {
                return Err(Error::InvalidInput(format!(
                    "{}: point index {} out of range [1, {}]",
                    path.display(),
                    i_point,
                    points_number
                )));
            }
            subset_points.set(i_point - 1); // numbered from 1 in the file
        }
    }

    info!(
        "Read rail instance {} with {} points and {} subsets from {}",
        name,
        points_number,
        subsets_number,
        path.display()
    );
    Ok(Instance::new(name, points_number, subsets_points))
}

/** Writes an instance in the OR-Library format, with cost 1 for every
subset and lines soft-wrapped every twelve numbers. */
pub fn write(instance: &Instance, path: &Path) -> Result<()> {
    let mut out = String::new();
    let _ = write!(out, " {} {} \n ", instance.points_number(), instance.subsets_number());

    let mut out_counter = 0;
    for _ in 0..instance.subsets_number() {
        out.push_str("1 "); // unicost
        out_counter += 1;
        if out_counter == WRITE_WRAP {
            out.push_str("\n ");
            out_counter = 0;
        }
    }
    out.push_str("\n ");

    for i_point in 0..instance.points_number() {
        let covering_subsets: Vec<usize> = (0..instance.subsets_number())
            .filter(|&i_subset| instance.subset_points(i_subset).test(i_point))
            .map(|i_subset| i_subset + 1) // numbered from 1 in the file
            .collect();
        let _ = write!(out, "{} \n ", covering_subsets.len());
        out_counter = 0;
        for i_subset in covering_subsets {
            let _ = write!(out, "{} ", i_subset);
            out_counter += 1;
            if out_counter == WRITE_WRAP {
                out.push_str("\n ");
                out_counter = 0;
            }
        }
        if out_counter != 0 {
            out.push_str("\n ");
        }
    }

    fs::write(path, out)
        .map_err(|io_error| Error::InvalidInput(format!("{}: {}", path.display(), io_error)))?;
    info!(
        "Written instance {} to {} in the OR-Library format",
        instance.name(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "3 4\n1 1 1 1\n2 1 2\n1 3\n2 3 4\n";

    fn write_temp(content: &str, file_name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(file_name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read() {
        let path = write_temp(TINY, "uscp_orlibrary_tiny.txt");
        let instance = read(&path, "tiny").unwrap();
        assert_eq!(instance.points_number(), 3);
        assert_eq!(instance.subsets_number(), 4);
        // subset 0 covers point 0; subset 2 covers points 1 and 2
        assert_eq!(instance.subset_points(0).ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(instance.subset_points(1).ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(instance.subset_points(2).ones().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(instance.subset_points(3).ones().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_read_rejects_out_of_range_index() {
        let path = write_temp("2 2\n1 1\n1 3\n1 1\n", "uscp_orlibrary_bad.txt");
        assert!(read(&path, "bad").is_err());
    }

    #[test]
    fn test_read_rejects_truncated_file() {
        let path = write_temp("3 4\n1 1 1 1\n2 1", "uscp_orlibrary_truncated.txt");
        assert!(read(&path, "truncated").is_err());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let path = write_temp(TINY, "uscp_orlibrary_roundtrip_in.txt");
        let instance = read(&path, "roundtrip").unwrap();
        let out_path = std::env::temp_dir().join("uscp_orlibrary_roundtrip_out.txt");
        write(&instance, &out_path).unwrap();
        let reread = read(&out_path, "roundtrip").unwrap();
        assert_eq!(reread.points_number(), instance.points_number());
        assert_eq!(reread.subsets_number(), instance.subsets_number());
        for i_subset in 0..instance.subsets_number() {
            assert_eq!(reread.subset_points(i_subset), instance.subset_points(i_subset));
        }
    }

    #[test]
    fn test_read_rail() {
        // 3 points, 2 subsets given column-wise
        let path = write_temp("3 2\n1 2 1 2\n1 2 2 3\n", "uscp_rail_tiny.txt");
        let instance = read_rail(&path, "rail_tiny").unwrap();
        assert_eq!(instance.subset_points(0).ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(instance.subset_points(1).ones().collect::<Vec<_>>(), vec![1, 2]);
    }
}
