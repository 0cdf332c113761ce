use std::path::Path;

use tracing::info;

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::orlibrary::{read_file, TokenReader};

/** Reads an instance derived from a Steiner triple system.

Layout: subsets number, points number, then exactly three 1-based subset
indices per point. */
pub fn read(path: &Path, name: &str) -> Result<Instance> {
    let content = read_file(path)?;
    let mut reader = TokenReader::new(&content, path);

    let subsets_number = reader.next_usize()?;
    if subsets_number == 0 {
        return Err(Error::InvalidInput(format!("{}: invalid subsets number", path.display())));
    }
    let points_number = reader.next_usize()?;
    if points_number == 0 {
        return Err(Error::InvalidInput(format!("{}: invalid points number", path.display())));
    }

    let mut subsets_points = vec![Bitset::new(points_number); subsets_number];
    for i_point in 0..points_number {
        for _ in 0..3 {
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
        "Read STS instance {} with {} points and {} subsets from {}",
        name,
        points_number,
        subsets_number,
        path.display()
    );
    Ok(Instance::new(name, points_number, subsets_points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let path = std::env::temp_dir().join("uscp_sts_tiny.txt");
        std::fs::write(&path, "4 2\n1 2 3\n2 3 4\n").unwrap();
        let instance = read(&path, "sts_tiny").unwrap();
        assert_eq!(instance.points_number(), 2);
        assert_eq!(instance.subsets_number(), 4);
        assert_eq!(instance.subset_points(0).ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(instance.subset_points(1).ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(instance.subset_points(2).ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(instance.subset_points(3).ones().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_read_rejects_missing_triple() {
        let path = std::env::temp_dir().join("uscp_sts_truncated.txt");
        std::fs::write(&path, "4 2\n1 2 3\n2 3\n").unwrap();
        assert!(read(&path, "sts_truncated").is_err());
    }
}
