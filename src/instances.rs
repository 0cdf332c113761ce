use std::path::Path;

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::{orlibrary, sts};

/// on-disk text format of a registered instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceFormat {
    /// OR-Library set covering format
    OrLibrary,
    /// OR-Library rail format (column-wise)
    OrLibraryRail,
    /// Steiner triple system format
    Sts,
}

impl InstanceFormat {
    /// format name as accepted by `--instance_type`
    pub fn name(self) -> &'static str {
        match self {
            InstanceFormat::OrLibrary => "orlibrary",
            InstanceFormat::OrLibraryRail => "orlibrary_rail",
            InstanceFormat::Sts => "sts",
        }
    }

    /// parses an `--instance_type` value
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "orlibrary" => Some(InstanceFormat::OrLibrary),
            "orlibrary_rail" => Some(InstanceFormat::OrLibraryRail),
            "sts" => Some(InstanceFormat::Sts),
            _ => None,
        }
    }
}

/// a known benchmark instance: registry name, format and resource path
#[derive(Debug, Clone, Copy)]
pub struct InstanceInfo {
    /// registry name, as given to `--instances`
    pub name: &'static str,
    /// text format of the file
    pub format: InstanceFormat,
    /// path relative to the working directory
    pub file: &'static str,
}

const fn orlib(name: &'static str, file: &'static str) -> InstanceInfo {
    InstanceInfo {
        name,
        format: InstanceFormat::OrLibrary,
        file,
    }
}

const fn rail(name: &'static str, file: &'static str) -> InstanceInfo {
    InstanceInfo {
        name,
        format: InstanceFormat::OrLibraryRail,
        file,
    }
}

const fn steiner(name: &'static str, file: &'static str) -> InstanceInfo {
    InstanceInfo {
        name,
        format: InstanceFormat::Sts,
        file,
    }
}

/// every instance known to the registry
pub const INSTANCES: &[InstanceInfo] = &[
    orlib("4.1", "resources/OR-Library/scp41.txt"),
    orlib("4.2", "resources/OR-Library/scp42.txt"),
    orlib("4.3", "resources/OR-Library/scp43.txt"),
    orlib("4.4", "resources/OR-Library/scp44.txt"),
    orlib("4.5", "resources/OR-Library/scp45.txt"),
    orlib("4.6", "resources/OR-Library/scp46.txt"),
    orlib("4.7", "resources/OR-Library/scp47.txt"),
    orlib("4.8", "resources/OR-Library/scp48.txt"),
    orlib("4.9", "resources/OR-Library/scp49.txt"),
    orlib("4.10", "resources/OR-Library/scp410.txt"),
    orlib("5.1", "resources/OR-Library/scp51.txt"),
    orlib("5.2", "resources/OR-Library/scp52.txt"),
    orlib("5.3", "resources/OR-Library/scp53.txt"),
    orlib("5.4", "resources/OR-Library/scp54.txt"),
    orlib("5.5", "resources/OR-Library/scp55.txt"),
    orlib("5.6", "resources/OR-Library/scp56.txt"),
    orlib("5.7", "resources/OR-Library/scp57.txt"),
    orlib("5.8", "resources/OR-Library/scp58.txt"),
    orlib("5.9", "resources/OR-Library/scp59.txt"),
    orlib("5.10", "resources/OR-Library/scp510.txt"),
    orlib("6.1", "resources/OR-Library/scp61.txt"),
    orlib("6.2", "resources/OR-Library/scp62.txt"),
    orlib("6.3", "resources/OR-Library/scp63.txt"),
    orlib("6.4", "resources/OR-Library/scp64.txt"),
    orlib("6.5", "resources/OR-Library/scp65.txt"),
    orlib("A.1", "resources/OR-Library/scpa1.txt"),
    orlib("A.2", "resources/OR-Library/scpa2.txt"),
    orlib("A.3", "resources/OR-Library/scpa3.txt"),
    orlib("A.4", "resources/OR-Library/scpa4.txt"),
    orlib("A.5", "resources/OR-Library/scpa5.txt"),
    orlib("B.1", "resources/OR-Library/scpb1.txt"),
    orlib("B.2", "resources/OR-Library/scpb2.txt"),
    orlib("B.3", "resources/OR-Library/scpb3.txt"),
    orlib("B.4", "resources/OR-Library/scpb4.txt"),
    orlib("B.5", "resources/OR-Library/scpb5.txt"),
    orlib("C.1", "resources/OR-Library/scpc1.txt"),
    orlib("C.2", "resources/OR-Library/scpc2.txt"),
    orlib("C.3", "resources/OR-Library/scpc3.txt"),
    orlib("C.4", "resources/OR-Library/scpc4.txt"),
    orlib("C.5", "resources/OR-Library/scpc5.txt"),
    orlib("D.1", "resources/OR-Library/scpd1.txt"),
    orlib("D.2", "resources/OR-Library/scpd2.txt"),
    orlib("D.3", "resources/OR-Library/scpd3.txt"),
    orlib("D.4", "resources/OR-Library/scpd4.txt"),
    orlib("D.5", "resources/OR-Library/scpd5.txt"),
    orlib("E.1", "resources/OR-Library/scpe1.txt"),
    orlib("E.2", "resources/OR-Library/scpe2.txt"),
    orlib("E.3", "resources/OR-Library/scpe3.txt"),
    orlib("E.4", "resources/OR-Library/scpe4.txt"),
    orlib("E.5", "resources/OR-Library/scpe5.txt"),
    orlib("NRE.1", "resources/OR-Library/scpnre1.txt"),
    orlib("NRE.2", "resources/OR-Library/scpnre2.txt"),
    orlib("NRE.3", "resources/OR-Library/scpnre3.txt"),
    orlib("NRE.4", "resources/OR-Library/scpnre4.txt"),
    orlib("NRE.5", "resources/OR-Library/scpnre5.txt"),
    orlib("NRF.1", "resources/OR-Library/scpnrf1.txt"),
    orlib("NRF.2", "resources/OR-Library/scpnrf2.txt"),
    orlib("NRF.3", "resources/OR-Library/scpnrf3.txt"),
    orlib("NRF.4", "resources/OR-Library/scpnrf4.txt"),
    orlib("NRF.5", "resources/OR-Library/scpnrf5.txt"),
    orlib("NRG.1", "resources/OR-Library/scpnrg1.txt"),
    orlib("NRG.2", "resources/OR-Library/scpnrg2.txt"),
    orlib("NRG.3", "resources/OR-Library/scpnrg3.txt"),
    orlib("NRG.4", "resources/OR-Library/scpnrg4.txt"),
    orlib("NRG.5", "resources/OR-Library/scpnrg5.txt"),
    orlib("NRH.1", "resources/OR-Library/scpnrh1.txt"),
    orlib("NRH.2", "resources/OR-Library/scpnrh2.txt"),
    orlib("NRH.3", "resources/OR-Library/scpnrh3.txt"),
    orlib("NRH.4", "resources/OR-Library/scpnrh4.txt"),
    orlib("NRH.5", "resources/OR-Library/scpnrh5.txt"),
    orlib("CLR10", "resources/OR-Library/scpclr10.txt"),
    orlib("CLR11", "resources/OR-Library/scpclr11.txt"),
    orlib("CLR12", "resources/OR-Library/scpclr12.txt"),
    orlib("CLR13", "resources/OR-Library/scpclr13.txt"),
    orlib("CYC6", "resources/OR-Library/scpcyc06.txt"),
    orlib("CYC7", "resources/OR-Library/scpcyc07.txt"),
    orlib("CYC8", "resources/OR-Library/scpcyc08.txt"),
    orlib("CYC9", "resources/OR-Library/scpcyc09.txt"),
    orlib("CYC10", "resources/OR-Library/scpcyc10.txt"),
    orlib("CYC11", "resources/OR-Library/scpcyc11.txt"),
    rail("RAIL507", "resources/rail/rail507.txt"),
    rail("RAIL516", "resources/rail/rail516.txt"),
    rail("RAIL582", "resources/rail/rail582.txt"),
    rail("RAIL2536", "resources/rail/rail2536.txt"),
    rail("RAIL2586", "resources/rail/rail2586.txt"),
    rail("RAIL4284", "resources/rail/rail4284.txt"),
    rail("RAIL4872", "resources/rail/rail4872.txt"),
    steiner("STS9", "resources/steiner/data.9.txt"),
    steiner("STS15", "resources/steiner/data.15.txt"),
    steiner("STS27", "resources/steiner/data.27.txt"),
    steiner("STS45", "resources/steiner/data.45.txt"),
    steiner("STS81", "resources/steiner/data.81.txt"),
    steiner("STS135", "resources/steiner/data.135.txt"),
    steiner("STS243", "resources/steiner/data.243.txt"),
    steiner("STS405", "resources/steiner/data.405.txt"),
    steiner("STS729", "resources/steiner/data.729.txt"),
    steiner("STS1215", "resources/steiner/data.1215.txt"),
    steiner("STS2187", "resources/steiner/data.2187.txt"),
];

/// looks up a registered instance by name
pub fn by_name(name: &str) -> Option<&'static InstanceInfo> {
    INSTANCES.iter().find(|info| info.name == name)
}

/// reads a registered instance from its resource file
pub fn read_registered(info: &InstanceInfo) -> Result<Instance> {
    read_typed(info.format, Path::new(info.file), info.name)
}

/// reads an instance of the given format from an arbitrary path
pub fn read_typed(format: InstanceFormat, path: &Path, name: &str) -> Result<Instance> {
    match format {
        InstanceFormat::OrLibrary => orlibrary::read(path, name),
        InstanceFormat::OrLibraryRail => orlibrary::read_rail(path, name),
        InstanceFormat::Sts => sts::read(path, name),
    }
}

/// reads an instance from an `--instance_type` string, an error when unknown
pub fn read_unknown(instance_type: &str, path: &Path, name: &str) -> Result<Instance> {
    let format = InstanceFormat::from_name(instance_type).ok_or_else(|| {
        Error::InvalidInput(format!("invalid instance type: {}", instance_type))
    })?;
    read_typed(format, path, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(by_name("4.1").is_some());
        assert!(by_name("STS81").is_some());
        assert_eq!(by_name("RAIL507").unwrap().format, InstanceFormat::OrLibraryRail);
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn test_format_names_roundtrip() {
        for format in [
            InstanceFormat::OrLibrary,
            InstanceFormat::OrLibraryRail,
            InstanceFormat::Sts,
        ] {
            assert_eq!(InstanceFormat::from_name(format.name()), Some(format));
        }
        assert_eq!(InstanceFormat::from_name("gvcp"), None);
    }

    #[test]
    fn test_read_unknown_rejects_bad_type() {
        let result = read_unknown("dimacs", Path::new("nowhere.txt"), "x");
        assert!(result.is_err());
    }
}
