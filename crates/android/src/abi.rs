//! Android ABI classification and per-library coverage.

use crate::resolver::Resolution;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Application Binary Interface a native library is built for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Abi {
    /// 32-bit ARM
    ArmeabiV7a,
    /// 64-bit ARM
    Arm64V8a,
    /// 32-bit Intel
    X86,
    /// 64-bit Intel
    X86_64,
    /// 64-bit RISC-V
    Riscv64,
    /// A directory name the NDK does not define
    Other(String),
}

impl Abi {
    /// Parse an NDK ABI directory name
    pub fn from_name(name: &str) -> Self {
        match name {
            "armeabi-v7a" => Abi::ArmeabiV7a,
            "arm64-v8a" => Abi::Arm64V8a,
            "x86" => Abi::X86,
            "x86_64" => Abi::X86_64,
            "riscv64" => Abi::Riscv64,
            other => Abi::Other(other.to_string()),
        }
    }

    /// NDK directory name
    pub fn name(&self) -> &str {
        match self {
            Abi::ArmeabiV7a => "armeabi-v7a",
            Abi::Arm64V8a => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
            Abi::Riscv64 => "riscv64",
            Abi::Other(name) => name,
        }
    }

    /// Whether the ABI is 64-bit; unknown names count as 32-bit
    pub fn is_64_bit(&self) -> bool {
        matches!(self, Abi::Arm64V8a | Abi::X86_64 | Abi::Riscv64)
    }

    /// ABI of a `lib/<abi>/<file>` package path
    pub fn from_package_path(path: &str) -> Option<Self> {
        let mut parts = path.trim_start_matches('/').split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("lib"), Some(abi), Some(_)) if !abi.is_empty() => Some(Abi::from_name(abi)),
            _ => None,
        }
    }
}

impl FromStr for Abi {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Abi::from_name(s))
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Abi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Which ABIs each packaged library is available for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AbiCoverage {
    /// Library file name to the ABIs it ships for
    pub libraries: BTreeMap<String, BTreeSet<Abi>>,
    /// Every ABI present in the package
    pub abis: BTreeSet<Abi>,
}

impl AbiCoverage {
    /// Collect coverage from the resolved `lib/<abi>/` entries
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let mut coverage = Self::default();

        for (path, _) in resolution.iter() {
            let Some(abi) = Abi::from_package_path(path) else {
                continue;
            };
            let Some(file_name) = path.rsplit('/').next() else {
                continue;
            };
            coverage.abis.insert(abi.clone());
            coverage
                .libraries
                .entry(file_name.to_string())
                .or_default()
                .insert(abi);
        }

        coverage
    }

    /// Libraries absent for some ABI the package otherwise supports
    ///
    /// A device picks one ABI directory, so a gap means a load failure there.
    pub fn gaps(&self) -> BTreeMap<&str, Vec<&Abi>> {
        self.libraries
            .iter()
            .filter_map(|(library, present)| {
                let missing: Vec<&Abi> = self.abis.difference(present).collect();
                (!missing.is_empty()).then_some((library.as_str(), missing))
            })
            .collect()
    }

    /// 32-bit ABIs present with no 64-bit ABI alongside them
    ///
    /// Stores reject packages whose native code is 32-bit only.
    pub fn lacks_64_bit(&self) -> bool {
        !self.abis.is_empty() && !self.abis.iter().any(Abi::is_64_bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{resolve, Candidate, PackagingOptions};

    #[test]
    fn test_abi_names_round_trip() {
        for abi in [Abi::ArmeabiV7a, Abi::Arm64V8a, Abi::X86, Abi::X86_64, Abi::Riscv64] {
            assert_eq!(Abi::from_name(abi.name()), abi);
        }
        assert_eq!(Abi::from_name("mips"), Abi::Other("mips".to_string()));
        assert_eq!("x86_64".parse::<Abi>().unwrap(), Abi::X86_64);
    }

    #[test]
    fn test_from_package_path() {
        assert_eq!(
            Abi::from_package_path("lib/arm64-v8a/libfoo.so"),
            Some(Abi::Arm64V8a)
        );
        assert_eq!(Abi::from_package_path("/lib/x86/libfoo.so"), Some(Abi::X86));
        assert_eq!(Abi::from_package_path("lib/libfoo.so"), None);
        assert_eq!(Abi::from_package_path("assets/x86/libfoo.so"), None);
    }

    #[test]
    fn test_is_64_bit() {
        assert!(Abi::Arm64V8a.is_64_bit());
        assert!(!Abi::ArmeabiV7a.is_64_bit());
        assert!(!Abi::Other("mips64".into()).is_64_bit());
    }

    #[test]
    fn test_coverage_reports_gaps() {
        let candidates = [
            "lib/arm64-v8a/libtensorflowlite_jni.so",
            "lib/x86_64/libtensorflowlite_jni.so",
            "lib/arm64-v8a/libxnnpack_delegate.so",
        ]
        .into_iter()
        .map(|p| Candidate::new(p, p, "dep"));
        let resolution = resolve(&PackagingOptions::default(), candidates).unwrap();

        let coverage = AbiCoverage::from_resolution(&resolution);
        assert_eq!(coverage.abis.len(), 2);
        assert_eq!(coverage.libraries.len(), 2);

        let gaps = coverage.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps["libxnnpack_delegate.so"], vec![&Abi::X86_64]);
    }

    #[test]
    fn test_lacks_64_bit() {
        fn coverage_of(paths: &[&str]) -> AbiCoverage {
            let candidates = paths.iter().map(|p| Candidate::new(*p, *p, "dep"));
            AbiCoverage::from_resolution(&resolve(&PackagingOptions::default(), candidates).unwrap())
        }

        assert!(coverage_of(&["lib/armeabi-v7a/libfoo.so", "lib/x86/libfoo.so"]).lacks_64_bit());
        assert!(!coverage_of(&["lib/armeabi-v7a/libfoo.so", "lib/arm64-v8a/libfoo.so"]).lacks_64_bit());
        assert!(!coverage_of(&[]).lacks_64_bit());
    }

    #[test]
    fn test_abi_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Abi::Arm64V8a).unwrap(), "\"arm64-v8a\"");
    }
}
