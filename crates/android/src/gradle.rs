//! Gradle build script inspection
//!
//! Reads the settings that matter for native packaging out of an app-level
//! `build.gradle.kts`: SDK and NDK pins, Java levels, plugins, the release
//! signing config and the `packaging { }` conflict rules. This is a textual
//! scan, not a Kotlin evaluator; computed values are reported verbatim.

use apkpack_core::config::PackagingConfig;
use apkpack_core::error::{Error, Result, ResultExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;

static PLUGIN_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bid\(\s*"([^"]+)"\s*\)"#).expect("valid plugin regex"));

static NAMESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bnamespace\s*=\s*"([^"]*)""#).expect("valid namespace regex"));

static APPLICATION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bapplicationId\s*=\s*"([^"]*)""#).expect("valid applicationId regex")
});

static NDK_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bndkVersion\s*=\s*"([^"]*)""#).expect("valid ndkVersion regex"));

static SDK_LEVEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(compileSdk|minSdk|targetSdk)(?:Version)?\s*(?:=\s*|\(\s*)([\w.]+)")
        .expect("valid sdk regex")
});

static JAVA_COMPATIBILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(sourceCompatibility|targetCompatibility)\s*=\s*JavaVersion\.VERSION_(\w+)")
        .expect("valid compatibility regex")
});

static JVM_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bjvmTarget\s*=\s*(?:JavaVersion\.VERSION_(\w+)\.toString\(\)|"([^"]+)")"#)
        .expect("valid jvmTarget regex")
});

static SIGNING_CONFIG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bsigningConfig\s*=\s*signingConfigs\.(?:getByName\(\s*"([^"]+)"\s*\)|(\w+))"#)
        .expect("valid signingConfig regex")
});

static LIST_APPEND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(pickFirsts|excludes|merges)\s*\+=\s*(?:listOf|setOf|mutableListOf|mutableSetOf)\(([^)]*)\)")
        .expect("valid list append regex")
});

static SINGLE_APPEND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(pickFirsts|excludes|merges)\s*(?:\+=\s*|\.add\(\s*)"([^"]*)""#)
        .expect("valid single append regex")
});

static LEGACY_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(pickFirst|exclude|merge)\(\s*"([^"]*)"\s*\)"#).expect("valid legacy regex")
});

static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("valid string literal regex"));

/// An SDK level as written in the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SdkLevel {
    /// A literal API level
    Fixed(u32),
    /// Supplied by the Flutter Gradle plugin, e.g. `flutter.minSdkVersion`
    Flutter(String),
    /// Any other expression
    Expression(String),
}

impl SdkLevel {
    fn parse(raw: &str) -> Self {
        if let Ok(level) = raw.parse() {
            return SdkLevel::Fixed(level);
        }
        match raw.strip_prefix("flutter.") {
            Some(property) => SdkLevel::Flutter(property.to_string()),
            None => SdkLevel::Expression(raw.to_string()),
        }
    }

    /// The literal level, when one is written
    pub fn fixed(&self) -> Option<u32> {
        match self {
            SdkLevel::Fixed(level) => Some(*level),
            _ => None,
        }
    }
}

impl fmt::Display for SdkLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkLevel::Fixed(level) => write!(f, "{}", level),
            SdkLevel::Flutter(property) => write!(f, "flutter.{}", property),
            SdkLevel::Expression(expr) => f.write_str(expr),
        }
    }
}

/// Problems worth reporting in an otherwise valid script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildScriptWarning {
    /// The release build type reuses the debug signing key
    ReleaseSignedWithDebugKey,
    /// `targetSdk` is above `compileSdk`
    TargetAboveCompileSdk { target: u32, compile: u32 },
    /// `minSdk` is above `targetSdk`
    MinAboveTargetSdk { min: u32, target: u32 },
}

impl fmt::Display for BuildScriptWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildScriptWarning::ReleaseSignedWithDebugKey => {
                f.write_str("release build is signed with the debug key")
            }
            BuildScriptWarning::TargetAboveCompileSdk { target, compile } => {
                write!(f, "targetSdk {} is above compileSdk {}", target, compile)
            }
            BuildScriptWarning::MinAboveTargetSdk { min, target } => {
                write!(f, "minSdk {} is above targetSdk {}", min, target)
            }
        }
    }
}

/// Packaging-relevant settings of an app module build script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildScript {
    /// Plugin ids applied in `plugins { }`
    pub plugins: Vec<String>,
    /// `android.namespace`
    pub namespace: Option<String>,
    /// `defaultConfig.applicationId`
    pub application_id: Option<String>,
    /// `compileSdk`
    pub compile_sdk: Option<SdkLevel>,
    /// `minSdk`
    pub min_sdk: Option<SdkLevel>,
    /// `targetSdk`
    pub target_sdk: Option<SdkLevel>,
    /// Pinned NDK version
    pub ndk_version: Option<String>,
    /// `sourceCompatibility`, e.g. `11`
    pub java_source: Option<String>,
    /// `targetCompatibility`
    pub java_target: Option<String>,
    /// Kotlin `jvmTarget`
    pub jvm_target: Option<String>,
    /// Signing config used by the release build type
    pub release_signing_config: Option<String>,
    /// Rules from `packaging { }` or `packagingOptions { }`
    pub packaging: PackagingConfig,
}

impl BuildScript {
    /// Read and parse a build script from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).context(format!("While reading {}", path.display()))
    }

    /// Parse the text of a Kotlin DSL build script
    pub fn parse(text: &str) -> Result<Self> {
        let text = strip_comments(text);

        let android = find_block(&text, "android").ok_or_else(|| {
            Error::build_script("No android { } block found")
                .with_suggestion("Point inspect at the app module's build.gradle.kts")
        })?;

        let plugins: Vec<String> = find_block(&text, "plugins")
            .map(|block| {
                PLUGIN_ID
                    .captures_iter(block)
                    .map(|c| c[1].to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut script = Self {
            plugins,
            namespace: capture(&NAMESPACE, android),
            application_id: capture(&APPLICATION_ID, android),
            compile_sdk: None,
            min_sdk: None,
            target_sdk: None,
            ndk_version: capture(&NDK_VERSION, android),
            java_source: None,
            java_target: None,
            jvm_target: None,
            release_signing_config: None,
            packaging: PackagingConfig {
                pick_firsts: Vec::new(),
                excludes: Vec::new(),
                merges: Vec::new(),
            },
        };

        for caps in SDK_LEVEL.captures_iter(android) {
            let level = Some(SdkLevel::parse(&caps[2]));
            match &caps[1] {
                "compileSdk" => script.compile_sdk = level,
                "minSdk" => script.min_sdk = level,
                _ => script.target_sdk = level,
            }
        }

        for caps in JAVA_COMPATIBILITY.captures_iter(android) {
            let version = Some(java_version(&caps[2]));
            if &caps[1] == "sourceCompatibility" {
                script.java_source = version;
            } else {
                script.java_target = version;
            }
        }

        script.jvm_target = JVM_TARGET.captures(android).and_then(|caps| {
            caps.get(1)
                .map(|m| java_version(m.as_str()))
                .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
        });

        script.release_signing_config = find_block(android, "buildTypes")
            .and_then(|types| find_block(types, "release"))
            .and_then(|release| SIGNING_CONFIG.captures(release))
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string());

        if let Some(packaging) =
            find_block(android, "packaging").or_else(|| find_block(android, "packagingOptions"))
        {
            script.packaging = parse_packaging(packaging);
        }

        Ok(script)
    }

    /// Problems found in the parsed settings
    pub fn warnings(&self) -> Vec<BuildScriptWarning> {
        let mut warnings = Vec::new();

        if self.release_signing_config.as_deref() == Some("debug") {
            warnings.push(BuildScriptWarning::ReleaseSignedWithDebugKey);
        }

        let compile = self.compile_sdk.as_ref().and_then(SdkLevel::fixed);
        let min = self.min_sdk.as_ref().and_then(SdkLevel::fixed);
        let target = self.target_sdk.as_ref().and_then(SdkLevel::fixed);

        if let (Some(target), Some(compile)) = (target, compile) {
            if target > compile {
                warnings.push(BuildScriptWarning::TargetAboveCompileSdk { target, compile });
            }
        }
        if let (Some(min), Some(target)) = (min, target) {
            if min > target {
                warnings.push(BuildScriptWarning::MinAboveTargetSdk { min, target });
            }
        }

        warnings
    }
}

fn capture(regex: &Regex, text: &str) -> Option<String> {
    regex.captures(text).map(|caps| caps[1].to_string())
}

/// `11` -> `11`, `1_8` -> `1.8`
fn java_version(raw: &str) -> String {
    raw.replace('_', ".")
}

/// Collect packaging rules in declaration order
fn parse_packaging(block: &str) -> PackagingConfig {
    let mut rules: Vec<(usize, &str, String)> = Vec::new();

    for caps in LIST_APPEND.captures_iter(block) {
        let (Some(whole), Some(list), Some(items)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        for item in STRING_LITERAL.captures_iter(items.as_str()) {
            rules.push((whole.start(), list.as_str(), item[1].to_string()));
        }
    }

    for caps in SINGLE_APPEND.captures_iter(block) {
        if let (Some(whole), Some(list)) = (caps.get(0), caps.get(1)) {
            rules.push((whole.start(), list.as_str(), caps[2].to_string()));
        }
    }

    for caps in LEGACY_CALL.captures_iter(block) {
        let list = match &caps[1] {
            "pickFirst" => "pickFirsts",
            "exclude" => "excludes",
            _ => "merges",
        };
        if let Some(whole) = caps.get(0) {
            rules.push((whole.start(), list, caps[2].to_string()));
        }
    }

    // stable sort keeps listOf items in order
    rules.sort_by_key(|(offset, _, _)| *offset);

    let mut packaging = PackagingConfig {
        pick_firsts: Vec::new(),
        excludes: Vec::new(),
        merges: Vec::new(),
    };
    for (_, list, pattern) in rules {
        match list {
            "pickFirsts" => packaging.pick_firsts.push(pattern),
            "excludes" => packaging.excludes.push(pattern),
            _ => packaging.merges.push(pattern),
        }
    }
    packaging
}

/// Remove `//` and `/* */` comments, leaving string literals intact
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    previous = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Body of the first `name { ... }` block, braces balanced
fn find_block<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let pattern = Regex::new(&format!(r"\b{}\s*\{{", regex::escape(name))).ok()?;

    for found in pattern.find_iter(text) {
        // skip property access such as `flutter.minSdkVersion`
        if text[..found.start()].ends_with('.') {
            continue;
        }

        let body_start = found.end();
        let mut depth = 1usize;
        let mut in_string = false;
        for (offset, c) in text[body_start..].char_indices() {
            match c {
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[body_start..body_start + offset]);
                    }
                }
                _ => {}
            }
        }
        return None;
    }

    None
}
