use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rhai::{AST, Engine, Shared, packages::Package, packages::StandardPackage};
use sha2::{Digest, Sha256};

use crate::error::BootstrapError;

pub const MANIFEST_FILE: &str = "MANIFEST";

const EMBEDDED_MANIFEST: &str = include_str!("../library/MANIFEST");
const EMBEDDED_MODULES: &[(&str, &str)] = &[
    ("text.rhai", include_str!("../library/text.rhai")),
    ("numbers.rhai", include_str!("../library/numbers.rhai")),
];

/// Where the script library is read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LibrarySource {
    /// The copy compiled into this crate.
    #[default]
    Embedded,
    /// A directory holding a `MANIFEST` and the module files it lists.
    Directory(PathBuf),
}

impl LibrarySource {
    fn read(&self, name: &str) -> Result<String, BootstrapError> {
        match self {
            LibrarySource::Embedded if name == MANIFEST_FILE => Ok(EMBEDDED_MANIFEST.to_string()),
            LibrarySource::Embedded => EMBEDDED_MODULES
                .iter()
                .find(|(file, _)| *file == name)
                .map(|(_, code)| code.to_string())
                .ok_or_else(|| BootstrapError::MissingResource(name.to_string())),
            LibrarySource::Directory(dir) => read_file(&dir.join(name), name),
        }
    }
}

fn read_file(path: &Path, name: &str) -> Result<String, BootstrapError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BootstrapError::MissingResource(name.to_string()),
        _ => BootstrapError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

#[derive(Debug, Clone, PartialEq)]
struct ManifestEntry {
    checksum: String,
    file: String,
}

fn parse_manifest(manifest: &str) -> Result<Vec<ManifestEntry>, BootstrapError> {
    manifest
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            [checksum, file] if checksum.len() == 64 && checksum.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(ManifestEntry {
                    checksum: checksum.to_ascii_lowercase(),
                    file: file.to_string(),
                })
            }
            _ => Err(BootstrapError::InvalidManifest {
                line: i + 1,
                content: line.to_string(),
            }),
        })
        .collect()
}

pub(crate) fn sha256_hex(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[derive(Debug, Clone)]
pub struct LibraryModule {
    pub name: String,
    pub checksum: String,
    pub(crate) ast: AST,
}

/// The verified, compiled script library shared by every interpreter.
#[derive(Debug)]
pub struct Library {
    modules: Vec<LibraryModule>,
    pub(crate) standard: Shared<rhai::Module>,
}

impl Library {
    pub fn load(source: &LibrarySource) -> Result<Self, BootstrapError> {
        let entries = parse_manifest(&source.read(MANIFEST_FILE)?)?;
        let compiler = compiler();

        let modules = entries
            .into_iter()
            .map(|entry| {
                let code = source.read(&entry.file)?;
                let actual = sha256_hex(&code);

                if actual != entry.checksum {
                    return Err(BootstrapError::ChecksumMismatch {
                        file: entry.file,
                        expected: entry.checksum,
                        actual,
                    });
                }

                let ast = compiler.compile(&code).map_err(|e| BootstrapError::Compile {
                    file: entry.file.clone(),
                    message: e.to_string(),
                })?;

                Ok(LibraryModule {
                    name: module_name(&entry.file),
                    checksum: actual,
                    ast,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            modules,
            standard: StandardPackage::new().as_shared_module(),
        })
    }

    pub fn modules(&self) -> &[LibraryModule] {
        &self.modules
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }
}

fn module_name(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string())
}

fn compiler() -> Engine {
    let mut engine = Engine::new_raw();
    engine.disable_symbol("eval");
    engine
}
