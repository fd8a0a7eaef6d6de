//! Shared test helpers: in-memory filesystem, scripted command runners and a
//! freshly minted root certificate.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trust_cert::exec::{CommandOutput, CommandRunner};
use trust_cert::fs::Filesystem;
use trust_cert::platform::Toolbox;
use trust_cert::TrustError;

/// PEM of a self-signed CA whose subject and issuer CN is `cn`.
pub fn root_ca_pem(cn: &str) -> String {
    let key = rcgen::KeyPair::generate().expect("key pair");
    let mut params = rcgen::CertificateParams::default();
    params.distinguished_name = rcgen::DistinguishedName::new();
    params.distinguished_name.push(
        rcgen::DnType::CommonName,
        rcgen::DnValue::Utf8String(cn.to_string()),
    );
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params.self_signed(&key).expect("self-signed CA").pem()
}

#[derive(Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create `dir` and all of its ancestors.
    pub fn mkdir(&self, dir: impl AsRef<Path>) {
        let mut dirs = self.dirs.lock().unwrap();
        for a in dir.as_ref().ancestors() {
            if !a.as_os_str().is_empty() {
                dirs.insert(a.to_path_buf());
            }
        }
    }

    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.mkdir(parent);
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    pub fn file_names(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display()))
}

impl Filesystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }

    fn is_readable_file(&self, path: &Path) -> bool {
        self.is_file(path)
    }

    fn resolves_to_dir(&self, path: &Path) -> bool {
        self.is_dir(path)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(dir) {
            return Err(not_found(dir));
        }
        let files = self.files.lock().unwrap();
        let dirs = self.dirs.lock().unwrap();
        let mut entries: Vec<PathBuf> = files
            .keys()
            .chain(dirs.iter())
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let data = self.read(src)?;
        match dst.parent() {
            Some(parent) if parent.as_os_str().is_empty() || self.is_dir(parent) => {}
            _ => return Err(not_found(dst)),
        }
        self.files.lock().unwrap().insert(dst.to_path_buf(), data);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }
}

type Responder = Box<dyn Fn(&str) -> Result<CommandOutput, TrustError> + Send + Sync>;

/// Runner that records every command line and answers from a closure.
pub struct ScriptedRunner {
    calls: Mutex<Vec<String>>,
    respond: Responder,
}

impl ScriptedRunner {
    pub fn new(
        respond: impl Fn(&str) -> Result<CommandOutput, TrustError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    /// Every command succeeds with no output.
    pub fn succeeding() -> Arc<Self> {
        Self::new(|_| Ok(ok("")))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command_line: &str) -> Result<CommandOutput, TrustError> {
        self.calls.lock().unwrap().push(command_line.to_string());
        (self.respond)(command_line)
    }
}

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: true,
    }
}

pub fn stderr(text: &str) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: text.to_string(),
        success: false,
    }
}

pub fn failed(command: &str, message: &str) -> TrustError {
    TrustError::CommandFailed {
        command: command.to_string(),
        message: message.to_string(),
    }
}

pub fn toolbox(
    fs: &Arc<MemoryFs>,
    shell: &Arc<ScriptedRunner>,
    elevated: &Arc<ScriptedRunner>,
) -> Toolbox {
    Toolbox {
        fs: fs.clone(),
        shell: shell.clone(),
        elevated: elevated.clone(),
    }
}
