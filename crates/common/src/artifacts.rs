//! Compiled contract artifacts (ABI + creation bytecode).

use std::{
    fs,
    path::{Path, PathBuf},
};

use ethers::{
    abi::{self, Abi, ParamType, Token},
    types::Bytes,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact for {name} not found, searched: {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed artifact for {name}: {reason}")]
    Malformed { name: String, reason: String },
    #[error("invalid constructor arguments for {name}: {reason}")]
    ConstructorArguments { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn new(name: impl Into<String>, abi: Abi, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    /// Parses a forge (`bytecode.object`) or hardhat (`bytecode`) artifact.
    pub fn from_json(name: &str, artifact: &Value) -> Result<Self, ArtifactError> {
        let malformed = |reason: String| ArtifactError::Malformed {
            name: name.to_string(),
            reason,
        };

        let abi: Abi = serde_json::from_value(artifact["abi"].clone())
            .map_err(|e| malformed(format!("invalid abi: {e}")))?;

        let code = artifact["bytecode"]
            .as_str()
            .or_else(|| artifact["bytecode"]["object"].as_str())
            .filter(|code| !code.is_empty() && *code != "0x")
            .ok_or_else(|| malformed("no creation bytecode".to_string()))?;
        let bytecode: Bytes = code
            .parse()
            .map_err(|e| malformed(format!("invalid bytecode (unlinked libraries?): {e}")))?;

        Ok(Self::new(name, abi, bytecode))
    }

    pub fn constructor_inputs(&self) -> Vec<ParamType> {
        self.abi
            .constructor()
            .map(|constructor| constructor.inputs.iter().map(|p| p.kind.clone()).collect())
            .unwrap_or_default()
    }

    /// ABI-encoded constructor arguments, without the bytecode prefix.
    pub fn encode_constructor_args(&self, args: &[Token]) -> Result<Bytes, ArtifactError> {
        let inputs = self.constructor_inputs();
        if inputs.len() != args.len() {
            return Err(ArtifactError::ConstructorArguments {
                name: self.name.clone(),
                reason: format!("expected {} arguments, got {}", inputs.len(), args.len()),
            });
        }
        if !Token::types_check(args, &inputs) {
            return Err(ArtifactError::ConstructorArguments {
                name: self.name.clone(),
                reason: format!("argument types do not match {inputs:?}"),
            });
        }
        Ok(abi::encode(args).into())
    }

    /// Creation transaction payload: bytecode followed by the encoded arguments.
    pub fn creation_code(&self, args: &[Token]) -> Result<Bytes, ArtifactError> {
        let encoded = self.encode_constructor_args(args)?;
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encoded);
        Ok(code.into())
    }

    /// Decodes the constructor arguments back out of a creation payload.
    pub fn decode_constructor_args(&self, creation_code: &[u8]) -> Result<Vec<Token>, ArtifactError> {
        let args = creation_code
            .strip_prefix(self.bytecode.as_ref())
            .ok_or_else(|| ArtifactError::ConstructorArguments {
                name: self.name.clone(),
                reason: "creation code does not start with the artifact bytecode".to_string(),
            })?;
        abi::decode(&self.constructor_inputs(), args).map_err(|e| {
            ArtifactError::ConstructorArguments {
                name: self.name.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Where the orchestrator looks up artifacts by contract name.
pub trait ArtifactSource: Send + Sync {
    fn load(&self, name: &str) -> Result<ContractArtifact, ArtifactError>;
}

/// Artifacts on disk, in forge (`out/`) or hardhat (`artifacts/`) layout.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn forge_path(&self, name: &str) -> PathBuf {
        self.root
            .join("out")
            .join(format!("{name}.sol"))
            .join(format!("{name}.json"))
    }

    /// Hardhat nests artifacts by source path, so the tree is searched.
    fn find_hardhat(dir: &Path, name: &str) -> Option<PathBuf> {
        let file_name = format!("{name}.json");
        let source_dir = format!("{name}.sol");
        for entry in fs::read_dir(dir).ok()?.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some(source_dir.as_str()) {
                let candidate = path.join(&file_name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            if let Some(found) = Self::find_hardhat(&path, name) {
                return Some(found);
            }
        }
        None
    }
}

impl ArtifactSource for ArtifactStore {
    fn load(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let forge = self.forge_path(name);
        let hardhat_root = self.root.join("artifacts");
        let path = if forge.is_file() {
            forge
        } else if let Some(path) = Self::find_hardhat(&hardhat_root, name) {
            path
        } else {
            return Err(ArtifactError::NotFound {
                name: name.to_string(),
                searched: vec![forge, hardhat_root],
            });
        };

        let content = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let json: Value = serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        ContractArtifact::from_json(name, &json)
    }
}
