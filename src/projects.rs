use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

// Per-project credential set, loaded once at startup and immutable afterwards
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCredential {
    pub project_id: u64,
    pub public_keys: HashSet<String>,
    pub secret_keys: HashSet<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read credentials file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse credentials file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("credential pair is registered for projects {first} and {second}")]
    DuplicateCredential { first: u64, second: u64 },
}

// Project id lookup plus a direct (public key, secret key) -> project index
// for the header authentication flow
pub struct ProjectCredentialRegistry {
    projects: HashMap<u64, ProjectCredential>,
    credential_index: HashMap<(String, String), u64>,
}

impl ProjectCredentialRegistry {
    pub fn from_credentials(credentials: Vec<ProjectCredential>) -> Result<Self, RegistryError> {
        let mut projects = HashMap::new();
        let mut credential_index = HashMap::new();

        for credential in credentials {
            for public in &credential.public_keys {
                for secret in &credential.secret_keys {
                    let pair = (public.clone(), secret.clone());
                    if let Some(existing) = credential_index.insert(pair, credential.project_id) {
                        // a shared pair would make header auth ambiguous
                        return Err(RegistryError::DuplicateCredential {
                            first: existing,
                            second: credential.project_id,
                        });
                    }
                }
            }
            projects.insert(credential.project_id, credential);
        }

        Ok(Self {
            projects,
            credential_index,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)?;
        let credentials: Vec<ProjectCredential> = serde_json::from_str(&raw)?;
        Self::from_credentials(credentials)
    }

    pub fn get(&self, project_id: u64) -> Option<&ProjectCredential> {
        self.projects.get(&project_id)
    }

    pub fn project_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.projects.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    // Resolve a (public key, secret key) pair to its project
    pub fn match_credentials(&self, public_key: &str, secret_key: &str) -> Option<u64> {
        self.credential_index
            .get(&(public_key.to_string(), secret_key.to_string()))
            .copied()
    }
}
