//! Name resolution for script actors.
//!
//! - `@pool`, `@treasury`, ... name a protocol-owned account
//! - any other name is a key holder whose Ed25519 secret is
//!   `BLAKE3::hash(name)`, so scripts stay reproducible across runs

use std::collections::BTreeMap;

use anyhow::bail;

use constel_crypto::blake3;
use constel_crypto::ed25519::KeyPair;
use constel_protocol::accounts::ProtocolAccounts;
use constel_types::Identity;

/// Deterministic keys for named actors.
#[derive(Default)]
pub struct Actors {
    keys: BTreeMap<String, KeyPair>,
}

impl Actors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key pair of a named key holder, created on first use.
    pub fn keypair(&mut self, name: &str) -> anyhow::Result<&KeyPair> {
        if name.starts_with('@') {
            bail!("protocol account {name} has no signing key");
        }
        Ok(self
            .keys
            .entry(name.to_string())
            .or_insert_with(|| KeyPair::from_bytes(&blake3::hash(name.as_bytes()))))
    }

    /// Identity behind `name`.
    pub fn identity(
        &mut self,
        accounts: &ProtocolAccounts,
        name: &str,
    ) -> anyhow::Result<Identity> {
        if let Some(account) = name.strip_prefix('@') {
            return accounts
                .all()
                .into_iter()
                .find(|(label, _)| *label == account)
                .map(|(_, id)| id)
                .ok_or_else(|| anyhow::anyhow!("unknown protocol account @{account}"));
        }
        Ok(Identity(self.keypair(name)?.identity()))
    }

    /// Named key holders seen so far, for the report.
    pub fn directory(&self) -> BTreeMap<String, Identity> {
        self.keys
            .iter()
            .map(|(name, kp)| (name.clone(), Identity(kp.identity())))
            .collect()
    }
}
