//! Test vector generator for the Constellation accounting core.
//!
//! Generates `test_vectors.json` with every signed-payload digest the
//! protocol verifies. Off-ledger signers (the admin server, oracle admins)
//! check their digest construction against this file.
//!
//! Usage:
//!   constel-testvec              # Generate test_vectors.json
//!   constel-testvec --verify     # Verify test vectors match expected values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use constel_auth::grant::SignedClaimAuthorization;
use constel_crypto::blake3::{self, contexts};
use constel_crypto::ed25519::KeyPair;
use constel_oracle::attestation::{attestation_digest, YieldAttestation};
use constel_types::{Asset, Identity, SigningDomain, ONE_ETHER};

const FIXTURE_PATH: &str = "tests/fixtures/test_vectors.json";

/// Contract label and chain every digest vector is bound to.
const CONTRACT_LABEL: &str = "constellation";
const CHAIN_ID: u64 = 1;

#[derive(Serialize, Deserialize)]
struct TestVectors {
    version: String,
    generated_by: String,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

fn domain() -> SigningDomain {
    let contract = blake3::derive_key(contexts::CONTRACT_IDENTITY, CONTRACT_LABEL.as_bytes());
    SigningDomain::new(Identity(contract), CHAIN_ID)
}

fn generate_blake3_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let hash = blake3::hash(b"Constellation test vector 1");
    vectors.insert(
        "blake3_basic_hash".to_string(),
        TestVector {
            description: "BLAKE3::hash(b\"Constellation test vector 1\")".to_string(),
            inputs: BTreeMap::from([(
                "data".to_string(),
                "Constellation test vector 1".to_string(),
            )]),
            outputs: BTreeMap::from([("hash".to_string(), hex::encode(hash))]),
        },
    );

    // Length-prefixed field encoding
    let encoded = blake3::encode_multi_field(&[b"ab", b""]);
    vectors.insert(
        "multi_field_encoding".to_string(),
        TestVector {
            description: "LE32(len) || field, for fields [\"ab\", \"\"]".to_string(),
            inputs: BTreeMap::from([
                ("field_0".to_string(), hex::encode(b"ab")),
                ("field_1".to_string(), String::new()),
            ]),
            outputs: BTreeMap::from([("encoded".to_string(), hex::encode(encoded))]),
        },
    );

    vectors
}

fn generate_identity_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let contract = blake3::derive_key(contexts::CONTRACT_IDENTITY, CONTRACT_LABEL.as_bytes());
    vectors.insert(
        "contract_identity".to_string(),
        TestVector {
            description: "BLAKE3::derive_key(\"Constellation v1 contract-identity\", label)"
                .to_string(),
            inputs: BTreeMap::from([("label".to_string(), CONTRACT_LABEL.to_string())]),
            outputs: BTreeMap::from([("identity".to_string(), hex::encode(contract))]),
        },
    );

    for name in ["distribution-pool", "treasury", "operator-rewards"] {
        let label = format!("{CONTRACT_LABEL}/{name}");
        let account = blake3::derive_key(contexts::ACCOUNT_LABEL, label.as_bytes());
        vectors.insert(
            format!("account_identity_{}", name.replace('-', "_")),
            TestVector {
                description: format!(
                    "BLAKE3::derive_key(\"Constellation v1 account-label\", \"{label}\")"
                ),
                inputs: BTreeMap::from([("label".to_string(), label)]),
                outputs: BTreeMap::from([("identity".to_string(), hex::encode(account))]),
            },
        );
    }

    vectors
}

fn generate_ed25519_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let secret = [0x01u8; 32];
    let kp = KeyPair::from_bytes(&secret);
    let message = b"Constellation test vector 1";
    let signature = kp.signing_key.sign(message);

    vectors.insert(
        "ed25519_sign".to_string(),
        TestVector {
            description: "Ed25519 sign with secret 0x01*32".to_string(),
            inputs: BTreeMap::from([
                ("secret_key".to_string(), hex::encode(secret)),
                ("message".to_string(), hex::encode(message)),
            ]),
            outputs: BTreeMap::from([
                (
                    "public_key".to_string(),
                    hex::encode(kp.verifying_key.to_bytes()),
                ),
                ("signature".to_string(), hex::encode(signature.to_bytes())),
            ]),
        },
    );

    vectors.insert(
        "signer_identity".to_string(),
        TestVector {
            description: "identity = BLAKE3::hash(public_key)".to_string(),
            inputs: BTreeMap::from([(
                "public_key".to_string(),
                hex::encode(kp.verifying_key.to_bytes()),
            )]),
            outputs: BTreeMap::from([("identity".to_string(), hex::encode(kp.identity()))]),
        },
    );

    vectors
}

fn generate_attestation_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();
    let domain = domain();

    for (name, new_yield) in [("gain", 3 * ONE_ETHER as i128), ("loss", -(ONE_ETHER as i128))] {
        let attestation = YieldAttestation {
            new_yield,
            expected_oracle_error: ONE_ETHER as i128,
            timestamp: 1_700_000_000,
        };
        let digest = attestation_digest(&attestation, &domain);
        vectors.insert(
            format!("yield_attestation_{name}"),
            TestVector {
                description: "derive_key(\"Constellation v1 yield-attestation\", LP(i128 yield) || LP(i128 expected_error) || LP(u64 timestamp) || LP(contract) || LP(u64 chain_id))".to_string(),
                inputs: BTreeMap::from([
                    ("new_yield".to_string(), new_yield.to_string()),
                    (
                        "expected_oracle_error".to_string(),
                        attestation.expected_oracle_error.to_string(),
                    ),
                    ("timestamp".to_string(), attestation.timestamp.to_string()),
                    ("contract".to_string(), hex::encode(domain.contract.as_bytes())),
                    ("chain_id".to_string(), domain.chain_id.to_string()),
                ]),
                outputs: BTreeMap::from([("digest".to_string(), hex::encode(digest))]),
            },
        );
    }

    vectors
}

fn generate_grant_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();
    let domain = domain();
    let auth = SignedClaimAuthorization::new(domain);
    let subject = Identity([0x11; 32]);

    // Reward claim at nonce 0, epoch 0
    let amount = ONE_ETHER / 2;
    let claim =
        constel_auth::rewards::reward_claim_digest(&auth, &subject, Asset::Base, amount, 0, 0);
    vectors.insert(
        "grant_reward_claim".to_string(),
        TestVector {
            description: "Reward-claim grant digest: LP(rewardee) || LP(asset_tag) || LP(u128 amount) || LP(nonce) || LP(epoch) || LP(contract) || LP(chain_id)".to_string(),
            inputs: BTreeMap::from([
                ("rewardee".to_string(), hex::encode(subject.as_bytes())),
                ("asset_tag".to_string(), Asset::Base.tag().to_string()),
                ("amount".to_string(), amount.to_string()),
                ("identity_nonce".to_string(), "0".to_string()),
                ("epoch".to_string(), "0".to_string()),
                ("chain_id".to_string(), domain.chain_id.to_string()),
            ]),
            outputs: BTreeMap::from([("digest".to_string(), hex::encode(claim))]),
        },
    );

    // Operator onboarding after one epoch bump
    let onboarding = constel_auth::whitelist::onboarding_digest(&auth, &subject, 0, 1);
    vectors.insert(
        "grant_operator_onboarding".to_string(),
        TestVector {
            description: "Operator-onboarding grant digest: LP(operator) || LP(nonce) || LP(epoch) || LP(contract) || LP(chain_id)".to_string(),
            inputs: BTreeMap::from([
                ("operator".to_string(), hex::encode(subject.as_bytes())),
                ("identity_nonce".to_string(), "0".to_string()),
                ("epoch".to_string(), "1".to_string()),
                ("chain_id".to_string(), domain.chain_id.to_string()),
            ]),
            outputs: BTreeMap::from([("digest".to_string(), hex::encode(onboarding))]),
        },
    );

    // Endorsement by a fixed admin-server key
    let signer = KeyPair::from_bytes(&[0x02u8; 32]);
    let endorsement = signer.endorse(&claim);
    vectors.insert(
        "grant_reward_claim_endorsement".to_string(),
        TestVector {
            description: "Ed25519 endorsement of grant_reward_claim with secret 0x02*32"
                .to_string(),
            inputs: BTreeMap::from([
                ("secret_key".to_string(), hex::encode([0x02u8; 32])),
                ("digest".to_string(), hex::encode(claim)),
            ]),
            outputs: BTreeMap::from([
                (
                    "signer".to_string(),
                    hex::encode(endorsement.signer.to_bytes()),
                ),
                (
                    "signature".to_string(),
                    hex::encode(endorsement.signature.to_bytes()),
                ),
            ]),
        },
    );

    vectors
}

fn generate_all_vectors() -> TestVectors {
    let mut all_vectors = BTreeMap::new();

    all_vectors.extend(generate_blake3_vectors());
    all_vectors.extend(generate_identity_vectors());
    all_vectors.extend(generate_ed25519_vectors());
    all_vectors.extend(generate_attestation_vectors());
    all_vectors.extend(generate_grant_vectors());

    TestVectors {
        version: "1.0".to_string(),
        generated_by: "constel-testvec".to_string(),
        vectors: all_vectors,
    }
}

fn verify_vectors(vectors: &TestVectors) -> bool {
    let regenerated = generate_all_vectors();
    let mut all_pass = true;

    for (name, expected) in &vectors.vectors {
        if let Some(actual) = regenerated.vectors.get(name) {
            if actual.outputs != expected.outputs {
                eprintln!("FAIL: {name}");
                eprintln!("  expected: {:?}", expected.outputs);
                eprintln!("  actual:   {:?}", actual.outputs);
                all_pass = false;
            } else {
                eprintln!("PASS: {name}");
            }
        } else {
            eprintln!("MISSING: {name}");
            all_pass = false;
        }
    }

    all_pass
}

fn write_vectors(vectors: &TestVectors) {
    let json = serde_json::to_string_pretty(vectors).expect("serialize");
    if let Some(parent) = std::path::Path::new(FIXTURE_PATH).parent() {
        std::fs::create_dir_all(parent).expect("create dirs");
    }
    std::fs::write(FIXTURE_PATH, &json).expect("write file");
    eprintln!("Generated {} test vectors to {FIXTURE_PATH}", vectors.vectors.len());
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let vectors = if args.iter().any(|a| a == "--verify") {
        match std::fs::read_to_string(FIXTURE_PATH) {
            Ok(content) => serde_json::from_str(&content).expect("valid JSON"),
            Err(_) => {
                eprintln!("No existing test vectors found at {FIXTURE_PATH}. Generating...");
                let vectors = generate_all_vectors();
                write_vectors(&vectors);
                vectors
            }
        }
    } else {
        let vectors = generate_all_vectors();
        write_vectors(&vectors);
        vectors
    };

    if verify_vectors(&vectors) {
        eprintln!("All test vectors verified successfully.");
    } else {
        eprintln!("Test vector verification FAILED.");
        std::process::exit(1);
    }
}
