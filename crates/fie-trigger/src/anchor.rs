// anchor.rs — Trust anchor interface for certificate-backed oracle verdicts.
//
// Zero-knowledge verification of death, medical or legal certificates
// happens outside this crate. The trigger only consumes the verifier's
// boolean answer, which becomes the submitting oracle's verdict.

use fie_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An opaque certificate proof as produced by the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateProof {
    /// Content hash of the certificate the proof speaks about.
    pub certificate_hash: String,
    /// Encoded proof bytes; format is the verifier's business.
    pub proof: String,
}

/// Public inputs bound into every verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub creator_commitment: String,
    pub certificate_hash: String,
    /// Lets the verifier enforce the certificate's embedded expiration.
    pub now: Timestamp,
}

impl PublicInputs {
    pub fn new(principal: &Identity, proof: &CertificateProof, now: Timestamp) -> Self {
        Self {
            creator_commitment: creator_commitment(principal),
            certificate_hash: proof.certificate_hash.clone(),
            now,
        }
    }
}

/// Checks a certificate proof. Must return `true` only if the proof is
/// well-formed and the embedded expiration check passes at `inputs.now`.
pub trait CertificateVerifier {
    fn verify(&self, proof: &CertificateProof, inputs: &PublicInputs) -> bool;
}

impl<F> CertificateVerifier for F
where
    F: Fn(&CertificateProof, &PublicInputs) -> bool,
{
    fn verify(&self, proof: &CertificateProof, inputs: &PublicInputs) -> bool {
        self(proof, inputs)
    }
}

/// SHA-256 commitment to a principal identity, hex encoded.
pub fn creator_commitment(principal: &Identity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(principal.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_is_stable_and_distinct() {
        let alice = Identity::new("alice").unwrap();
        let bob = Identity::new("bob").unwrap();
        assert_eq!(creator_commitment(&alice), creator_commitment(&alice));
        assert_ne!(creator_commitment(&alice), creator_commitment(&bob));
        assert_eq!(creator_commitment(&alice).len(), 64);
    }

    #[test]
    fn closures_act_as_verifiers() {
        let expires_at = Timestamp::from_secs(1_000);
        let verifier = |_: &CertificateProof, inputs: &PublicInputs| inputs.now < expires_at;
        let proof = CertificateProof {
            certificate_hash: "abc".into(),
            proof: "0x01".into(),
        };
        let alice = Identity::new("alice").unwrap();
        assert!(verifier.verify(&proof, &PublicInputs::new(&alice, &proof, Timestamp::from_secs(10))));
        assert!(!verifier.verify(
            &proof,
            &PublicInputs::new(&alice, &proof, Timestamp::from_secs(2_000))
        ));
    }
}
