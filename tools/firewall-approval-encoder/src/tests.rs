#[cfg(test)]
mod tests {
    use crate::encoder::{
        approval_digest, bundle_call_hash, call_hash, encode_program, sign_approval, vector_hash, EncodeError,
    };
    use crate::types::SignatureApproval;
    use alloy_primitives::{address, Address, FixedBytes, Selector, U256};
    use call_firewall_types::{CompOp, InvariantCheck};
    use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

    const VAULT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const USER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

    #[test]
    fn test_encode_program() {
        let checks = vec![
            InvariantCheck::After { slot: 0, op: CompOp::Gt, rhs: U256::ZERO, tag: "INVARIANT1".into() },
            InvariantCheck::AfterSum {
                a: 1,
                b: 2,
                op: CompOp::Lte,
                rhs: U256::from(52),
                tag: "INVARIANT2".into(),
            },
        ];

        let encoded = encode_program(&checks).unwrap();
        // op + slot + cmp + rhs + len + tag
        let first = 1 + 1 + 1 + 32 + 1 + 10;
        assert_eq!(encoded[0], 0x01);
        assert_eq!(encoded[2], 2); // Gt
        assert_eq!(encoded[first], 0x04);
        assert_eq!(encoded.len(), first + 1 + 2 + 1 + 32 + 1 + 10);
    }

    #[test]
    fn test_encode_program_rejects_oversized_tag() {
        let fits = "x".repeat(255);
        let encoded = encode_program(&[InvariantCheck::Unchanged { slot: 0, tag: fits.clone() }]).unwrap();
        assert_eq!(encoded[2], 255);
        assert_eq!(encoded.len(), 1 + 1 + 1 + 255);

        // 128 two-byte characters: 256 bytes, so the prefix cannot hold it.
        let long = "é".repeat(128);
        let err = encode_program(&[
            InvariantCheck::Unchanged { slot: 0, tag: fits },
            InvariantCheck::Unchanged { slot: 1, tag: long.clone() },
        ])
        .unwrap_err();
        assert_eq!(err, EncodeError::TagTooLong { tag: long, len: 256 });
    }

    #[test]
    fn test_hashes_match_shared_recipes() {
        let data = [0xd0, 0xe3, 0x0d, 0xb0];
        let value = U256::from(7);
        assert_eq!(
            call_hash(VAULT, USER, USER, &data, value),
            call_firewall_types::call_hash(VAULT, USER, USER, &data, value)
        );
        assert_eq!(
            bundle_call_hash(VAULT, USER, USER, &data, value, 12),
            call_firewall_types::call_hash_with_discriminator(VAULT, USER, USER, &data, value, U256::from(12))
        );
        let selectors = [Selector::new([1, 2, 3, 4]), Selector::new([5, 6, 7, 8])];
        assert_eq!(vector_hash(&selectors), call_firewall_types::vector_hash(&selectors));
    }

    #[test]
    fn test_sign_approval_recovers_signer() {
        let key = SigningKey::from_slice(&[0x42u8; 32]).unwrap();
        let mut approval = SignatureApproval {
            call_hashes: vec![FixedBytes::ZERO],
            expiration: U256::from(1_900_000_000u64),
            origin: USER,
            sender: USER,
            nonce: U256::ZERO,
            signature: Vec::new(),
        };
        sign_approval(&mut approval, &key).unwrap();
        assert_eq!(approval.signature.len(), 65);

        let digest = approval_digest(&approval);
        let expected = call_firewall_types::eth_signed_message_digest(alloy_primitives::keccak256(
            call_firewall_types::signature_approval_message(
                &approval.call_hashes,
                approval.expiration,
                approval.origin,
                approval.sender,
                approval.nonce,
            ),
        ));
        assert_eq!(digest, expected);

        let sig = Signature::from_slice(&approval.signature[..64]).unwrap();
        let recid = RecoveryId::from_byte(approval.signature[64] - 27).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recid).unwrap();
        assert_eq!(&recovered, key.verifying_key());
    }
}
