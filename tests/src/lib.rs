#[cfg(test)]
mod tests {
    use note_pool_lib::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    /// Commitments as published by the zero-identity pool.
    const RAW_LEAVES: [&str; 17] = [
        "0x8b8a7297bc4350dd84de1f21f5397389e7bd523dc4b1efbb42963f8fee53ce1",
        "0x7f474ce2c7d48131b3d0cd905442ade4d26fb6fdea99641f6580df11630812f",
        "0x1d0828ee3b4accc842f212b5d740d3d251c7868cc01545898458375c26eda6b5",
        "0x1963ee68bbaa3fea50638a641781b3c97064b0a5b272b999b7b5624cd6593654",
        "0xd92e3066f7ffec8d664044a04aec68fae86ebcd93795e96b8270e2f4f60be7d",
        "0x1e595d7a64258384caa6c73838f105b544c0053f6ba623a101dab98e4f975968",
        "0x87ec3b064e9550b1a5100ea02bf3cf707dd658c60ccbe38d05ea1d4820b9866",
        "0x14aa49bc55ddaf858cf24454637a4c15f702c1a3c4a4999d74262c1dbf7264f0",
        "0x2fab1ca3e6d073b3a236f7f293b77b6bb39bf3e47e05f3228b562a804ddc2783",
        "0xab3654742c9cb58dc53487173bc7c009de93a2345cbde488667960ae984e8d6",
        "0x2339bad6019977816671a6f4460b10613ae882afc5ef12d34c545340749fa166",
        "0x1809c1097d6678b733b237ba29f333969eb02004979dfd098a61a3d547bddc6e",
        "0x2a7059232aea75e10e7f616c3c6bd2dceb6cf7a2b66078e76574428f03e2a24f",
        "0x2b2e3bb89ab28ca89e4195a0e20f60633bee168311a1b067fdea31609d6586a6",
        "0x17e1abf4b87730ea5bd2bce589ac40c59c54c715299bb3febaf15d8cf8c7d6a8",
        "0x25cefca3693d6d2673dd626f71b44c5d84703f8cb71c1f776995730614da37f0",
        "0x3a6970b2c1915e400be8671190a88a90052929be07cc3cfe6f2e00d99fe4ceb",
    ];

    const ZERO_IDENTITY_ROOT: &str =
        "6438977049748256494652080486557650606703653145732020688108992093677347159459";

    const ZERO_IDENTITY_PATH: [&str; 5] = [
        "0x87ec3b064e9550b1a5100ea02bf3cf707dd658c60ccbe38d05ea1d4820b9866",
        "0x1a6e231f8012ef3c2c40e07b9f66f1fac82faa764ae795e385400d76a624a547",
        "0x185e54c4653815c950126e1ca7d4d4345df5dddd3c4ef238d22b3ec2bec62d2d",
        "0x17197b8f183da6b2b1bd95af6185f3c536c312ee06c6d7ebcd29825b8d7374e",
        "0x3a6970b2c1915e400be8671190a88a90052929be07cc3cfe6f2e00d99fe4ceb",
    ];

    /// The same commitments with the low bit cleared, as the odd-parity pool
    /// stores them.
    const EVEN_LEAVES: [&str; 17] = [
        "0x8b8a7297bc4350dd84de1f21f5397389e7bd523dc4b1efbb42963f8fee53ce0",
        "0x7f474ce2c7d48131b3d0cd905442ade4d26fb6fdea99641f6580df11630812e",
        "0x1d0828ee3b4accc842f212b5d740d3d251c7868cc01545898458375c26eda6b4",
        "0x1963ee68bbaa3fea50638a641781b3c97064b0a5b272b999b7b5624cd6593654",
        "0xd92e3066f7ffec8d664044a04aec68fae86ebcd93795e96b8270e2f4f60be7c",
        "0x1e595d7a64258384caa6c73838f105b544c0053f6ba623a101dab98e4f975968",
        "0x87ec3b064e9550b1a5100ea02bf3cf707dd658c60ccbe38d05ea1d4820b9866",
        "0x14aa49bc55ddaf858cf24454637a4c15f702c1a3c4a4999d74262c1dbf7264f0",
        "0x2fab1ca3e6d073b3a236f7f293b77b6bb39bf3e47e05f3228b562a804ddc2782",
        "0xab3654742c9cb58dc53487173bc7c009de93a2345cbde488667960ae984e8d6",
        "0x2339bad6019977816671a6f4460b10613ae882afc5ef12d34c545340749fa166",
        "0x1809c1097d6678b733b237ba29f333969eb02004979dfd098a61a3d547bddc6e",
        "0x2a7059232aea75e10e7f616c3c6bd2dceb6cf7a2b66078e76574428f03e2a24e",
        "0x2b2e3bb89ab28ca89e4195a0e20f60633bee168311a1b067fdea31609d6586a6",
        "0x17e1abf4b87730ea5bd2bce589ac40c59c54c715299bb3febaf15d8cf8c7d6a8",
        "0x25cefca3693d6d2673dd626f71b44c5d84703f8cb71c1f776995730614da37f0",
        "0x3a6970b2c1915e400be8671190a88a90052929be07cc3cfe6f2e00d99fe4cea",
    ];

    const ODD_PARITY_ROOT: &str =
        "0x12b5f872ab26fe936a02b0d9c2184379ec18c27e76fa9c2bf36aad952fcae239";

    const ODD_PARITY_PATH: [&str; 5] = [
        "0x87ec3b064e9550b1a5100ea02bf3cf707dd658c60ccbe38d05ea1d4820b9866",
        "0x18d6209a939a0fa9bc43d37d85d43227378ef2bf41e0d3844b9e1a0c7b236199",
        "0x216bc11a7be9067d09d7a4cd4681eb4c7e436d36ff61892fd896009c6a1869fb",
        "0x1526a6df23ab306af0949d738f9725a1a6126383c9c345735d9b9fd0a0eab4d5",
        "0x3a6970b2c1915e400be8671190a88a90052929be07cc3cfe6f2e00d99fe4ceb",
    ];

    const NOTE_COMMITMENT: &str =
        "0x14aa49bc55ddaf858cf24454637a4c15f702c1a3c4a4999d74262c1dbf7264f0";

    const NOTE_INDEX: usize = 7;

    fn fe(s: &str) -> FieldElement {
        FieldElement::parse(s).unwrap()
    }

    fn accumulator(rule: PairingRule) -> MerkleAccumulator {
        MerkleAccumulator::new(Arc::new(PoseidonBn254), rule)
    }

    /// The note spent throughout: 100000 units of one token.
    fn fixture_note() -> Note {
        Note::new(
            fe("0x6162726163616461627261"),
            fe("0x6a6f65"),
            Asset::new(
                100_000u64,
                fe("0x2877e73feb5b7af1e12db1ff5b15db30ffa42182406241f672e9e611f42f3e1"),
            ),
        )
    }

    fn parse_all(values: &[&str]) -> Vec<FieldElement> {
        values.iter().map(|s| fe(s)).collect()
    }

    fn fixture_leaves() -> Vec<FieldElement> {
        parse_all(&RAW_LEAVES)
    }

    fn fixture_request(acc: &MerkleAccumulator) -> SpendRequest {
        let leaves = fixture_leaves();
        let root = acc.root(&leaves).unwrap();
        let path = acc.authentication_path(&leaves, NOTE_INDEX).unwrap();
        SpendRequest::withdraw_all(fixture_note(), path, root)
    }

    struct FixtureLedger {
        leaves: Vec<FieldElement>,
        root: FieldElement,
    }

    impl LedgerReader for FixtureLedger {
        async fn fetch_leaves(&self) -> Result<Vec<FieldElement>> {
            Ok(self.leaves.clone())
        }

        async fn fetch_root(&self) -> Result<FieldElement> {
            Ok(self.root)
        }
    }

    struct FakeProver {
        response: ProofResponse,
    }

    impl ProvingBackend for FakeProver {
        async fn prove(&self, _witness: &SpendWitness) -> Result<ProofResponse> {
            Ok(self.response.clone())
        }
    }

    // -----------------------------------------------------------------------
    // Accumulator over the 17-leaf fixture
    // -----------------------------------------------------------------------

    #[test]
    fn test_fixture_note_commitment_is_published_leaf() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let commitment = fixture_note().commitment(acc.hasher()).unwrap();
        assert_eq!(commitment, fe(NOTE_COMMITMENT));

        for leaves in [&RAW_LEAVES, &EVEN_LEAVES] {
            let snapshot = AccumulatorSnapshot::new(parse_all(leaves));
            assert_eq!(snapshot.position_of(commitment), Some(NOTE_INDEX));
        }
    }

    #[test]
    fn test_zero_identity_fixture_root_and_path() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let leaves = fixture_leaves();
        let root = acc.root(&leaves).unwrap();
        assert_eq!(root, fe(ZERO_IDENTITY_ROOT));

        let path = acc.authentication_path(&leaves, NOTE_INDEX).unwrap();
        // 17 leaves: four full pairing levels, then the 17th leaf joins at the top.
        assert_eq!(path.siblings, parse_all(&ZERO_IDENTITY_PATH));
        assert_eq!(path.terminator, root);
        assert_eq!(
            acc.root_from_path(fe(NOTE_COMMITMENT), &path.siblings).unwrap(),
            root
        );
        assert!(!acc.is_member(leaves[NOTE_INDEX + 1], &path, root));
    }

    #[test]
    fn test_odd_parity_fixture_root_and_path() {
        let acc = accumulator(PairingRule::OddParity);
        let leaves = parse_all(&EVEN_LEAVES);
        let root = acc.root(&leaves).unwrap();
        assert_eq!(root, fe(ODD_PARITY_ROOT));

        let path = acc.authentication_path(&leaves, NOTE_INDEX).unwrap();
        assert_eq!(path.siblings, parse_all(&ODD_PARITY_PATH));
        assert_eq!(path.terminator, root);
        assert_eq!(
            acc.root_from_path(fe(NOTE_COMMITMENT), &path.siblings).unwrap(),
            root
        );

        // raw leaves are admitted through the parity filter
        assert_eq!(acc.root(&fixture_leaves()).unwrap(), root);
    }

    #[test]
    fn test_rules_disagree_on_the_same_leaves() {
        let leaves = fixture_leaves();
        let zero = accumulator(PairingRule::ZeroIdentity);
        let odd = accumulator(PairingRule::OddParity);
        assert_ne!(zero.root(&leaves).unwrap(), odd.root(&leaves).unwrap());
        assert_ne!(
            zero.authentication_path(&leaves, NOTE_INDEX).unwrap(),
            odd.authentication_path(&leaves, NOTE_INDEX).unwrap()
        );
    }

    #[test]
    fn test_fixture_root_depends_on_every_leaf() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let leaves = fixture_leaves();
        let root = acc.root(&leaves).unwrap();
        for i in [0, NOTE_INDEX, leaves.len() - 1] {
            let mut altered = leaves.clone();
            altered[i] = altered[i] + FieldElement::one();
            assert_ne!(acc.root(&altered).unwrap(), root, "leaf {i}");
        }
    }

    #[test]
    fn test_appending_a_leaf_moves_the_root() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let mut snapshot = AccumulatorSnapshot::new(fixture_leaves());
        let before = snapshot.root(&acc).unwrap();
        let index = snapshot.push(FieldElement::from(42u64));
        assert_eq!(index, RAW_LEAVES.len());
        assert_ne!(snapshot.root(&acc).unwrap(), before);

        // old paths no longer verify against the new root
        let old_path = acc.authentication_path(&fixture_leaves(), NOTE_INDEX).unwrap();
        let new_root = snapshot.root(&acc).unwrap();
        assert!(!acc.is_member(snapshot.leaves()[NOTE_INDEX], &old_path, new_root));
    }

    // -----------------------------------------------------------------------
    // Witness assembly
    // -----------------------------------------------------------------------

    #[test]
    fn test_full_withdrawal_witness() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let request = fixture_request(&acc);
        let asm = SpendWitnessAssembler::new(acc);
        let w = asm.assemble(&request, &mut StdRng::seed_from_u64(1)).unwrap();

        let note = fixture_note();
        assert_eq!(w.withdraw.amount, note.asset.amount);
        assert!(w.tx1_amount.is_zero());
        assert!(w.tx2_amount.is_zero());
        assert_eq!(w.withdraw_to, note.owner);
        assert_eq!(w.nullifier, note.nullifier(asm.accumulator().hasher()).unwrap());
        assert_eq!(w.merkle_proof.len(), MERKLE_PATH_SLOTS);
        assert_eq!(w.merkle_root, fe(ZERO_IDENTITY_ROOT));
        assert_eq!(w.merkle_proof[..5], parse_all(&ZERO_IDENTITY_PATH)[..]);
        assert!(w.merkle_proof[5..].iter().all(FieldElement::is_zero));
    }

    #[test]
    fn test_balance_law_across_splits() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let base = fixture_request(&acc);
        let asm = SpendWitnessAssembler::new(acc);
        let mut rng = StdRng::seed_from_u64(2);

        for (withdraw, tx1) in [(0u64, 0u64), (60_000, 0), (60_000, 40_000), (0, 100_000), (1, 2)] {
            let request = SpendRequest {
                withdraw_amount: FieldElement::from(withdraw),
                tx1: ChangeOutput {
                    amount: Some(FieldElement::from(tx1)),
                    secret: Some(FieldElement::from(11u64)),
                },
                tx2_secret: Some(FieldElement::from(22u64)),
                ..base.clone()
            };
            let w = asm.assemble(&request, &mut rng).unwrap();
            assert_eq!(
                w.withdraw.amount + w.tx1_amount + w.tx2_amount,
                w.tx_asset.amount,
                "withdraw {withdraw}, tx1 {tx1}"
            );
            let tx2 = commit_to_asset(
                asm.accumulator().hasher(),
                w.tx2_secret,
                w.tx_asset.token_address,
                w.tx2_amount,
            )
            .unwrap();
            assert_eq!(w.tx2, tx2);
        }
    }

    #[test]
    fn test_overspend_is_rejected() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let request = SpendRequest {
            withdraw_amount: FieldElement::from(97_500u64),
            tx1: ChangeOutput {
                amount: Some(FieldElement::from(5_000u64)),
                secret: Some(FieldElement::from(1u64)),
            },
            tx2_secret: Some(FieldElement::from(2u64)),
            ..fixture_request(&acc)
        };
        let asm = SpendWitnessAssembler::new(acc);
        let err = asm
            .assemble(&request, &mut StdRng::seed_from_u64(3))
            .unwrap_err();
        assert_eq!(
            err,
            PoolError::OverspendAttempt {
                available: FieldElement::from(100_000u64),
                withdraw: FieldElement::from(97_500u64),
                tx1: FieldElement::from(5_000u64),
            }
        );
    }

    #[test]
    fn test_change_without_secret_is_rejected() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let request = SpendRequest {
            withdraw_amount: FieldElement::from(40_000u64),
            ..fixture_request(&acc)
        };
        let asm = SpendWitnessAssembler::new(acc);
        let err = asm
            .assemble(&request, &mut StdRng::seed_from_u64(4))
            .unwrap_err();
        assert!(matches!(
            err,
            PoolError::MissingSecretForNonzeroAmount {
                slot: ChangeSlot::Tx2,
                ..
            }
        ));
    }

    #[test]
    fn test_witness_from_published_odd_parity_path() {
        let asm = SpendWitnessAssembler::new(accumulator(PairingRule::OddParity));
        let path = AuthenticationPath {
            index: NOTE_INDEX,
            siblings: parse_all(&ODD_PARITY_PATH),
            terminator: fe(ODD_PARITY_ROOT),
        };
        let request = SpendRequest {
            withdraw_amount: FieldElement::from(97_500u64),
            tx2_secret: Some(fe(
                "0x17fac61fa9d3f0b73ba678c69cfb943d2645a42d7a37902788789b702bdd6844",
            )),
            ..SpendRequest::withdraw_all(fixture_note(), path, fe(ODD_PARITY_ROOT))
        };
        let w = asm.assemble(&request, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(w.merkle_root, fe(ODD_PARITY_ROOT));
        assert_eq!(w.tx2_amount, FieldElement::from(2_500u64));

        // the same path does not lead to the zero-identity root
        let zero = accumulator(PairingRule::ZeroIdentity);
        assert!(!zero.is_member(fe(NOTE_COMMITMENT), &request.path, fe(ZERO_IDENTITY_ROOT)));
    }

    #[test]
    fn test_witness_json_layout() -> anyhow::Result<()> {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let request = fixture_request(&acc);
        let asm = SpendWitnessAssembler::new(acc);
        let w = asm.assemble(&request, &mut StdRng::seed_from_u64(6))?;

        let json: serde_json::Value = serde_json::from_str(&w.to_json()?)?;
        let obj = json.as_object().expect("object");
        for key in [
            "ClaimingKey", "Owner", "OwnerKey", "AuthDone", "TxAsset", "MerkleProof",
            "MerkleRoot", "Nullifier", "Withdraw", "WithdrawTo", "Tx1Secret", "Tx1Amount",
            "Tx1", "Tx2Secret", "Tx2", "Payload",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(!obj.contains_key("Tx2Amount"));
        assert_eq!(json["TxAsset"]["Amount"], "100000");
        assert_eq!(json["Withdraw"]["Amount"], "100000");
        assert_eq!(json["Withdraw"]["Addr"], fixture_note().asset.token_address.to_string());
        assert_eq!(json["OwnerKey"], "0");
        assert_eq!(json["MerkleProof"].as_array().map(Vec::len), Some(MERKLE_PATH_SLOTS));

        // the key is written as a decimal string of its canonical value
        let key = fixture_note().claiming_key;
        assert_eq!(json["ClaimingKey"], key.to_string());
        assert_eq!(key.to_hex(), format!("0x{}", hex::encode(key.to_be_bytes())));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ledger and prover boundary
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_prepare_and_prove_against_fake_backends() {
        let loader = BackendLoader::poseidon();
        let acc = MerkleAccumulator::new(loader.handle().await.unwrap(), PairingRule::ZeroIdentity);
        let leaves = fixture_leaves();
        let ledger = FixtureLedger {
            root: acc.root(&leaves).unwrap(),
            leaves,
        };
        let asm = SpendWitnessAssembler::new(acc);
        let note = fixture_note();
        let intent = SpendIntent {
            note,
            withdraw_amount: FieldElement::from(30_000u64),
            withdraw_to: Some(FieldElement::from(0xbeefu64)),
            withdraw_token: None,
            tx1: ChangeOutput {
                amount: Some(FieldElement::from(20_000u64)),
                secret: Some(FieldElement::from(7u64)),
            },
            tx2_secret: Some(FieldElement::from(8u64)),
        };

        let witness = prepare_spend(&ledger, &asm, intent, &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();
        assert_eq!(witness.merkle_root, ledger.root);
        assert_eq!(witness.tx2_amount, FieldElement::from(50_000u64));
        assert_eq!(witness.withdraw_to, FieldElement::from(0xbeefu64));

        let ok = FakeProver {
            response: ProofResponse::Success {
                proof: serde_json::json!({ "a": ["1", "2"] }),
                public_inputs: vec![witness.merkle_root, witness.nullifier],
                calldata: Some("0x00ff".into()),
            },
        };
        let proof = prove_spend(&ok, &witness).await.unwrap();
        assert_eq!(proof.public_inputs, vec![witness.merkle_root, witness.nullifier]);
        assert_eq!(proof.calldata, Some(vec![0x00, 0xff]));

        let failing = FakeProver {
            response: ProofResponse::Error {
                error: "constraint".into(),
                message: "unsatisfied".into(),
            },
        };
        let err = prove_spend(&failing, &witness).await.unwrap_err();
        assert_eq!(
            err,
            PoolError::ProofBackendFailure {
                kind: "constraint".into(),
                message: "unsatisfied".into(),
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_stale_ledger_is_retryable() {
        let acc = accumulator(PairingRule::ZeroIdentity);
        let leaves = fixture_leaves();
        let ledger = FixtureLedger {
            root: acc.root(&leaves[..16]).unwrap(),
            leaves,
        };
        let err = locate_note(&ledger, &acc, &fixture_note()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_backend_loader_shares_one_handle() {
        let loader = Arc::new(BackendLoader::poseidon());
        assert!(loader.get().is_err());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.handle().await.unwrap() })
            })
            .collect();
        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        for h in &handles[1..] {
            assert!(Arc::ptr_eq(&handles[0], h));
        }
        assert!(Arc::ptr_eq(&handles[0], &loader.get().unwrap()));
    }
}
