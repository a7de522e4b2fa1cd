//! Owner, guardians and a recovering device exchanging shards without a relay

use assert_matches::assert_matches;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use warden_client::{
    prepare_configuration, reseal_for_recovery, ClientError, GuardianContact, Identity,
    RecoveryKeypair,
};
use warden_core::SealedShard;
use warden_shamir::ShamirError;

struct Setup {
    owner: Identity,
    guardians: Vec<Identity>,
    rng: ChaCha20Rng,
}

fn setup(guardian_count: u8) -> Setup {
    Setup {
        owner: Identity::from_seed(&[0xA0; 32]),
        guardians: (1..=guardian_count)
            .map(|i| Identity::from_seed(&[i; 32]))
            .collect(),
        rng: ChaCha20Rng::seed_from_u64(99),
    }
}

fn contacts(guardians: &[Identity]) -> Vec<GuardianContact> {
    guardians
        .iter()
        .map(|g| GuardianContact {
            signing_key: g.public_key(),
            encryption_key: g.encryption_key(),
        })
        .collect()
}

#[test]
fn any_threshold_of_guardians_restore_the_identity() {
    let Setup {
        owner,
        guardians,
        mut rng,
    } = setup(5);
    let prepared =
        prepare_configuration(&owner, owner.seed(), &contacts(&guardians), 3, &mut rng).unwrap();

    let device = RecoveryKeypair::generate(&mut rng);
    let helping = [4usize, 0, 2];
    let submitted: Vec<_> = helping
        .iter()
        .map(|&i| {
            let resealed = reseal_for_recovery(
                &guardians[i],
                &prepared.owner_encryption_key,
                &device.temp_pubkey(),
                &prepared.shards[i].encrypted_shard,
                &mut rng,
            )
            .unwrap();
            (guardians[i].encryption_key(), resealed)
        })
        .collect();

    let seed = device
        .reconstruct(
            submitted.iter().map(|(k, s)| (k, s)),
            prepared.threshold,
            Some(&prepared.digest),
        )
        .unwrap();
    let seed: [u8; 32] = seed.as_slice().try_into().unwrap();
    let restored = Identity::from_seed(&seed);
    assert_eq!(restored.public_key(), owner.public_key());
    assert_eq!(restored.encryption_key(), owner.encryption_key());
}

#[test]
fn forged_submission_is_caught_by_digest_not_by_interpolation() {
    let Setup {
        owner,
        guardians,
        mut rng,
    } = setup(3);
    let prepared =
        prepare_configuration(&owner, owner.seed(), &contacts(&guardians), 2, &mut rng).unwrap();
    let device = RecoveryKeypair::generate(&mut rng);

    let honest = reseal_for_recovery(
        &guardians[0],
        &prepared.owner_encryption_key,
        &device.temp_pubkey(),
        &prepared.shards[0].encrypted_shard,
        &mut rng,
    )
    .unwrap();

    // A malicious guardian seals a well-formed but wrong share.
    let bogus = warden_shamir::Share::new(2, vec![0x5A; 32]);
    let forged: SealedShard = warden_client::sealing::seal(
        guardians[1].encryption(),
        &device.temp_pubkey(),
        &bogus.to_bytes(),
        &mut rng,
    )
    .unwrap();

    let k0 = guardians[0].encryption_key();
    let k1 = guardians[1].encryption_key();
    let submissions = [(&k0, &honest), (&k1, &forged)];

    let unchecked = device.reconstruct(submissions, 2, None).unwrap();
    assert_ne!(unchecked.as_slice(), owner.seed());

    assert_matches!(
        device.reconstruct(submissions, 2, Some(&prepared.digest)),
        Err(ClientError::Shamir(ShamirError::DigestMismatch))
    );
}

#[test]
fn shard_attributed_to_the_wrong_guardian_fails_to_open() {
    let Setup {
        owner,
        guardians,
        mut rng,
    } = setup(2);
    let prepared =
        prepare_configuration(&owner, owner.seed(), &contacts(&guardians), 2, &mut rng).unwrap();
    let device = RecoveryKeypair::generate(&mut rng);

    let resealed = reseal_for_recovery(
        &guardians[0],
        &prepared.owner_encryption_key,
        &device.temp_pubkey(),
        &prepared.shards[0].encrypted_shard,
        &mut rng,
    )
    .unwrap();
    let wrong_sender = guardians[1].encryption_key();
    assert_matches!(
        device.reconstruct([(&wrong_sender, &resealed)], 2, None),
        Err(ClientError::Opening { .. })
    );
}
