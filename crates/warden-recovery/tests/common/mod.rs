//! Shared harness for recovery service tests

#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use warden_client::{
    prepare_configuration, reseal_for_recovery, GuardianContact, Identity,
    PreparedConfiguration, RecoveryKeypair,
};
use warden_core::{OwnerRef, RecoveryId};
use warden_recovery::{
    ConfigureRequest, GuardianUpload, InitiateRequest, InitiateResponse, PendingRequest,
    RecoveryService, SubmissionReceipt, SubmitShardRequest,
};
use warden_signature::{RequestAuth, SignedAction};
use warden_testkit::{identities, identity, TestEffects};

pub struct Harness {
    pub effects: Arc<TestEffects>,
    pub service: RecoveryService<TestEffects>,
    pub owner: Identity,
    pub guardians: Vec<Identity>,
    pub rng: ChaCha20Rng,
}

impl Harness {
    pub fn new(guardian_count: usize) -> Self {
        let effects = TestEffects::new().shared();
        Self {
            service: RecoveryService::new(Arc::clone(&effects)),
            effects,
            owner: identity("owner"),
            guardians: identities("guardian", guardian_count),
            rng: ChaCha20Rng::seed_from_u64(0x5eed),
        }
    }

    pub fn now(&self) -> u64 {
        self.effects.clock().now_ms()
    }

    pub fn contacts_of(&self, indices: &[usize]) -> Vec<GuardianContact> {
        indices
            .iter()
            .map(|&i| GuardianContact {
                signing_key: self.guardians[i].public_key(),
                encryption_key: self.guardians[i].encryption_key(),
            })
            .collect()
    }

    pub fn configure_request(&mut self, threshold: usize) -> (ConfigureRequest, PreparedConfiguration) {
        let all: Vec<usize> = (0..self.guardians.len()).collect();
        self.configure_request_for(&all, threshold)
    }

    /// Configure request naming only the guardians at `indices`
    pub fn configure_request_for(
        &mut self,
        indices: &[usize],
        threshold: usize,
    ) -> (ConfigureRequest, PreparedConfiguration) {
        let contacts = self.contacts_of(indices);
        let prepared = prepare_configuration(
            &self.owner,
            self.owner.seed(),
            &contacts,
            threshold,
            &mut self.rng,
        )
        .unwrap();
        let request = ConfigureRequest {
            guardians: prepared
                .shards
                .iter()
                .map(|s| GuardianUpload {
                    pubkey: s.guardian,
                    encrypted_shard: s.encrypted_shard.clone(),
                })
                .collect(),
            threshold,
            owner_recovery_encryption_key: prepared.owner_encryption_key,
            auth: self
                .owner
                .sign(&SignedAction::Configure { threshold }, self.now()),
        };
        (request, prepared)
    }

    pub async fn configure(&mut self, threshold: usize) -> PreparedConfiguration {
        let (request, prepared) = self.configure_request(threshold);
        self.service.configure(request).await.unwrap();
        prepared
    }

    pub async fn initiate(&self, device: &RecoveryKeypair) -> InitiateResponse {
        self.service
            .initiate(InitiateRequest {
                owner: OwnerRef::PublicKey(self.owner.public_key()),
                temp_pubkey: device.temp_pubkey(),
            })
            .await
            .unwrap()
    }

    pub fn pending_auth(&self, guardian: &Identity) -> RequestAuth {
        guardian.sign(&SignedAction::Pending, self.now())
    }

    pub async fn pending_for(&self, guardian: usize) -> Vec<PendingRequest> {
        let auth = self.pending_auth(&self.guardians[guardian]);
        self.service.guardian_pending(&auth).await.unwrap()
    }

    /// Build the submit request guardian `index` would send for `request`
    pub fn submission(&mut self, index: usize, request: &PendingRequest) -> SubmitShardRequest {
        let guardian = &self.guardians[index];
        let resealed = reseal_for_recovery(
            guardian,
            &request.owner_encryption_pubkey,
            &request.temp_pubkey,
            &request.encrypted_shard,
            &mut self.rng,
        )
        .unwrap();
        SubmitShardRequest {
            recovery_id: request.recovery_id,
            encrypted_shard: resealed,
            guardian_encryption_pubkey: guardian.encryption_key(),
            auth: guardian.sign(
                &SignedAction::Submit {
                    recovery_id: request.recovery_id,
                },
                self.now(),
            ),
        }
    }

    /// Poll as guardian `index` and submit for `id`
    pub async fn guardian_submits(&mut self, index: usize, id: RecoveryId) -> SubmissionReceipt {
        let pending = self.pending_for(index).await;
        let request = pending
            .iter()
            .find(|p| p.recovery_id == id)
            .expect("session should be pending for guardian")
            .clone();
        let submission = self.submission(index, &request);
        self.service.submit_shard(submission).await.unwrap()
    }
}
