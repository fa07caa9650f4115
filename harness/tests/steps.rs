// Individual steps against the simulated L3 and a failing client

use async_trait::async_trait;
use orbit_common::{
    abi::{ContractCall, Token},
    client::{ChainClient, Deployment, TxOutcome},
    contract::{ContractArtifact, NftCall, VALIDATE_L3_CHAIN},
    error::ClientError,
    types::{Address, BlockSnapshot, U256},
};
use orbit_harness::{
    config::Expectations,
    context::{RunContext, RunState, Workflow},
    error::{ErrorKind, HarnessError},
    simulator::{SimulatedL3, DEMO_BYTECODE},
    steps::{chain_check, deployment, mint, transfer, validation},
};

fn artifact() -> ContractArtifact {
    ContractArtifact {
        contract_name: "BunkerverseNFT".to_string(),
        bytecode: DEMO_BYTECODE.to_vec(),
    }
}

// Deploy and pass the gate, leaving the context in ChainVerified
async fn verified_context(client: &dyn ChainClient, deployer: Address) -> RunContext {
    let mut ctx = RunContext::new(Workflow::Test);
    ctx.transition(RunState::Deploying).unwrap();
    deployment::deploy(client, &mut ctx, &artifact(), deployer, deployer)
        .await
        .unwrap();
    chain_check::check_l3(
        client,
        &mut ctx,
        &Expectations::default(),
        chain_check::POST_DEPLOY,
    )
    .await
    .unwrap();
    ctx.transition(RunState::ChainVerified).unwrap();
    ctx
}

#[tokio::test]
async fn test_transfer_by_non_owner_is_rejected() {
    let sim = SimulatedL3::default();
    let signers = sim.signers().to_vec();
    let (deployer, user1, user2) = (signers[0], signers[1], signers[2]);

    let mut ctx = verified_context(&sim, deployer).await;
    ctx.transition(RunState::Minting).unwrap();
    let token_id = mint::mint_one(&sim, &mut ctx, deployer, user1, "ipfs://one")
        .await
        .unwrap();
    ctx.transition(RunState::Transferring).unwrap();

    // user2 neither owns nor is approved for the token
    let err = transfer::transfer_token(&sim, &mut ctx, token_id, user2, user2)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransferRejected);

    let outcome = ctx.outcomes().last().unwrap();
    assert_eq!(outcome.step, transfer::TRANSFER);
    assert_eq!(outcome.error, Some(ErrorKind::TransferRejected));

    // Ownership did not move, on chain or in the record
    let contract = ctx.contract().unwrap();
    let owner = sim
        .read_state(&contract, &NftCall::owner_of(token_id))
        .await
        .unwrap();
    assert_eq!(owner, vec![Token::Address(user1)]);
    assert_eq!(ctx.token(token_id).unwrap().owner, user1);
}

#[tokio::test]
async fn test_approved_sender_can_transfer() {
    let sim = SimulatedL3::default();
    let signers = sim.signers().to_vec();
    let (deployer, user1, user2) = (signers[0], signers[1], signers[2]);

    let mut ctx = verified_context(&sim, deployer).await;
    ctx.transition(RunState::Minting).unwrap();
    let token_id = mint::mint_one(&sim, &mut ctx, deployer, user1, "ipfs://one")
        .await
        .unwrap();
    let contract = ctx.contract().unwrap();
    let approval = sim
        .send_transaction(&user1, &contract, &NftCall::approve(user2, token_id))
        .await
        .unwrap();
    assert!(approval.succeeded());

    ctx.transition(RunState::Transferring).unwrap();
    transfer::transfer_token(&sim, &mut ctx, token_id, user2, deployer)
        .await
        .unwrap();
    assert_eq!(ctx.token(token_id).unwrap().owner, deployer);
}

#[tokio::test]
async fn test_mutations_refused_outside_mutating_states() {
    let sim = SimulatedL3::default();
    let signers = sim.signers().to_vec();
    let mut ctx = verified_context(&sim, signers[0]).await;
    let calls = sim.mutating_calls();

    // Still in ChainVerified
    let err = mint::mint_one(&sim, &mut ctx, signers[0], signers[1], "ipfs://x")
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::MutationsHalted(RunState::ChainVerified)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(sim.mutating_calls(), calls);
}

#[tokio::test]
async fn test_batch_mint_records_ids_in_order() {
    let sim = SimulatedL3::default();
    let signers = sim.signers().to_vec();
    let (deployer, user1, user2) = (signers[0], signers[1], signers[2]);

    let mut ctx = verified_context(&sim, deployer).await;
    ctx.transition(RunState::Minting).unwrap();
    mint::read_baseline_supply(&sim, &mut ctx).await.unwrap();

    let uris: Vec<String> = ["ipfs://a", "ipfs://b", "ipfs://c"]
        .iter()
        .map(|u| u.to_string())
        .collect();
    let ids = mint::mint_batch(&sim, &mut ctx, deployer, &[user2, user1, user2], &uris)
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(ctx.token(2).unwrap().owner, user1);
    assert_eq!(ctx.token(3).unwrap().uri, "ipfs://c");

    assert_eq!(mint::check_supply(&sim, &mut ctx).await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_supply_check_skipped_without_baseline() {
    let sim = SimulatedL3::default();
    let signers = sim.signers().to_vec();
    let mut ctx = verified_context(&sim, signers[0]).await;
    ctx.transition(RunState::Minting).unwrap();

    assert_eq!(mint::check_supply(&sim, &mut ctx).await.unwrap(), None);
    let outcome = ctx.outcomes().last().unwrap();
    assert_eq!(outcome.step, mint::SUPPLY_CHECK);
    assert!(outcome.is_skipped());
}

#[tokio::test]
async fn test_validation_is_repeatable() {
    let sim = SimulatedL3::default();
    let deployer = sim.signers()[0];
    let mut ctx = verified_context(&sim, deployer).await;
    ctx.transition(RunState::Validating).unwrap();
    let expectations = Expectations::default();

    let before = ctx.outcomes().len();
    let first = validation::validate_metadata(&sim, &mut ctx, &expectations)
        .await
        .unwrap();
    let middle = ctx.outcomes().len();
    let second = validation::validate_metadata(&sim, &mut ctx, &expectations)
        .await
        .unwrap();

    assert_eq!(first, second);
    let outcomes = ctx.outcomes();
    assert_eq!(middle - before, 5);
    assert_eq!(outcomes[before..middle], outcomes[middle..]);
    // Reads do not produce blocks
    assert_eq!(sim.mutating_calls(), 1);
}

/// Simulated chain whose contract cannot answer validateL3Chain()
struct NoContractView(SimulatedL3);

#[async_trait]
impl ChainClient for NoContractView {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.0.chain_id().await
    }

    async fn get_signer_identities(&self) -> Result<Vec<Address>, ClientError> {
        self.0.get_signer_identities().await
    }

    async fn get_balance(&self, address: &Address) -> Result<U256, ClientError> {
        Err(ClientError::Rpc {
            code: -32601,
            message: format!("balance of {address:#x} unavailable"),
        })
    }

    async fn get_block_snapshot(&self) -> Result<BlockSnapshot, ClientError> {
        self.0.get_block_snapshot().await
    }

    async fn deploy_contract(
        &self,
        from: &Address,
        bytecode: &[u8],
        constructor_args: &[u8],
    ) -> Result<Deployment, ClientError> {
        self.0.deploy_contract(from, bytecode, constructor_args).await
    }

    async fn send_transaction(
        &self,
        from: &Address,
        target: &Address,
        call: &ContractCall,
    ) -> Result<TxOutcome, ClientError> {
        self.0.send_transaction(from, target, call).await
    }

    async fn read_state(
        &self,
        target: &Address,
        call: &ContractCall,
    ) -> Result<Vec<Token>, ClientError> {
        if call.signature == VALIDATE_L3_CHAIN {
            return Err(ClientError::Execution("execution reverted".to_string()));
        }
        self.0.read_state(target, call).await
    }
}

#[tokio::test]
async fn test_unavailable_contract_view_does_not_fail_gate() {
    let client = NoContractView(SimulatedL3::default());
    let deployer = client.0.signers()[0];

    let ctx = verified_context(&client, deployer).await;

    let gate = ctx
        .outcomes()
        .iter()
        .find(|o| o.step == "l3_check.post_deploy")
        .unwrap();
    assert!(gate.success);
    assert!(gate.details["contractView"]
        .as_str()
        .unwrap()
        .starts_with("unavailable"));

    // Balance is informational only
    let deploy = ctx.outcomes().first().unwrap();
    assert!(deploy.success);
    assert!(!deploy.details.contains_key("deployerBalanceEth"));
}
