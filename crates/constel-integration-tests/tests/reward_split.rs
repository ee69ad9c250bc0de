//! Integration test: reward splitting and minipool exits.
//!
//! Exercises the distribution pool lifecycle:
//! 1. Split a 1 ETH reward 0.6/0.4 with nothing left for the community
//! 2. Check treasury + operator + community == reward across odd inputs
//! 3. Onboard an operator, fund a 32 ETH minipool and exit it at 33 ETH
//! 4. Exit at exactly the bond: no proceeds, no fees
//! 5. Fee changes after creation do not touch an existing minipool
//! 6. Rejections: outsiders, rates above 1.0, unknown or unfunded minipools
//!
//! Community portions stay in the pool and raise the oracle error.

use constel_auth::whitelist::onboarding_digest;
use constel_auth::AuthError;
use constel_crypto::ed25519::KeyPair;
use constel_distributor::DistributorError;
use constel_protocol::config::ProtocolConfig;
use constel_protocol::host::Protocol;
use constel_protocol::ProtocolError;
use constel_types::ledger::AssetLedger;
use constel_types::{Amount, Asset, Identity, Role, ONE_ETHER, RATE_SCALE};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

const ADMIN: Identity = Identity([0xAD; 32]);
const KEEPER: Identity = Identity([0x50; 32]);
const OPERATOR: Identity = Identity([0x0B; 32]);
const MINIPOOL: Identity = Identity([0x3C; 32]);
const OUTSIDER: Identity = Identity([0xEE; 32]);

/// Helper: protocol with a keeper and an admin server; bond in whole ETH.
fn setup(bond_eth: u64) -> (Protocol, KeyPair) {
    let mut config = ProtocolConfig::default();
    config.distributor.bond_gwei = bond_eth * 1_000_000_000;
    let mut p = Protocol::new(&config, ADMIN).expect("protocol");

    let server = KeyPair::from_bytes(&[0x5E; 32]);
    p.grant_role(ADMIN, Role::Protocol, KEEPER, BASE_TIME)
        .expect("grant protocol");
    p.grant_role(ADMIN, Role::AdminServer, Identity(server.identity()), BASE_TIME)
        .expect("grant admin server");
    (p, server)
}

/// Helper: onboard `operator` with a grant signed at the live nonces.
fn onboard(p: &mut Protocol, server: &KeyPair, operator: Identity) {
    let auth = &p.state().auth;
    let digest = onboarding_digest(
        auth,
        &operator,
        auth.nonces().identity_nonce(&operator),
        auth.nonces().epoch(),
    );
    let grant = server.endorse(&digest);
    p.add_operator(operator, &grant, BASE_TIME)
        .expect("onboarding should succeed");
}

fn balance(p: &Protocol, account: Identity) -> Amount {
    p.state().bank.balance_of(&account, Asset::Base)
}

#[test]
fn reward_split_sixty_forty_one_ether() {
    let (mut p, _) = setup(8);
    let accounts = *p.accounts();
    p.fund(accounts.pool, Asset::Base, ONE_ETHER, BASE_TIME)
        .expect("reward lands in pool");

    let split = p
        .on_reward_received(KEEPER, ONE_ETHER, 6 * RATE_SCALE / 10, 4 * RATE_SCALE / 10, BASE_TIME)
        .expect("split");

    assert_eq!(split.treasury, 6 * ONE_ETHER / 10);
    assert_eq!(split.operator, 4 * ONE_ETHER / 10);
    assert_eq!(split.community, 0);
    assert_eq!(balance(&p, accounts.treasury), 6 * ONE_ETHER / 10);
    assert_eq!(balance(&p, accounts.operator_rewards), 4 * ONE_ETHER / 10);
    assert_eq!(balance(&p, accounts.pool), 0);
    assert_eq!(p.state().distributor.oracle_error(), 0);
}

#[test]
fn reward_split_conserves_value() {
    let (mut p, _) = setup(8);
    let accounts = *p.accounts();
    let third = RATE_SCALE / 3;
    let cases: [(Amount, u128, u128); 4] = [
        (1, RATE_SCALE / 10, RATE_SCALE / 10),
        (7, third, third),
        (ONE_ETHER + 3, RATE_SCALE / 10, RATE_SCALE / 10),
        (123_456_789, 0, RATE_SCALE),
    ];
    let total: Amount = cases.iter().map(|(reward, _, _)| reward).sum();
    p.fund(accounts.pool, Asset::Base, total, BASE_TIME).expect("fund pool");

    let mut expected_error = 0i128;
    for (reward, treasury_rate, operator_rate) in cases {
        let pool_before = balance(&p, accounts.pool);
        let split = p
            .on_reward_received(KEEPER, reward, treasury_rate, operator_rate, BASE_TIME)
            .expect("split");

        assert_eq!(split.total(), reward, "reward {reward} not conserved");
        assert_eq!(
            pool_before - balance(&p, accounts.pool),
            split.treasury + split.operator
        );
        expected_error += split.community as i128;
        assert_eq!(p.state().distributor.oracle_error(), expected_error);
    }
}

#[test]
fn reward_split_exit_thirty_two_to_thirty_three() {
    let (mut p, server) = setup(32);
    let accounts = *p.accounts();
    p.fund(accounts.pool, Asset::Base, 32 * ONE_ETHER, BASE_TIME)
        .expect("fund pool");
    onboard(&mut p, &server, OPERATOR);

    let record = p
        .create_minipool(KEEPER, MINIPOOL, OPERATOR, BASE_TIME)
        .expect("create minipool");
    assert_eq!(record.bond, 32 * ONE_ETHER);
    assert_eq!(balance(&p, accounts.pool), 0);
    assert_eq!(p.state().distributor.deployed_bonds(), 32 * ONE_ETHER);
    assert_eq!(
        p.total_assets(Asset::Base, BASE_TIME).expect("total"),
        32 * ONE_ETHER,
        "deployed bonds still count"
    );
    let op = p.state().whitelist.operator(&OPERATOR).expect("listed");
    assert_eq!(op.active_validators, 1);

    // Beacon chain returns principal plus 1 ETH.
    p.fund(MINIPOOL, Asset::Base, ONE_ETHER, BASE_TIME + 100)
        .expect("proceeds land");
    let report = p
        .distribute_exited_minipool(KEEPER, MINIPOOL, BASE_TIME + 200)
        .expect("exit");

    assert_eq!(report.final_balance, 33 * ONE_ETHER);
    assert_eq!(report.proceeds, ONE_ETHER);
    assert_eq!(report.split.treasury, ONE_ETHER / 10);
    assert_eq!(report.split.operator, ONE_ETHER / 10);
    assert_eq!(report.split.community, 8 * ONE_ETHER / 10);

    assert_eq!(balance(&p, MINIPOOL), 0);
    assert_eq!(balance(&p, accounts.pool), 328 * ONE_ETHER / 10);
    assert_eq!(balance(&p, accounts.treasury), ONE_ETHER / 10);
    assert_eq!(balance(&p, accounts.operator_rewards), ONE_ETHER / 10);
    assert_eq!(p.state().distributor.oracle_error(), (8 * ONE_ETHER / 10) as i128);
    assert_eq!(p.state().distributor.deployed_bonds(), 0);
    assert!(p.state().distributor.minipools().is_empty());
    let op = p.state().whitelist.operator(&OPERATOR).expect("listed");
    assert_eq!(op.active_validators, 0);
}

#[test]
fn reward_split_exit_at_bond_has_no_proceeds() {
    let (mut p, server) = setup(8);
    let accounts = *p.accounts();
    p.fund(accounts.pool, Asset::Base, 8 * ONE_ETHER, BASE_TIME)
        .expect("fund pool");
    onboard(&mut p, &server, OPERATOR);
    p.create_minipool(KEEPER, MINIPOOL, OPERATOR, BASE_TIME)
        .expect("create");

    let report = p
        .distribute_exited_minipool(ADMIN, MINIPOOL, BASE_TIME + 10)
        .expect("admin may distribute exits");
    assert_eq!(report.proceeds, 0);
    assert_eq!(report.split.total(), 0);
    assert_eq!(balance(&p, accounts.pool), 8 * ONE_ETHER);
    assert_eq!(balance(&p, accounts.treasury), 0);
    assert_eq!(p.state().distributor.oracle_error(), 0);
}

#[test]
fn reward_split_exit_uses_fee_snapshot() {
    let (mut p, server) = setup(8);
    let accounts = *p.accounts();
    p.fund(accounts.pool, Asset::Base, 8 * ONE_ETHER, BASE_TIME)
        .expect("fund pool");
    onboard(&mut p, &server, OPERATOR);
    let record = p
        .create_minipool(KEEPER, MINIPOOL, OPERATOR, BASE_TIME)
        .expect("create");
    assert_eq!(record.fees.treasury_rate, RATE_SCALE / 10);

    p.set_fee_split(ADMIN, 3 * RATE_SCALE / 10, 2 * RATE_SCALE / 10, BASE_TIME)
        .expect("new fees");
    p.fund(MINIPOOL, Asset::Base, ONE_ETHER, BASE_TIME).expect("proceeds");

    let report = p
        .distribute_exited_minipool(KEEPER, MINIPOOL, BASE_TIME + 10)
        .expect("exit");
    assert_eq!(report.split.treasury, ONE_ETHER / 10);
    assert_eq!(report.split.operator, ONE_ETHER / 10);
    assert_eq!(p.state().distributor.fee_split().treasury_rate, 3 * RATE_SCALE / 10);
}

#[test]
fn reward_split_rejections_leave_state() {
    let (mut p, server) = setup(8);
    let accounts = *p.accounts();
    p.fund(accounts.pool, Asset::Base, 4 * ONE_ETHER, BASE_TIME)
        .expect("fund pool");

    assert!(matches!(
        p.on_reward_received(OUTSIDER, ONE_ETHER, 0, 0, BASE_TIME),
        Err(ProtocolError::Distributor(DistributorError::Unauthorized { .. }))
    ));
    assert!(matches!(
        p.on_reward_received(
            KEEPER,
            ONE_ETHER,
            7 * RATE_SCALE / 10,
            4 * RATE_SCALE / 10,
            BASE_TIME,
        ),
        Err(ProtocolError::Distributor(DistributorError::ArithmeticUnderflow { .. }))
    ));
    assert!(matches!(
        p.set_fee_split(ADMIN, 7 * RATE_SCALE / 10, 4 * RATE_SCALE / 10, BASE_TIME),
        Err(ProtocolError::Distributor(DistributorError::InvalidFeeSplit { .. }))
    ));

    // Not whitelisted, then whitelisted but the pool is short of a bond.
    assert!(matches!(
        p.create_minipool(KEEPER, MINIPOOL, OPERATOR, BASE_TIME),
        Err(ProtocolError::Distributor(DistributorError::Auth(AuthError::NotWhitelisted(_))))
    ));
    onboard(&mut p, &server, OPERATOR);
    assert!(matches!(
        p.create_minipool(KEEPER, MINIPOOL, OPERATOR, BASE_TIME),
        Err(ProtocolError::Distributor(DistributorError::InsufficientLiquidity { .. }))
    ));
    assert!(matches!(
        p.distribute_exited_minipool(KEEPER, MINIPOOL, BASE_TIME),
        Err(ProtocolError::Distributor(DistributorError::UnknownMinipool(_)))
    ));

    assert_eq!(balance(&p, accounts.pool), 4 * ONE_ETHER);
    assert_eq!(balance(&p, accounts.treasury), 0);
    assert_eq!(p.state().distributor.oracle_error(), 0);
    assert_eq!(p.state().distributor.deployed_bonds(), 0);
}

#[test]
fn reward_split_operator_with_minipool_cannot_be_removed() {
    let (mut p, server) = setup(8);
    let accounts = *p.accounts();
    p.fund(accounts.pool, Asset::Base, 8 * ONE_ETHER, BASE_TIME)
        .expect("fund pool");
    onboard(&mut p, &server, OPERATOR);
    p.create_minipool(KEEPER, MINIPOOL, OPERATOR, BASE_TIME)
        .expect("create");

    assert!(matches!(
        p.remove_operator(ADMIN, OPERATOR, BASE_TIME),
        Err(ProtocolError::Auth(AuthError::OperatorHasValidators { active: 1, .. }))
    ));

    p.distribute_exited_minipool(KEEPER, MINIPOOL, BASE_TIME + 1)
        .expect("exit");
    p.remove_operator(ADMIN, OPERATOR, BASE_TIME + 2)
        .expect("no validators left");
    assert!(!p.state().whitelist.is_whitelisted(&OPERATOR));
}
