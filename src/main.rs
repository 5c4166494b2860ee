//! Lending protocol simulation.
//!
//! Walks the full loan lifecycle against an in-memory ledger: escrow, financing,
//! partial and full repayment, rejected double financing, and liquidation.
//! Set `RUST_LOG=lending_core=debug` to see every emitted event.

use lending_core::*;
use tracing_subscriber::EnvFilter;

const BORROWER_1: Address = Address(0xb1);
const BORROWER_2: Address = Address(0xb2);
const LENDER: Address = Address(0x1e);

type SimResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Collateralized P2P Lending Simulation\n");

    if let Err(e) = run() {
        eprintln!("simulation failed: {}", e);
        std::process::exit(1);
    }

    println!("\nAll simulations completed successfully.");
}

fn run() -> SimResult<()> {
    scenario_1_full_repayment()?;
    scenario_2_collateral_reuse_rejected()?;
    scenario_3_double_financing_rejected()?;
    scenario_4_liquidation()?;
    scenario_5_interest_settlement()?;
    Ok(())
}

// genesis tokens plus one collateral type (id 2); borrower 1 holds 2 units, borrower 2 holds none
fn setup(lending: LendingConfig) -> SimResult<(Protocol, TokenId)> {
    let genesis = GenesisConfig::default();
    let reserve = genesis.reserve;
    let mut protocol = Protocol::new(ProtocolConfig { genesis, lending })?;

    let nft = protocol.ledger_mut().mint(reserve, 10)?;
    protocol.reserve_transfer(reserve, LENDER, TokenId::CURRENCY, 10_000)?;
    protocol.reserve_transfer(reserve, BORROWER_1, nft, 2)?;
    protocol.reserve_transfer(reserve, BORROWER_2, TokenId::CURRENCY, 1_000)?;

    for account in [BORROWER_1, BORROWER_2, LENDER] {
        protocol.ledger_mut().set_approval_for_all(account, ENGINE_ADDRESS, true);
    }
    Ok((protocol, nft))
}

fn print_balances(protocol: &Protocol, nft: TokenId) {
    let ledger = protocol.ledger();
    for (label, account) in [("borrower", BORROWER_1), ("lender", LENDER), ("custody", ENGINE_ADDRESS)] {
        println!(
            "    {:<9} currency {:>6}, collateral {}",
            label,
            ledger.balance_of(account, TokenId::CURRENCY),
            ledger.balance_of(account, nft)
        );
    }
}

/// Open, finance, repay in two installments, close.
fn scenario_1_full_repayment() -> SimResult<()> {
    println!("Scenario 1: Full Repayment\n");

    let (mut protocol, nft) = setup(LendingConfig::development())?;
    let t0 = Timestamp::now();

    let request = OpenTradeRequest { nft_id: nft, borrower: BORROWER_1, borrowing_amount: 1_000, apy: Apy(2) };
    let trade_id = protocol.open_trade(BORROWER_1, request, t0)?;
    println!("  Borrower opens {} for 1000 at {} APY, collateral escrowed", trade_id, Apy(2));

    protocol.lend_to_trade(LENDER, trade_id, t0)?;
    println!("  Lender finances {}", trade_id);
    print_balances(&protocol, nft);

    protocol.claim_principal(BORROWER_1, trade_id, t0.plus_secs(60))?;
    println!("  Borrower claims principal");

    let partial = protocol.pay_interest(BORROWER_1, trade_id, 400, t0.plus_secs(3_600))?;
    let ratio = protocol.engine().trades(trade_id).map(|t| t.repaid_ratio()).unwrap_or_default();
    println!("  Borrower repays 400, state {:?}, repaid {}", partial.state, ratio);

    let last = protocol.pay_interest(BORROWER_1, trade_id, 600, t0.plus_secs(7_200))?;
    println!("  Borrower repays 600, state {:?}, lender paid {}", last.state, last.paid_to_lender);
    print_balances(&protocol, nft);
    println!();
    Ok(())
}

/// The only collateral unit is already escrowed.
fn scenario_2_collateral_reuse_rejected() -> SimResult<()> {
    println!("Scenario 2: Collateral Reuse\n");

    let (mut protocol, nft) = setup(LendingConfig::development())?;
    let now = Timestamp::from_secs(1_700_000_000);

    let request = OpenTradeRequest { nft_id: nft, borrower: BORROWER_2, borrowing_amount: 1_000, apy: Apy(2) };
    match protocol.open_trade(BORROWER_2, request, now) {
        Ok(id) => println!("  unexpected: {} opened", id),
        Err(e) => println!("  Borrower 2 without collateral rejected: {}", e.code()),
    }
    println!();
    Ok(())
}

fn scenario_3_double_financing_rejected() -> SimResult<()> {
    println!("Scenario 3: Double Financing\n");

    let (mut protocol, nft) = setup(LendingConfig::development())?;
    let now = Timestamp::from_secs(1_700_000_000);

    let request = OpenTradeRequest { nft_id: nft, borrower: BORROWER_1, borrowing_amount: 1_000, apy: Apy(1) };
    let trade_id = protocol.open_trade(BORROWER_1, request, now)?;
    protocol.lend_to_trade(LENDER, trade_id, now)?;

    match protocol.lend_to_trade(LENDER, trade_id, now) {
        Ok(_) => println!("  unexpected: financed twice"),
        Err(e) => println!("  Second financing rejected: {}", e.code()),
    }
    for event in protocol.engine().recent_events(2) {
        println!("    event {}: {:?}", event.id.0, event.payload);
    }
    println!();
    Ok(())
}

/// Lender takes the collateral after the grace period.
fn scenario_4_liquidation() -> SimResult<()> {
    println!("Scenario 4: Liquidation\n");

    let lending = LendingConfig {
        liquidation_delay_secs: 7 * config::SECONDS_PER_DAY,
        ..LendingConfig::default()
    };
    let (mut protocol, nft) = setup(lending)?;
    let t0 = Timestamp::from_secs(1_700_000_000);

    let request = OpenTradeRequest { nft_id: nft, borrower: BORROWER_1, borrowing_amount: 2_000, apy: Apy(1) };
    let trade_id = protocol.open_trade(BORROWER_1, request, t0)?;
    protocol.lend_to_trade(LENDER, trade_id, t0)?;
    protocol.claim_principal(BORROWER_1, trade_id, t0)?;

    match protocol.liquidate_trade(LENDER, trade_id, t0.plus_secs(3_600)) {
        Ok(_) => println!("  unexpected: liquidated early"),
        Err(e) => println!("  Early liquidation rejected: {}", e),
    }

    let result = protocol.liquidate_trade(LENDER, trade_id, t0.plus_secs(8 * config::SECONDS_PER_DAY))?;
    println!("  Liquidated after 8 days, lender receives {} x {}", result.collateral, result.nft_id);
    print_balances(&protocol, nft);

    let err = protocol.pay_interest(BORROWER_1, trade_id, 100, t0.plus_secs(9 * config::SECONDS_PER_DAY));
    if let Err(e) = err {
        println!("  Late repayment rejected: {}", e.code());
    }
    println!();
    Ok(())
}

/// Principal plus simple interest must be repaid.
fn scenario_5_interest_settlement() -> SimResult<()> {
    println!("Scenario 5: Interest Settlement\n");

    let lending = LendingConfig {
        settlement: Settlement::PrincipalPlusInterest,
        disbursement: Disbursement::Immediate,
        ..LendingConfig::development()
    };
    let (mut protocol, nft) = setup(lending)?;
    let t0 = Timestamp::from_secs(1_700_000_000);

    let request = OpenTradeRequest { nft_id: nft, borrower: BORROWER_1, borrowing_amount: 1_000, apy: Apy(1) };
    let trade_id = protocol.open_trade(BORROWER_1, request, t0)?;
    protocol.lend_to_trade(LENDER, trade_id, t0)?;

    let half_year = t0.plus_secs(SECONDS_PER_YEAR / 2);
    let owed = protocol.engine().amount_owed(trade_id, half_year)?;
    println!("  Owed after half a year at 100%: {}", owed);

    protocol.reserve_transfer(BORROWER_2, BORROWER_1, TokenId::CURRENCY, owed - 1_000)?;
    let result = protocol.pay_interest(BORROWER_1, trade_id, owed, half_year)?;
    println!(
        "  Repaid {}, state {:?}, lender receives {}",
        result.paid_back_amount, result.state, result.paid_to_lender
    );
    print_balances(&protocol, nft);
    Ok(())
}
