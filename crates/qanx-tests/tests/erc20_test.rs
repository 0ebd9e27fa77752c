//! ERC20 surface of the QANX token: metadata, balances, transfers and
//! allowances

use qanx_core::{Address, Amount, Error, Event, Token, TokenConfig, UNLIMITED_ALLOWANCE};

const NOW: u64 = 1_700_000_000;
const TOKEN: Amount = 1_000_000_000_000_000_000;

fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

fn creator() -> Address {
    addr(0xc0)
}

/// Token whose pool has handed the whole supply to the creator
fn fixture() -> Token {
    let config = TokenConfig::new(1, addr(0xcc), addr(0xaa));
    let mut token = Token::genesis(&config).unwrap();
    let supply = token.total_supply();
    token.transfer(addr(0xcc), creator(), supply, NOW).unwrap();
    token
}

#[test]
fn test_metadata() {
    let token = fixture();
    assert_eq!(token.name(), "QANX Token");
    assert_eq!(token.symbol(), "QANX");
    assert_eq!(token.decimals(), 18);
}

#[test]
fn test_total_supply_held_by_creator() {
    let token = fixture();
    assert_eq!(token.total_supply(), 3_333_333_000 * TOKEN);
    assert_eq!(token.balance_of(&creator()), 3_333_333_000 * TOKEN);
    assert_eq!(token.balance_of(&addr(1)), 0);
}

#[test]
fn test_transfer_moves_exact_amount() {
    let mut token = fixture();
    let before = token.balance_of(&creator());

    let events = token.transfer(creator(), addr(1), 1_000 * TOKEN, NOW).unwrap();

    assert_eq!(token.balance_of(&creator()), before - 1_000 * TOKEN);
    assert_eq!(token.balance_of(&addr(1)), 1_000 * TOKEN);
    assert_eq!(
        events,
        vec![Event::Transfer {
            from: creator(),
            to: addr(1),
            amount: 1_000 * TOKEN
        }]
    );
}

#[test]
fn test_transfer_failure_leaves_state() {
    let mut token = fixture();
    token.transfer(creator(), addr(1), 10, NOW).unwrap();
    let snapshot = token.clone();

    assert!(matches!(
        token.transfer(addr(1), addr(2), 11, NOW),
        Err(Error::InsufficientBalance { .. })
    ));
    assert!(matches!(
        token.transfer(addr(1), Address::ZERO, 1, NOW),
        Err(Error::InvalidRecipient(_))
    ));
    assert_eq!(token, snapshot);
}

#[test]
fn test_approval_and_query() {
    let mut token = fixture();
    let events = token.approve(creator(), addr(2), 500 * TOKEN).unwrap();

    assert_eq!(token.allowance(&creator(), &addr(2)), 500 * TOKEN);
    assert_eq!(token.allowance(&addr(2), &creator()), 0);
    assert_eq!(
        events,
        vec![Event::Approval {
            owner: creator(),
            spender: addr(2),
            amount: 500 * TOKEN
        }]
    );
}

#[test]
fn test_approved_spender_transfers_from_owner() {
    let mut token = fixture();
    token.approve(creator(), addr(2), 500 * TOKEN).unwrap();

    let events = token
        .transfer_from(addr(2), creator(), addr(3), 200 * TOKEN, NOW)
        .unwrap();

    assert_eq!(token.balance_of(&addr(3)), 200 * TOKEN);
    assert_eq!(token.allowance(&creator(), &addr(2)), 300 * TOKEN);
    assert_eq!(
        events,
        vec![Event::Transfer {
            from: creator(),
            to: addr(3),
            amount: 200 * TOKEN
        }]
    );

    assert!(matches!(
        token.transfer_from(addr(4), creator(), addr(3), 1, NOW),
        Err(Error::InsufficientAllowance { .. })
    ));
}

#[test]
fn test_unlimited_allowance() {
    let mut token = fixture();
    token.approve(creator(), addr(2), UNLIMITED_ALLOWANCE).unwrap();
    token
        .transfer_from(addr(2), creator(), addr(3), 1_000 * TOKEN, NOW)
        .unwrap();
    assert_eq!(token.allowance(&creator(), &addr(2)), UNLIMITED_ALLOWANCE);
}

#[test]
fn test_increase_and_decrease_allowance() {
    let mut token = fixture();
    token.approve(creator(), addr(2), 100 * TOKEN).unwrap();

    let events = token.increase_allowance(creator(), addr(2), 50 * TOKEN).unwrap();
    assert_eq!(token.allowance(&creator(), &addr(2)), 150 * TOKEN);
    assert_eq!(
        events,
        vec![Event::Approval {
            owner: creator(),
            spender: addr(2),
            amount: 150 * TOKEN
        }]
    );

    let events = token.decrease_allowance(creator(), addr(2), 120 * TOKEN).unwrap();
    assert_eq!(token.allowance(&creator(), &addr(2)), 30 * TOKEN);
    assert!(matches!(events[0], Event::Approval { amount, .. } if amount == 30 * TOKEN));

    assert!(matches!(
        token.decrease_allowance(creator(), addr(2), 31 * TOKEN),
        Err(Error::InsufficientAllowance { .. })
    ));
    assert_eq!(token.allowance(&creator(), &addr(2)), 30 * TOKEN);
}
