#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use qanx_core::{Address, Amount, Ledger, LockTerms};

const START: u64 = 1_700_000_000;
const SUPPLY: Amount = 1_000_000_000;

#[derive(Arbitrary, Debug)]
enum Op {
    Transfer { from: u8, to: u8, amount: Amount },
    TransferLocked { from: u8, to: u8, amount: Amount, hard: u16, window: u16, hops: u8 },
    Approve { owner: u8, spender: u8, amount: Amount },
    TransferFrom { spender: u8, from: u8, to: u8, amount: Amount },
    Unlock { who: u8 },
    Wait { seconds: u16 },
}

fn account(byte: u8) -> Address {
    // Small address space so operations collide; 0 is the zero address
    Address::new([byte % 5; 20])
}

fuzz_target!(|ops: Vec<Op>| {
    let mut ledger = Ledger::with_genesis(account(1), SUPPLY);
    let mut now = START;

    for op in ops {
        let before = ledger.clone();
        let result = match op {
            Op::Transfer { from, to, amount } => {
                ledger.transfer(account(from), account(to), amount, now)
            }
            Op::TransferLocked { from, to, amount, hard, window, hops } => {
                let hard = now + hard as u64;
                let terms = LockTerms::new(hard, hard + window as u64, hops as u64);
                ledger.transfer_locked(account(from), account(to), amount, terms, now)
            }
            Op::Approve { owner, spender, amount } => {
                ledger.approve(account(owner), account(spender), amount)
            }
            Op::TransferFrom { spender, from, to, amount } => {
                ledger.transfer_from(account(spender), account(from), account(to), amount, now)
            }
            Op::Unlock { who } => ledger.unlock(account(who), now),
            Op::Wait { seconds } => {
                now += seconds as u64;
                Ok(Vec::new())
            }
        };

        // Failures leave no trace
        if result.is_err() {
            assert_eq!(ledger, before);
        }

        let total: Amount = ledger.accounts().map(|(_, a)| a.balance).sum();
        assert_eq!(total, SUPPLY);
        for (_, a) in ledger.accounts() {
            assert!(a.locked_balance(now) <= a.balance);
        }
    }
});
