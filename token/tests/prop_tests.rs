use proptest::prelude::*;

use lockup_token::{EscrowToken, InMemoryToken, TokenOp};
use lockup_types::Address;

fn account(i: u8) -> Address {
    Address::new(format!("acct-{}", i % 4))
}

fn op_strategy() -> impl Strategy<Value = TokenOp> {
    prop_oneof![
        (0u8..4, 0u128..1_000).prop_map(|(to, amount)| TokenOp::Mint {
            to: account(to),
            amount
        }),
        (0u8..4, 0u8..4, 0u128..1_000).prop_map(|(from, to, amount)| TokenOp::Transfer {
            from: account(from),
            to: account(to),
            amount
        }),
        (0u8..4, 0u8..4, 0u128..1_000).prop_map(|(from, to, amount)| TokenOp::TransferFrom {
            spender: Address::new("escrow"),
            from: account(from),
            to: account(to),
            amount
        }),
    ]
}

proptest! {
    /// Total supply always equals the sum of balances, whether or not a
    /// batch succeeds.
    #[test]
    fn supply_equals_sum_of_balances(
        batches in prop::collection::vec(prop::collection::vec(op_strategy(), 1..5), 1..20),
    ) {
        let mut token = InMemoryToken::new();
        for i in 0..4u8 {
            token.approve(&account(i), &Address::new("escrow"), 2_000);
        }
        for batch in batches {
            let supply_before = token.total_supply();
            let result = token.execute(&batch);
            if result.is_err() {
                prop_assert_eq!(token.total_supply(), supply_before);
            }
            let sum: u128 = (0..4u8).map(|i| token.balance_of(&account(i))).sum();
            prop_assert_eq!(sum, token.total_supply());
        }
    }
}
