//! Structured log helpers.
//!
//! Every swap event carries the same fields so log pipelines can index them:
//! - `swap_id`: coordinator swap identifier
//! - `state`: swap state after the event
//! - `chain`: ledger label for chain calls (`escrow`, `claimable_balance`)
//! - additional context fields

/// Log a swap lifecycle event with standard fields.
///
/// ```rust,ignore
/// log_swap_event!(info, "[htlc] Swap created", swap.id, swap.state, amount = %swap.amount);
/// ```
#[macro_export]
macro_rules! log_swap_event {
    ($level:ident, $msg:expr, $swap_id:expr, $state:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            swap_id = %$swap_id,
            state = %$state,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a ledger call with standard fields.
#[macro_export]
macro_rules! log_chain_event {
    ($level:ident, $msg:expr, $chain:expr, $op:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            chain = %$chain,
            op = $op,
            $($($field)*,)?
            $msg
        )
    };
}
