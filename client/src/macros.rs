//! Macro functions used by the exchanges.

/// Just to move some logging code from the state transitions.
macro_rules! log_send(
    ($message:expr, $interface:expr, $destination:expr) => (
        info!(
            "Sending {} (xid {:#08x}) on interface {} to {}",
            $message.message_type, $message.transaction_id, $interface, $destination,
        );
        debug!("{}", $message);
    );
);

/// Just to move some logging code from the state transitions.
macro_rules! log_receive(
    ($message:expr, $interface:expr) => (
        info!(
            "Received {} (xid {:#08x}) on interface {}",
            $message.message_type, $message.transaction_id, $interface,
        );
        debug!("{}", $message);
    );
);
