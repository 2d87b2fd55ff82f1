//! The main DHCPv6 message module.

use std::fmt;

use crate::{
    duid::Duid,
    message_type::MessageType,
    options::{DhcpOption, OptionCode, OptionId, OptionTree, Parent},
    status_code::StatusCode,
};

/// DHCPv6 client/server message.
#[derive(Debug, Clone)]
pub struct Message {
    pub message_type: MessageType,
    /// Only the lower 24 bits are transmitted.
    pub transaction_id: u32,
    pub options: OptionTree,
}

impl Message {
    pub fn new(message_type: MessageType, transaction_id: u32, options: OptionTree) -> Self {
        Message {
            message_type,
            transaction_id,
            options,
        }
    }

    pub fn server_id(&self) -> Option<&Duid> {
        match self.options.get_root(OptionCode::ServerId) {
            Some(DhcpOption::ServerId(duid)) => Some(duid),
            _ => None,
        }
    }

    pub fn client_id(&self) -> Option<&Duid> {
        match self.options.get_root(OptionCode::ClientId) {
            Some(DhcpOption::ClientId(duid)) => Some(duid),
            _ => None,
        }
    }

    /// The status code among the direct children of `parent`.
    ///
    /// A missing `STATUS_CODE` option means success (RFC 3315 §22.13).
    pub fn status(&self, parent: Parent) -> StatusCode {
        match self
            .options
            .find(parent, OptionCode::StatusCode)
            .and_then(|id| self.options.get(id))
        {
            Some(DhcpOption::StatusCode(code, _)) => *code,
            _ => StatusCode::Success,
        }
    }

    fn fmt_option(&self, f: &mut fmt::Formatter, id: OptionId, depth: usize) -> fmt::Result {
        if let Some(option) = self.options.get(id) {
            let code = option.code();
            writeln!(
                f,
                "{}[{:03}] {:width$}| {}",
                "  ".repeat(depth),
                u16::from(code),
                code.to_string(),
                option,
                width = 24 - 2 * depth.min(8),
            )?;
        }
        for &child in self.options.children(Parent::Option(id)) {
            self.fmt_option(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}HEADER{}", "_".repeat(30), "_".repeat(39))?;
        writeln!(f, "{:32} | {}", "Message type", self.message_type)?;
        writeln!(f, "{:32} | {:#08x}", "Transaction ID", self.transaction_id)?;
        writeln!(f, "{}OPTIONS{}", "_".repeat(30), "_".repeat(38))?;
        for &id in self.options.roots() {
            self.fmt_option(f, id, 0)?;
        }
        writeln!(f, "{}", "_".repeat(75))?;
        Ok(())
    }
}
