use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// Create a QR payment intent and settle it through the gateway.
    Deposit,
    /// Merge a purchase lot into a holding.
    Acquire,
    /// Create a cash withdrawal request.
    Withdraw,
    /// Create a commodity withdrawal request.
    WithdrawAsset,
    Approve,
    Reject,
}

/// One replayable ledger command.
///
/// `r#ref` is a file-scoped reference: withdrawal rows declare it, and
/// approve/reject rows use it to name the request they resolve.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub r#type: CommandType,
    pub user: u64,
    pub r#ref: Option<u32>,
    pub asset: Option<String>,
    // Parsed from the literal text: the default Decimal deserializer lets
    // csv infer the field as f64 first, discarding the written scale.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub cost: Option<Decimal>,
}

/// Reads commands from a CSV source.
///
/// Whitespace around fields is trimmed and short rows are tolerated; each row
/// yields its own `Result` so one malformed line does not abort the replay.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "type, user, ref, asset, amount, cost\n\
                    deposit, 1, , , 500.00,\n\
                    acquire, 1, , GOLD96, 5.0, 26000.00\n\
                    withdraw, 1, 10, , 300.00,";
        let reader = CommandReader::new(data.as_bytes());
        let commands: Vec<_> = reader.commands().collect();

        assert_eq!(commands.len(), 3);
        let deposit = commands[0].as_ref().unwrap();
        assert_eq!(deposit.r#type, CommandType::Deposit);
        assert_eq!(deposit.amount, Some(dec!(500.00)));
        assert_eq!(deposit.asset, None);

        let acquire = commands[1].as_ref().unwrap();
        assert_eq!(acquire.r#type, CommandType::Acquire);
        assert_eq!(acquire.asset.as_deref(), Some("GOLD96"));
        assert_eq!(acquire.cost, Some(dec!(26000.00)));

        let withdraw = commands[2].as_ref().unwrap();
        assert_eq!(withdraw.r#ref, Some(10));
    }

    #[test]
    fn test_reader_resolve_rows() {
        let data = "type, user, ref, asset, amount, cost\n\
                    withdraw_asset, 2, 7, GOLD96, 2.0,\n\
                    reject, 2, 7, , ,";
        let reader = CommandReader::new(data.as_bytes());
        let commands: Vec<_> = reader.commands().collect();

        assert_eq!(commands[0].as_ref().unwrap().r#type, CommandType::WithdrawAsset);
        let reject = commands[1].as_ref().unwrap();
        assert_eq!(reject.r#type, CommandType::Reject);
        assert_eq!(reject.r#ref, Some(7));
    }

    #[test]
    fn test_reader_keeps_written_scale() {
        let data = "type, user, ref, asset, amount, cost\n\
                    deposit, 1, , , 1000.00,\n\
                    acquire, 1, , GOLD96, 5.0000, 26000.00";
        let reader = CommandReader::new(data.as_bytes());
        let commands: Vec<_> = reader.commands().collect();

        let amount = commands[0].as_ref().unwrap().amount.unwrap();
        assert_eq!(amount.scale(), 2);
        assert_eq!(amount.to_string(), "1000.00");

        let acquire = commands[1].as_ref().unwrap();
        assert_eq!(acquire.amount.unwrap().to_string(), "5.0000");
        assert_eq!(acquire.cost.unwrap().to_string(), "26000.00");
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, user, ref, asset, amount, cost\ninvalid, 1, , , 1.0,";
        let reader = CommandReader::new(data.as_bytes());
        let commands: Vec<_> = reader.commands().collect();

        assert!(commands[0].is_err());
    }
}
