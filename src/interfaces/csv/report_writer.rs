use crate::domain::account::{Account, AssetHolding};
use crate::error::Result;
use std::io::Write;

/// Writes the final state report: an accounts section and a holdings section.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_report(
        mut self,
        accounts: Vec<Account>,
        holdings: Vec<AssetHolding>,
    ) -> Result<()> {
        {
            let mut csv = csv::Writer::from_writer(&mut self.writer);
            csv.write_record(["user", "balance"])?;
            for account in accounts {
                csv.write_record([account.user_id.to_string(), account.balance.to_string()])?;
            }
            csv.flush()?;
        }

        writeln!(self.writer)?;

        let mut csv = csv::Writer::from_writer(&mut self.writer);
        csv.write_record(["user", "asset", "quantity", "total_cost", "average_cost"])?;
        for holding in holdings {
            csv.write_record([
                holding.user_id.to_string(),
                holding.asset.clone(),
                holding.quantity.to_string(),
                holding.total_cost.to_string(),
                holding.average_cost().to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}
