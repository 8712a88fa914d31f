use crate::domain::order::Order;
use crate::error::Result;
use std::io::Write;

/// Writes captured orders as a CSV report.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes a header followed by one record per order. Amounts are
    /// rendered in major units.
    pub fn write_orders(&mut self, orders: &[Order]) -> Result<()> {
        self.writer.write_record([
            "order_number",
            "user_id",
            "total_amount",
            "status",
            "created_at",
        ])?;
        for order in orders {
            self.writer.write_record([
                order.order_number.clone(),
                order.user_id.to_string(),
                order.total_amount.to_string(),
                "paid".to_string(),
                order.created_at.to_rfc3339(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
