use crate::{
    error::Error, AggregatedBalance, CurrencyProjector, DimensionKey, PhaseRequirement,
    ResourceRequirement,
};
use csv::WriterBuilder;
use std::fmt::Display;
use std::io::{Cursor, Write};

/// Large enough for a 128 bit amount with two decimals and a sign.
const AMOUNT_BUF: usize = 48;

/// Formats `value` with two decimals into `buf`, returning the written bytes.
fn two_decimals<T: Display>(buf: &mut [u8; AMOUNT_BUF], value: T) -> std::io::Result<&[u8]> {
    let mut cursor = Cursor::new(&mut buf[..]);
    write!(cursor, "{:.2}", value)?;
    let len = cursor.position() as usize;
    Ok(&buf[..len])
}

pub fn write_balances<W: Write>(
    balances: &[AggregatedBalance<DimensionKey>],
    projector: &CurrencyProjector,
    writer: W,
) -> Result<(), Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(["key", "inflow", "outflow", "balance", "samples", "currency"])?;

    let mut samples_buf = itoa::Buffer::new();
    let mut inflow_buf = [0u8; AMOUNT_BUF];
    let mut outflow_buf = [0u8; AMOUNT_BUF];
    let mut balance_buf = [0u8; AMOUNT_BUF];

    for balance in balances {
        let currency = match balance.currency {
            Some(currency) => projector.label(currency)?,
            None => "mixed",
        };

        writer.write_record([
            balance.dimension_key.to_string().as_bytes(),
            two_decimals(&mut inflow_buf, balance.inflow)?,
            two_decimals(&mut outflow_buf, balance.outflow)?,
            two_decimals(&mut balance_buf, balance.balance)?,
            samples_buf.format(balance.sample_count).as_bytes(),
            currency.as_bytes(),
        ])?;
    }

    Ok(writer.flush()?)
}

pub fn write_requirements<W: Write>(
    requirements: &[ResourceRequirement],
    writer: W,
) -> Result<(), std::io::Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(["resource", "computed", "acquired", "remaining"])?;

    let mut id_buf = itoa::Buffer::new();
    let mut computed_buf = [0u8; AMOUNT_BUF];
    let mut acquired_buf = [0u8; AMOUNT_BUF];
    let mut remaining_buf = [0u8; AMOUNT_BUF];

    for requirement in requirements {
        writer.write_record([
            id_buf.format(requirement.resource_id.0).as_bytes(),
            two_decimals(&mut computed_buf, requirement.computed_quantity)?,
            two_decimals(&mut acquired_buf, requirement.acquired_quantity)?,
            two_decimals(&mut remaining_buf, requirement.remaining_quantity)?,
        ])?;
    }

    writer.flush()
}

pub fn write_phase_requirements<W: Write>(
    requirements: &[PhaseRequirement],
    writer: W,
) -> Result<(), std::io::Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(["phase", "phase_order", "resource", "quantity"])?;

    let mut phase_buf = itoa::Buffer::new();
    let mut order_buf = itoa::Buffer::new();
    let mut resource_buf = itoa::Buffer::new();
    let mut quantity_buf = [0u8; AMOUNT_BUF];

    for requirement in requirements {
        let phase: &[u8] = match requirement.phase_id {
            Some(phase) => phase_buf.format(phase.0).as_bytes(),
            None => b"",
        };
        let order: &[u8] = match requirement.phase_order {
            Some(order) => order_buf.format(order).as_bytes(),
            None => b"",
        };

        writer.write_record([
            phase,
            order,
            resource_buf.format(requirement.resource_id.0).as_bytes(),
            two_decimals(&mut quantity_buf, requirement.quantity)?,
        ])?;
    }

    writer.flush()
}
