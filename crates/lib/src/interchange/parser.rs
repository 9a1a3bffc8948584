use crate::{
    CategoryNode, ConsumptionRatio, CurrencyId, Flow, MovementRecord, ResourceId, ScalingRecord,
    UAmount,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use strum_macros::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Header {
    Id,
    Name,
    Parent,
    Tenant,
    Flow,
    Label,
    Date,
    Amount,
    Currency,
    Rate,
    Wallet,
    Category,
    Counterparty,
    Resource,
    Task,
    PerUnit,
    Multiplier,
    Phase,
    PhaseOrder,
    Quantity,
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Column `{0}` missing")]
    MissingHeader(Header),
    #[error("Field `{0}` is empty")]
    EmptyField(Header),
    #[error("Invalid value in flow field: `{0}`")]
    InvalidFlowField(String),
    #[error(transparent)]
    CSVError(#[from] csv::Error),
    #[error(transparent)]
    IntParseError(#[from] std::num::ParseIntError),
    #[error(transparent)]
    CurrencyParseError(#[from] fixed::ParseFixedError),
    #[error(transparent)]
    DateParseError(#[from] chrono::ParseError),
}

/// Label of a currency as shown next to projected amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyLabel {
    pub id: CurrencyId,
    pub label: String,
}

/// Quantity of a resource already bought or delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredQuantity {
    pub resource_id: ResourceId,
    pub quantity: UAmount,
}

/// Column positions by header name.
pub struct HeaderIndex<'a>(HashMap<&'a str, usize>);

impl HeaderIndex<'_> {
    fn required(&self, header: Header) -> Result<usize, ParserError> {
        self.optional(header).ok_or(ParserError::MissingHeader(header))
    }

    fn optional(&self, header: Header) -> Option<usize> {
        self.0.get(header.to_string().as_str()).copied()
    }
}

fn required<'r>(
    record: &'r StringRecord,
    idx: usize,
    header: Header,
) -> Result<&'r str, ParserError> {
    record
        .get(idx)
        .filter(|field| !field.is_empty())
        .ok_or(ParserError::EmptyField(header))
}

/// An absent column, a short row and an empty cell all read as `None`.
fn optional(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|idx| record.get(idx))
        .filter(|field| !field.is_empty())
}

fn parse_flow(field: &str) -> Result<Flow, ParserError> {
    field
        .parse()
        .map_err(|_| ParserError::InvalidFlowField(field.to_string()))
}

/// A CSV row type addressed by header names.
pub trait Row: Sized {
    type Columns: Copy;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError>;

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError>;
}

#[derive(Clone, Copy)]
pub struct CategoryColumns {
    id: usize,
    name: usize,
    parent: Option<usize>,
    tenant: Option<usize>,
    flow: Option<usize>,
}

impl Row for CategoryNode {
    type Columns = CategoryColumns;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError> {
        Ok(CategoryColumns {
            id: headers.required(Header::Id)?,
            name: headers.required(Header::Name)?,
            parent: headers.optional(Header::Parent),
            tenant: headers.optional(Header::Tenant),
            flow: headers.optional(Header::Flow),
        })
    }

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError> {
        Ok(CategoryNode {
            id: required(record, columns.id, Header::Id)?.parse()?,
            name: required(record, columns.name, Header::Name)?.to_string(),
            parent_id: optional(record, columns.parent)
                .map(str::parse)
                .transpose()?,
            tenant_id: optional(record, columns.tenant)
                .map(str::parse)
                .transpose()?,
            classification_hint: optional(record, columns.flow)
                .map(parse_flow)
                .transpose()?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct CurrencyColumns {
    id: usize,
    label: usize,
}

impl Row for CurrencyLabel {
    type Columns = CurrencyColumns;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError> {
        Ok(CurrencyColumns {
            id: headers.required(Header::Id)?,
            label: headers.required(Header::Label)?,
        })
    }

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError> {
        Ok(CurrencyLabel {
            id: required(record, columns.id, Header::Id)?.parse()?,
            label: required(record, columns.label, Header::Label)?.to_string(),
        })
    }
}

#[derive(Clone, Copy)]
pub struct MovementColumns {
    id: usize,
    date: usize,
    amount: usize,
    currency: usize,
    rate: usize,
    wallet: usize,
    category: usize,
    counterparty: Option<usize>,
}

impl Row for MovementRecord {
    type Columns = MovementColumns;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError> {
        Ok(MovementColumns {
            id: headers.required(Header::Id)?,
            date: headers.required(Header::Date)?,
            amount: headers.required(Header::Amount)?,
            currency: headers.required(Header::Currency)?,
            rate: headers.required(Header::Rate)?,
            wallet: headers.required(Header::Wallet)?,
            category: headers.required(Header::Category)?,
            counterparty: headers.optional(Header::Counterparty),
        })
    }

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError> {
        Ok(MovementRecord {
            id: required(record, columns.id, Header::Id)?.parse()?,
            date: required(record, columns.date, Header::Date)?.parse()?,
            amount: required(record, columns.amount, Header::Amount)?.parse()?,
            currency_id: required(record, columns.currency, Header::Currency)?.parse()?,
            exchange_rate: required(record, columns.rate, Header::Rate)?.parse()?,
            wallet_id: required(record, columns.wallet, Header::Wallet)?.parse()?,
            category_id: required(record, columns.category, Header::Category)?.parse()?,
            counterparty_id: optional(record, columns.counterparty)
                .map(str::parse)
                .transpose()?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct RatioColumns {
    resource: usize,
    task: usize,
    per_unit: usize,
}

impl Row for ConsumptionRatio {
    type Columns = RatioColumns;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError> {
        Ok(RatioColumns {
            resource: headers.required(Header::Resource)?,
            task: headers.required(Header::Task)?,
            per_unit: headers.required(Header::PerUnit)?,
        })
    }

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError> {
        Ok(ConsumptionRatio {
            resource_id: required(record, columns.resource, Header::Resource)?.parse()?,
            task_id: required(record, columns.task, Header::Task)?.parse()?,
            per_unit_amount: required(record, columns.per_unit, Header::PerUnit)?.parse()?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct ScalingColumns {
    task: usize,
    multiplier: usize,
    phase: Option<usize>,
    phase_order: Option<usize>,
}

impl Row for ScalingRecord {
    type Columns = ScalingColumns;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError> {
        Ok(ScalingColumns {
            task: headers.required(Header::Task)?,
            multiplier: headers.required(Header::Multiplier)?,
            phase: headers.optional(Header::Phase),
            phase_order: headers.optional(Header::PhaseOrder),
        })
    }

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError> {
        Ok(ScalingRecord {
            task_id: required(record, columns.task, Header::Task)?.parse()?,
            multiplier: required(record, columns.multiplier, Header::Multiplier)?.parse()?,
            phase_id: optional(record, columns.phase)
                .map(str::parse)
                .transpose()?,
            phase_order: optional(record, columns.phase_order)
                .map(str::parse)
                .transpose()?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct AcquiredColumns {
    resource: usize,
    quantity: usize,
}

impl Row for AcquiredQuantity {
    type Columns = AcquiredColumns;

    fn columns(headers: &HeaderIndex<'_>) -> Result<Self::Columns, ParserError> {
        Ok(AcquiredColumns {
            resource: headers.required(Header::Resource)?,
            quantity: headers.required(Header::Quantity)?,
        })
    }

    fn parse(record: &StringRecord, columns: Self::Columns) -> Result<Self, ParserError> {
        Ok(AcquiredQuantity {
            resource_id: required(record, columns.resource, Header::Resource)?.parse()?,
            quantity: required(record, columns.quantity, Header::Quantity)?.parse()?,
        })
    }
}

/// Trimming, flexible-width reader so trailing optional cells may be omitted.
pub fn csv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader)
}

pub fn parse_from_reader<T: Row, R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<impl Iterator<Item = Result<T, ParserError>>, ParserError> {
    let headers = reader.headers()?.clone();
    let columns = T::columns(&HeaderIndex(
        headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect(),
    ))?;

    Ok(reader
        .into_records()
        .map(move |res| res.map_err(ParserError::from).and_then(|rec| T::parse(&rec, columns))))
}

/// Reads every row, failing on the first malformed one.
pub fn parse_csv<T: Row, R: std::io::Read>(reader: R) -> Result<Vec<T>, ParserError> {
    parse_from_reader(csv_reader(reader))?.collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{CategoryId, CounterpartyId, MovementId, PhaseId, TaskId, TenantId, WalletId};
    use chrono::NaiveDate;
    use fixed_macro::types::I64F64 as rate;
    use fixed_macro::types::U64F64 as currency;

    #[test]
    fn parses_movements_in_any_column_order() {
        let input = "\
wallet,id,category,date,amount,currency,rate,counterparty
3, 1, 11, 2024-02-29, 1500.25, 2, 980.5,
3, 2, 21, 2024-03-01, 10, 1, 1, 8
";
        let movements = parse_csv::<MovementRecord, _>(input.as_bytes()).unwrap();
        assert_eq!(
            movements,
            vec![
                MovementRecord {
                    id: MovementId(1),
                    date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                    amount: currency!(1500.25),
                    currency_id: CurrencyId(2),
                    exchange_rate: rate!(980.5),
                    wallet_id: WalletId(3),
                    category_id: CategoryId(11),
                    counterparty_id: None,
                },
                MovementRecord {
                    id: MovementId(2),
                    date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    amount: currency!(10),
                    currency_id: CurrencyId(1),
                    exchange_rate: rate!(1),
                    wallet_id: WalletId(3),
                    category_id: CategoryId(21),
                    counterparty_id: Some(CounterpartyId(8)),
                },
            ]
        );
    }

    #[test]
    fn negative_amount_fails() {
        let input = "id,date,amount,currency,rate,wallet,category\n1,2024-01-01,-5,1,1,1,1\n";
        assert!(matches!(
            parse_csv::<MovementRecord, _>(input.as_bytes()),
            Err(ParserError::CurrencyParseError(_))
        ));
    }

    #[test]
    fn negative_rate_parses_so_projection_can_reject_it() {
        let input = "id,date,amount,currency,rate,wallet,category\n1,2024-01-01,5,1,-2,1,1\n";
        let movements = parse_csv::<MovementRecord, _>(input.as_bytes()).unwrap();
        assert_eq!(movements[0].exchange_rate, rate!(-2));
    }

    #[test]
    fn missing_required_column_fails() {
        let input = "id,date,amount,currency,wallet,category\n";
        assert!(matches!(
            parse_csv::<MovementRecord, _>(input.as_bytes()),
            Err(ParserError::MissingHeader(Header::Rate))
        ));
    }

    #[test]
    fn empty_required_cell_fails() {
        let input = "id,date,amount,currency,rate,wallet,category\n1,2024-01-01,,1,1,1,1\n";
        assert!(matches!(
            parse_csv::<MovementRecord, _>(input.as_bytes()),
            Err(ParserError::EmptyField(Header::Amount))
        ));
    }

    #[test]
    fn invalid_date_fails() {
        let input = "id,date,amount,currency,rate,wallet,category\n1,01/02/2024,5,1,1,1,1\n";
        assert!(matches!(
            parse_csv::<MovementRecord, _>(input.as_bytes()),
            Err(ParserError::DateParseError(_))
        ));
    }

    #[test]
    fn parses_category_forest() {
        let input = "\
id,name,parent,tenant,flow
1,Income,,,inflow
2,Sales,1
3,Tenant sales,2,7,
";
        let nodes = parse_csv::<CategoryNode, _>(input.as_bytes()).unwrap();
        assert_eq!(
            nodes,
            vec![
                CategoryNode::root(1, "Income", Some(Flow::Inflow)),
                CategoryNode::child(2, "Sales", 1),
                CategoryNode::child(3, "Tenant sales", 2).owned_by(TenantId(7)),
            ]
        );
    }

    #[test]
    fn invalid_flow_fails() {
        let input = "id,name,flow\n1,Income,sideways\n";
        assert!(matches!(
            parse_csv::<CategoryNode, _>(input.as_bytes()),
            Err(ParserError::InvalidFlowField(flow)) if flow == "sideways"
        ));
    }

    #[test]
    fn parses_scaling_with_optional_phase() {
        let input = "task,multiplier,phase,phase_order\n10,3.5,2,1\n20,4\n";
        let scaling = parse_csv::<ScalingRecord, _>(input.as_bytes()).unwrap();
        assert_eq!(
            scaling,
            vec![
                ScalingRecord::new(TaskId(10), currency!(3.5)).in_phase(PhaseId(2), 1),
                ScalingRecord::new(TaskId(20), currency!(4)),
            ]
        );
    }

    #[test]
    fn parses_ratios_currencies_and_acquired() {
        let ratios = parse_csv::<ConsumptionRatio, _>(
            "resource,task,per_unit\n1,10,0.125\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(ratios[0].per_unit_amount, currency!(0.125));

        let labels = parse_csv::<CurrencyLabel, _>("id,label\n2,USD\n".as_bytes()).unwrap();
        assert_eq!(
            labels,
            vec![CurrencyLabel {
                id: CurrencyId(2),
                label: "USD".to_string()
            }]
        );

        let acquired =
            parse_csv::<AcquiredQuantity, _>("resource,quantity\n1,12\n".as_bytes()).unwrap();
        assert_eq!(acquired[0].quantity, currency!(12));
    }
}
