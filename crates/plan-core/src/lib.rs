#![deny(warnings)]

//! Core domain model for the prospecting plan canvas.
//!
//! This crate defines the single worksheet record, the catalogue of its
//! fields, the planner configuration, and the pt-BR currency/number helpers
//! used at the input and display boundaries.

pub mod config;
pub mod money;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use config::{ConfigError, ExportSettings, FunnelConstants, PlannerConfig};

/// Fixed key under which the worksheet snapshot is persisted.
pub const STORAGE_KEY: &str = "prospecting_map_data";

/// Whether `key` can name a snapshot: non-empty, no leading `.`, and only
/// `[A-Za-z0-9_.-]`, so it maps to a single file name on every backend.
pub fn is_valid_storage_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Amounts persist as JSON numbers. Reading back tolerates numbers outside
/// `Decimal` range, saturating them, so one oversized amount never costs the
/// rest of the worksheet.
mod amount_serde {
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    /// Nearest `Decimal` to a finite float; non-finite values read as zero.
    fn saturating_from_f64(v: f64) -> Decimal {
        if !v.is_finite() {
            return Decimal::ZERO;
        }
        if let Ok(d) = Decimal::from_str(&v.to_string()) {
            return d;
        }
        if v.abs() >= 1.0 {
            if v > 0.0 {
                Decimal::MAX
            } else {
                Decimal::MIN
            }
        } else {
            Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
        }
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            Ok(saturating_from_f64(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            Decimal::from_str(v.trim())
                .or_else(|_| Decimal::from_scientific(v.trim()))
                .or_else(|_| v.trim().parse::<f64>().map(saturating_from_f64))
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

/// The worksheet record: every field the user can fill in.
///
/// Serialized field names are the persisted on-disk contract and must not
/// change. Missing keys fall back to their defaults so older snapshots load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorksheetState {
    /// Company name, also used to name exported files.
    #[serde(rename = "empresa")]
    pub company: String,
    /// Product or service being sold.
    #[serde(rename = "produto")]
    pub product: String,
    /// Market segment of the ideal customer.
    #[serde(rename = "segmentacao")]
    pub segmentation: String,
    /// Best outreach channels.
    #[serde(rename = "comunicacao")]
    pub channels: String,
    /// Neighbourhood/city of the ideal customer.
    #[serde(rename = "localizacao")]
    pub location: String,
    /// Where leads are extracted from.
    #[serde(rename = "fontes")]
    pub lead_sources: String,
    /// Monthly sales goal, canonical amount in BRL.
    #[serde(rename = "metaVendas", with = "amount_serde")]
    pub sales_goal: Decimal,
    /// Average ticket per sale, canonical amount in BRL.
    #[serde(rename = "ticketMedio", with = "amount_serde")]
    pub average_ticket: Decimal,
    /// Lead-to-sale conversion rate in percent.
    #[serde(rename = "taxaConversao", with = "amount_serde")]
    pub conversion_rate: Decimal,
    #[serde(rename = "qualificacaoLista")]
    pub list_qualification: String,
    #[serde(rename = "qualificacaoLead")]
    pub lead_qualification: String,
    /// Opening message.
    #[serde(rename = "abordagem")]
    pub approach: String,
    #[serde(rename = "objecoes")]
    pub objections: String,
    /// Number of follow-up attempts and their spacing.
    #[serde(rename = "followUp")]
    pub follow_up: String,
    /// What is offered to catch the lead's attention.
    #[serde(rename = "oferta")]
    pub value_offer: String,
}

/// How a field's raw input is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free-form text, stored verbatim.
    Text,
    /// Monetary amount typed with the cents last.
    Currency,
    /// Percentage parsed as a floating point number.
    Percentage,
}

/// Every field of the worksheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Company,
    Product,
    SalesGoal,
    AverageTicket,
    ConversionRate,
    Segmentation,
    Channels,
    Location,
    LeadSources,
    ListQualification,
    LeadQualification,
    ValueOffer,
    Approach,
    Objections,
    FollowUp,
}

impl Field {
    /// All fields in canvas order: header, goals, execution plan.
    pub const ALL: [Field; 15] = [
        Field::Company,
        Field::Product,
        Field::SalesGoal,
        Field::AverageTicket,
        Field::ConversionRate,
        Field::Segmentation,
        Field::Channels,
        Field::Location,
        Field::LeadSources,
        Field::ListQualification,
        Field::LeadQualification,
        Field::ValueOffer,
        Field::Approach,
        Field::Objections,
        Field::FollowUp,
    ];

    /// Key used in the persisted snapshot.
    pub fn key(self) -> &'static str {
        match self {
            Field::Company => "empresa",
            Field::Product => "produto",
            Field::SalesGoal => "metaVendas",
            Field::AverageTicket => "ticketMedio",
            Field::ConversionRate => "taxaConversao",
            Field::Segmentation => "segmentacao",
            Field::Channels => "comunicacao",
            Field::Location => "localizacao",
            Field::LeadSources => "fontes",
            Field::ListQualification => "qualificacaoLista",
            Field::LeadQualification => "qualificacaoLead",
            Field::ValueOffer => "oferta",
            Field::Approach => "abordagem",
            Field::Objections => "objecoes",
            Field::FollowUp => "followUp",
        }
    }

    /// snake_case name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Field::Company => "company",
            Field::Product => "product",
            Field::SalesGoal => "sales_goal",
            Field::AverageTicket => "average_ticket",
            Field::ConversionRate => "conversion_rate",
            Field::Segmentation => "segmentation",
            Field::Channels => "channels",
            Field::Location => "location",
            Field::LeadSources => "lead_sources",
            Field::ListQualification => "list_qualification",
            Field::LeadQualification => "lead_qualification",
            Field::ValueOffer => "value_offer",
            Field::Approach => "approach",
            Field::Objections => "objections",
            Field::FollowUp => "follow_up",
        }
    }

    /// Caption shown on the canvas.
    pub fn label(self) -> &'static str {
        match self {
            Field::Company => "Empresa",
            Field::Product => "Produto/Serviço",
            Field::SalesGoal => "Meta de Vendas",
            Field::AverageTicket => "Ticket Médio",
            Field::ConversionRate => "Taxa de Conversão",
            Field::Segmentation => "Segmentação",
            Field::Channels => "Comunicação",
            Field::Location => "Localização",
            Field::LeadSources => "Fontes",
            Field::ListQualification => "Qualificação da Lista",
            Field::LeadQualification => "Qualificação do Lead",
            Field::ValueOffer => "Entrega de Valor",
            Field::Approach => "Abordagem",
            Field::Objections => "Objeções",
            Field::FollowUp => "Follow Up",
        }
    }

    /// Guiding question printed under the caption.
    pub fn prompt(self) -> &'static str {
        match self {
            Field::Company => "Nome da empresa",
            Field::Product => "O que você vende?",
            Field::SalesGoal => "Qual é a sua meta financeira?",
            Field::AverageTicket => "Qual é o valor médio da venda?",
            Field::ConversionRate => "Qual é a taxa de conversão em vendas?",
            Field::Segmentation => "Qual é o segmento de mercado do seu cliente ideal?",
            Field::Channels => "Quais melhores canais para abordagem?",
            Field::Location => "Qual bairro/cidade o cliente ideal está?",
            Field::LeadSources => "Onde o lead será extraído?",
            Field::ListQualification => "Quais são os critérios para qualificar uma lista?",
            Field::LeadQualification => {
                "Quais são os critérios para qualificar o potencial cliente?"
            }
            Field::ValueOffer => "O que irá oferecer para atrair a atenção do lead?",
            Field::Approach => "Como é a sua mensagem inicial?",
            Field::Objections => "Quais são as 3 principais objeções?",
            Field::FollowUp => "Quantas tentativas e em quais intervalos?",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::SalesGoal | Field::AverageTicket => FieldKind::Currency,
            Field::ConversionRate => FieldKind::Percentage,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a field name matches neither a key nor a name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    /// Accepts the persisted key (`metaVendas`) or the snake_case name
    /// (`sales_goal`, `sales-goal`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(&wanted) || f.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A field value as stored in the worksheet.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl WorksheetState {
    /// Current value of `field`.
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::SalesGoal => FieldValue::Number(self.sales_goal),
            Field::AverageTicket => FieldValue::Number(self.average_ticket),
            Field::ConversionRate => FieldValue::Number(self.conversion_rate),
            _ => FieldValue::Text(self.text(field).map(str::to_owned).unwrap_or_default()),
        }
    }

    /// Borrow a text field; `None` for numeric fields.
    pub fn text(&self, field: Field) -> Option<&str> {
        let s = match field {
            Field::Company => &self.company,
            Field::Product => &self.product,
            Field::Segmentation => &self.segmentation,
            Field::Channels => &self.channels,
            Field::Location => &self.location,
            Field::LeadSources => &self.lead_sources,
            Field::ListQualification => &self.list_qualification,
            Field::LeadQualification => &self.lead_qualification,
            Field::ValueOffer => &self.value_offer,
            Field::Approach => &self.approach,
            Field::Objections => &self.objections,
            Field::FollowUp => &self.follow_up,
            Field::SalesGoal | Field::AverageTicket | Field::ConversionRate => return None,
        };
        Some(s.as_str())
    }

    /// Mutable access to a text field; `None` for numeric fields.
    pub fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        let s = match field {
            Field::Company => &mut self.company,
            Field::Product => &mut self.product,
            Field::Segmentation => &mut self.segmentation,
            Field::Channels => &mut self.channels,
            Field::Location => &mut self.location,
            Field::LeadSources => &mut self.lead_sources,
            Field::ListQualification => &mut self.list_qualification,
            Field::LeadQualification => &mut self.lead_qualification,
            Field::ValueOffer => &mut self.value_offer,
            Field::Approach => &mut self.approach,
            Field::Objections => &mut self.objections,
            Field::FollowUp => &mut self.follow_up,
            Field::SalesGoal | Field::AverageTicket | Field::ConversionRate => return None,
        };
        Some(s)
    }

    /// Mutable access to a numeric field; `None` for text fields.
    pub fn number_mut(&mut self, field: Field) -> Option<&mut Decimal> {
        match field {
            Field::SalesGoal => Some(&mut self.sales_goal),
            Field::AverageTicket => Some(&mut self.average_ticket),
            Field::ConversionRate => Some(&mut self.conversion_rate),
            _ => None,
        }
    }
}
