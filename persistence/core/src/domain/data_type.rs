// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Value-type enumerations of the AAS metamodel.
//!
//! `DataTypeDefXsd` types the values of properties, ranges, qualifiers and
//! extensions; `DataTypeIec61360` types IEC 61360 data specification content.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::reference::parse_enum_name;
use crate::domain::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTypeDefXsd {
    #[serde(rename = "xs:anyURI")]
    AnyUri,
    #[serde(rename = "xs:base64Binary")]
    Base64Binary,
    #[serde(rename = "xs:boolean")]
    Boolean,
    #[serde(rename = "xs:byte")]
    Byte,
    #[serde(rename = "xs:date")]
    Date,
    #[serde(rename = "xs:dateTime")]
    DateTime,
    #[serde(rename = "xs:decimal")]
    Decimal,
    #[serde(rename = "xs:double")]
    Double,
    #[serde(rename = "xs:duration")]
    Duration,
    #[serde(rename = "xs:float")]
    Float,
    #[serde(rename = "xs:gDay")]
    GDay,
    #[serde(rename = "xs:gMonth")]
    GMonth,
    #[serde(rename = "xs:gMonthDay")]
    GMonthDay,
    #[serde(rename = "xs:gYear")]
    GYear,
    #[serde(rename = "xs:gYearMonth")]
    GYearMonth,
    #[serde(rename = "xs:hexBinary")]
    HexBinary,
    #[serde(rename = "xs:int")]
    Int,
    #[serde(rename = "xs:integer")]
    Integer,
    #[serde(rename = "xs:long")]
    Long,
    #[serde(rename = "xs:negativeInteger")]
    NegativeInteger,
    #[serde(rename = "xs:nonNegativeInteger")]
    NonNegativeInteger,
    #[serde(rename = "xs:nonPositiveInteger")]
    NonPositiveInteger,
    #[serde(rename = "xs:positiveInteger")]
    PositiveInteger,
    #[serde(rename = "xs:short")]
    Short,
    #[serde(rename = "xs:string")]
    String,
    #[serde(rename = "xs:time")]
    Time,
    #[serde(rename = "xs:unsignedByte")]
    UnsignedByte,
    #[serde(rename = "xs:unsignedInt")]
    UnsignedInt,
    #[serde(rename = "xs:unsignedLong")]
    UnsignedLong,
    #[serde(rename = "xs:unsignedShort")]
    UnsignedShort,
}

impl FromStr for DataTypeDefXsd {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum_name("xsd data type", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataTypeIec61360 {
    Date,
    String,
    StringTranslatable,
    IntegerMeasure,
    IntegerCount,
    IntegerCurrency,
    RealMeasure,
    RealCount,
    RealCurrency,
    Boolean,
    Iri,
    Irdi,
    Rational,
    RationalMeasure,
    Time,
    Timestamp,
    File,
    Html,
    Blob,
}

impl FromStr for DataTypeIec61360 {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum_name("IEC 61360 data type", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xsd_names() {
        assert_eq!("xs:string".parse::<DataTypeDefXsd>().unwrap(), DataTypeDefXsd::String);
        assert_eq!(
            serde_json::to_value(DataTypeDefXsd::NonNegativeInteger).unwrap(),
            "xs:nonNegativeInteger"
        );
        assert!("string".parse::<DataTypeDefXsd>().is_err());
    }

    #[test]
    fn test_iec_names() {
        assert_eq!(
            "STRING_TRANSLATABLE".parse::<DataTypeIec61360>().unwrap(),
            DataTypeIec61360::StringTranslatable
        );
        assert_eq!(serde_json::to_value(DataTypeIec61360::Irdi).unwrap(), "IRDI");
    }
}
